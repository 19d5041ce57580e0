use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jiff::civil::Date;
use reqwest::header::{REFERER, RETRY_AFTER};
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::{
    error::AppResult,
    models::{FilmMetadata, ScrapedMovie, ScrapedReview},
};

const MAX_FETCH_RETRIES: u32 = 3;

pub async fn fetch_popular_page(
    client: &reqwest::Client,
    base_url: &str,
    language: &str,
    page: u32,
) -> AppResult<String> {
    let url = format!(
        "{}/films/ajax/popular/language/{}/page/{}/?esiAllowFilters=true",
        base_url.trim_end_matches('/'),
        language,
        page
    );
    debug!(page = page, url = %url, "fetching popular films page");

    let html = client
        .get(&url)
        .header(REFERER, base_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(html)
}

pub fn parse_popular_page(html: &str, base_url: &str) -> Vec<ScrapedMovie> {
    let doc = Html::parse_document(html);
    let item_selector = Selector::parse("li.poster-container").unwrap();
    let poster_selector = Selector::parse("div.film-poster").unwrap();
    let img_selector = Selector::parse("img").unwrap();

    let base = base_url.trim_end_matches('/');
    let mut out = Vec::new();

    for item in doc.select(&item_selector) {
        let Some(poster) = item.select(&poster_selector).next() else { continue };

        let title = poster
            .select(&img_selector)
            .next()
            .and_then(|img| img.value().attr("alt"));
        let link = poster.value().attr("data-target-link");

        let Some(title) = title else { continue };
        let Some(link) = link else { continue };

        let average_rating =
            item.value().attr("data-average-rating").and_then(|r| r.parse::<f64>().ok());

        out.push(ScrapedMovie {
            title: title.to_string(),
            letterboxd_url: format!("{base}{link}"),
            average_rating,
        });
    }

    out
}

/// Fetch a film page, honoring `Retry-After` on 429 for a bounded number of
/// attempts.
pub async fn fetch_film_metadata(
    client: &reqwest::Client,
    url: &str,
) -> AppResult<FilmMetadata> {
    let mut attempt = 0;

    let html = loop {
        let resp = client.get(url).header(REFERER, "https://letterboxd.com/").send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_FETCH_RETRIES {
            let wait: u64 = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(60);
            info!(url = %url, wait_secs = wait, "rate limited, waiting before retry");
            tokio::time::sleep(Duration::from_secs(wait)).await;
            attempt += 1;
            continue;
        }

        break resp.error_for_status()?.text().await?;
    };

    Ok(parse_film_page(&html))
}

pub fn parse_film_page(html: &str) -> FilmMetadata {
    let doc = Html::parse_document(html);

    let og_title_selector = Selector::parse("meta[property='og:title']").unwrap();
    let release_year = doc
        .select(&og_title_selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(|t| split_trailing_year(t).and_then(|(_, y)| y));

    let original_title_selector = Selector::parse("h2.originalname").unwrap();
    let original_title = doc.select(&original_title_selector).next().map(element_text);

    let synopsis_selector = Selector::parse(".review.body-text.-prose.-hero p").unwrap();
    let synopsis = doc.select(&synopsis_selector).next().map(element_text);

    let footer_selector = Selector::parse("p.text-footer").unwrap();
    let runtime = doc
        .select(&footer_selector)
        .next()
        .and_then(|el| parse_runtime_mins(&el.text().collect::<String>()));

    let cast_selector = Selector::parse(".cast-list.text-sluglist a").unwrap();
    let actors: Vec<String> = doc.select(&cast_selector).map(element_text).collect();

    let genre_selector = Selector::parse("#tab-genres .text-sluglist a").unwrap();
    let genres: Vec<String> = doc.select(&genre_selector).map(element_text).collect();

    let studio_selector =
        Selector::parse("#tab-details .text-sluglist a[href*='/studio/']").unwrap();
    let studios: Vec<String> = doc.select(&studio_selector).map(element_text).collect();

    let imdb_selector = Selector::parse(r#".text-footer a[data-track-action="IMDb"]"#).unwrap();
    let imdb_url = doc
        .select(&imdb_selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string);

    let tmdb_selector = Selector::parse(r#".text-footer a[data-track-action="TMDb"]"#).unwrap();
    let tmdb_url = doc
        .select(&tmdb_selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string);

    let imdb_id = imdb_url.as_deref().and_then(extract_imdb_id);
    let tmdb_id = tmdb_url.as_deref().and_then(extract_tmdb_id);

    FilmMetadata {
        original_title,
        synopsis,
        runtime,
        actors,
        genres,
        studios,
        release_year,
        tmdb_id,
        imdb_id,
        tmdb_url,
        imdb_url,
    }
}

pub async fn fetch_review_page(
    client: &reqwest::Client,
    film_url: &str,
    page: u32,
) -> AppResult<String> {
    let url =
        format!("{}/reviews/by/activity/page/{}/", film_url.trim_end_matches('/'), page);
    debug!(page = page, url = %url, "fetching review page");

    let html = client
        .get(&url)
        .header(REFERER, "https://letterboxd.com/")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(html)
}

pub fn parse_review_page(html: &str, source_url: &str, today: Date) -> Vec<ScrapedReview> {
    let doc = Html::parse_document(html);
    let item_selector = Selector::parse("li.film-detail").unwrap();
    let author_selector = Selector::parse("strong.name").unwrap();
    let date_selector = Selector::parse("span._nobr").unwrap();
    let rating_selector = Selector::parse("span.rating").unwrap();
    let content_selector = Selector::parse(".body-text").unwrap();
    let likes_selector = Selector::parse("[data-count]").unwrap();
    let comments_selector = Selector::parse("a.comment-count").unwrap();

    let mut out = Vec::new();

    for item in doc.select(&item_selector) {
        let Some(author) = item.select(&author_selector).next().map(element_text) else {
            continue;
        };

        let date = item
            .select(&date_selector)
            .next()
            .map(|el| parse_review_date(&el.text().collect::<String>(), today))
            .unwrap_or(today);

        let rating = item.select(&rating_selector).next().and_then(|el| {
            el.value()
                .classes()
                .find_map(|c| c.strip_prefix("rated-"))
                .and_then(|n| n.parse::<f64>().ok())
                .map(|n| n / 2.0)
        });

        let content =
            item.select(&content_selector).next().map(element_text).unwrap_or_default();

        let likes = item
            .select(&likes_selector)
            .next()
            .and_then(|el| el.value().attr("data-count"))
            .and_then(|s| s.trim().parse::<i32>().ok())
            .unwrap_or(0);

        let comments = item
            .select(&comments_selector)
            .next()
            .and_then(|el| el.text().collect::<String>().trim().parse::<i32>().ok())
            .unwrap_or(0);

        out.push(ScrapedReview {
            author,
            content,
            rating,
            date,
            likes,
            comments,
            letterboxd_url: source_url.to_string(),
        });
    }

    out
}

/// Review timestamps show up either as an ISO date or as a relative
/// "N days ago"; anything else falls back to today.
pub fn parse_review_date(raw: &str, today: Date) -> Date {
    let s = raw.trim();

    if let Ok(date) = s.parse::<Date>() {
        return date;
    }

    if let Some(prefix) = s.strip_suffix("days ago") {
        if let Ok(days) = prefix.trim().parse::<i64>() {
            return today.checked_sub(jiff::Span::new().days(days)).unwrap_or(today);
        }
    }

    today
}

fn element_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn parse_runtime_mins(text: &str) -> Option<i32> {
    let pos = text.find("mins")?;
    let head = text[..pos].trim_end();
    let digits: String =
        head.chars().rev().take_while(|c| c.is_ascii_digit()).collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn extract_imdb_id(url: &str) -> Option<String> {
    for (idx, _) in url.match_indices("tt") {
        let digits: String =
            url[idx + 2..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            return Some(format!("tt{digits}"));
        }
    }
    None
}

fn extract_tmdb_id(url: &str) -> Option<String> {
    if let Some(movie_pos) = url.find("/movie/") {
        let after = &url[movie_pos + 7..];
        let id: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        return (!id.is_empty()).then_some(id);
    }
    if let Some(tv_pos) = url.find("/tv/") {
        let after = &url[tv_pos + 4..];
        let id: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        return (!id.is_empty()).then_some(id);
    }
    None
}

pub(crate) fn jitter_ms(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos =
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos() as u64).unwrap_or(0);
    nanos % (max + 1)
}

fn split_trailing_year(title: &str) -> Option<(&str, Option<i16>)> {
    let s = title.trim();
    if !s.ends_with(')') {
        return Some((s, None));
    }
    let open = s.rfind('(')?;
    let inside = &s[open + 1..s.len() - 1];
    if inside.len() != 4 || !inside.chars().all(|c| c.is_ascii_digit()) {
        return Some((s, None));
    }
    let year = inside.parse().ok();
    Some((&s[..open].trim_end(), year))
}
