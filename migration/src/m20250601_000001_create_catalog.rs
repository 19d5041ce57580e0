use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(string(Movies::Id).primary_key())
                    .col(string(Movies::Title))
                    .col(string_null(Movies::OriginalTitle))
                    .col(string(Movies::LetterboxdUrl))
                    .col(double_null(Movies::AverageRating))
                    .col(string(Movies::Genres))
                    .col(string_null(Movies::ReleaseDate))
                    .col(string_null(Movies::Synopsis))
                    .col(integer_null(Movies::Runtime))
                    .col(string(Movies::Actors))
                    .col(string(Movies::Studios))
                    .col(string_null(Movies::TmdbId))
                    .col(string_null(Movies::ImdbId))
                    .col(string_null(Movies::TmdbUrl))
                    .col(string_null(Movies::ImdbUrl))
                    .col(big_integer(Movies::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_letterboxd_url_unique")
                    .table(Movies::Table)
                    .col(Movies::LetterboxdUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(string(Reviews::Id).primary_key())
                    .col(string(Reviews::MovieId))
                    .col(string(Reviews::Author))
                    .col(string(Reviews::Content))
                    .col(double_null(Reviews::Rating))
                    .col(string(Reviews::Date))
                    .col(integer(Reviews::Likes))
                    .col(integer(Reviews::Comments))
                    .col(string(Reviews::LetterboxdUrl))
                    .col(double_null(Reviews::SentimentScore))
                    .col(big_integer(Reviews::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_movie_id")
                            .from(Reviews::Table, Reviews::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_movie_id")
                    .table(Reviews::Table)
                    .col(Reviews::MovieId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_identity_unique")
                    .table(Reviews::Table)
                    .col(Reviews::MovieId)
                    .col(Reviews::Author)
                    .col(Reviews::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Reviews::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    OriginalTitle,
    LetterboxdUrl,
    AverageRating,
    Genres,
    ReleaseDate,
    Synopsis,
    Runtime,
    Actors,
    Studios,
    TmdbId,
    ImdbId,
    TmdbUrl,
    ImdbUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    MovieId,
    Author,
    Content,
    Rating,
    Date,
    Likes,
    Comments,
    LetterboxdUrl,
    SentimentScore,
    CreatedAt,
}
