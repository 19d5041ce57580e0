use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub letterboxd_url: String,
    pub average_rating: Option<f64>,
    /// JSON-encoded list of genre names.
    pub genres: String,
    pub release_date: Option<String>,
    pub synopsis: Option<String>,
    pub runtime: Option<i32>,
    /// JSON-encoded list of cast member names.
    pub actors: String,
    /// JSON-encoded list of studio names.
    pub studios: String,
    pub tmdb_id: Option<String>,
    pub imdb_id: Option<String>,
    pub tmdb_url: Option<String>,
    pub imdb_url: Option<String>,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
