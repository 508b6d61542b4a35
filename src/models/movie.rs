use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Local copy of the title and poster of an external (TMDb) movie id.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub tmdb_id: i64,
    pub title: String,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MovieRequest {
    #[validate(range(min = 1, message = "tmdb_id is required"))]
    pub tmdb_id: i64,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl From<MovieRequest> for Movie {
    fn from(req: MovieRequest) -> Self {
        Movie {
            tmdb_id: req.tmdb_id,
            title: req.title,
            poster_path: req.poster_path.filter(|p| !p.trim().is_empty()),
        }
    }
}
