//! Author model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub biography: String,
    /// Photo URL
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub biography: String,
    #[validate(url(message = "Photo must be a valid URL"))]
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    pub name: Option<String>,
    pub biography: Option<String>,
    #[validate(url(message = "Photo must be a valid URL"))]
    pub photo: Option<String>,
}
