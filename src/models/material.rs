//! Catalog material model (books and magazines)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Kind of catalog material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Book,
    Magazine,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Book => "book",
            MaterialType::Magazine => "magazine",
        }
    }
}

impl std::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MaterialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "book" => Ok(MaterialType::Book),
            "magazine" => Ok(MaterialType::Magazine),
            _ => Err(format!("Invalid material type: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for MaterialType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for MaterialType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for MaterialType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Material availability status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    Available,
    Loaned,
    InRepair,
    Lost,
}

impl MaterialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialStatus::Available => "available",
            MaterialStatus::Loaned => "loaned",
            MaterialStatus::InRepair => "in_repair",
            MaterialStatus::Lost => "lost",
        }
    }

    /// Status implied by a copy count after a loan mutation
    pub fn from_available_copies(available: i32) -> Self {
        if available <= 0 {
            MaterialStatus::Loaned
        } else {
            MaterialStatus::Available
        }
    }
}

impl std::fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MaterialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(MaterialStatus::Available),
            "loaned" => Ok(MaterialStatus::Loaned),
            "in_repair" => Ok(MaterialStatus::InRepair),
            "lost" => Ok(MaterialStatus::Lost),
            _ => Err(format!("Invalid material status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for MaterialStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for MaterialStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for MaterialStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Full material model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Material {
    pub id: i32,
    pub material_type: MaterialType,
    pub title: String,
    pub author: String,
    /// Catalog code (unique)
    pub code: String,
    pub category: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub publication_date: Option<NaiveDate>,
    pub publisher: Option<String>,
    pub location: Option<String>,
    pub cover_image: Option<String>,
    // Book-only fields
    pub edition: Option<String>,
    pub pages: Option<i32>,
    // Magazine-only fields
    pub volume: Option<i32>,
    pub number: Option<i32>,
    pub periodicity: Option<String>,
    pub status: MaterialStatus,
}

impl Material {
    /// Whether this material can ever be lent out
    pub fn is_loanable(&self) -> bool {
        self.material_type != MaterialType::Magazine
    }
}

/// Availability filter for material lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// At least one copy on the shelf
    Available,
    /// No copies left
    Exhausted,
}

/// Material list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct MaterialQuery {
    #[serde(rename = "type")]
    pub material_type: Option<MaterialType>,
    pub category: Option<String>,
    /// Partial title search (case-insensitive)
    pub title: Option<String>,
    pub availability: Option<Availability>,
}

/// Create material request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaterial {
    pub material_type: MaterialType,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub publication_date: Option<NaiveDate>,
    pub publisher: Option<String>,
    pub location: Option<String>,
    pub cover_image: Option<String>,
    pub edition: Option<String>,
    pub pages: Option<i32>,
    pub volume: Option<i32>,
    pub number: Option<i32>,
    pub periodicity: Option<String>,
    pub status: Option<MaterialStatus>,
}

/// Update material request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMaterial {
    pub material_type: Option<MaterialType>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
    pub publication_date: Option<NaiveDate>,
    pub publisher: Option<String>,
    pub location: Option<String>,
    pub cover_image: Option<String>,
    pub edition: Option<String>,
    pub pages: Option<i32>,
    pub volume: Option<i32>,
    pub number: Option<i32>,
    pub periodicity: Option<String>,
    pub status: Option<MaterialStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magazines_are_never_loanable() {
        let magazine = Material {
            id: 1,
            material_type: MaterialType::Magazine,
            title: "National Geographic".to_string(),
            author: "Various".to_string(),
            code: "MAG-001".to_string(),
            category: "Science".to_string(),
            total_copies: 5,
            available_copies: 5,
            publication_date: None,
            publisher: None,
            location: None,
            cover_image: None,
            edition: None,
            pages: None,
            volume: Some(12),
            number: Some(3),
            periodicity: Some("monthly".to_string()),
            status: MaterialStatus::Available,
        };
        assert!(!magazine.is_loanable());

        let book = Material {
            material_type: MaterialType::Book,
            volume: None,
            number: None,
            periodicity: None,
            edition: Some("2nd".to_string()),
            pages: Some(320),
            ..magazine
        };
        assert!(book.is_loanable());
    }

    #[test]
    fn status_follows_copy_count() {
        assert_eq!(MaterialStatus::from_available_copies(0), MaterialStatus::Loaned);
        assert_eq!(MaterialStatus::from_available_copies(-1), MaterialStatus::Loaned);
        assert_eq!(MaterialStatus::from_available_copies(1), MaterialStatus::Available);
    }

    #[test]
    fn status_slugs_round_trip() {
        for status in [
            MaterialStatus::Available,
            MaterialStatus::Loaned,
            MaterialStatus::InRepair,
            MaterialStatus::Lost,
        ] {
            assert_eq!(status.as_str().parse::<MaterialStatus>().unwrap(), status);
        }
    }
}
