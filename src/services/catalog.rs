//! Catalog (materials) service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::material::{CreateMaterial, Material, MaterialQuery, UpdateMaterial},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: i32) -> AppResult<Material> {
        self.repository.materials.get_by_id(id).await
    }

    pub async fn list(&self, query: &MaterialQuery) -> AppResult<Vec<Material>> {
        self.repository.materials.list(query).await
    }

    pub async fn create(&self, request: &CreateMaterial) -> AppResult<Material> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        validate_copy_counts(request.total_copies, request.available_copies)?;

        self.repository.materials.create(request).await
    }

    pub async fn update(&self, id: i32, request: &UpdateMaterial) -> AppResult<Material> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let (Some(total), Some(available)) = (request.total_copies, request.available_copies) {
            validate_copy_counts(total, available)?;
        }

        self.repository.materials.update(id, request).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.materials.delete(id).await
    }

    /// Materials ranked by loan count
    pub async fn most_borrowed(&self, limit: i64) -> AppResult<Vec<Material>> {
        self.repository.materials.most_borrowed(limit).await
    }
}

fn validate_copy_counts(total: i32, available: i32) -> AppResult<()> {
    if total < 0 || available < 0 {
        return Err(AppError::Validation(
            "Copy counts cannot be negative".to_string(),
        ));
    }
    if available > total {
        return Err(AppError::Validation(
            "Available copies cannot exceed total copies".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_counts_are_bounded() {
        assert!(validate_copy_counts(5, 5).is_ok());
        assert!(validate_copy_counts(5, 0).is_ok());
        assert!(matches!(
            validate_copy_counts(5, 6),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_copy_counts(-1, 0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_copy_counts(5, -2),
            Err(AppError::Validation(_))
        ));
    }
}
