//! Categories service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CreateCategory, UpdateCategory},
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create(&self, request: &CreateCategory) -> AppResult<Category> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        self.repository.categories.create(request).await
    }

    pub async fn update(&self, id: i32, request: &UpdateCategory) -> AppResult<Category> {
        self.repository.categories.update(id, request).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await
    }
}
