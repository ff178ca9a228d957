//! Publishers service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::publisher::{CreatePublisher, Publisher, UpdatePublisher},
    repository::Repository,
};

#[derive(Clone)]
pub struct PublishersService {
    repository: Repository,
}

impl PublishersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Publisher>> {
        self.repository.publishers.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<Publisher> {
        self.repository.publishers.get_by_id(id).await
    }

    pub async fn create(&self, request: &CreatePublisher) -> AppResult<Publisher> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        self.repository.publishers.create(request).await
    }

    pub async fn update(&self, id: i32, request: &UpdatePublisher) -> AppResult<Publisher> {
        self.repository.publishers.update(id, request).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.publishers.delete(id).await
    }
}
