//! Business logic services

pub mod authors;
pub mod catalog;
pub mod categories;
pub mod loans;
pub mod publishers;
pub mod users;

use crate::{
    config::{AuthConfig, LoansConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub authors: authors::AuthorsService,
    pub categories: categories::CategoriesService,
    pub publishers: publishers::PublishersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, loans_config: LoansConfig) -> Self {
        Self {
            users: users::UsersService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), loans_config),
            authors: authors::AuthorsService::new(repository.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            publishers: publishers::PublishersService::new(repository),
        }
    }
}
