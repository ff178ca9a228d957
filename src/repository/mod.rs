//! Repository layer for database operations

pub mod authors;
pub mod categories;
pub mod loans;
pub mod materials;
pub mod publishers;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub materials: materials::MaterialsRepository,
    pub loans: loans::LoansRepository,
    pub authors: authors::AuthorsRepository,
    pub categories: categories::CategoriesRepository,
    pub publishers: publishers::PublishersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            materials: materials::MaterialsRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            publishers: publishers::PublishersRepository::new(pool.clone()),
            pool,
        }
    }
}
