//! Authors repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::author::{Author, CreateAuthor, UpdateAuthor},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(authors)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO authors (name, biography, photo) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&author.name)
        .bind(&author.biography)
        .bind(&author.photo)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author> {
        sqlx::query(
            r#"
            UPDATE authors
            SET name = COALESCE($1, name),
                biography = COALESCE($2, biography),
                photo = COALESCE($3, photo)
            WHERE id = $4
            "#,
        )
        .bind(&author.name)
        .bind(&author.biography)
        .bind(&author.photo)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }

        Ok(())
    }
}
