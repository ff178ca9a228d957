//! Publishers repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::publisher::{CreatePublisher, Publisher, UpdatePublisher},
};

#[derive(Clone)]
pub struct PublishersRepository {
    pool: Pool<Postgres>,
}

impl PublishersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Publisher>> {
        let publishers = sqlx::query_as::<_, Publisher>("SELECT * FROM publishers ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(publishers)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Publisher> {
        sqlx::query_as::<_, Publisher>("SELECT * FROM publishers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Publisher with id {} not found", id)))
    }

    pub async fn create(&self, publisher: &CreatePublisher) -> AppResult<Publisher> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO publishers (name, country, founded) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&publisher.name)
        .bind(&publisher.country)
        .bind(publisher.founded)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, publisher: &UpdatePublisher) -> AppResult<Publisher> {
        sqlx::query(
            r#"
            UPDATE publishers
            SET name = COALESCE($1, name),
                country = COALESCE($2, country),
                founded = COALESCE($3, founded)
            WHERE id = $4
            "#,
        )
        .bind(&publisher.name)
        .bind(&publisher.country)
        .bind(publisher.founded)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM publishers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Publisher with id {} not found",
                id
            )));
        }

        Ok(())
    }
}
