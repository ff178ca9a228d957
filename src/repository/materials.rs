//! Materials repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::material::{
        Availability, CreateMaterial, Material, MaterialQuery, MaterialStatus, UpdateMaterial,
    },
};

#[derive(Clone)]
pub struct MaterialsRepository {
    pool: Pool<Postgres>,
}

impl MaterialsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get material by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Material> {
        sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material with id {} not found", id)))
    }

    /// List materials with optional filters
    pub async fn list(&self, query: &MaterialQuery) -> AppResult<Vec<Material>> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(material_type) = query.material_type {
            params.push(material_type.as_str().to_string());
            conditions.push(format!("material_type = ${}", params.len()));
        }

        if let Some(ref category) = query.category {
            params.push(category.clone());
            conditions.push(format!("category = ${}", params.len()));
        }

        if let Some(ref title) = query.title {
            params.push(format!("%{}%", title));
            conditions.push(format!("title ILIKE ${}", params.len()));
        }

        match query.availability {
            Some(Availability::Available) => conditions.push("available_copies > 0".to_string()),
            Some(Availability::Exhausted) => conditions.push("available_copies = 0".to_string()),
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!("SELECT * FROM materials {} ORDER BY title", where_clause);

        let mut builder = sqlx::query_as::<_, Material>(&select_query);
        for param in &params {
            builder = builder.bind(param);
        }
        let materials = builder.fetch_all(&self.pool).await?;

        Ok(materials)
    }

    /// Create a new material
    pub async fn create(&self, material: &CreateMaterial) -> AppResult<Material> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO materials (
                material_type, title, author, code, category,
                total_copies, available_copies, publication_date, publisher,
                location, cover_image, edition, pages, volume, number,
                periodicity, status
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17
            ) RETURNING id
            "#,
        )
        .bind(material.material_type)
        .bind(&material.title)
        .bind(&material.author)
        .bind(&material.code)
        .bind(&material.category)
        .bind(material.total_copies)
        .bind(material.available_copies)
        .bind(material.publication_date)
        .bind(&material.publisher)
        .bind(&material.location)
        .bind(&material.cover_image)
        .bind(&material.edition)
        .bind(material.pages)
        .bind(material.volume)
        .bind(material.number)
        .bind(&material.periodicity)
        .bind(material.status.unwrap_or(MaterialStatus::Available))
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update an existing material
    pub async fn update(&self, id: i32, material: &UpdateMaterial) -> AppResult<Material> {
        let mut sets = Vec::new();
        let mut param_idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(material.material_type, "material_type");
        add_field!(material.title, "title");
        add_field!(material.author, "author");
        add_field!(material.code, "code");
        add_field!(material.category, "category");
        add_field!(material.total_copies, "total_copies");
        add_field!(material.available_copies, "available_copies");
        add_field!(material.publication_date, "publication_date");
        add_field!(material.publisher, "publisher");
        add_field!(material.location, "location");
        add_field!(material.cover_image, "cover_image");
        add_field!(material.edition, "edition");
        add_field!(material.pages, "pages");
        add_field!(material.volume, "volume");
        add_field!(material.number, "number");
        add_field!(material.periodicity, "periodicity");
        add_field!(material.status, "status");

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!("UPDATE materials SET {} WHERE id = {}", sets.join(", "), id);

        let mut builder = sqlx::query(&query);

        if let Some(material_type) = material.material_type {
            builder = builder.bind(material_type);
        }

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(material.title);
        bind_field!(material.author);
        bind_field!(material.code);
        bind_field!(material.category);

        if let Some(total) = material.total_copies {
            builder = builder.bind(total);
        }
        if let Some(available) = material.available_copies {
            builder = builder.bind(available);
        }
        if let Some(date) = material.publication_date {
            builder = builder.bind(date);
        }

        bind_field!(material.publisher);
        bind_field!(material.location);
        bind_field!(material.cover_image);
        bind_field!(material.edition);

        if let Some(pages) = material.pages {
            builder = builder.bind(pages);
        }
        if let Some(volume) = material.volume {
            builder = builder.bind(volume);
        }
        if let Some(number) = material.number {
            builder = builder.bind(number);
        }

        bind_field!(material.periodicity);

        if let Some(status) = material.status {
            builder = builder.bind(status);
        }

        builder.execute(&self.pool).await?;

        self.get_by_id(id).await
    }

    /// Delete a material
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Material with id {} not found",
                id
            )));
        }

        Ok(())
    }

    /// Apply a copy-count delta and set the status recomputed by the caller.
    ///
    /// Loan creation passes (-1, loaned|available); loan return passes
    /// (+1, available). No lower-bound guard: the availability check lives in
    /// the lifecycle service and two concurrent creates can race past it.
    pub async fn update_availability(
        &self,
        id: i32,
        delta_copies: i32,
        new_status: MaterialStatus,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE materials
            SET available_copies = available_copies + $1, status = $2
            WHERE id = $3
            "#,
        )
        .bind(delta_copies)
        .bind(new_status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Materials ranked by how often they have been loaned out
    pub async fn most_borrowed(&self, limit: i64) -> AppResult<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(
            r#"
            SELECT m.* FROM materials m
            JOIN loans l ON l.material_id = m.id
            GROUP BY m.id
            ORDER BY COUNT(l.id) DESC, m.title
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(materials)
    }
}
