//! Catalog material endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::material::{CreateMaterial, Material, MaterialQuery, UpdateMaterial},
    AppState,
};

/// Query for the most-borrowed ranking
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct MostBorrowedQuery {
    /// Maximum number of entries (default 10)
    pub limit: Option<i64>,
}

/// List materials
#[utoipa::path(
    get,
    path = "/materials",
    tag = "materials",
    params(MaterialQuery),
    responses(
        (status = 200, description = "List of materials", body = Vec<Material>)
    )
)]
pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<MaterialQuery>,
) -> AppResult<Json<Vec<Material>>> {
    let materials = state.services.catalog.list(&query).await?;
    Ok(Json(materials))
}

/// Materials ranked by loan count
#[utoipa::path(
    get,
    path = "/materials/most-borrowed",
    tag = "materials",
    params(MostBorrowedQuery),
    responses(
        (status = 200, description = "Most borrowed materials", body = Vec<Material>)
    )
)]
pub async fn most_borrowed(
    State(state): State<AppState>,
    Query(query): Query<MostBorrowedQuery>,
) -> AppResult<Json<Vec<Material>>> {
    let materials = state
        .services
        .catalog
        .most_borrowed(query.limit.unwrap_or(10))
        .await?;
    Ok(Json(materials))
}

/// Get a material by ID
#[utoipa::path(
    get,
    path = "/materials/{id}",
    tag = "materials",
    params(
        ("id" = i32, Path, description = "Material ID")
    ),
    responses(
        (status = 200, description = "Material", body = Material),
        (status = 404, description = "Material not found")
    )
)]
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Material>> {
    let material = state.services.catalog.get(id).await?;
    Ok(Json(material))
}

/// Add a material to the catalog
#[utoipa::path(
    post,
    path = "/materials",
    tag = "materials",
    request_body = CreateMaterial,
    responses(
        (status = 201, description = "Material created", body = Material),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_material(
    State(state): State<AppState>,
    Json(request): Json<CreateMaterial>,
) -> AppResult<(StatusCode, Json<Material>)> {
    let material = state.services.catalog.create(&request).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// Update a material
#[utoipa::path(
    put,
    path = "/materials/{id}",
    tag = "materials",
    params(
        ("id" = i32, Path, description = "Material ID")
    ),
    request_body = UpdateMaterial,
    responses(
        (status = 200, description = "Material updated", body = Material),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Material not found")
    )
)]
pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateMaterial>,
) -> AppResult<Json<Material>> {
    let material = state.services.catalog.update(id, &request).await?;
    Ok(Json(material))
}

/// Delete a material
#[utoipa::path(
    delete,
    path = "/materials/{id}",
    tag = "materials",
    params(
        ("id" = i32, Path, description = "Material ID")
    ),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 404, description = "Material not found")
    )
)]
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
