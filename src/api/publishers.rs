//! Publisher endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::publisher::{CreatePublisher, Publisher, UpdatePublisher},
    AppState,
};

/// List publishers
#[utoipa::path(
    get,
    path = "/publishers",
    tag = "publishers",
    responses(
        (status = 200, description = "List of publishers", body = Vec<Publisher>)
    )
)]
pub async fn list_publishers(State(state): State<AppState>) -> AppResult<Json<Vec<Publisher>>> {
    let publishers = state.services.publishers.list().await?;
    Ok(Json(publishers))
}

/// Get a publisher by ID
#[utoipa::path(
    get,
    path = "/publishers/{id}",
    tag = "publishers",
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    responses(
        (status = 200, description = "Publisher", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn get_publisher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Publisher>> {
    let publisher = state.services.publishers.get(id).await?;
    Ok(Json(publisher))
}

/// Create a publisher
#[utoipa::path(
    post,
    path = "/publishers",
    tag = "publishers",
    request_body = CreatePublisher,
    responses(
        (status = 201, description = "Publisher created", body = Publisher),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_publisher(
    State(state): State<AppState>,
    Json(request): Json<CreatePublisher>,
) -> AppResult<(StatusCode, Json<Publisher>)> {
    let publisher = state.services.publishers.create(&request).await?;
    Ok((StatusCode::CREATED, Json(publisher)))
}

/// Update a publisher
#[utoipa::path(
    put,
    path = "/publishers/{id}",
    tag = "publishers",
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    request_body = UpdatePublisher,
    responses(
        (status = 200, description = "Publisher updated", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn update_publisher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdatePublisher>,
) -> AppResult<Json<Publisher>> {
    let publisher = state.services.publishers.update(id, &request).await?;
    Ok(Json(publisher))
}

/// Delete a publisher
#[utoipa::path(
    delete,
    path = "/publishers/{id}",
    tag = "publishers",
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    responses(
        (status = 204, description = "Publisher deleted"),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn delete_publisher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.publishers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
