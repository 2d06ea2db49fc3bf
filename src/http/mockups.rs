use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::AppResult;
use crate::models::{Mockup, MockupFilter, MockupReview, MockupUpdate, NewMockup, Page};

pub async fn list_mockups(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<MockupFilter>,
) -> AppResult<Json<Page<Mockup>>> {
    Ok(Json(state.db.list_mockups(&filter).await?))
}

pub async fn create_mockup(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(mockup): ApiJson<NewMockup>,
) -> AppResult<(StatusCode, Json<Mockup>)> {
    caller.require_staff()?;
    let mockup = state.db.create_mockup(&mockup, caller.id()).await?;
    Ok((StatusCode::CREATED, Json(mockup)))
}

pub async fn get_mockup(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Mockup>> {
    Ok(Json(state.db.get_mockup(id).await?))
}

pub async fn update_mockup(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<MockupUpdate>,
) -> AppResult<Json<Mockup>> {
    caller.require_staff()?;
    Ok(Json(state.db.update_mockup(id, update).await?))
}

// Clients sign off on designs here, so no role check.
pub async fn review_mockup(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(review): ApiJson<MockupReview>,
) -> AppResult<Json<Mockup>> {
    Ok(Json(state.db.review_mockup(id, &review).await?))
}

pub async fn delete_mockup(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_staff()?;
    state.db.delete_mockup(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
