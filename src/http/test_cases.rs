use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::AppResult;
use crate::models::{NewTestCase, Page, TestCase, TestCaseFilter, TestCaseUpdate, TestResult};

pub async fn list_test_cases(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<TestCaseFilter>,
) -> AppResult<Json<Page<TestCase>>> {
    Ok(Json(state.db.list_test_cases(&filter).await?))
}

pub async fn create_test_case(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(case): ApiJson<NewTestCase>,
) -> AppResult<(StatusCode, Json<TestCase>)> {
    caller.require_staff()?;
    let case = state.db.create_test_case(&case).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn get_test_case(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<TestCase>> {
    Ok(Json(state.db.get_test_case(id).await?))
}

pub async fn update_test_case(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<TestCaseUpdate>,
) -> AppResult<Json<TestCase>> {
    caller.require_staff()?;
    Ok(Json(state.db.update_test_case(id, update).await?))
}

/// UAT runs are open to every role, including client testers.
pub async fn record_result(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(result): ApiJson<TestResult>,
) -> AppResult<Json<TestCase>> {
    let case = state.db.record_test_result(id, &result, caller.id()).await?;
    Ok(Json(case))
}

pub async fn delete_test_case(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_staff()?;
    state.db.delete_test_case(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
