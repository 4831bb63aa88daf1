//! Admin HTTP API over the directory.

use crate::error::{DirectoryError, ErrorCode};
use crate::health;
use crate::metrics::METRICS;
use crate::model::{
    Employee, EmployeeId, EmployeeUpdate, Extension, ExtensionId, ExtensionInput,
    ExtensionListing, NewEmployee,
};
use crate::report::REPORT_CONTENT_TYPE;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route(
            "/employees/{id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/extensions", get(list_extensions).post(create_extension))
        .route(
            "/extensions/{id}",
            get(get_extension)
                .put(update_extension)
                .delete(delete_extension),
        )
        .route("/report", get(download_report))
        .route("/health", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: ErrorCode,
    category: &'static str,
    message: String,
}

pub struct ApiError(DirectoryError);

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = match code {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::EmployeeNotFound | ErrorCode::ExtensionNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::NotificationFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::ReportFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code,
                category: code.category(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn list_employees(State(state): State<Arc<AppState>>) -> Json<Vec<Employee>> {
    Json(state.directory().employees())
}

async fn create_employee(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewEmployee>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    let employee = state.directory().create_employee(input)?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn get_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(state.directory().employee(EmployeeId(id))?))
}

async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(update): Json<EmployeeUpdate>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(state.directory().update_employee(EmployeeId(id), update)?))
}

async fn delete_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.directory().delete_employee(EmployeeId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_extensions(State(state): State<Arc<AppState>>) -> Json<Vec<ExtensionListing>> {
    Json(state.directory().extensions())
}

async fn create_extension(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ExtensionInput>,
) -> ApiResult<(StatusCode, Json<Extension>)> {
    let extension = state.directory().create_extension(input).await?;
    Ok((StatusCode::CREATED, Json(extension)))
}

async fn get_extension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Extension>> {
    Ok(Json(state.directory().extension(ExtensionId(id))?))
}

async fn update_extension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(input): Json<ExtensionInput>,
) -> ApiResult<Json<Extension>> {
    Ok(Json(
        state
            .directory()
            .update_extension(ExtensionId(id), input)
            .await?,
    ))
}

async fn delete_extension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.directory().delete_extension(ExtensionId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_report(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let document = state
        .directory()
        .render_report(Utc::now().date_naive())?;
    let disposition = format!("attachment; filename=\"{}\"", document.filename());
    Ok((
        [
            (header::CONTENT_TYPE, REPORT_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.into_bytes(),
    )
        .into_response())
}

async fn metrics_handler() -> (StatusCode, String) {
    (StatusCode::OK, METRICS.encode())
}
