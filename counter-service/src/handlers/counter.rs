use crate::dtos::CountResponse;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

pub async fn get_counter(State(state): State<AppState>) -> Result<Json<CountResponse>, AppError> {
    tracing::info!("get_counter triggered");

    let count = state.counter.get().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch counter");
        e.during("Failed to read counter")
    })?;

    Ok(Json(CountResponse { count }))
}

pub async fn increment_counter(
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    tracing::info!("increment_counter triggered");

    let count = state.counter.increment().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to increment counter");
        e.during("Failed to increment counter")
    })?;

    Ok(Json(CountResponse { count }))
}

/// CORS preflight: empty 200. Headers come from the CORS middleware.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
