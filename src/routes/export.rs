use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::AppError;
use crate::models::CafeView;
use crate::registry::CafeRegistry;
use crate::AppState;

#[derive(Serialize)]
struct ExportData {
    exported_at: String,
    cafes: Vec<CafeView>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/export", get(export_data))
}

async fn export_data(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cafes = CafeRegistry::new(&state.db).list_with_status().await?;

    let export = ExportData {
        exported_at: chrono::Utc::now().to_rfc3339(),
        cafes,
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"cafes.json\""),
    );

    Ok((headers, Json(export)))
}
