use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use tracing::error;

use super::state::AppState;
use crate::bundle::{MapSettings, MarkerRecord};
use crate::html_template::asset_text;

pub async fn index_html(State(state): State<AppState>) -> Html<String> {
    Html((*state.page).clone())
}

pub async fn runtime_js() -> Response {
    match asset_text("runtime.js") {
        Ok(body) => ([(header::CONTENT_TYPE, "application/javascript")], body).into_response(),
        Err(e) => {
            error!("runtime asset unavailable: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn get_settings(State(state): State<AppState>) -> Json<MapSettings> {
    Json(state.bundle.settings.clone())
}

pub async fn get_markers(State(state): State<AppState>) -> Json<Vec<MarkerRecord>> {
    Json(state.bundle.markers.clone())
}
