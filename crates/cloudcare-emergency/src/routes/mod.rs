//! Router for the `/api/emergency` surface.

mod alerts;
mod stream;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::server::AppState;

pub const STREAM_PATH: &str = "/api/emergency/stream";

pub fn emergency_routes() -> Router<AppState> {
    Router::new()
        .route(STREAM_PATH, get(stream::emergency_stream))
        .route(
            "/api/emergency/alerts",
            get(alerts::list_alerts).post(alerts::create_alert),
        )
        .route("/api/emergency/alerts/{alert_id}", get(alerts::get_alert))
        .route(
            "/api/emergency/alerts/{alert_id}/acknowledge",
            patch(alerts::acknowledge_alert),
        )
        .route(
            "/api/emergency/alerts/{alert_id}/respond",
            patch(alerts::respond_to_alert),
        )
        .route(
            "/api/emergency/alerts/{alert_id}/resolve",
            patch(alerts::resolve_alert),
        )
        .route(
            "/api/emergency/alerts/{alert_id}/false-alarm",
            patch(alerts::mark_false_alarm),
        )
        .route(
            "/api/emergency/patients/{patient_id}/alerts",
            get(alerts::patient_alerts),
        )
        .route("/api/emergency/statistics", get(alerts::statistics))
}
