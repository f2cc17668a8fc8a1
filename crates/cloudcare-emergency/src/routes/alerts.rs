use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use cloudcare_api::{ApiError, BaseResponse};
use cloudcare_storage::{EmergencyAlert, Severity};
use serde::Deserialize;

use crate::alerts::{AlertStatistics, CreateAlertRequest, ListAlertsQuery};
use crate::server::AppState;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
    #[serde(default = "default_true")]
    pub active_only: bool,
    pub severity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatientAlertsParams {
    #[serde(default = "default_true")]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeParams {
    pub responder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondParams {
    pub responder_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FalseAlarmParams {
    pub notes: Option<String>,
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(p)| p)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

pub async fn create_alert(
    State(state): State<AppState>,
    body: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| match e {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::unsupported_media_type(e.body_text())
        }
        JsonRejection::JsonSyntaxError(_) => ApiError::bad_request(e.body_text()),
        _ => ApiError::unprocessable_entity(e.body_text()),
    })?;
    let alert = state.alerts.create(request).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> Result<Json<EmergencyAlert>, ApiError> {
    Ok(Json(state.alerts.get(&alert_id).await?))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<EmergencyAlert>>, ApiError> {
    let params = query(params)?;
    let severity = params
        .severity
        .as_deref()
        .map(str::parse::<Severity>)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let alerts = state
        .alerts
        .list(ListAlertsQuery {
            skip: params.skip,
            limit: params.limit,
            active_only: params.active_only,
            severity,
        })
        .await?;
    Ok(Json(alerts))
}

pub async fn patient_alerts(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    params: Result<Query<PatientAlertsParams>, QueryRejection>,
) -> Result<Json<Vec<EmergencyAlert>>, ApiError> {
    let params = query(params)?;
    let alerts = state
        .alerts
        .patient_alerts(&patient_id, params.active_only)
        .await?;
    Ok(Json(alerts))
}

pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    params: Result<Query<AcknowledgeParams>, QueryRejection>,
) -> Result<Json<BaseResponse>, ApiError> {
    let params = query(params)?;
    let resp = state
        .alerts
        .acknowledge(&alert_id, params.responder_id.as_deref())
        .await?;
    Ok(Json(resp))
}

pub async fn respond_to_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    params: Result<Query<RespondParams>, QueryRejection>,
) -> Result<Json<BaseResponse>, ApiError> {
    let params = query(params)?;
    let resp = state
        .alerts
        .respond(&alert_id, params.responder_id.as_deref(), params.notes)
        .await?;
    Ok(Json(resp))
}

pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    params: Result<Query<ResolveParams>, QueryRejection>,
) -> Result<Json<BaseResponse>, ApiError> {
    let params = query(params)?;
    let resp = state
        .alerts
        .resolve(&alert_id, params.resolution_notes)
        .await?;
    Ok(Json(resp))
}

pub async fn mark_false_alarm(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    params: Result<Query<FalseAlarmParams>, QueryRejection>,
) -> Result<Json<BaseResponse>, ApiError> {
    let params = query(params)?;
    let resp = state.alerts.false_alarm(&alert_id, params.notes).await?;
    Ok(Json(resp))
}

pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<AlertStatistics>, ApiError> {
    Ok(Json(state.alerts.statistics().await?))
}
