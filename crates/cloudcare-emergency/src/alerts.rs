//! Emergency alert lifecycle.
//!
//! Every write goes to storage first and is then published on the
//! broadcaster, so a stream subscriber never sees an event for an alert the
//! API cannot return.

use cloudcare_api::{ApiError, BaseResponse};
use cloudcare_core::events::{AlertEventKind, EmergencyBroadcaster, EmergencyEvent};
use cloudcare_core::time::Timestamp;
use cloudcare_storage::{
    AlertFilter, AlertStatus, DynEmergencyStorage, EmergencyAlert, EmergencyFlag, Severity,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

pub const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlertRequest {
    pub alert_id: String,
    pub patient_id: String,
    /// Hospital name; unknown hospitals are ignored
    #[serde(default)]
    pub hospital_id: Option<String>,
    pub alert_type: String,
    pub severity: Severity,
    pub description: String,
    pub triggered_by: String,
    #[serde(default)]
    pub trigger_data: Option<Value>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CreateAlertRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let required = [
            ("alert_id", &self.alert_id),
            ("patient_id", &self.patient_id),
            ("alert_type", &self.alert_type),
            ("description", &self.description),
            ("triggered_by", &self.triggered_by),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ApiError::bad_request(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListAlertsQuery {
    pub skip: usize,
    pub limit: Option<usize>,
    pub active_only: bool,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertStatistics {
    pub total_alerts: u64,
    pub active_alerts: u64,
    pub responding_alerts: u64,
    pub resolved_alerts: u64,
    pub false_alarms: u64,
    /// Critical alerts still active or being responded to
    pub critical_active: u64,
    pub timestamp: Timestamp,
}

/// Write and read side of the alert API.
#[derive(Clone)]
pub struct AlertService {
    storage: DynEmergencyStorage,
    broadcaster: EmergencyBroadcaster,
}

impl AlertService {
    pub fn new(storage: DynEmergencyStorage, broadcaster: EmergencyBroadcaster) -> Self {
        Self {
            storage,
            broadcaster,
        }
    }

    pub fn broadcaster(&self) -> &EmergencyBroadcaster {
        &self.broadcaster
    }

    pub async fn create(&self, request: CreateAlertRequest) -> Result<EmergencyAlert, ApiError> {
        request.validate()?;

        let patient = self
            .storage
            .find_patient(&request.patient_id)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("Patient {} not found", request.patient_id))
            })?;

        let hospital = match request.hospital_id.as_deref() {
            Some(name) => self.storage.find_hospital_by_name(name).await?,
            None => None,
        };

        let now = OffsetDateTime::now_utc();
        let alert = EmergencyAlert {
            alert_id: request.alert_id.clone(),
            patient_id: patient.patient_id.clone(),
            hospital_id: hospital.map(|h| h.hospital_id),
            alert_type: request.alert_type.clone(),
            severity: request.severity,
            description: request.description.clone(),
            triggered_by: request.triggered_by.clone(),
            trigger_data: request.trigger_data.clone(),
            location: request.location.clone(),
            status: AlertStatus::Active,
            responders: Vec::new(),
            notes: None,
            response_time: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        let alert = self.storage.create_alert(alert).await?;

        self.storage
            .set_patient_emergency(
                &patient.patient_id,
                Some(EmergencyFlag {
                    emergency_type: alert.alert_type.clone(),
                    notes: Some(alert.description.clone()),
                }),
            )
            .await?;

        let timestamp = Timestamp::from(alert.created_at)
            .to_rfc3339()
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let mut details = Map::new();
        details.insert("patient_id".into(), Value::from(request.patient_id));
        details.insert("patient_name".into(), Value::from(patient.name));
        details.insert("alert_type".into(), Value::from(alert.alert_type.clone()));
        details.insert("severity".into(), Value::from(alert.severity.as_str()));
        details.insert("description".into(), Value::from(alert.description.clone()));
        details.insert("location".into(), option_value(request.location));
        details.insert(
            "trigger_data".into(),
            request.trigger_data.unwrap_or(Value::Null),
        );
        details.insert("timestamp".into(), Value::from(timestamp));
        details.insert("hospital_id".into(), option_value(request.hospital_id));
        self.broadcaster
            .publish(EmergencyEvent::alert_created(alert.alert_id.clone(), details));

        tracing::info!(
            alert_id = %alert.alert_id,
            patient_id = %alert.patient_id,
            severity = %alert.severity,
            alert_type = %alert.alert_type,
            status = %alert.status,
            "Emergency alert created"
        );
        Ok(alert)
    }

    pub async fn acknowledge(
        &self,
        alert_id: &str,
        responder_id: Option<&str>,
    ) -> Result<BaseResponse, ApiError> {
        let responder = responder_id.map(str::to_owned);
        let now = OffsetDateTime::now_utc();
        self.storage
            .modify_alert(
                alert_id,
                Box::new(move |alert| {
                    if let Some(responder) = responder {
                        alert.add_responder(&responder);
                    }
                    alert.transition(AlertStatus::Acknowledged, now);
                }),
            )
            .await?;

        self.broadcaster.publish(EmergencyEvent::status_changed(
            AlertEventKind::AlertAcknowledged,
            alert_id,
            responder_id,
        ));
        tracing::info!(
            alert_id,
            responder_id,
            status = %AlertStatus::Acknowledged,
            "Emergency alert acknowledged"
        );
        Ok(BaseResponse::ok(format!("Alert {alert_id} acknowledged")))
    }

    pub async fn respond(
        &self,
        alert_id: &str,
        responder_id: Option<&str>,
        notes: Option<String>,
    ) -> Result<BaseResponse, ApiError> {
        let responder_id = responder_id
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("responder_id is required"))?;

        let responder = responder_id.to_owned();
        let now = OffsetDateTime::now_utc();
        self.storage
            .modify_alert(
                alert_id,
                Box::new(move |alert| {
                    alert.add_responder(&responder);
                    alert.notes = notes;
                    alert.transition(AlertStatus::Responding, now);
                }),
            )
            .await?;

        self.broadcaster.publish(EmergencyEvent::status_changed(
            AlertEventKind::AlertResponding,
            alert_id,
            Some(responder_id),
        ));
        tracing::info!(
            alert_id,
            responder_id,
            status = %AlertStatus::Responding,
            "Emergency alert being responded to"
        );
        Ok(BaseResponse::ok(format!("Responding to alert {alert_id}")))
    }

    pub async fn resolve(
        &self,
        alert_id: &str,
        resolution_notes: Option<String>,
    ) -> Result<BaseResponse, ApiError> {
        let now = OffsetDateTime::now_utc();
        let alert = self
            .storage
            .modify_alert(
                alert_id,
                Box::new(move |alert| {
                    alert.notes = resolution_notes;
                    alert.transition(AlertStatus::Resolved, now);
                }),
            )
            .await?;

        // The flag stays while the patient has other open alerts.
        let cleared = self
            .storage
            .release_patient_emergency(&alert.patient_id)
            .await?;

        self.broadcaster.publish(EmergencyEvent::status_changed(
            AlertEventKind::AlertResolved,
            alert_id,
            None,
        ));
        tracing::info!(
            alert_id,
            cleared,
            status = %AlertStatus::Resolved,
            "Emergency alert resolved"
        );
        Ok(BaseResponse::ok(format!("Alert {alert_id} resolved")))
    }

    pub async fn false_alarm(
        &self,
        alert_id: &str,
        notes: Option<String>,
    ) -> Result<BaseResponse, ApiError> {
        let now = OffsetDateTime::now_utc();
        let alert = self
            .storage
            .modify_alert(
                alert_id,
                Box::new(move |alert| {
                    alert.notes = notes;
                    alert.transition(AlertStatus::FalseAlarm, now);
                }),
            )
            .await?;

        self.storage
            .set_patient_emergency(&alert.patient_id, None)
            .await?;

        self.broadcaster.publish(EmergencyEvent::status_changed(
            AlertEventKind::FalseAlarm,
            alert_id,
            None,
        ));
        tracing::info!(
            alert_id,
            status = %AlertStatus::FalseAlarm,
            "Emergency alert marked as false alarm"
        );
        Ok(BaseResponse::ok(format!(
            "Alert {alert_id} marked as false alarm"
        )))
    }

    pub async fn get(&self, alert_id: &str) -> Result<EmergencyAlert, ApiError> {
        self.storage
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Alert {alert_id} not found")))
    }

    /// Newest first. `active_only` keeps alerts still in the `active` state.
    pub async fn list(&self, query: ListAlertsQuery) -> Result<Vec<EmergencyAlert>, ApiError> {
        let mut filter = AlertFilter::new().paged(
            query.skip,
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        );
        if query.active_only {
            filter = filter.with_status(AlertStatus::Active);
        }
        if let Some(severity) = query.severity {
            filter = filter.with_severity(severity);
        }
        Ok(self.storage.list_alerts(&filter).await?)
    }

    pub async fn patient_alerts(
        &self,
        patient_id: &str,
        active_only: bool,
    ) -> Result<Vec<EmergencyAlert>, ApiError> {
        if self.storage.find_patient(patient_id).await?.is_none() {
            return Err(ApiError::not_found(format!(
                "Patient {patient_id} not found"
            )));
        }
        let mut filter = AlertFilter::new().for_patient(patient_id);
        if active_only {
            filter = filter.with_status(AlertStatus::Active);
        }
        Ok(self.storage.list_alerts(&filter).await?)
    }

    pub async fn statistics(&self) -> Result<AlertStatistics, ApiError> {
        let count = |filter: AlertFilter| {
            let storage = self.storage.clone();
            async move { storage.count_alerts(&filter).await }
        };

        Ok(AlertStatistics {
            total_alerts: count(AlertFilter::new()).await?,
            active_alerts: count(AlertFilter::new().with_status(AlertStatus::Active)).await?,
            responding_alerts: count(AlertFilter::new().with_status(AlertStatus::Responding))
                .await?,
            resolved_alerts: count(AlertFilter::new().with_status(AlertStatus::Resolved)).await?,
            false_alarms: count(AlertFilter::new().with_status(AlertStatus::FalseAlarm)).await?,
            critical_active: count(
                AlertFilter::new()
                    .with_severity(Severity::Critical)
                    .with_statuses([AlertStatus::Active, AlertStatus::Responding]),
            )
            .await?,
            timestamp: Timestamp::now(),
        })
    }
}

fn option_value(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::String)
}
