use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::{AlertChange, EmergencyStorage};
use crate::types::{AlertFilter, EmergencyAlert, EmergencyFlag, HospitalRecord, PatientRecord};

const PATIENT: &str = "Patient";
const ALERT: &str = "Alert";

/// In-memory emergency store.
///
/// - Patient and hospital directories in `DashMap`s for lock-free lookups
/// - Alerts in an insertion-ordered `IndexMap`, so "newest first" is a
///   reverse walk
#[derive(Debug, Default)]
pub struct InMemoryEmergencyStorage {
    patients: DashMap<String, PatientRecord>,
    hospitals: DashMap<String, HospitalRecord>,
    alerts: RwLock<IndexMap<String, EmergencyAlert>>,
}

impl InMemoryEmergencyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }

    pub fn hospital_count(&self) -> usize {
        self.hospitals.len()
    }
}

#[async_trait]
impl EmergencyStorage for InMemoryEmergencyStorage {
    async fn upsert_patient(&self, patient: PatientRecord) -> Result<(), StorageError> {
        if patient.patient_id.trim().is_empty() {
            return Err(StorageError::invalid_record("patient_id must not be empty"));
        }
        self.patients.insert(patient.patient_id.clone(), patient);
        Ok(())
    }

    async fn find_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, StorageError> {
        Ok(self.patients.get(patient_id).map(|p| p.value().clone()))
    }

    async fn set_patient_emergency(
        &self,
        patient_id: &str,
        flag: Option<EmergencyFlag>,
    ) -> Result<PatientRecord, StorageError> {
        let mut patient = self
            .patients
            .get_mut(patient_id)
            .ok_or_else(|| StorageError::not_found(PATIENT, patient_id))?;

        match flag {
            Some(flag) => {
                patient.emergency_flag = true;
                patient.emergency_type = Some(flag.emergency_type);
                patient.emergency_notes = flag.notes;
            }
            None => {
                patient.emergency_flag = false;
                patient.emergency_type = None;
                patient.emergency_notes = None;
            }
        }
        Ok(patient.clone())
    }

    async fn upsert_hospital(&self, hospital: HospitalRecord) -> Result<(), StorageError> {
        if hospital.name.trim().is_empty() {
            return Err(StorageError::invalid_record("hospital name must not be empty"));
        }
        self.hospitals.insert(hospital.name.clone(), hospital);
        Ok(())
    }

    async fn find_hospital_by_name(
        &self,
        name: &str,
    ) -> Result<Option<HospitalRecord>, StorageError> {
        Ok(self.hospitals.get(name).map(|h| h.value().clone()))
    }

    async fn create_alert(&self, alert: EmergencyAlert) -> Result<EmergencyAlert, StorageError> {
        let mut alerts = self.alerts.write().await;
        if alerts.contains_key(&alert.alert_id) {
            return Err(StorageError::already_exists(ALERT, alert.alert_id));
        }
        alerts.insert(alert.alert_id.clone(), alert.clone());
        Ok(alert)
    }

    async fn get_alert(&self, alert_id: &str) -> Result<Option<EmergencyAlert>, StorageError> {
        Ok(self.alerts.read().await.get(alert_id).cloned())
    }

    async fn modify_alert(
        &self,
        alert_id: &str,
        change: AlertChange,
    ) -> Result<EmergencyAlert, StorageError> {
        let mut alerts = self.alerts.write().await;
        let slot = alerts
            .get_mut(alert_id)
            .ok_or_else(|| StorageError::not_found(ALERT, alert_id))?;
        change(slot);
        Ok(slot.clone())
    }

    async fn release_patient_emergency(&self, patient_id: &str) -> Result<bool, StorageError> {
        // Holding the alert map blocks create_alert until the flag is settled.
        let alerts = self.alerts.read().await;
        if alerts
            .values()
            .any(|a| a.patient_id == patient_id && a.status.is_open())
        {
            return Ok(false);
        }
        self.set_patient_emergency(patient_id, None).await?;
        drop(alerts);
        Ok(true)
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<EmergencyAlert>, StorageError> {
        let alerts = self.alerts.read().await;
        let matching = alerts
            .values()
            .rev()
            .filter(|a| filter.matches(a))
            .skip(filter.skip);
        let page = match filter.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(page)
    }

    async fn count_alerts(&self, filter: &AlertFilter) -> Result<u64, StorageError> {
        let alerts = self.alerts.read().await;
        Ok(alerts.values().filter(|a| filter.matches(a)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertStatus, Severity};
    use time::OffsetDateTime;

    fn alert(alert_id: &str, patient_id: &str, severity: Severity) -> EmergencyAlert {
        let now = OffsetDateTime::now_utc();
        EmergencyAlert {
            alert_id: alert_id.into(),
            patient_id: patient_id.into(),
            hospital_id: None,
            alert_type: "critical_vitals".into(),
            severity,
            description: "Heart rate above threshold".into(),
            triggered_by: "wearable".into(),
            trigger_data: Some(serde_json::json!({"heart_rate": 182})),
            location: Some("Ward 3".into()),
            status: AlertStatus::Active,
            responders: Vec::new(),
            notes: None,
            response_time: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_patient_directory() {
        let storage = InMemoryEmergencyStorage::new();
        storage
            .upsert_patient(PatientRecord::new("P-1", "Jane Doe"))
            .await
            .unwrap();

        let found = storage.find_patient("P-1").await.unwrap().unwrap();
        assert_eq!(found.name, "Jane Doe");
        assert!(!found.emergency_flag);
        assert!(storage.find_patient("P-404").await.unwrap().is_none());
        assert_eq!(storage.patient_count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_patient_rejects_empty_id() {
        let storage = InMemoryEmergencyStorage::new();
        let err = storage
            .upsert_patient(PatientRecord::new(" ", "Nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord { .. }));
    }

    #[tokio::test]
    async fn test_set_and_clear_emergency_flag() {
        let storage = InMemoryEmergencyStorage::new();
        storage
            .upsert_patient(PatientRecord::new("P-1", "Jane Doe"))
            .await
            .unwrap();

        let flagged = storage
            .set_patient_emergency(
                "P-1",
                Some(EmergencyFlag {
                    emergency_type: "fall".into(),
                    notes: Some("Found on floor".into()),
                }),
            )
            .await
            .unwrap();
        assert!(flagged.emergency_flag);
        assert_eq!(flagged.emergency_type.as_deref(), Some("fall"));

        let cleared = storage.set_patient_emergency("P-1", None).await.unwrap();
        assert!(!cleared.emergency_flag);
        assert!(cleared.emergency_notes.is_none());

        let err = storage.set_patient_emergency("P-9", None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_hospital_lookup_by_name() {
        let storage = InMemoryEmergencyStorage::new();
        storage
            .upsert_hospital(HospitalRecord::new("H-1", "City General"))
            .await
            .unwrap();

        let found = storage.find_hospital_by_name("City General").await.unwrap();
        assert_eq!(found.map(|h| h.hospital_id), Some("H-1".to_string()));
        assert!(storage.find_hospital_by_name("H-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_alert_conflict() {
        let storage = InMemoryEmergencyStorage::new();
        storage
            .create_alert(alert("A1", "P-1", Severity::High))
            .await
            .unwrap();

        let err = storage
            .create_alert(alert("A1", "P-1", Severity::Low))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_modify_alert() {
        let storage = InMemoryEmergencyStorage::new();
        storage
            .create_alert(alert("A1", "P-1", Severity::High))
            .await
            .unwrap();

        let updated = storage
            .modify_alert(
                "A1",
                Box::new(|a| a.transition(AlertStatus::Responding, OffsetDateTime::now_utc())),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AlertStatus::Responding);
        let stored = storage.get_alert("A1").await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Responding);

        let err = storage
            .modify_alert("A2", Box::new(|_| {}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_modifications_are_not_lost() {
        let storage = std::sync::Arc::new(InMemoryEmergencyStorage::new());
        storage
            .create_alert(alert("A1", "P-1", Severity::High))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..64 {
            let storage = storage.clone();
            tasks.push(tokio::spawn(async move {
                storage
                    .modify_alert("A1", Box::new(move |a| a.add_responder(&format!("R-{i}"))))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored = storage.get_alert("A1").await.unwrap().unwrap();
        assert_eq!(stored.responders.len(), 64);
    }

    #[tokio::test]
    async fn test_release_patient_emergency_waits_for_open_alerts() {
        let storage = InMemoryEmergencyStorage::new();
        storage
            .upsert_patient(PatientRecord::new("P-1", "Jane Doe"))
            .await
            .unwrap();
        storage
            .set_patient_emergency(
                "P-1",
                Some(EmergencyFlag {
                    emergency_type: "fall".into(),
                    notes: None,
                }),
            )
            .await
            .unwrap();
        storage
            .create_alert(alert("A1", "P-1", Severity::High))
            .await
            .unwrap();

        assert!(!storage.release_patient_emergency("P-1").await.unwrap());
        assert!(storage.find_patient("P-1").await.unwrap().unwrap().emergency_flag);

        storage
            .modify_alert(
                "A1",
                Box::new(|a| a.transition(AlertStatus::Resolved, OffsetDateTime::now_utc())),
            )
            .await
            .unwrap();
        assert!(storage.release_patient_emergency("P-1").await.unwrap());
        assert!(!storage.find_patient("P-1").await.unwrap().unwrap().emergency_flag);

        let err = storage.release_patient_emergency("P-9").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_paging() {
        let storage = InMemoryEmergencyStorage::new();
        for id in ["A1", "A2", "A3", "A4"] {
            storage
                .create_alert(alert(id, "P-1", Severity::Medium))
                .await
                .unwrap();
        }

        let all = storage.list_alerts(&AlertFilter::new()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|a| a.alert_id.as_str()).collect();
        assert_eq!(ids, vec!["A4", "A3", "A2", "A1"]);

        let page = storage
            .list_alerts(&AlertFilter::new().paged(1, 2))
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|a| a.alert_id.as_str()).collect();
        assert_eq!(ids, vec!["A3", "A2"]);
    }

    #[tokio::test]
    async fn test_count_with_filters() {
        let storage = InMemoryEmergencyStorage::new();
        storage
            .create_alert(alert("A1", "P-1", Severity::Critical))
            .await
            .unwrap();
        storage
            .create_alert(alert("A2", "P-2", Severity::Critical))
            .await
            .unwrap();
        let mut resolved = alert("A3", "P-1", Severity::Low);
        resolved.status = AlertStatus::Resolved;
        storage.create_alert(resolved).await.unwrap();

        let open_for_p1 = AlertFilter::new()
            .for_patient("P-1")
            .with_statuses(AlertStatus::OPEN);
        assert_eq!(storage.count_alerts(&open_for_p1).await.unwrap(), 1);

        let critical = AlertFilter::new().with_severity(Severity::Critical).paged(0, 1);
        assert_eq!(storage.count_alerts(&critical).await.unwrap(), 2);
        assert_eq!(storage.count_alerts(&AlertFilter::new()).await.unwrap(), 3);
    }
}
