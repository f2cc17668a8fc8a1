//! Storage contract for the emergency service.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{AlertFilter, EmergencyAlert, EmergencyFlag, HospitalRecord, PatientRecord};

/// In-place edit applied by [`EmergencyStorage::modify_alert`].
pub type AlertChange = Box<dyn FnOnce(&mut EmergencyAlert) + Send>;

/// Persistence backend for emergency alerts and the patient/hospital lookups
/// they depend on. Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use cloudcare_storage::{EmergencyStorage, StorageError};
///
/// async fn require_alert(storage: &dyn EmergencyStorage, id: &str) -> Result<EmergencyAlert, StorageError> {
///     storage
///         .get_alert(id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Alert", id))
/// }
/// ```
#[async_trait]
pub trait EmergencyStorage: Send + Sync {
    // ==================== Directory ====================

    /// Inserts or replaces a patient, keyed by `patient_id`.
    async fn upsert_patient(&self, patient: PatientRecord) -> Result<(), StorageError>;

    /// Returns `None` if the patient is unknown.
    async fn find_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, StorageError>;

    /// Sets (`Some`) or clears (`None`) the patient's emergency marker.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient is unknown.
    async fn set_patient_emergency(
        &self,
        patient_id: &str,
        flag: Option<EmergencyFlag>,
    ) -> Result<PatientRecord, StorageError>;

    /// Inserts or replaces a hospital, keyed by name.
    async fn upsert_hospital(&self, hospital: HospitalRecord) -> Result<(), StorageError>;

    async fn find_hospital_by_name(
        &self,
        name: &str,
    ) -> Result<Option<HospitalRecord>, StorageError>;

    // ==================== Alerts ====================

    /// Stores a new alert.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the alert id is taken.
    async fn create_alert(&self, alert: EmergencyAlert) -> Result<EmergencyAlert, StorageError>;

    async fn get_alert(&self, alert_id: &str) -> Result<Option<EmergencyAlert>, StorageError>;

    /// Applies `change` to a stored alert as one atomic step and returns the
    /// updated alert. Concurrent changes to the same alert never overwrite
    /// each other.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the alert does not exist.
    async fn modify_alert(
        &self,
        alert_id: &str,
        change: AlertChange,
    ) -> Result<EmergencyAlert, StorageError>;

    /// Clears the patient's emergency marker unless the patient still has an
    /// open alert. The check and the clear happen atomically with respect to
    /// alert creation. Returns `true` if the marker was cleared.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient is unknown.
    async fn release_patient_emergency(&self, patient_id: &str) -> Result<bool, StorageError>;

    /// Lists matching alerts, newest first, honoring `skip`/`limit`.
    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<EmergencyAlert>, StorageError>;

    /// Counts matching alerts; paging fields are ignored.
    async fn count_alerts(&self, filter: &AlertFilter) -> Result<u64, StorageError>;
}
