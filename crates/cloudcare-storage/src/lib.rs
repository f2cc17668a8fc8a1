//! # cloudcare-storage
//!
//! Storage layer for the CloudCare emergency service.
//!
//! [`EmergencyStorage`] is the contract the alert handlers talk to;
//! [`InMemoryEmergencyStorage`] is the bundled backend.
//!
//! ```ignore
//! use cloudcare_storage::{AlertFilter, AlertStatus, EmergencyStorage, InMemoryEmergencyStorage};
//!
//! let storage = InMemoryEmergencyStorage::new();
//! let open = storage
//!     .count_alerts(&AlertFilter::new().with_statuses(AlertStatus::OPEN))
//!     .await?;
//! ```

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::StorageError;
pub use memory::InMemoryEmergencyStorage;
pub use traits::{AlertChange, EmergencyStorage};
pub use types::{
    AlertFilter, AlertStatus, EmergencyAlert, EmergencyFlag, HospitalRecord, PatientRecord,
    Severity,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable storage trait object.
pub type DynEmergencyStorage = std::sync::Arc<dyn EmergencyStorage>;

/// Creates a new in-memory storage instance.
pub fn create_memory_storage() -> DynEmergencyStorage {
    std::sync::Arc::new(InMemoryEmergencyStorage::new())
}
