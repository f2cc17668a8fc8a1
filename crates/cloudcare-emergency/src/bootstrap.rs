//! Seeds the patient and hospital directories from configuration.

use cloudcare_storage::{DynEmergencyStorage, StorageResult};

use crate::config::BootstrapConfig;

pub async fn seed_directory(
    storage: &DynEmergencyStorage,
    bootstrap: &BootstrapConfig,
) -> StorageResult<()> {
    for patient in &bootstrap.patients {
        storage.upsert_patient(patient.clone()).await?;
    }
    for hospital in &bootstrap.hospitals {
        storage.upsert_hospital(hospital.clone()).await?;
    }
    tracing::info!(
        patients = bootstrap.patients.len(),
        hospitals = bootstrap.hospitals.len(),
        "Directory seeded"
    );
    Ok(())
}
