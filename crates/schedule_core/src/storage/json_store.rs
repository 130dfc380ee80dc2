use crate::error::AppError;
use crate::model::{Customer, Schedule};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 2;
const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "SALES_SCHEDULE_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    schema_version: u32,
    #[serde(default)]
    schedules: Vec<Schedule>,
    #[serde(default)]
    customers: Vec<Customer>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreState {
    pub schedules: Vec<Schedule>,
    pub customers: Vec<Customer>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(crate::config::app_dir()?.join(STORE_FILE_NAME))
}

pub fn load_state(path: &Path) -> Result<StoreState, AppError> {
    if !path.exists() {
        return Ok(StoreState::default());
    }

    let content = std::fs::read_to_string(path)?;
    let stored: StoredState =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    for schedule in &stored.schedules {
        if let Some(customer_id) = schedule.customer_id.as_deref() {
            let exists = stored
                .customers
                .iter()
                .any(|customer| customer.id == customer_id);
            if !exists {
                return Err(AppError::invalid_data(format!(
                    "schedule {} references unknown customer {}",
                    schedule.id, customer_id
                )));
            }
        }
    }

    Ok(StoreState {
        schedules: stored.schedules,
        customers: stored.customers,
    })
}

pub fn save_state(path: &Path, state: &StoreState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let stored = StoredState {
        schema_version: SCHEMA_VERSION,
        schedules: state.schedules.clone(),
        customers: state.customers.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    Ok(())
}
