//! Alarm definitions from the `[[alarms]]` tables of cronos.toml.

use std::collections::HashSet;

use figment::Figment;
use serde::Deserialize;

use cronos_core::{CronosError, Result};
use cronos_scheduler::Alarm;

#[derive(Debug, Default, Deserialize)]
struct AlarmFile {
    #[serde(default)]
    alarms: Vec<Alarm>,
}

/// Extract and validate the alarm list. Rule and time invariants are checked
/// while deserialising; duplicate IDs are rejected here.
pub fn load_alarms(figment: &Figment) -> Result<Vec<Alarm>> {
    let file: AlarmFile = figment
        .extract()
        .map_err(|e| CronosError::Config(e.to_string()))?;

    let mut seen = HashSet::new();
    for alarm in &file.alarms {
        if !seen.insert(alarm.id.clone()) {
            return Err(CronosError::Config(format!("duplicate alarm id: {}", alarm.id)));
        }
    }
    Ok(file.alarms)
}
