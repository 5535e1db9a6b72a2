//! Result data types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type RunId = String;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    pub role: String,
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub timestamp: String,
    pub tool_version: String,
    pub stress_period_count: u32,
    pub inputs: Vec<InputRecord>,
    /// Names relative to the output directory, in write order.
    pub outputs: Vec<String>,
}

impl RunManifest {
    pub fn new(
        run_id: RunId,
        tool_version: &str,
        stress_period_count: u32,
        inputs: Vec<InputRecord>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            run_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: tool_version.to_string(),
            stress_period_count,
            inputs,
            outputs,
        }
    }
}
