//! Content-based hashing for run ids.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::InputRecord;
use crate::{ResultsError, ResultsResult};

pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn digest_file(path: &Path) -> ResultsResult<String> {
    let bytes = std::fs::read(path).map_err(|e| ResultsError::io(path, e))?;
    Ok(digest_bytes(&bytes))
}

/// Accumulates everything a run depends on; the run id is the SHA-256 of the
/// input digests, the configuration and the tool version.
#[derive(Debug, Clone, Default)]
pub struct RunFingerprint {
    inputs: Vec<InputRecord>,
    config_json: String,
}

impl RunFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, role: &str, path: &Path) -> ResultsResult<()> {
        let sha256 = digest_file(path)?;
        self.inputs.push(InputRecord {
            role: role.to_string(),
            path: path.to_path_buf(),
            sha256,
        });
        Ok(())
    }

    pub fn set_config<C: Serialize>(&mut self, config: &C) -> ResultsResult<()> {
        self.config_json = serde_json::to_string(config)?;
        Ok(())
    }

    pub fn inputs(&self) -> &[InputRecord] {
        &self.inputs
    }

    pub fn run_id(&self, tool_version: &str) -> String {
        let mut hasher = Sha256::new();
        for input in &self.inputs {
            hasher.update(input.role.as_bytes());
            hasher.update(input.sha256.as_bytes());
        }
        hasher.update(self.config_json.as_bytes());
        hasher.update(tool_version.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn into_inputs(self) -> Vec<InputRecord> {
        self.inputs
    }
}
