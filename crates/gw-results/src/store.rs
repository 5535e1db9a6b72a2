//! Run-scoped output directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::types::{MANIFEST_FILE, RunManifest};
use crate::{ResultsError, ResultsResult};

/// Every report of one run lands here; the names written are remembered
/// for the manifest.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
    written: Vec<String>,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> ResultsResult<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| ResultsError::io(&root, e))?;
        }
        Ok(Self {
            root,
            written: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn written(&self) -> &[String] {
        &self.written
    }

    fn check_name(name: &str) -> ResultsResult<()> {
        let path = Path::new(name);
        let plain = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if name.is_empty() || !plain {
            return Err(ResultsError::InvalidName {
                name: name.to_string(),
                message: "must be a relative path inside the output directory".to_string(),
            });
        }
        Ok(())
    }

    pub fn write_text(&mut self, name: &str, contents: &str) -> ResultsResult<PathBuf> {
        Self::check_name(name)?;
        let path = self.path(name);
        fs::write(&path, contents).map_err(|e| ResultsError::io(&path, e))?;
        tracing::info!(path = %path.display(), bytes = contents.len(), "Wrote output");
        if !self.written.iter().any(|w| w == name) {
            self.written.push(name.to_string());
        }
        Ok(path)
    }

    pub fn save_json<T: Serialize>(&mut self, name: &str, value: &T) -> ResultsResult<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_text(name, &json)
    }

    pub fn save_manifest(&self, manifest: &RunManifest) -> ResultsResult<PathBuf> {
        let path = self.path(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(&path, json).map_err(|e| ResultsError::io(&path, e))?;
        Ok(path)
    }

    pub fn load_manifest(&self) -> ResultsResult<RunManifest> {
        let path = self.path(MANIFEST_FILE);
        if !path.exists() {
            return Err(ResultsError::ManifestNotFound {
                dir: self.root.clone(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| ResultsError::io(&path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}
