//! Saved groups kept together in a single JSON file.

use crate::domain::basket::Group;
use crate::domain::error::PerfError;
use crate::ports::config_port::ConfigPort;
use crate::ports::group_store::GroupStore;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GROUPS_PATH: &str = ".cache/groups.json";

pub struct JsonGroupStore {
    path: PathBuf,
}

impl JsonGroupStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let path = config
            .get_string("groups", "path")
            .unwrap_or_else(|| DEFAULT_GROUPS_PATH.to_string());
        Self::new(PathBuf::from(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, groups: &[Group]) -> Result<(), PerfError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PerfError::Store {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        let json = serde_json::to_string_pretty(groups)?;
        fs::write(&self.path, json).map_err(|e| PerfError::Store {
            reason: format!("failed to write {}: {}", self.path.display(), e),
        })
    }
}

impl GroupStore for JsonGroupStore {
    /// A missing file means no groups yet.
    fn list(&self) -> Result<Vec<Group>, PerfError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PerfError::Store {
                    reason: format!("failed to read {}: {}", self.path.display(), e),
                })
            }
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, group: Group) -> Result<(), PerfError> {
        let mut groups = self.list()?;
        match groups
            .iter_mut()
            .find(|g| g.name.eq_ignore_ascii_case(&group.name))
        {
            Some(existing) => *existing = group,
            None => groups.push(group),
        }
        self.write_all(&groups)
    }

    fn delete(&self, name: &str) -> Result<bool, PerfError> {
        let name = name.trim();
        let mut groups = self.list()?;
        let before = groups.len();
        groups.retain(|g| !g.name.eq_ignore_ascii_case(name));
        if groups.len() == before {
            return Ok(false);
        }
        self.write_all(&groups)?;
        Ok(true)
    }
}
