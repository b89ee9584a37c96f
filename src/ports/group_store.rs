//! Saved group persistence port.

use crate::domain::basket::Group;
use crate::domain::error::PerfError;

pub trait GroupStore: Send + Sync {
    fn list(&self) -> Result<Vec<Group>, PerfError>;

    /// Insert, or replace the group whose name matches case-insensitively.
    fn save(&self, group: Group) -> Result<(), PerfError>;

    /// Returns whether a group was removed.
    fn delete(&self, name: &str) -> Result<bool, PerfError>;

    fn find(&self, name: &str) -> Result<Option<Group>, PerfError> {
        let name = name.trim();
        Ok(self
            .list()?
            .into_iter()
            .find(|g| g.name.eq_ignore_ascii_case(name)))
    }
}
