//! Executor roster: the fixed list of people who can be assigned to orders.
//!
//! Persisted as UTF-8 text, one name per line. Blank lines are ignored.

use crate::atomic::write_atomic;
use crate::error::{Result, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug)]
pub struct Roster {
    path: PathBuf,
    names: Vec<String>,
}

impl Roster {
    /// Load the roster, or start empty if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let names = if path.exists() {
            fs::read_to_string(&path)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        Ok(Self { path, names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Whether `name` may be assigned: empty always passes, and an empty
    /// roster accepts anyone.
    pub fn allows(&self, name: &str) -> bool {
        name.is_empty() || self.names.is_empty() || self.contains(name)
    }

    /// Add a name and persist. Rejects blank and duplicate names.
    pub fn add(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("executor name must not be empty".into()));
        }
        if self.contains(name) {
            return Err(StoreError::Validation(format!(
                "executor {name} is already registered"
            )));
        }
        let mut names = self.names.clone();
        names.push(name.to_string());
        self.commit(names)?;
        info!(executor = name, "executor added");
        Ok(())
    }

    /// Remove by 1-based position and persist. Returns the removed name.
    pub fn remove_at(&mut self, position: usize) -> Result<String> {
        if position == 0 || position > self.names.len() {
            return Err(StoreError::Validation(format!(
                "no executor at position {position}"
            )));
        }
        let mut names = self.names.clone();
        let removed = names.remove(position - 1);
        self.commit(names)?;
        info!(executor = %removed, "executor removed");
        Ok(removed)
    }

    /// Remove by name and persist.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let position = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| StoreError::Validation(format!("executor {name} is not registered")))?;
        self.remove_at(position + 1).map(|_| ())
    }

    /// Write `names` to disk, then adopt them. A failed write leaves the
    /// roster as it was.
    fn commit(&mut self, names: Vec<String>) -> Result<()> {
        let mut text = String::new();
        for name in &names {
            text.push_str(name);
            text.push('\n');
        }
        write_atomic(&self.path, text.as_bytes())?;
        self.names = names;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("executantes.txt");
        fs::write(&path, "Ismael\n\n  Ana  \n").unwrap();

        let roster = Roster::load(&path).unwrap();
        assert_eq!(roster.names(), &["Ismael".to_string(), "Ana".to_string()]);
    }

    #[test]
    fn test_add_and_remove_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("executantes.txt");

        let mut roster = Roster::load(&path).unwrap();
        assert!(roster.is_empty());
        roster.add("Ismael").unwrap();
        roster.add("Ana").unwrap();
        assert!(matches!(roster.add("Ana"), Err(StoreError::Validation(_))));
        assert!(matches!(roster.add("  "), Err(StoreError::Validation(_))));

        roster.add("Rui").unwrap();
        assert_eq!(roster.remove_at(1).unwrap(), "Ismael");
        assert!(roster.remove_at(5).is_err());
        roster.remove("Rui").unwrap();
        assert!(roster.remove("Rui").is_err());

        let reloaded = Roster::load(&path).unwrap();
        assert_eq!(reloaded.names(), &["Ana".to_string()]);
    }

    #[test]
    fn test_failed_write_keeps_roster() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("executantes.txt");
        let mut roster = Roster::load(&path).unwrap();
        roster.add("Ismael").unwrap();

        // A directory in place of the file makes the atomic replace fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(roster.add("Ana").is_err());
        assert!(roster.remove_at(1).is_err());
        assert_eq!(roster.names(), &["Ismael".to_string()]);
    }

    #[test]
    fn test_allows() {
        let dir = TempDir::new().unwrap();
        let mut roster = Roster::load(dir.path().join("executantes.txt")).unwrap();
        assert!(roster.allows("Qualquer"));

        roster.add("Ismael").unwrap();
        assert!(roster.allows("Ismael"));
        assert!(roster.allows(""));
        assert!(!roster.allows("Qualquer"));
    }
}
