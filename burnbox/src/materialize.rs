//! Writes generated files without clobbering user edits.
//!
//! A ledger (`<root>/.burnbox/materialized.json`) records the hash of every
//! file as burnbox last wrote it. On a later run a file is rewritten only if
//! it still matches that hash, i.e. nobody edited it since.

use crate::templates::GeneratedFile;
use crate::util::{sha256_hex, write_executable, write_file};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    updated_at: Option<DateTime<Utc>>,
    files: BTreeMap<PathBuf, String>,
}

impl Ledger {
    fn load(path: &Path) -> BurnboxResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(BurnboxError::Storage(format!(
                "Failed to read ledger {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&mut self, path: &Path) -> BurnboxResult<()> {
        self.updated_at = Some(Utc::now());
        write_file(path, &serde_json::to_string_pretty(self)?)
    }
}

/// Per-file result of a materialization pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaterializeOutcome {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    /// Edited by the user and left alone.
    pub preserved: Vec<PathBuf>,
}

/// Write `files`, consulting and updating the ledger at `ledger_path`.
///
/// With `force`, user-edited files are overwritten too.
pub fn materialize(
    files: &[GeneratedFile],
    ledger_path: &Path,
    force: bool,
) -> BurnboxResult<MaterializeOutcome> {
    let mut ledger = Ledger::load(ledger_path)?;
    let mut outcome = MaterializeOutcome::default();

    for file in files {
        let new_hash = sha256_hex(file.contents.as_bytes());
        let current_hash = match std::fs::read(&file.path) {
            Ok(bytes) => Some(sha256_hex(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let action = match &current_hash {
            None => Action::Write,
            Some(current) if *current == new_hash => Action::Keep,
            Some(current) if ledger.files.get(&file.path) == Some(current) => Action::Write,
            Some(_) if force => Action::Write,
            Some(_) => Action::Preserve,
        };

        match action {
            Action::Write => {
                if file.executable {
                    write_executable(&file.path, &file.contents)?;
                } else {
                    write_file(&file.path, &file.contents)?;
                }
                tracing::debug!(path = %file.path.display(), "Wrote generated file");
                ledger.files.insert(file.path.clone(), new_hash);
                outcome.written.push(file.path.clone());
            }
            Action::Keep => {
                ledger.files.insert(file.path.clone(), new_hash);
                outcome.unchanged.push(file.path.clone());
            }
            Action::Preserve => {
                tracing::warn!(
                    path = %file.path.display(),
                    "File was modified locally; keeping it (use --force to overwrite)"
                );
                outcome.preserved.push(file.path.clone());
            }
        }
    }

    ledger.save(ledger_path)?;
    Ok(outcome)
}

enum Action {
    Write,
    Keep,
    Preserve,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(path: PathBuf, contents: &str) -> GeneratedFile {
        GeneratedFile {
            path,
            contents: contents.to_string(),
            executable: false,
        }
    }

    #[test]
    fn test_first_run_writes_everything() {
        let tmp = TempDir::new().unwrap();
        let ledger = tmp.path().join(".burnbox/materialized.json");
        let files = vec![
            file(tmp.path().join("a.txt"), "a"),
            file(tmp.path().join("sub/b.txt"), "b"),
        ];

        let outcome = materialize(&files, &ledger, false).unwrap();
        assert_eq!(outcome.written.len(), 2);
        assert!(ledger.exists());
        assert_eq!(std::fs::read_to_string(tmp.path().join("sub/b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_rerun_updates_untouched_and_preserves_edited() {
        let tmp = TempDir::new().unwrap();
        let ledger = tmp.path().join("ledger.json");
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");

        materialize(&[file(a.clone(), "v1"), file(b.clone(), "v1")], &ledger, false).unwrap();
        std::fs::write(&b, "user edit").unwrap();

        let outcome =
            materialize(&[file(a.clone(), "v2"), file(b.clone(), "v2")], &ledger, false).unwrap();
        assert_eq!(outcome.written, vec![a.clone()]);
        assert_eq!(outcome.preserved, vec![b.clone()]);
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "v2");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "user edit");

        let forced = materialize(&[file(b.clone(), "v2")], &ledger, true).unwrap();
        assert_eq!(forced.written, vec![b.clone()]);
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "v2");
    }

    #[test]
    fn test_identical_content_is_unchanged() {
        let tmp = TempDir::new().unwrap();
        let ledger = tmp.path().join("ledger.json");
        let a = tmp.path().join("a.txt");
        std::fs::write(&a, "same").unwrap();

        let outcome = materialize(&[file(a.clone(), "same")], &ledger, false).unwrap();
        assert_eq!(outcome.unchanged, vec![a]);
        assert!(outcome.written.is_empty());
    }

    #[test]
    fn test_preexisting_unknown_file_is_preserved() {
        let tmp = TempDir::new().unwrap();
        let ledger = tmp.path().join("ledger.json");
        let a = tmp.path().join("config.kdl");
        std::fs::write(&a, "mine").unwrap();

        let outcome = materialize(&[file(a.clone(), "ours")], &ledger, false).unwrap();
        assert_eq!(outcome.preserved, vec![a]);
    }
}
