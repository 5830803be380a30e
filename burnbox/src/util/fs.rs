//! Small filesystem helpers used by materialization and the session hook.

use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> BurnboxResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            BurnboxError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    fs::write(path, contents).map_err(|e| {
        BurnboxError::Storage(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// Write a file and mark it executable (0755).
pub fn write_executable(path: &Path, contents: &str) -> BurnboxResult<()> {
    write_file(path, contents)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
        BurnboxError::Storage(format!(
            "Failed to make {} executable: {}",
            path.display(),
            e
        ))
    })
}

/// Append `body` to `path` wrapped in begin/end markers.
///
/// If a block with the same `marker` already exists it is replaced, so
/// repeated runs leave exactly one copy. Returns `true` when the file changed.
pub fn append_block(path: &Path, marker: &str, body: &str) -> BurnboxResult<bool> {
    let begin = format!("# >>> {} >>>", marker);
    let end = format!("# <<< {} <<<", marker);
    let block = format!("{}\n{}\n{}\n", begin, body.trim_end(), end);

    let existing = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let updated = match (existing.find(&begin), existing.find(&end)) {
        (Some(start), Some(stop)) if stop > start => {
            let after = &existing[stop + end.len()..];
            let after = after.strip_prefix('\n').unwrap_or(after);
            format!("{}{}{}", &existing[..start], block, after)
        }
        _ => {
            let mut s = existing.clone();
            if !s.is_empty() && !s.ends_with('\n') {
                s.push('\n');
            }
            s.push_str(&block);
            s
        }
    };

    if updated == existing {
        return Ok(false);
    }
    write_file(path, &updated)?;
    Ok(true)
}

pub fn sha256_hex(contents: &[u8]) -> String {
    hex::encode(Sha256::digest(contents))
}
