//! Line-prefix variable rewriting in Python sources.
//!
//! Only the assignment lines are touched; every other byte of the file is
//! preserved. The new content is written to a temporary file next to the
//! original and persisted over it.

use std::fmt;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::VersionFileError;

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    /// Written as a double-quoted string literal.
    Str(String),
    /// Written as a bare Python boolean.
    Bool(bool),
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Str(s) => write!(f, "{}", s),
            VariableValue::Bool(true) => write!(f, "True"),
            VariableValue::Bool(false) => write!(f, "False"),
        }
    }
}

impl VariableValue {
    fn assignment(&self, variable: &str) -> String {
        match self {
            VariableValue::Str(s) => format!("{} = \"{}\"\n", variable, s),
            VariableValue::Bool(_) => format!("{} = {}\n", variable, self),
        }
    }
}

/// Replace every line starting with `variable` by `variable = value`.
///
/// Returns [`VersionFileError::VariableNotFound`] without modifying the file
/// when no line matches.
pub fn set_variable(
    path: &Path,
    variable: &str,
    value: &VariableValue,
) -> Result<(), VersionFileError> {
    let content = read_file(path)?;
    let replacement = value.assignment(variable);

    let rewritten = rewrite_lines(&content, |line| {
        line.starts_with(variable).then(|| replacement.clone())
    });

    match rewritten {
        Some(new_content) => {
            write_file(path, &new_content)?;
            info!("Set {} in {} to {}.", variable, path.display(), value);
            Ok(())
        }
        None => Err(VersionFileError::VariableNotFound {
            path: path.to_path_buf(),
            variable: variable.to_string(),
        }),
    }
}

/// Rewrite `content` line by line.
///
/// `replace` receives each line including its terminator and returns the
/// replacement, or `None` to keep it. Returns `None` when nothing was replaced.
pub(crate) fn rewrite_lines<F>(content: &str, mut replace: F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(content.len());
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        match replace(line) {
            Some(new_line) => {
                out.push_str(&new_line);
                replaced = true;
            }
            None => out.push_str(line),
        }
    }

    replaced.then_some(out)
}

pub(crate) fn read_file(path: &Path) -> Result<String, VersionFileError> {
    std::fs::read_to_string(path).map_err(|source| VersionFileError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replace `path` with `content`, keeping its permissions.
pub(crate) fn write_file(path: &Path, content: &str) -> Result<(), VersionFileError> {
    let write_failed = |reason: String| VersionFileError::WriteFailed {
        path: path.to_path_buf(),
        reason,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| write_failed(format!("Failed to create temp file: {}", e)))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| write_failed(format!("Failed to write temp file: {}", e)))?;

    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| write_failed(format!("Failed to copy permissions: {}", e)))?;
    }

    tmp.persist(path)
        .map_err(|e| write_failed(format!("Failed to replace file: {}", e.error)))?;

    Ok(())
}
