//! Path confinement for archive reads.

use std::path::{Path, PathBuf};

use rxlens_core::{Error, Result};

/// Resolve a caller-supplied file name to a path directly under `root`.
///
/// Directory segments are discarded, keeping only the base name. Names that
/// try to climb out of the root (`..` segments, NUL bytes) or reduce to
/// nothing are refused with `AccessDenied`. This is purely lexical; the
/// file need not exist.
pub fn confine(root: &Path, requested: &str) -> Result<PathBuf> {
    if requested.contains('\0') {
        return Err(Error::AccessDenied("file name contains a NUL byte".into()));
    }

    let segments: Vec<&str> = requested.split(['/', '\\']).collect();
    if segments.iter().any(|s| *s == "..") {
        return Err(Error::AccessDenied(format!(
            "path traversal not allowed: {}",
            requested
        )));
    }

    let base = match segments.iter().rev().find(|s| !s.is_empty()) {
        Some(&".") | None => {
            return Err(Error::AccessDenied(format!(
                "invalid file name: {:?}",
                requested
            )))
        }
        Some(base) => *base,
    };

    let candidate = root.join(base);
    if candidate.parent() != Some(root) {
        return Err(Error::AccessDenied(format!(
            "path escapes results directory: {}",
            requested
        )));
    }
    Ok(candidate)
}

/// Canonicalize a confined path and check it still lives under `root`.
///
/// Catches escapes the lexical check cannot see, such as symlinks placed
/// inside the root.
pub fn resolve_existing(root: &Path, candidate: &Path) -> Result<PathBuf> {
    if !candidate.exists() {
        let name = candidate
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        return Err(Error::NotFound(name));
    }

    let root_canonical = root.canonicalize()?;
    let canonical = candidate.canonicalize()?;
    if !canonical.starts_with(&root_canonical) {
        return Err(Error::AccessDenied(format!(
            "{} resolves outside the results directory",
            candidate.display()
        )));
    }
    Ok(canonical)
}
