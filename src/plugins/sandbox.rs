//! Filesystem sandbox: confines every resolved path to a root directory.
//!
//! The containment check is component-wise, not a string prefix test, so a
//! sibling directory like `/srv/sandbox-evil` never passes against the root
//! `/srv/sandbox`. Candidate paths that exist on disk are canonicalized
//! (resolving `.`, `..` and symlinks) before the check; candidates that do
//! not exist yet are normalized lexically, so `..` escapes are rejected
//! whether or not the target exists.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// A path escaped the configured sandbox root.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("path escapes the sandbox root")]
pub struct SandboxViolation;

/// A canonicalized root directory and the containment rules around it.
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Opens a sandbox over an existing directory.
    ///
    /// The root is canonicalized here, once; `resolve` compares candidates
    /// against this canonical form.
    pub fn open(root: &Path) -> io::Result<Self> {
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// The canonical sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a caller-supplied argument to a contained absolute path.
    ///
    /// The argument is trimmed, joined onto the root and resolved. An empty
    /// argument resolves to the root itself. Returns the path all subsequent
    /// I/O must use; on violation, no I/O may be performed at all.
    pub fn resolve(&self, argument: &str) -> Result<PathBuf, SandboxViolation> {
        let candidate = self.root.join(argument.trim());

        // canonicalize() fails on paths that do not exist yet; those still
        // need `..` resolution before the containment check.
        let resolved = match candidate.canonicalize() {
            Ok(path) => path,
            Err(_) => normalize_lexically(&candidate),
        };

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(SandboxViolation)
        }
    }
}

/// Resolves `.` and `..` components without touching the filesystem.
///
/// `..` at the filesystem root stays at the root, which turns an escape
/// attempt like `/../../etc/passwd` into `/etc/passwd` and lets the
/// containment check reject it.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
