//! Workspace sandbox: keeps file-like command arguments under one root.
//!
//! Resolution is lexical: `.` and `..` are folded without touching the
//! filesystem, so paths that do not exist yet (files about to be written)
//! resolve the same way as existing ones.

use std::path::{Component, Path, PathBuf};

/// Error returned when a path cannot be resolved inside the workspace.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the workspace root")]
    OutsideWorkspace { path: String },

    #[error("Path '{path}' matches forbidden pattern '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' contains a null byte")]
    NullByte { path: String },
}

/// A run-scoped sandbox root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    restrict: bool,
    forbidden_paths: Vec<String>,
}

impl Workspace {
    /// Create a workspace rooted at `root`.
    ///
    /// With `restrict` set, every resolved path must stay under the root.
    pub fn new(root: impl Into<PathBuf>, restrict: bool) -> Self {
        Self {
            root: normalize(&root.into()),
            restrict,
            forbidden_paths: Vec::new(),
        }
    }

    /// Add forbidden path prefixes (`~` is expanded).
    pub fn with_forbidden_paths(mut self, forbidden: Vec<String>) -> Self {
        self.forbidden_paths = forbidden;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_restricted(&self) -> bool {
        self.restrict
    }

    /// Create the root directory if it does not exist.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// Resolve a (usually relative) path against the root.
    ///
    /// Relative paths are joined onto the root; absolute paths are accepted
    /// only if they already lie inside it (when restricted). An empty path
    /// resolves to the root itself.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PathValidationError> {
        if relative.contains('\0') {
            return Err(PathValidationError::NullByte {
                path: relative.replace('\0', "\\0"),
            });
        }

        let input = Path::new(relative);
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };
        let resolved = normalize(&joined);

        if self.restrict && !resolved.starts_with(&self.root) {
            return Err(if input.is_absolute() {
                PathValidationError::OutsideWorkspace {
                    path: relative.into(),
                }
            } else {
                PathValidationError::PathTraversal {
                    path: relative.into(),
                }
            });
        }

        let resolved_str = resolved.to_string_lossy().replace('\\', "/").to_lowercase();
        for forbidden in &self.forbidden_paths {
            let expanded = expand_tilde(forbidden).replace('\\', "/").to_lowercase();
            if resolved_str.starts_with(&expanded) {
                return Err(PathValidationError::ForbiddenPath {
                    path: relative.into(),
                    pattern: forbidden.clone(),
                });
            }
        }

        Ok(resolved)
    }
}

/// Fold `.` and `..` components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Ok(home) = home_dir()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

fn home_dir() -> Result<String, ()> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").map_err(|_| ())
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").map_err(|_| ())
    }
}
