//! Validated absolute path handling.
//!
//! The I/O core never interprets raw path strings itself: every public
//! operation funnels its input through [`normalize`] first and works with
//! [`AbsolutePath`] values from then on. Paths are stored with forward
//! slashes internally and converted to platform-native form only at the
//! I/O boundary.

use std::path::{Path, PathBuf};

/// Options accepted by [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeFlags {
    /// Reject paths that are not rooted (Unix `/...` or a drive letter).
    pub absolute_required: bool,
    /// Accept and strip a `file://` wrapper prefix.
    pub wrapper_allowed: bool,
}

impl Default for NormalizeFlags {
    fn default() -> Self {
        Self {
            absolute_required: true,
            wrapper_allowed: true,
        }
    }
}

/// Reasons a path string can be rejected by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("path is empty")]
    Empty,

    #[error("path contains a NUL byte")]
    NulByte,

    #[error("path is not absolute: {path}")]
    NotAbsolute { path: String },

    #[error("unsupported path wrapper: {scheme}://")]
    UnsupportedWrapper { scheme: String },

    #[error("path escapes its root: {path}")]
    EscapesRoot { path: String },
}

/// A path that passed [`normalize`], stored with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsolutePath {
    inner: String,
}

impl AbsolutePath {
    /// The normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native `PathBuf` for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        dunce::simplified(Path::new(&self.inner)).to_path_buf()
    }

    /// Parent directory, if any.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Final path component, if any.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// A path next to this one with a different file name. Only used to
    /// derive temp-file names; never exposed to callers.
    pub(crate) fn sibling(&self, name: &str) -> Self {
        match self.parent() {
            Some(parent) => Self {
                inner: format!("{}/{}", parent.inner.trim_end_matches('/'), name),
            },
            None => Self {
                inner: format!("/{name}"),
            },
        }
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// Normalize a raw path string into an [`AbsolutePath`].
///
/// Purely lexical: backslashes become forward slashes, duplicate separators
/// and `.` components collapse, `..` components resolve against their
/// parent. Nothing is looked up on the filesystem, so the target does not
/// need to exist.
pub fn normalize(path: &str, flags: NormalizeFlags) -> Result<AbsolutePath, NormalizeError> {
    if path.trim().is_empty() {
        return Err(NormalizeError::Empty);
    }
    if path.contains('\0') {
        return Err(NormalizeError::NulByte);
    }

    let mut candidate = path.trim().replace('\\', "/");
    if let Some((scheme, rest)) = candidate.split_once("://") {
        if !(flags.wrapper_allowed && scheme.eq_ignore_ascii_case("file")) {
            return Err(NormalizeError::UnsupportedWrapper {
                scheme: scheme.to_string(),
            });
        }
        candidate = rest.to_string();
    }

    let (root, remainder): (String, &str) = if let Some(rest) = candidate.strip_prefix('/') {
        ("/".to_string(), rest)
    } else if is_drive_rooted(&candidate) {
        (format!("{}/", &candidate[..2]), &candidate[3..])
    } else if flags.absolute_required {
        return Err(NormalizeError::NotAbsolute {
            path: path.to_string(),
        });
    } else {
        (String::new(), candidate.as_str())
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in remainder.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(NormalizeError::EscapesRoot {
                        path: path.to_string(),
                    });
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    let inner = if joined.is_empty() {
        if root.is_empty() {
            ".".to_string()
        } else {
            root
        }
    } else {
        format!("{root}{joined}")
    };
    Ok(AbsolutePath { inner })
}

fn is_drive_rooted(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}
