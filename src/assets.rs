//! Asset access for templates, static files and record data.
//!
//! Every asset group can come from one of two places: a snapshot compiled
//! into the binary (production: the binary is self-contained), or a live
//! directory on disk (development: edits show up without a rebuild).
//! `AssetStore::mount` picks the source; callers read by name and never
//! care which one they got.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;

/// A single compiled-in asset.
pub struct Asset {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

/// Templates compiled into the binary.
pub static TEMPLATES: &[Asset] = &[
    Asset {
        name: "home.html",
        bytes: include_bytes!("../templates/home.html"),
    },
    Asset {
        name: "404.html",
        bytes: include_bytes!("../templates/404.html"),
    },
];

/// Static files compiled into the binary.
pub static STATIC: &[Asset] = &[Asset {
    name: "styles.css",
    bytes: include_bytes!("../static/styles.css"),
}];

/// Record data compiled into the binary.
pub static DATA: &[Asset] = &[Asset {
    name: "short-urls.csv",
    bytes: include_bytes!("../data/short-urls.csv"),
}];

/// Error type for asset access.
#[derive(Debug)]
pub enum AssetError {
    /// Directory missing or not a directory.
    Mount { path: PathBuf },
    /// No asset with the requested name.
    NotFound { name: String },
    /// Name tries to escape the mounted directory.
    InvalidName { name: String },
    /// Underlying filesystem error.
    Io { name: String, error: io::Error },
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetError::Mount { path } => {
                write!(f, "path {:?} could not be mounted", path)
            }
            AssetError::NotFound { name } => {
                write!(f, "asset '{}' not found", name)
            }
            AssetError::InvalidName { name } => {
                write!(f, "asset name '{}' is not valid", name)
            }
            AssetError::Io { name, error } => {
                write!(f, "asset '{}' could not be read: {}", name, error)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// One mounted asset source.
#[derive(Clone)]
pub enum AssetStore {
    /// Live directory, read on every access.
    Dir(PathBuf),
    /// Compiled-in snapshot.
    Embedded(&'static [Asset]),
}

impl AssetStore {
    /// Mount an asset source. Development mode requires the directory to
    /// exist; otherwise the embedded snapshot is used and the directory
    /// argument is ignored.
    pub fn mount(
        dev: bool,
        dir: impl Into<PathBuf>,
        embedded: &'static [Asset],
    ) -> Result<Self, AssetError> {
        if !dev {
            return Ok(AssetStore::Embedded(embedded));
        }
        let dir = dir.into();
        let is_dir = std::fs::metadata(&dir).map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            return Err(AssetError::Mount { path: dir });
        }
        Ok(AssetStore::Dir(dir))
    }

    /// Read an asset by name, relative to the store root.
    pub async fn read(&self, name: &str) -> Result<Bytes, AssetError> {
        match self {
            AssetStore::Dir(dir) => {
                let path = safe_join(dir, name).ok_or_else(|| AssetError::InvalidName {
                    name: name.to_string(),
                })?;
                match tokio::fs::read(&path).await {
                    Ok(contents) => Ok(Bytes::from(contents)),
                    Err(e) if not_found(&e) => Err(AssetError::NotFound {
                        name: name.to_string(),
                    }),
                    Err(error) => Err(AssetError::Io {
                        name: name.to_string(),
                        error,
                    }),
                }
            }
            AssetStore::Embedded(assets) => assets
                .iter()
                .find(|a| a.name == name)
                .map(|a| Bytes::from_static(a.bytes))
                .ok_or_else(|| AssetError::NotFound {
                    name: name.to_string(),
                }),
        }
    }

    /// Last modification time of an asset. `None` for embedded snapshots,
    /// which never change while the process runs.
    pub async fn modified(&self, name: &str) -> Result<Option<SystemTime>, AssetError> {
        match self {
            AssetStore::Dir(dir) => {
                let path = safe_join(dir, name).ok_or_else(|| AssetError::InvalidName {
                    name: name.to_string(),
                })?;
                let meta = match tokio::fs::metadata(&path).await {
                    Ok(meta) => meta,
                    Err(e) if not_found(&e) => {
                        return Err(AssetError::NotFound {
                            name: name.to_string(),
                        })
                    }
                    Err(error) => {
                        return Err(AssetError::Io {
                            name: name.to_string(),
                            error,
                        })
                    }
                };
                let modified = meta.modified().map_err(|error| AssetError::Io {
                    name: name.to_string(),
                    error,
                })?;
                Ok(Some(modified))
            }
            AssetStore::Embedded(_) => Ok(None),
        }
    }
}

fn not_found(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::IsADirectory
    )
}

/// Join a requested name onto the store root, rejecting anything that
/// would escape it (absolute paths, `..` segments).
fn safe_join(dir: &Path, name: &str) -> Option<PathBuf> {
    let rel = Path::new(name);
    if rel.components().any(|c| {
        !matches!(c, Component::Normal(_))
    }) || name.is_empty()
    {
        return None;
    }
    Some(dir.join(rel))
}
