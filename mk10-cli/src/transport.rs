// mk10-cli/src/transport.rs
// ============================================================================
// Module: File Bundle Transport
// Description: Directory-backed bundle sink and reader.
// Purpose: Move sealed bundle bytes to and from disk; the only storage writer.
// Dependencies: mk10-core
// ============================================================================

//! ## Overview
//! The file transport implements the core sink and reader contracts over a
//! root directory. Paths are transport-relative; traversal outside the root
//! is rejected. The canonical JSON file is normative; this transport moves
//! bytes and never reinterprets them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use mk10_core::BundleReader;
use mk10_core::BundleSink;
use mk10_core::TransportError;

// ============================================================================
// SECTION: File Transport
// ============================================================================

/// Directory-backed bundle sink and reader.
#[derive(Debug, Clone)]
pub struct FileBundleStore {
    /// Root directory for transport-relative paths.
    root: PathBuf,
}

impl FileBundleStore {
    /// Creates a transport rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Resolves a transport-relative path, rejecting traversal.
    fn resolve(&self, path: &str) -> Result<PathBuf, TransportError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|component| {
            matches!(component, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            return Err(TransportError::Io {
                path: path.to_string(),
                message: "path escapes the transport root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl BundleSink for FileBundleStore {
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), TransportError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| TransportError::Io {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        }
        fs::write(&target, bytes).map_err(|err| TransportError::Io {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

impl BundleReader for FileBundleStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        let target = self.resolve(path)?;
        fs::read(&target).map_err(|err| TransportError::Io {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}
