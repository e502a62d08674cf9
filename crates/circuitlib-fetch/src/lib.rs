//! Acquisition of raw KiCad library text.
//!
//! Sources are local directory trees, remote URLs, or a git mirror that is
//! cloned once and then read locally. Individual sources that cannot be read
//! are logged and skipped; callers always get whatever could be acquired.

pub mod local;
pub mod mirror;
pub mod remote;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub use local::{collect_files, read_library_tree};
pub use mirror::{cache_dir, ensure_mirror};
pub use remote::{
    fetch_footprint_libraries, fetch_symbol_libraries, Fetch, HttpFetcher, MemoryFetcher,
};

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No such resource: {0}")]
    NotFound(String),

    #[error("Invalid footprint listing at {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to clone {url} into {path}")]
    Clone { url: String, path: String },

    #[error("Acquisition cancelled")]
    Cancelled,
}

/// The three kinds of library content, by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    Symbol,
    Footprint,
    Model,
}

impl LibraryKind {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            LibraryKind::Symbol => &["kicad_sym", "lib"],
            LibraryKind::Footprint => &["kicad_mod"],
            LibraryKind::Model => &["step", "stp", "wrl", "vrml"],
        }
    }

    /// Case-insensitive extension check.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }
}

/// One acquired library file.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryText {
    /// Library name: the symbol file stem, or the `.pretty` folder stem for footprints.
    pub library: String,
    /// Item name: the file stem. Equal to `library` for symbol files.
    pub name: String,
    /// Lowercase file extension without the dot.
    pub extension: String,
    /// Where the text came from (path or URL), for diagnostics.
    pub origin: String,
    pub content: String,
}

/// Shared cancellation flag, checked between sources.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), AcquireError> {
        if self.is_cancelled() {
            Err(AcquireError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Final path segment of a URL or path, without query string.
pub(crate) fn last_segment(location: &str) -> &str {
    let trimmed = location
        .split(['?', '#'])
        .next()
        .unwrap_or(location)
        .trim_end_matches('/');
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

/// Split `Name.ext` into (`Name`, `ext`), lowercasing the extension.
pub(crate) fn split_name(file: &str) -> (&str, String) {
    match file.rfind('.') {
        Some(dot) if dot > 0 => (&file[..dot], file[dot + 1..].to_ascii_lowercase()),
        _ => (file, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_extension() {
        assert!(LibraryKind::Symbol.matches(Path::new("a/Device.kicad_sym")));
        assert!(LibraryKind::Symbol.matches(Path::new("device.LIB")));
        assert!(LibraryKind::Footprint.matches(Path::new("x.pretty/R.kicad_mod")));
        assert!(LibraryKind::Model.matches(Path::new("SOT23.STEP")));
        assert!(!LibraryKind::Model.matches(Path::new("README")));
        assert!(!LibraryKind::Footprint.matches(Path::new("R.kicad_sym")));
    }

    #[test]
    fn test_url_segments() {
        assert_eq!(last_segment("https://host/raw/master/Device.kicad_sym"), "Device.kicad_sym");
        assert_eq!(last_segment("https://host/raw/master/Resistor_SMD.pretty/"), "Resistor_SMD.pretty");
        assert_eq!(last_segment("https://host/x/Audio.kicad_sym?inline=false"), "Audio.kicad_sym");
        assert_eq!(split_name("Device.kicad_sym"), ("Device", "kicad_sym".to_string()));
        assert_eq!(split_name("Resistor_SMD.pretty"), ("Resistor_SMD", "pretty".to_string()));
        assert_eq!(split_name("NoExt"), ("NoExt", String::new()));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(AcquireError::Cancelled)));
    }
}
