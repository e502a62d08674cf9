use crate::{last_segment, split_name, AcquireError, CancelToken, LibraryKind, LibraryText};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Retrieves the text behind a URL.
pub trait Fetch: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, AcquireError>;
}

/// Blocking HTTP fetcher with a per-request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AcquireError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("circuitlib/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| AcquireError::Request {
                url: "<client>".to_string(),
                source,
            })?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, AcquireError> {
        log::trace!("GET {url}");
        let request_error = |source| AcquireError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(request_error)
    }
}

/// In-memory fetcher keyed by exact URL. Unknown URLs are `NotFound`.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    pages: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(url, content);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, content: impl Into<String>) {
        self.pages.insert(url.into(), content.into());
    }
}

impl Fetch for MemoryFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, AcquireError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AcquireError::NotFound(url.to_string()))
    }
}

/// Fetch each symbol library URL (`…/Device.kicad_sym`). Failed URLs are
/// logged and skipped.
pub fn fetch_symbol_libraries(
    fetcher: &dyn Fetch,
    urls: &[String],
    cancel: &CancelToken,
) -> Result<Vec<LibraryText>, AcquireError> {
    let mut texts = Vec::new();
    for url in urls {
        cancel.check()?;
        let (library, extension) = split_name(last_segment(url));
        match fetcher.fetch_text(url) {
            Ok(content) => texts.push(LibraryText {
                library: library.to_string(),
                name: library.to_string(),
                extension,
                origin: url.clone(),
                content,
            }),
            Err(e) => log::warn!("Skipping symbol library: {e}"),
        }
    }
    log::info!("Fetched {} of {} symbol libraries", texts.len(), urls.len());
    Ok(texts)
}

#[derive(Debug, Deserialize)]
struct Listing {
    files: Vec<String>,
}

/// Fetch every footprint of each `.pretty` library URL, using the library's
/// `index.json` listing. A library without a usable listing is skipped, as is
/// any single footprint that fails to download.
pub fn fetch_footprint_libraries(
    fetcher: &dyn Fetch,
    urls: &[String],
    cancel: &CancelToken,
) -> Result<Vec<LibraryText>, AcquireError> {
    let mut texts = Vec::new();
    for url in urls {
        match fetch_footprint_library(fetcher, url, cancel) {
            Ok(found) => texts.extend(found),
            Err(AcquireError::Cancelled) => return Err(AcquireError::Cancelled),
            Err(e) => log::warn!("Skipping footprint library: {e}"),
        }
    }
    log::info!("Fetched {} footprints from {} libraries", texts.len(), urls.len());
    Ok(texts)
}

pub fn fetch_footprint_library(
    fetcher: &dyn Fetch,
    url: &str,
    cancel: &CancelToken,
) -> Result<Vec<LibraryText>, AcquireError> {
    cancel.check()?;
    let base = url.trim_end_matches('/');
    let (library, _) = split_name(last_segment(base));

    let index_url = format!("{base}/index.json");
    let listing: Listing = serde_json::from_str(&fetcher.fetch_text(&index_url)?)
        .map_err(|source| AcquireError::Listing {
            url: index_url.clone(),
            source,
        })?;

    let mut texts = Vec::new();
    for file in listing
        .files
        .iter()
        .filter(|f| LibraryKind::Footprint.matches(Path::new(f)))
    {
        cancel.check()?;
        let file_url = format!("{base}/{file}");
        match fetcher.fetch_text(&file_url) {
            Ok(content) => {
                let (name, extension) = split_name(last_segment(file));
                texts.push(LibraryText {
                    library: library.to_string(),
                    name: name.to_string(),
                    extension,
                    origin: file_url,
                    content,
                });
            }
            Err(e) => log::warn!("Skipping footprint: {e}"),
        }
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/kicad-footprints/-/raw/master";

    #[test]
    fn test_symbol_urls_name_libraries() {
        let fetcher = MemoryFetcher::new().with("https://h/Device.kicad_sym", "(kicad_symbol_lib)");
        let urls = vec![
            "https://h/Device.kicad_sym".to_string(),
            "https://h/Missing.kicad_sym".to_string(),
        ];
        let texts = fetch_symbol_libraries(&fetcher, &urls, &CancelToken::new()).unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].library, "Device");
        assert_eq!(texts[0].extension, "kicad_sym");
        assert_eq!(texts[0].origin, "https://h/Device.kicad_sym");
    }

    #[test]
    fn test_footprint_listing() {
        let fetcher = MemoryFetcher::new()
            .with(
                format!("{BASE}/Resistor_SMD.pretty/index.json"),
                r#"{"files": ["R_0402.kicad_mod", "R_0603.kicad_mod", "notes.txt", "gone.kicad_mod"]}"#,
            )
            .with(format!("{BASE}/Resistor_SMD.pretty/R_0402.kicad_mod"), "(footprint \"R_0402\")")
            .with(format!("{BASE}/Resistor_SMD.pretty/R_0603.kicad_mod"), "(footprint \"R_0603\")");

        let urls = vec![format!("{BASE}/Resistor_SMD.pretty")];
        let texts = fetch_footprint_libraries(&fetcher, &urls, &CancelToken::new()).unwrap();
        let names: Vec<_> = texts.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["R_0402", "R_0603"]);
        assert!(texts.iter().all(|t| t.library == "Resistor_SMD"));
    }

    #[test]
    fn test_bad_listing_skips_library() {
        let fetcher = MemoryFetcher::new()
            .with(format!("{BASE}/Battery.pretty/index.json"), "<html>not json</html>");
        let err = fetch_footprint_library(&fetcher, &format!("{BASE}/Battery.pretty"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, AcquireError::Listing { .. }));

        let urls = vec![format!("{BASE}/Battery.pretty"), format!("{BASE}/Connector.pretty")];
        let texts = fetch_footprint_libraries(&fetcher, &urls, &CancelToken::new()).unwrap();
        assert!(texts.is_empty());
    }

    #[test]
    fn test_cancel_stops_fetching() {
        let fetcher = MemoryFetcher::new().with("https://h/Device.kicad_sym", "x");
        let cancel = CancelToken::new();
        cancel.cancel();
        let urls = vec!["https://h/Device.kicad_sym".to_string()];
        assert!(matches!(
            fetch_symbol_libraries(&fetcher, &urls, &cancel),
            Err(AcquireError::Cancelled)
        ));
        assert!(matches!(
            fetch_footprint_libraries(&fetcher, &urls, &cancel),
            Err(AcquireError::Cancelled)
        ));
    }
}
