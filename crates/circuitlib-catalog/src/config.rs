use crate::CatalogError;
use circuitlib_eda::ClassifierStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const KICAD_LIBRARIES: &str = "https://gitlab.com/kicad/libraries";
pub const DEFAULT_OUTPUT: &str = "component-definitions.json";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 750;

const SYMBOL_LIBRARIES: &[&str] = &[
    "Device",
    "Regulator_Linear",
    "Transistor_BJT",
    "Connector",
    "Audio",
];

const FOOTPRINT_LIBRARIES: &[&str] = &[
    "Resistor_SMD",
    "Capacitor_SMD",
    "Diode_SMD",
    "Package_DIP",
    "Audio_Module",
    "Battery",
    "Button_Switch_Keyboard",
    "Button_Switch_SMD",
    "Button_Switch_THT",
    "Buzzer_Beeper",
    "Connector",
];

/// Where one kind of library comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    /// A local directory tree, searched recursively.
    Local { path: PathBuf },
    /// A list of library URLs.
    Remote { urls: Vec<String> },
    /// A git repository cloned once into `path` (default: under the cache
    /// directory) and then read as a local tree.
    Mirror {
        url: String,
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl Source {
    pub fn default_symbols() -> Self {
        Source::Remote {
            urls: SYMBOL_LIBRARIES
                .iter()
                .map(|lib| format!("{KICAD_LIBRARIES}/kicad-symbols/-/raw/master/{lib}.kicad_sym"))
                .collect(),
        }
    }

    pub fn default_footprints() -> Self {
        Source::Remote {
            urls: FOOTPRINT_LIBRARIES
                .iter()
                .map(|lib| format!("{KICAD_LIBRARIES}/kicad-footprints/-/raw/master/{lib}.pretty"))
                .collect(),
        }
    }

    pub fn symbols_mirror() -> Self {
        Source::Mirror {
            url: format!("{KICAD_LIBRARIES}/kicad-symbols.git"),
            path: None,
        }
    }

    pub fn footprints_mirror() -> Self {
        Source::Mirror {
            url: format!("{KICAD_LIBRARIES}/kicad-footprints.git"),
            path: None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Local { path } => path.display().to_string(),
            Source::Remote { urls } => format!("{} remote libraries", urls.len()),
            Source::Mirror { url, .. } => format!("mirror of {url}"),
        }
    }
}

/// Catalog build settings, usually read from a TOML file:
///
/// ```toml
/// classifier = "prefix"
/// models = "/usr/share/kicad/3dmodels"
///
/// [symbols]
/// kind = "local"
/// path = "/usr/share/kicad/symbols"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub symbols: Source,
    pub footprints: Source,
    pub models: Option<PathBuf>,
    pub classifier: ClassifierStrategy,
    pub fetch_timeout_ms: u64,
    pub output: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            symbols: Source::default_symbols(),
            footprints: Source::default_footprints(),
            models: None,
            classifier: ClassifierStrategy::default(),
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl CatalogConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| CatalogError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// True when acquiring either library kind needs HTTP.
    pub fn needs_network(&self) -> bool {
        matches!(self.symbols, Source::Remote { .. })
            || matches!(self.footprints, Source::Remote { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.classifier, ClassifierStrategy::Keyword);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(750));
        assert_eq!(config.output, PathBuf::from("component-definitions.json"));
        assert!(config.needs_network());

        let Source::Remote { urls } = &config.symbols else {
            panic!("expected remote symbols");
        };
        assert_eq!(urls.len(), 5);
        assert_eq!(
            urls[0],
            "https://gitlab.com/kicad/libraries/kicad-symbols/-/raw/master/Device.kicad_sym"
        );
        let Source::Remote { urls } = &config.footprints else {
            panic!("expected remote footprints");
        };
        assert_eq!(urls.len(), 11);
        assert!(urls[0].ends_with("/Resistor_SMD.pretty"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = CatalogConfig::from_toml_str(
            r#"
classifier = "prefix"
models = "/opt/kicad/3dmodels"
fetch_timeout_ms = 300

[symbols]
kind = "local"
path = "/opt/kicad/symbols"

[footprints]
kind = "mirror"
url = "https://gitlab.com/kicad/libraries/kicad-footprints.git"
"#,
        )
        .unwrap();

        assert_eq!(config.classifier, ClassifierStrategy::Prefix);
        assert_eq!(config.models, Some(PathBuf::from("/opt/kicad/3dmodels")));
        assert_eq!(config.fetch_timeout_ms, 300);
        assert_eq!(
            config.symbols,
            Source::Local {
                path: PathBuf::from("/opt/kicad/symbols")
            }
        );
        assert_eq!(config.footprints, Source::footprints_mirror());
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert!(!config.needs_network());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(CatalogConfig::from_toml_str("classifer = \"prefix\"").is_err());
        assert!(CatalogConfig::from_toml_str("classifier = \"fuzzy\"").is_err());
    }
}
