use crate::{Model3D, ModelFormat};
use std::collections::HashMap;
use std::path::Path;

/// Recognized 3D model format for a file path, by extension.
pub fn model_format(path: &Path) -> Option<ModelFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "step" | "stp" => Some(ModelFormat::Step),
        "wrl" | "vrml" => Some(ModelFormat::Vrml),
        _ => None,
    }
}

/// Index of 3D model files keyed by base file name.
///
/// Lookups try the exact base name first, then a case-insensitive match,
/// then a match ignoring everything but letters and digits (so a footprint
/// referencing `SOT-23` finds `SOT23.step`). The first file inserted under a
/// key keeps it.
#[derive(Debug, Default, Clone)]
pub struct ModelIndex {
    exact: HashMap<String, Model3D>,
    lowercase: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl ModelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from paths relative to the models root. Sort the input first
    /// for reproducible results when base names collide.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut index = Self::new();
        for path in paths {
            index.insert(path.as_ref());
        }
        index
    }

    /// Add a model file. Returns false when the path is not a model or its
    /// base name is already taken.
    pub fn insert(&mut self, relative: &Path) -> bool {
        let Some(format) = model_format(relative) else {
            return false;
        };
        let (Some(stem), Some(filename)) = (
            relative.file_stem().and_then(|s| s.to_str()),
            relative.file_name().and_then(|s| s.to_str()),
        ) else {
            return false;
        };
        if self.exact.contains_key(stem) {
            log::trace!("Duplicate model base name {stem}, keeping the first");
            return false;
        }

        self.lowercase
            .entry(stem.to_lowercase())
            .or_insert_with(|| stem.to_string());
        self.folded
            .entry(fold(stem))
            .or_insert_with(|| stem.to_string());
        self.exact.insert(
            stem.to_string(),
            Model3D {
                filename: filename.to_string(),
                path: relative.to_string_lossy().replace('\\', "/"),
                format,
                scale: [1.0, 1.0, 1.0],
                offset: [0.0, 0.0, 0.0],
                rotation: [0.0, 0.0, 0.0],
            },
        );
        true
    }

    pub fn lookup(&self, base_name: &str) -> Option<&Model3D> {
        if base_name.is_empty() {
            return None;
        }
        if let Some(model) = self.exact.get(base_name) {
            return Some(model);
        }
        self.lowercase
            .get(&base_name.to_lowercase())
            .or_else(|| {
                let folded = fold(base_name);
                (!folded.is_empty())
                    .then(|| self.folded.get(&folded))
                    .flatten()
            })
            .and_then(|key| self.exact.get(key))
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

fn fold(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
