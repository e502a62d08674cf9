//! Symbol to footprint reconciliation.
//!
//! Each symbol is matched greedily against the footprint library using, in
//! order: exact name, footprint tag, name substring, then component type.
//! The first strategy that produces a footprint wins. Footprints may be
//! shared by any number of symbols.

use crate::classify::{describe, ClassifierStrategy, ComponentType};
use crate::kicad::footprint::FootprintDef;
use crate::kicad::model::ModelIndex;
use crate::kicad::symbol::RawSymbol;
use crate::{svg_path, Component};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which step of the fallback chain found the footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Tag,
    Substring,
    Type,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Tag => "tag",
            MatchKind::Substring => "substring",
            MatchKind::Type => "type",
        }
    }
}

/// Footprints keyed by name. Iteration is in name order, so the tag,
/// substring and type steps pick the same footprint on every run.
#[derive(Debug, Default, Clone)]
pub struct FootprintLibrary {
    footprints: BTreeMap<String, FootprintDef>,
}

impl FootprintLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a footprint. Footprints without pads are not matchable and are
    /// dropped; a later footprint with the same name replaces the earlier one.
    pub fn insert(&mut self, footprint: FootprintDef) -> bool {
        if footprint.pads.is_empty() {
            log::debug!(
                "Footprint {}:{} has no pads, skipping",
                footprint.library,
                footprint.name
            );
            return false;
        }
        if let Some(previous) = self.footprints.insert(footprint.name.clone(), footprint) {
            log::debug!(
                "Footprint {} from {} replaced by a later definition",
                previous.name,
                previous.library
            );
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<&FootprintDef> {
        self.footprints.get(name)
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FootprintDef> {
        self.footprints.values()
    }

    /// Run the fallback chain for one symbol name.
    pub fn find_match(
        &self,
        symbol_name: &str,
        component_type: ComponentType,
    ) -> Option<(MatchKind, &FootprintDef)> {
        if let Some(footprint) = self.get(symbol_name) {
            return Some((MatchKind::Exact, footprint));
        }

        let lower = symbol_name.to_lowercase();
        if lower.is_empty() {
            return None;
        }

        let by_tag = self.iter().find(|fp| {
            fp.tags
                .iter()
                .map(|tag| tag.to_lowercase())
                .any(|tag| !tag.is_empty() && lower.contains(&tag))
        });
        if let Some(footprint) = by_tag {
            return Some((MatchKind::Tag, footprint));
        }

        let by_substring = self.iter().find(|fp| {
            let name = fp.name.to_lowercase();
            !name.is_empty() && (lower.contains(&name) || name.contains(&lower))
        });
        if let Some(footprint) = by_substring {
            return Some((MatchKind::Substring, footprint));
        }

        let needle = component_type.as_str();
        self.iter()
            .find(|fp| {
                fp.name.to_lowercase().contains(needle)
                    || fp
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(needle))
                    || fp.tags.iter().any(|t| t.to_lowercase().contains(needle))
            })
            .map(|fp| (MatchKind::Type, fp))
    }
}

impl FromIterator<FootprintDef> for FootprintLibrary {
    fn from_iter<I: IntoIterator<Item = FootprintDef>>(iter: I) -> Self {
        let mut library = FootprintLibrary::new();
        for footprint in iter {
            library.insert(footprint);
        }
        library
    }
}

/// Combines the three parsed inputs into catalog entries. Holds the
/// footprint library and model index read-only once built.
#[derive(Debug)]
pub struct Reconciler {
    footprints: FootprintLibrary,
    models: ModelIndex,
    strategy: ClassifierStrategy,
}

impl Reconciler {
    pub fn new(footprints: FootprintLibrary, models: ModelIndex, strategy: ClassifierStrategy) -> Self {
        Reconciler {
            footprints,
            models,
            strategy,
        }
    }

    pub fn footprints(&self) -> &FootprintLibrary {
        &self.footprints
    }

    pub fn models(&self) -> &ModelIndex {
        &self.models
    }

    pub fn strategy(&self) -> ClassifierStrategy {
        self.strategy
    }

    pub fn reconcile(&self, symbol: &RawSymbol) -> Component {
        let component_type = self.strategy.classify(&symbol.name);
        let found = self.footprints.find_match(&symbol.name, component_type);

        let (footprint, matched_by, footprint_descr) = match found {
            Some((kind, def)) => {
                log::trace!("{} matched {} by {}", symbol.name, def.name, kind.as_str());
                (def.resolve(&self.models), Some(kind), def.description.clone())
            }
            None => {
                log::trace!("{} has no footprint match", symbol.name);
                (symbol.placeholder_footprint(), None, None)
            }
        };

        let description = symbol
            .description
            .clone()
            .or(footprint_descr)
            .unwrap_or_else(|| describe(&symbol.name, component_type));

        Component {
            component_type,
            name: symbol.name.clone(),
            description,
            footprint,
            library: symbol.library.clone(),
            value: symbol.value.clone(),
            datasheet: symbol.datasheet.clone(),
            keywords: symbol.keywords.clone(),
            electrical_defaults: component_type.electrical_defaults(),
            symbol_pins: Some(symbol.pins.clone()),
            matched_by,
            schematic_path: (!symbol.graphics.is_empty()).then(|| svg_path(&symbol.graphics)),
        }
    }

    /// Reconcile every symbol, preserving input order.
    pub fn reconcile_all(&self, symbols: &[RawSymbol]) -> Vec<Component> {
        symbols.iter().map(|s| self.reconcile(s)).collect()
    }
}
