use circuitlib_eda::{Component, MatchKind, Reconciler};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Counts reported at the end of a catalog build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub symbols: usize,
    pub footprints: usize,
    pub models: usize,
    pub components: usize,
    pub with_models: usize,
    pub unmatched: usize,
    pub matched_by: BTreeMap<MatchKind, usize>,
}

impl Summary {
    pub fn new(reconciler: &Reconciler, symbols: usize, components: &[Component]) -> Self {
        let mut matched_by = BTreeMap::new();
        for kind in components.iter().filter_map(|c| c.matched_by) {
            *matched_by.entry(kind).or_insert(0) += 1;
        }

        Summary {
            symbols,
            footprints: reconciler.footprints().len(),
            models: reconciler.models().len(),
            components: components.len(),
            with_models: components
                .iter()
                .filter(|c| c.footprint.model3d.is_some())
                .count(),
            unmatched: components.iter().filter(|c| c.matched_by.is_none()).count(),
            matched_by,
        }
    }

    pub fn matched(&self, kind: MatchKind) -> usize {
        self.matched_by.get(&kind).copied().unwrap_or(0)
    }

    pub fn log(&self) {
        log::info!("{self}");
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} symbols, {} footprints, {} 3D models -> {} components ({} with 3D models); \
             matched exact {}, tag {}, substring {}, type {}; unmatched {}",
            self.symbols,
            self.footprints,
            self.models,
            self.components,
            self.with_models,
            self.matched(MatchKind::Exact),
            self.matched(MatchKind::Tag),
            self.matched(MatchKind::Substring),
            self.matched(MatchKind::Type),
            self.unmatched,
        )
    }
}
