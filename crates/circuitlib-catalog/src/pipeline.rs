use crate::config::{CatalogConfig, Source};
use crate::summary::Summary;
use crate::{Catalog, CatalogError};
use circuitlib_eda::{
    parse_footprint, parse_symbol_text, FootprintLibrary, ModelIndex, RawSymbol, Reconciler,
};
use circuitlib_fetch::{
    cache_dir, collect_files, ensure_mirror, fetch_footprint_libraries, fetch_symbol_libraries,
    read_library_tree, AcquireError, CancelToken, Fetch, LibraryKind, LibraryText,
};
use std::path::{Path, PathBuf};
use std::thread;

/// Run the whole ingestion: the symbol, footprint and model stages run
/// concurrently, then every symbol is reconciled against the finished
/// footprint library and model index.
///
/// Unreachable sources and unparsable files only reduce the output. The
/// run fails only when cancelled.
pub fn build_catalog(
    config: &CatalogConfig,
    fetcher: &dyn Fetch,
    cancel: &CancelToken,
) -> Result<Catalog, CatalogError> {
    log::info!(
        "Building catalog: symbols from {}, footprints from {}",
        config.symbols.describe(),
        config.footprints.describe()
    );

    let (symbols, footprints, models) = thread::scope(|s| {
        let symbols = s.spawn(|| symbol_stage(&config.symbols, fetcher, cancel));
        let footprints = s.spawn(|| footprint_stage(&config.footprints, fetcher, cancel));
        let models = s.spawn(|| model_stage(config.models.as_deref(), cancel));

        Ok::<_, CatalogError>((
            symbols.join().map_err(|_| CatalogError::StagePanicked("symbol"))??,
            footprints
                .join()
                .map_err(|_| CatalogError::StagePanicked("footprint"))??,
            models.join().map_err(|_| CatalogError::StagePanicked("model"))??,
        ))
    })?;

    cancel.check()?;

    let reconciler = Reconciler::new(footprints, models, config.classifier);
    let components = reconciler.reconcile_all(&symbols);
    let summary = Summary::new(&reconciler, symbols.len(), &components);
    summary.log();

    Ok(Catalog {
        components,
        summary,
    })
}

fn acquire(
    source: &Source,
    kind: LibraryKind,
    fetcher: &dyn Fetch,
    cancel: &CancelToken,
) -> Result<Vec<LibraryText>, AcquireError> {
    match source {
        Source::Local { path } => read_library_tree(path, kind, cancel),
        Source::Remote { urls } => match kind {
            LibraryKind::Footprint => fetch_footprint_libraries(fetcher, urls, cancel),
            _ => fetch_symbol_libraries(fetcher, urls, cancel),
        },
        Source::Mirror { url, path } => {
            let dest = match path {
                Some(path) => path.clone(),
                None => cache_dir()?.join(mirror_dir_name(url)),
            };
            match ensure_mirror(url, &dest) {
                Ok(root) => read_library_tree(&root, kind, cancel),
                Err(e) => {
                    log::warn!("{e}; continuing without {kind:?} libraries");
                    Ok(Vec::new())
                }
            }
        }
    }
}

// "https://host/group/kicad-symbols.git" -> "kicad-symbols"
fn mirror_dir_name(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("mirror");
    last.trim_end_matches(".git").to_string()
}

fn symbol_stage(
    source: &Source,
    fetcher: &dyn Fetch,
    cancel: &CancelToken,
) -> Result<Vec<RawSymbol>, CatalogError> {
    let texts = acquire_or_empty(source, LibraryKind::Symbol, fetcher, cancel)?;

    let mut symbols = Vec::new();
    for text in &texts {
        match parse_symbol_text(&text.content, &text.library, &text.extension) {
            Ok(parsed) => symbols.extend(parsed),
            Err(e) => log::warn!("Failed to parse symbol library {}: {e}", text.origin),
        }
    }
    log::debug!("Symbol stage: {} symbols from {} files", symbols.len(), texts.len());
    Ok(symbols)
}

fn footprint_stage(
    source: &Source,
    fetcher: &dyn Fetch,
    cancel: &CancelToken,
) -> Result<FootprintLibrary, CatalogError> {
    let texts = acquire_or_empty(source, LibraryKind::Footprint, fetcher, cancel)?;

    let mut library = FootprintLibrary::new();
    for text in &texts {
        match parse_footprint(&text.content, &text.name, &text.library) {
            Ok(footprint) => {
                library.insert(footprint);
            }
            Err(e) => log::warn!("Failed to parse footprint {}: {e}", text.origin),
        }
    }
    log::debug!(
        "Footprint stage: {} footprints from {} files",
        library.len(),
        texts.len()
    );
    Ok(library)
}

fn model_stage(root: Option<&Path>, cancel: &CancelToken) -> Result<ModelIndex, CatalogError> {
    let Some(root) = root else {
        return Ok(ModelIndex::new());
    };
    cancel.check()?;

    let relative: Vec<PathBuf> = collect_files(root, LibraryKind::Model)
        .into_iter()
        .filter_map(|path| path.strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    let index = ModelIndex::from_paths(&relative);
    log::debug!("Model stage: indexed {} models", index.len());
    Ok(index)
}

// Acquisition failures other than cancellation leave the stage empty.
fn acquire_or_empty(
    source: &Source,
    kind: LibraryKind,
    fetcher: &dyn Fetch,
    cancel: &CancelToken,
) -> Result<Vec<LibraryText>, CatalogError> {
    match acquire(source, kind, fetcher, cancel) {
        Ok(texts) => Ok(texts),
        Err(AcquireError::Cancelled) => Err(CatalogError::Cancelled),
        Err(e) => {
            log::warn!("Could not acquire {kind:?} libraries from {}: {e}", source.describe());
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_dir_name() {
        assert_eq!(
            mirror_dir_name("https://gitlab.com/kicad/libraries/kicad-symbols.git"),
            "kicad-symbols"
        );
        assert_eq!(mirror_dir_name("https://example.com/libs/"), "libs");
    }
}
