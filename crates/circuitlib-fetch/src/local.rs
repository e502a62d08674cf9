use crate::{split_name, AcquireError, CancelToken, LibraryKind, LibraryText};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every file under `root` with an extension of `kind`, sorted by path.
///
/// Unreadable directories are logged and skipped. A missing root yields an
/// empty list.
pub fn collect_files(root: &Path, kind: LibraryKind) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {e}", root.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && kind.matches(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    log::debug!(
        "Found {} {kind:?} files under {}",
        files.len(),
        root.display()
    );
    files
}

/// Read every library file of `kind` under `root`. Files that fail to read
/// are skipped.
pub fn read_library_tree(
    root: &Path,
    kind: LibraryKind,
    cancel: &CancelToken,
) -> Result<Vec<LibraryText>, AcquireError> {
    let mut texts = Vec::new();
    for path in collect_files(root, kind) {
        cancel.check()?;
        match read_library_file(&path, kind) {
            Ok(text) => texts.push(text),
            Err(e) => log::warn!("{e}"),
        }
    }
    Ok(texts)
}

fn read_library_file(path: &Path, kind: LibraryKind) -> Result<LibraryText, AcquireError> {
    let content = fs::read_to_string(path).map_err(|source| AcquireError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (name, extension) = split_name(&file);
    let library = match kind {
        LibraryKind::Footprint => footprint_library_name(path),
        _ => name.to_string(),
    };

    Ok(LibraryText {
        library,
        name: name.to_string(),
        extension,
        origin: path.display().to_string(),
        content,
    })
}

// Nearest enclosing `X.pretty` folder, else the parent folder name.
fn footprint_library_name(path: &Path) -> String {
    let dirs = path.ancestors().skip(1).filter_map(|p| p.file_name());
    let mut parent = None;
    for dir in dirs {
        let dir = dir.to_string_lossy();
        if let Some(stem) = dir.strip_suffix(".pretty") {
            return stem.to_string();
        }
        parent.get_or_insert_with(|| dir.into_owned());
    }
    parent.unwrap_or_default()
}
