use crate::AcquireError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const CACHE_DIR_ENV: &str = "CIRCUITLIB_CACHE_DIR";

/// Root directory for mirrored library repositories.
pub fn cache_dir() -> Result<PathBuf, AcquireError> {
    // Explicit override for CI and sandboxed environments.
    if let Ok(custom) = std::env::var(CACHE_DIR_ENV) {
        let path = PathBuf::from(custom);
        create_dir(&path)?;
        return Ok(path);
    }

    if let Some(base) = dirs::cache_dir() {
        let dir = base.join("circuitlib");
        if fs::create_dir_all(&dir).is_ok() {
            return Ok(dir);
        }
    }

    let dir = std::env::temp_dir().join("circuitlib_cache");
    create_dir(&dir)?;
    Ok(dir)
}

/// Shallow-clone `url` into `dest` unless `dest` already holds something.
/// Returns `dest`.
pub fn ensure_mirror(url: &str, dest: &Path) -> Result<PathBuf, AcquireError> {
    if is_populated(dest) {
        log::debug!("Mirror of {url} already present at {}", dest.display());
        return Ok(dest.to_path_buf());
    }

    if let Some(parent) = dest.parent() {
        create_dir(parent)?;
    }

    log::info!("Cloning {url} into {}", dest.display());
    let mut cmd = Command::new("git");
    cmd.arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--quiet")
        .arg(url)
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    log::debug!("Running command: {cmd:?}");
    match cmd.status() {
        Ok(status) if status.success() => Ok(dest.to_path_buf()),
        Ok(status) => {
            log::warn!("git clone of {url} exited with {status}");
            Err(AcquireError::Clone {
                url: url.to_string(),
                path: dest.display().to_string(),
            })
        }
        Err(source) => Err(AcquireError::Io {
            path: "git".to_string(),
            source,
        }),
    }
}

fn is_populated(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn create_dir(path: &Path) -> Result<(), AcquireError> {
    fs::create_dir_all(path).map_err(|source| AcquireError::Io {
        path: path.display().to_string(),
        source,
    })
}
