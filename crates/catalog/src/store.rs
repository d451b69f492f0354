use crate::catalog::Catalog;
use crate::errors::CatalogError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-backed catalog.
///
/// The catalog is kept in memory; `update` applies a change to a copy,
/// persists it and only then swaps it in, so a failed save leaves the
/// in-memory state untouched.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    catalog: Catalog,
}

impl CatalogStore {
    /// Open the catalog at `path`. A missing file is an empty catalog.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let catalog = load(&path)?;
        tracing::debug!(
            path = %path.display(),
            hosts = catalog.hosts().len(),
            groups = catalog.groups().len(),
            "catalog loaded"
        );
        Ok(Self { path, catalog })
    }

    /// In-memory store that still saves to `path` (used by tests and `--catalog`).
    pub fn with_catalog(path: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            path: path.into(),
            catalog,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Re-read the file, discarding the in-memory state.
    pub fn reload(&mut self) -> Result<(), CatalogError> {
        self.catalog = load(&self.path)?;
        Ok(())
    }

    /// Apply `f` to a copy of the catalog and persist it. On any error the
    /// stored catalog is left as it was.
    pub fn update<R>(
        &mut self,
        f: impl FnOnce(&mut Catalog) -> Result<R, CatalogError>,
    ) -> Result<R, CatalogError> {
        let mut next = self.catalog.clone();
        let out = f(&mut next)?;
        save(&self.path, &next)?;
        self.catalog = next;
        Ok(out)
    }

    pub fn save(&self) -> Result<(), CatalogError> {
        save(&self.path, &self.catalog)
    }
}

fn load(path: &Path) -> Result<Catalog, CatalogError> {
    if !path.exists() {
        return Ok(Catalog::new());
    }
    let text = std::fs::read_to_string(path)?;
    let catalog: Catalog = toml::from_str(&text)?;
    catalog.validate()?;
    Ok(catalog)
}

fn save(path: &Path, catalog: &Catalog) -> Result<(), CatalogError> {
    let text = toml::to_string_pretty(catalog)?;
    write_atomic(path, text.as_bytes())?;
    tracing::info!(path = %path.display(), "catalog saved");
    Ok(())
}

/// Write `bytes` to a sibling temp file and rename it over `path`, holding an
/// exclusive advisory lock on `<path>.lock` for the duration.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let lock = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path.with_extension("lock"))?;
    lock.lock_exclusive()?;

    let res: std::io::Result<()> = (|| {
        let tmp = path.with_extension("tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        std::fs::rename(&tmp, path)?;
        // fsync parent dir
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Ok(d) = File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    })();

    lock.unlock()?;
    res
}
