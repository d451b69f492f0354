use crate::catalog::Catalog;
use crate::errors::CatalogError;
use crate::model::{Group, Host};
use crate::store::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString, VariantNames};

pub const BUNDLE_VERSION: u32 = 1;

/// Portable JSON form of (part of) a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ImportMode {
    /// Incoming entries overwrite same-named ones; everything else is kept.
    #[default]
    Merge,
    /// The catalog is replaced wholesale.
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub hosts_added: usize,
    pub hosts_updated: usize,
    pub groups_added: usize,
    pub groups_updated: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} host(s) added, {} updated; {} profile(s) added, {} updated",
            self.hosts_added, self.hosts_updated, self.groups_added, self.groups_updated
        )
    }
}

impl Bundle {
    /// Everything in the catalog.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            version: BUNDLE_VERSION,
            exported_at: Utc::now(),
            hosts: catalog.hosts().to_vec(),
            groups: catalog.groups().to_vec(),
        }
    }

    /// One profile plus the hosts it references.
    pub fn for_group(catalog: &Catalog, group: &str) -> Result<Self, CatalogError> {
        let entry = catalog
            .group(group)
            .ok_or_else(|| CatalogError::UnknownGroup(group.to_string()))?;
        let hosts = catalog
            .members(group)?
            .into_iter()
            .cloned()
            .collect();
        Ok(Self {
            version: BUNDLE_VERSION,
            exported_at: Utc::now(),
            hosts,
            groups: vec![entry.clone()],
        })
    }

    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let bundle: Bundle = serde_json::from_str(&text)?;
        if bundle.version > BUNDLE_VERSION {
            return Err(CatalogError::UnsupportedVersion(bundle.version));
        }
        Ok(bundle)
    }

    pub fn write(&self, path: &Path) -> Result<(), CatalogError> {
        let text = serde_json::to_string_pretty(self)?;
        write_atomic(path, text.as_bytes())?;
        Ok(())
    }
}

impl Catalog {
    /// Bring `bundle` into the catalog. The bundle must be self-consistent in
    /// `Replace` mode; in `Merge` mode memberships may also refer to hosts that
    /// already exist here. On error the catalog is unchanged.
    pub fn import(
        &mut self,
        bundle: Bundle,
        mode: ImportMode,
    ) -> Result<ImportSummary, CatalogError> {
        if bundle.version > BUNDLE_VERSION {
            return Err(CatalogError::UnsupportedVersion(bundle.version));
        }

        match mode {
            ImportMode::Replace => {
                let summary = ImportSummary {
                    hosts_added: bundle.hosts.len(),
                    groups_added: bundle.groups.len(),
                    ..ImportSummary::default()
                };
                *self = Catalog::from_parts(bundle.hosts, bundle.groups)?;
                Ok(summary)
            }
            ImportMode::Merge => {
                let mut next = self.clone();
                let mut summary = ImportSummary::default();
                let mut seen_hosts: Vec<String> = Vec::new();
                let mut seen_groups: Vec<String> = Vec::new();

                for host in bundle.hosts {
                    if seen_hosts.contains(&host.name) {
                        return Err(CatalogError::DuplicateHost(host.name));
                    }
                    seen_hosts.push(host.name.clone());
                    if next.host(&host.name).is_some() {
                        let name = host.name.clone();
                        next.update_host(&name, host)?;
                        summary.hosts_updated += 1;
                    } else {
                        next.add_host(host)?;
                        summary.hosts_added += 1;
                    }
                }

                for group in bundle.groups {
                    if seen_groups.contains(&group.name) {
                        return Err(CatalogError::DuplicateGroup(group.name));
                    }
                    seen_groups.push(group.name.clone());
                    if next.group(&group.name).is_some() {
                        let name = group.name.clone();
                        next.update_group(&name, group)?;
                        summary.groups_updated += 1;
                    } else {
                        next.add_group(group)?;
                        summary.groups_added += 1;
                    }
                }

                *self = next;
                Ok(summary)
            }
        }
    }
}
