//! Non-interactive subcommands.
use std::{io::Write, path::Path};

use catalog::{AuthKind, Bundle, Catalog, CatalogError, CatalogStore, Host, ImportMode, ImportSummary};
use color_eyre::{Result, eyre::eyre};
use serde::Serialize;
use tracing::info;

use crate::{
    config::Config,
    services::tmux::{OpenTarget, Tmux},
};

#[derive(Serialize)]
struct Listing<'a> {
    hosts: Vec<Host>,
    profiles: &'a [catalog::Group],
}

/// Stored passwords never leave the catalog through `list`.
fn redacted(host: &Host) -> Host {
    let mut host = host.clone();
    if let AuthKind::Password { password } = &mut host.auth {
        if password.is_some() {
            *password = Some("***".into());
        }
    }
    host
}

pub fn list(catalog: &Catalog, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        let listing = Listing {
            hosts: catalog.hosts().iter().map(redacted).collect(),
            profiles: catalog.groups(),
        };
        serde_json::to_writer_pretty(&mut *out, &listing)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "HOSTS")?;
    for host in catalog.hosts() {
        writeln!(
            out,
            "  {:<18} {}:{} ({})",
            host.name,
            host.destination(),
            host.port,
            host.auth.method()
        )?;
    }
    writeln!(out, "PROFILES")?;
    for group in catalog.groups() {
        writeln!(
            out,
            "  {:<18} [{}] {}",
            group.name,
            group.layout,
            group.hosts.join(", ")
        )?;
    }
    Ok(())
}

/// Open `name` (host first, then profile) and return the session to attach.
pub async fn connect(
    config: &Config,
    catalog: &Catalog,
    name: &str,
    window: Option<&str>,
    target: OpenTarget,
) -> Result<String> {
    let tmux = Tmux::new(config);
    let window = window.unwrap_or(name);
    if window.contains([':', '.']) {
        return Err(eyre!("window name `{window}` must not contain ':' or '.'"));
    }

    let session = if let Some(host) = catalog.host(name) {
        tmux.open_host(&config.session_name, window, host, target)
            .await?
    } else if let Some(group) = catalog.group(name) {
        let hosts: Vec<Host> = catalog.members(name)?.into_iter().cloned().collect();
        tmux.open_group(&config.session_name, window, name, &hosts, group.layout, target)
            .await?
    } else {
        return Err(eyre!("no host or profile named `{name}`"));
    };
    info!(name, %session, "connected from command line");
    Ok(session)
}

pub fn import(store: &mut CatalogStore, file: &Path, replace: bool) -> Result<ImportSummary> {
    let mode = if replace {
        ImportMode::Replace
    } else {
        ImportMode::Merge
    };
    let bundle = Bundle::read(file)?;
    let summary = store.update(|c| c.import(bundle, mode))?;
    info!(file = %file.display(), %mode, %summary, "bundle imported");
    Ok(summary)
}

pub fn export(catalog: &Catalog, file: &Path, profile: Option<&str>) -> Result<Bundle> {
    let bundle = match profile {
        Some(name) => Bundle::for_group(catalog, name)?,
        None => Bundle::from_catalog(catalog),
    };
    bundle.write(file).map_err(|err: CatalogError| eyre!("export to {}: {err}", file.display()))?;
    info!(file = %file.display(), hosts = bundle.hosts.len(), "bundle exported");
    Ok(bundle)
}
