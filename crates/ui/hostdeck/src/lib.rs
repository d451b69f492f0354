pub mod action;
pub mod app;
pub mod cli;
pub mod commands;
pub mod components;
pub mod config;
pub mod errors;
pub mod pages;
pub mod services;
pub mod state;
pub mod tui;

use std::process::Command;

use ::app::{AppBuilder, Application};
use catalog::CatalogStore;
use color_eyre::{Result, eyre::eyre};
use tracing::info;

use crate::{
    app::App,
    cli::{Cli, Cmd},
    config::Config,
    services::tmux::Tmux,
};

pub struct Hostdeck;

impl Application for Hostdeck {
    const APP_ID: &'static str = "hostdeck";
}

pub async fn run(cli: Cli) -> Result<()> {
    errors::init()?;
    let ctx = AppBuilder::<Hostdeck>::new(env!("CARGO_PKG_VERSION"))
        .map_err(|err| eyre!("startup failed: {err}"))?
        .build();
    let paths = ctx.path_context();

    let mut config = Config::load(paths)?;
    if let Some(session) = cli.session.clone() {
        config.session_name = session;
    }
    if let Some(catalog) = cli.catalog.clone() {
        config.catalog_file = Some(catalog);
    }
    let mut store = CatalogStore::open(config.catalog_path(paths))?;
    info!(catalog = %store.path().display(), session = %config.session_name, "starting");

    match cli.command() {
        Cmd::Tui => {
            let mut app = App::new(config.clone(), store, paths.exports_dir())?;
            if let Some(session) = app.run().await? {
                attach(&config, &session)?;
            }
        }
        Cmd::List { json } => {
            commands::list(store.catalog(), json, &mut std::io::stdout().lock())?;
        }
        Cmd::Connect {
            name,
            window,
            target,
        } => {
            let session =
                commands::connect(&config, store.catalog(), &name, window.as_deref(), target)
                    .await?;
            attach(&config, &session)?;
        }
        Cmd::Import { file, replace } => {
            let summary = commands::import(&mut store, &file, replace)?;
            println!("{summary}");
        }
        Cmd::Export { file, profile } => {
            let bundle = commands::export(store.catalog(), &file, profile.as_deref())?;
            println!(
                "exported {} host(s) and {} profile(s) to {}",
                bundle.hosts.len(),
                bundle.groups.len(),
                file.display()
            );
        }
    }
    Ok(())
}

/// Hand the terminal to tmux once the UI is gone.
fn attach(config: &Config, session: &str) -> Result<()> {
    let argv = Tmux::new(config).attach_command(session);
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| eyre!("empty attach command"))?;
    info!(?argv, "attaching");
    let status = Command::new(program).args(args).status()?;
    if !status.success() {
        return Err(eyre!("`{}` exited with {status}", argv.join(" ")));
    }
    Ok(())
}
