use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::services::tmux::OpenTarget;

#[derive(Parser, Debug)]
#[command(name = "hostdeck", version, about = "SSH hosts and profiles, opened in tmux")]
pub struct Cli {
    /// Catalog file to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// tmux session that windows are opened in
    #[arg(long, global = true, value_name = "NAME")]
    pub session: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Run the interactive TUI (default)
    Tui,
    /// Print hosts and profiles
    List {
        #[arg(long)]
        json: bool,
    },
    /// Open a host or profile in tmux and attach to it
    Connect {
        /// Host or profile name; hosts win on a clash
        name: String,
        /// Window name (defaults to NAME)
        #[arg(long)]
        window: Option<String>,
        /// Open in a window of the shared session or in a session of its own
        #[arg(long, default_value_t = OpenTarget::Window)]
        target: OpenTarget,
    },
    /// Merge (or replace) the catalog with a JSON bundle
    Import {
        file: PathBuf,
        #[arg(long)]
        replace: bool,
    },
    /// Write the catalog, or one profile, as a JSON bundle
    Export {
        file: PathBuf,
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

impl Cli {
    pub fn command(&self) -> Cmd {
        self.cmd.clone().unwrap_or(Cmd::Tui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["hostdeck"]).unwrap();
        assert_eq!(cli.command(), Cmd::Tui);
    }

    #[test]
    fn global_flags_and_connect() {
        let cli = Cli::try_parse_from([
            "hostdeck", "connect", "web", "--window", "w1", "--session", "ops", "--target", "session",
        ])
        .unwrap();
        assert_eq!(cli.session.as_deref(), Some("ops"));
        assert_eq!(
            cli.command(),
            Cmd::Connect {
                name: "web".into(),
                window: Some("w1".into()),
                target: OpenTarget::Session,
            }
        );
    }

    #[test]
    fn import_replace_flag() {
        let cli = Cli::try_parse_from(["hostdeck", "--catalog", "/tmp/c.toml", "import", "b.json", "--replace"])
            .unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(
            cli.command(),
            Cmd::Import {
                file: "b.json".into(),
                replace: true
            }
        );
    }
}
