//! tmux driver: sessions, windows and panes running ssh.
//!
//! Every call goes through `tokio::process` with the configured timeout and
//! `kill_on_drop`, so dropping a pending call (cancelled connect) also stops
//! the child. Attaching is the exception: it takes over the terminal and is
//! therefore only built here and run by `main` after the TUI is gone.
use std::{process::Stdio, time::Duration};

use catalog::{AuthKind, Host, Layout};
use strum::{Display, EnumString, VariantNames};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("failed to run `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`tmux {command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u128 },

    #[error("`tmux {command}` failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("window `{0}` already exists")]
    WindowExists(String),

    #[error("session `{0}` already exists")]
    SessionExists(String),

    #[error("profile `{0}` has no hosts")]
    NoHosts(String),
}

/// Where a connection opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum OpenTarget {
    /// New window in the shared session.
    #[default]
    Window,
    /// Dedicated session named after the window.
    Session,
}

/// ssh invocation for one host: argv plus the environment it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshInvocation {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl SshInvocation {
    /// argv as a single `sh -c` string.
    pub fn shell_line(&self) -> String {
        self.argv
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct Tmux {
    binary: String,
    ssh_binary: String,
    sshpass_binary: String,
    timeout: Duration,
}

impl Tmux {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.tmux_binary.clone(),
            ssh_binary: config.ssh_binary.clone(),
            sshpass_binary: config.sshpass_binary.clone(),
            timeout: config.command_timeout(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub async fn has_session(&self, name: &str) -> Result<bool, TmuxError> {
        let target = format!("={name}");
        let out = self.output(&["has-session", "-t", target.as_str()]).await?;
        Ok(out.status.success())
    }

    /// Create `name` detached unless it exists. True when it was created.
    pub async fn ensure_session(&self, name: &str) -> Result<bool, TmuxError> {
        if self.has_session(name).await? {
            return Ok(false);
        }
        self.run(&["new-session", "-d", "-s", name]).await?;
        info!(session = name, "tmux session created");
        Ok(true)
    }

    pub async fn list_windows(&self, session: &str) -> Result<Vec<String>, TmuxError> {
        let target = format!("={session}");
        let out = self
            .run(&["list-windows", "-t", target.as_str(), "-F", "#{window_name}"])
            .await?;
        Ok(parse_lines(&out))
    }

    /// Open `host` in a new window (or session). Returns the session to attach.
    pub async fn open_host(
        &self,
        session: &str,
        window: &str,
        host: &Host,
        target: OpenTarget,
    ) -> Result<String, TmuxError> {
        let ssh = self.ssh_command(host);
        let attach = self.open_first(session, window, &ssh, target).await?;
        info!(host = %host.name, session = %attach, window, "host opened");
        Ok(attach)
    }

    /// One pane per host in a single window, arranged with `layout`.
    pub async fn open_group(
        &self,
        session: &str,
        window: &str,
        group: &str,
        hosts: &[Host],
        layout: Layout,
        target: OpenTarget,
    ) -> Result<String, TmuxError> {
        let Some((first, rest)) = hosts.split_first() else {
            return Err(TmuxError::NoHosts(group.to_string()));
        };
        let attach = self
            .open_first(session, window, &self.ssh_command(first), target)
            .await?;

        let window_target = format!("{attach}:{window}");
        for host in rest {
            let ssh = self.ssh_command(host);
            let mut args = vec!["split-window".to_string(), "-t".into(), window_target.clone()];
            push_env(&mut args, &ssh);
            args.push(ssh.shell_line());
            self.run(&args).await?;
            // re-tile after every split so tmux never runs out of room
            self.run(&["select-layout", "-t", window_target.as_str(), "tiled"])
                .await?;
        }
        let layout: &'static str = layout.into();
        self.run(&["select-layout", "-t", window_target.as_str(), layout])
            .await?;
        info!(group, session = %attach, window, panes = hosts.len(), "profile opened");
        Ok(attach)
    }

    async fn open_first(
        &self,
        session: &str,
        window: &str,
        ssh: &SshInvocation,
        target: OpenTarget,
    ) -> Result<String, TmuxError> {
        match target {
            OpenTarget::Window => {
                self.ensure_session(session).await?;
                if self.list_windows(session).await?.iter().any(|w| w == window) {
                    return Err(TmuxError::WindowExists(window.to_string()));
                }
                let mut args = vec![
                    "new-window".to_string(),
                    "-t".into(),
                    format!("={session}:"),
                    "-n".into(),
                    window.to_string(),
                ];
                push_env(&mut args, ssh);
                args.push(ssh.shell_line());
                self.run(&args).await?;
                Ok(session.to_string())
            }
            OpenTarget::Session => {
                if self.has_session(window).await? {
                    return Err(TmuxError::SessionExists(window.to_string()));
                }
                let mut args = vec![
                    "new-session".to_string(),
                    "-d".into(),
                    "-s".into(),
                    window.to_string(),
                    "-n".into(),
                    window.to_string(),
                ];
                push_env(&mut args, ssh);
                args.push(ssh.shell_line());
                self.run(&args).await?;
                Ok(window.to_string())
            }
        }
    }

    /// argv that hands the terminal to `session`.
    pub fn attach_command(&self, session: &str) -> Vec<String> {
        attach_args(&self.binary, session, std::env::var_os("TMUX").is_some())
    }

    pub fn ssh_command(&self, host: &Host) -> SshInvocation {
        let mut argv = Vec::new();
        let mut env = Vec::new();

        if let AuthKind::Password {
            password: Some(password),
        } = &host.auth
        {
            if !password.is_empty() {
                argv.push(self.sshpass_binary.clone());
                argv.push("-e".into());
                env.push(("SSHPASS".to_string(), password.clone()));
            }
        }

        argv.push(self.ssh_binary.clone());
        argv.push("-p".into());
        argv.push(host.port.to_string());
        if let AuthKind::Key {
            identity: Some(identity),
        } = &host.auth
        {
            if !identity.is_empty() {
                argv.push("-i".into());
                argv.push(identity.clone());
            }
        }
        argv.push(host.destination());

        SshInvocation { argv, env }
    }

    async fn output<S: AsRef<str>>(&self, args: &[S]) -> Result<std::process::Output, TmuxError> {
        let argv: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let command = argv.first().copied().unwrap_or_default().to_string();
        debug!(binary = %self.binary, %command, "tmux");

        let mut cmd = Command::new(&self.binary);
        cmd.args(&argv).stdin(Stdio::null()).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => Err(TmuxError::Timeout {
                command,
                timeout_ms: self.timeout.as_millis(),
            }),
            Ok(Err(source)) => Err(TmuxError::Spawn {
                binary: self.binary.clone(),
                source,
            }),
            Ok(Ok(out)) => Ok(out),
        }
    }

    async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String, TmuxError> {
        let out = self.output(args).await?;
        if !out.status.success() {
            let command = args.first().map(|a| a.as_ref()).unwrap_or_default();
            return Err(TmuxError::Failed {
                command: command.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

fn push_env(args: &mut Vec<String>, ssh: &SshInvocation) {
    for (key, value) in &ssh.env {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
}

fn attach_args(binary: &str, session: &str, inside_tmux: bool) -> Vec<String> {
    let verb = if inside_tmux {
        "switch-client"
    } else {
        "attach-session"
    };
    vec![
        binary.to_string(),
        verb.to_string(),
        "-t".to_string(),
        format!("={session}"),
    ]
}

fn parse_lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Quote `arg` for `sh`; plain words are left alone.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tmux() -> Tmux {
        Tmux::new(&Config::default())
    }

    #[test]
    fn ssh_with_key_and_user() {
        let mut host = Host::new("web", "web.example.org");
        host.port = 2222;
        host.user = Some("deploy".into());
        host.auth = AuthKind::Key {
            identity: Some("~/.ssh/id_web".into()),
        };
        let ssh = tmux().ssh_command(&host);
        assert_eq!(
            ssh.argv,
            vec!["ssh", "-p", "2222", "-i", "~/.ssh/id_web", "deploy@web.example.org"]
        );
        assert!(ssh.env.is_empty());
        assert_eq!(ssh.shell_line(), "ssh -p 2222 -i '~/.ssh/id_web' deploy@web.example.org");
    }

    #[test]
    fn ssh_with_stored_password_goes_through_sshpass() {
        let mut host = Host::new("db", "10.0.0.5");
        host.auth = AuthKind::Password {
            password: Some("s3cr'et".into()),
        };
        let ssh = tmux().ssh_command(&host);
        assert_eq!(ssh.argv, vec!["sshpass", "-e", "ssh", "-p", "22", "10.0.0.5"]);
        assert_eq!(ssh.env, vec![("SSHPASS".to_string(), "s3cr'et".to_string())]);

        let mut args = Vec::new();
        push_env(&mut args, &ssh);
        assert_eq!(args, vec!["-e", "SSHPASS=s3cr'et"]);
    }

    #[test]
    fn password_auth_without_password_prompts() {
        let mut host = Host::new("db", "db");
        host.auth = AuthKind::Password { password: None };
        assert_eq!(tmux().ssh_command(&host).argv, vec!["ssh", "-p", "22", "db"]);

        host.auth = AuthKind::Agent;
        assert_eq!(tmux().ssh_command(&host).argv, vec!["ssh", "-p", "22", "db"]);
    }

    #[test]
    fn quoting() {
        assert_eq!(shell_quote("plain-word_1.2"), "plain-word_1.2");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn attach_inside_and_outside_tmux() {
        assert_eq!(
            attach_args("tmux", "work", false),
            vec!["tmux", "attach-session", "-t", "=work"]
        );
        assert_eq!(
            attach_args("tmux", "work", true),
            vec!["tmux", "switch-client", "-t", "=work"]
        );
    }

    #[test]
    fn window_list_parsing() {
        assert_eq!(parse_lines("bash\n web \n\n"), vec!["bash", "web"]);
    }

    #[test]
    fn open_target_options() {
        assert_eq!(OpenTarget::VARIANTS, &["window", "session"]);
        assert_eq!("session".parse::<OpenTarget>().unwrap(), OpenTarget::Session);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_drives_has_session() {
        let mut config = Config::default();
        config.tmux_binary = "true".into();
        assert!(Tmux::new(&config).has_session("x").await.unwrap());

        config.tmux_binary = "false".into();
        assert!(!Tmux::new(&config).has_session("x").await.unwrap());
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let mut config = Config::default();
        config.tmux_binary = "/nonexistent/hostdeck-tmux".into();
        let err = Tmux::new(&config).has_session("x").await.unwrap_err();
        assert!(matches!(err, TmuxError::Spawn { .. }));
    }

    #[tokio::test]
    async fn empty_profile_is_rejected_before_tmux_runs() {
        let mut config = Config::default();
        config.tmux_binary = "/nonexistent/hostdeck-tmux".into();
        let err = Tmux::new(&config)
            .open_group("s", "w", "empty", &[], Layout::Tiled, OpenTarget::Window)
            .await
            .unwrap_err();
        assert!(matches!(err, TmuxError::NoHosts(name) if name == "empty"));
    }
}
