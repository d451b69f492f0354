use std::{collections::HashMap, path::Path, path::PathBuf, time::Duration};

use config::{ConfigError, Environment, File, FileFormat};
use paths::PathContext;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::components::popups::form::ValidationMode;

pub const ENV_PREFIX: &str = "HOSTDECK";

/// When dialogs validate their fields.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSetting {
    #[default]
    OnSubmit,
    Immediate,
}

impl From<ValidationSetting> for ValidationMode {
    fn from(value: ValidationSetting) -> Self {
        match value {
            ValidationSetting::OnSubmit => ValidationMode::OnSubmitOnly,
            ValidationSetting::Immediate => ValidationMode::Immediate,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub session_name: String,
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
    pub tmux_binary: String,
    pub ssh_binary: String,
    pub sshpass_binary: String,
    pub command_timeout_ms: u64,
    pub tick_rate: f64,
    pub frame_rate: f64,
    #[serde(default)]
    pub validation_mode: ValidationSetting,
}

impl Config {
    /// Defaults, then `config.json5`/`config.toml` from the config dir, then
    /// `HOSTDECK_*` environment variables.
    pub fn load(paths: &PathContext) -> Result<Self, ConfigError> {
        Self::load_from(&paths.config_dir(), None)
    }

    /// `env` replaces the process environment when given.
    pub fn load_from(
        config_dir: &Path,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("session_name", "hostdeck")?
            .set_default("tmux_binary", "tmux")?
            .set_default("ssh_binary", "ssh")?
            .set_default("sshpass_binary", "sshpass")?
            .set_default("command_timeout_ms", 5_000)?
            .set_default("tick_rate", 4.0)?
            .set_default("frame_rate", 30.0)?
            .set_default("validation_mode", "on_submit")?;

        let config_files = [
            ("config.json5", FileFormat::Json5),
            ("config.toml", FileFormat::Toml),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            let path = config_dir.join(file);
            if path.exists() {
                found_config = true;
            }
            builder = builder.add_source(File::from(path).format(*format).required(false));
        }
        if !found_config {
            debug!(dir = %config_dir.display(), "no configuration file, using defaults");
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.tick_rate <= 0.0 || cfg.frame_rate <= 0.0 {
            warn!(
                tick_rate = cfg.tick_rate,
                frame_rate = cfg.frame_rate,
                "non-positive rate configured"
            );
            return Err(ConfigError::Message(
                "tick_rate and frame_rate must be positive".into(),
            ));
        }
        Ok(cfg)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    pub fn catalog_path(&self, paths: &PathContext) -> PathBuf {
        self.catalog_file
            .clone()
            .unwrap_or_else(|| paths.catalog_file())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_name: "hostdeck".into(),
            catalog_file: None,
            tmux_binary: "tmux".into(),
            ssh_binary: "ssh".into(),
            sshpass_binary: "sshpass".into(),
            command_timeout_ms: 5_000,
            tick_rate: 4.0,
            frame_rate: 30.0,
            validation_mode: ValidationSetting::OnSubmit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files_or_env() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_from(dir.path(), Some(HashMap::new())).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn file_then_env_layering() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "session_name = \"work\"\ncommand_timeout_ms = 900\nvalidation_mode = \"immediate\"\n",
        )
        .unwrap();

        let env = HashMap::from([
            ("HOSTDECK_COMMAND_TIMEOUT_MS".to_string(), "1500".to_string()),
            ("HOSTDECK_TMUX_BINARY".to_string(), "/opt/bin/tmux".to_string()),
        ]);
        let cfg = Config::load_from(dir.path(), Some(env)).unwrap();
        assert_eq!(cfg.session_name, "work");
        assert_eq!(cfg.command_timeout_ms, 1500);
        assert_eq!(cfg.tmux_binary, "/opt/bin/tmux");
        assert_eq!(cfg.validation_mode, ValidationSetting::Immediate);
        assert_eq!(
            ValidationMode::from(cfg.validation_mode),
            ValidationMode::Immediate
        );
    }

    #[test]
    fn json5_file_is_read() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json5"),
            "{ // comments are fine\n  session_name: 'ops', tick_rate: 2.0 }",
        )
        .unwrap();
        let cfg = Config::load_from(dir.path(), Some(HashMap::new())).unwrap();
        assert_eq!(cfg.session_name, "ops");
        assert_eq!(cfg.tick_rate, 2.0);
    }

    #[test]
    fn unknown_validation_mode_is_rejected() {
        let dir = TempDir::new().unwrap();
        let env = HashMap::from([(
            "HOSTDECK_VALIDATION_MODE".to_string(),
            "sometimes".to_string(),
        )]);
        assert!(Config::load_from(dir.path(), Some(env)).is_err());
    }

    #[test]
    fn catalog_file_override() {
        let dir = TempDir::new().unwrap();
        let ctx = PathContext::with_base_path(dir.path().to_path_buf(), "chicken105", "hostdeck", "hostdeck");
        let mut cfg = Config::default();
        assert_eq!(cfg.catalog_path(&ctx), ctx.catalog_file());
        cfg.catalog_file = Some(PathBuf::from("/srv/hosts.toml"));
        assert_eq!(cfg.catalog_path(&ctx), PathBuf::from("/srv/hosts.toml"));
    }
}
