use paths::PathContext;
use std::marker::PhantomData;
#[cfg(debug_assertions)]
use std::path::PathBuf;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application infrastructure context.
///
/// Contains path management, version info, and logging infrastructure.
pub struct AppContext {
    pub path_context: PathContext,
    pub version: &'static str,
    /// The log guard must be kept alive for the duration of the application
    /// to ensure log messages are properly flushed.
    _log_guard: tracing_appender::non_blocking::WorkerGuard,
}

impl AppContext {
    pub fn app_id(&self) -> &str {
        self.path_context.app_id()
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn path_context(&self) -> &PathContext {
        &self.path_context
    }
}

/// Application metadata trait.
///
/// Define your application's identity by implementing this trait.
pub trait Application: Sized + 'static {
    const APP_ID: &'static str;
    const STUDIO: &'static str = "chicken105";
    const PROJECT_ID: &'static str = "hostdeck";

    /// Environment variable holding an `EnvFilter` directive (falls back to `RUST_LOG`).
    fn log_env() -> String {
        format!("{}_LOG", Self::APP_ID.to_uppercase())
    }
}

/// Builder for creating applications with proper initialization.
pub struct AppBuilder<A: Application> {
    context: AppContext,
    _marker: PhantomData<A>,
}

impl<A: Application> AppBuilder<A> {
    /// Create a new application builder.
    ///
    /// This performs all the common initialization:
    /// - Sets up path context (platform-specific directories)
    /// - Initializes file logging (the terminal belongs to the UI)
    /// - Ensures all directories exist
    pub fn new(version: &'static str) -> Result<Self, BoxError> {
        let app_id = A::APP_ID;
        let studio = A::STUDIO;
        let project_id = A::PROJECT_ID;

        #[cfg(debug_assertions)]
        let path_context = match PathContext::home_override(app_id) {
            Some(_) => PathContext::new(studio, project_id, app_id),
            None => PathContext::with_base_path(
                PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                    .join("..")
                    .join("..")
                    .join(".out"),
                studio,
                project_id,
                app_id,
            ),
        };
        #[cfg(not(debug_assertions))]
        let path_context = PathContext::new(studio, project_id, app_id);

        path_context.ensure_directories()?;

        let log_dir = path_context.logs_dir();
        let log_file_path = path_context.log_file_now();
        let log_filename = log_file_path
            .file_name()
            .ok_or("log file path has no file name")?;

        let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let filter = env_filter(&A::log_env(), default_level());

        let file_layer = fmt::Layer::default()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(ErrorLayer::default())
            .try_init()?;

        tracing::info!(
            app = app_id,
            version,
            root = %path_context.project_root().display(),
            "logging initialised"
        );

        Ok(Self {
            context: AppContext {
                path_context,
                version,
                _log_guard: guard,
            },
            _marker: PhantomData,
        })
    }

    /// Finish building and hand out the context.
    pub fn build(self) -> AppContext {
        self.context
    }
}

fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

/// Filter from `var`, then `RUST_LOG`, then `fallback`.
fn env_filter(var: &str, fallback: LevelFilter) -> EnvFilter {
    let directive = std::env::var(var)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .ok();
    parse_filter(directive.as_deref(), fallback)
}

fn parse_filter(directive: Option<&str>, fallback: LevelFilter) -> EnvFilter {
    match directive.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directive) => EnvFilter::builder()
            .with_default_directive(fallback.into())
            .parse(directive)
            .unwrap_or_else(|_| EnvFilter::default().add_directive(fallback.into())),
        None => EnvFilter::default().add_directive(fallback.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Demo;

    impl Application for Demo {
        const APP_ID: &'static str = "hostdeck";
    }

    #[test]
    fn log_env_is_derived_from_app_id() {
        assert_eq!(Demo::log_env(), "HOSTDECK_LOG");
    }

    #[test]
    fn empty_directive_falls_back_to_level() {
        let filter = parse_filter(Some("  "), LevelFilter::WARN);
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn directive_is_parsed() {
        let filter = parse_filter(Some("catalog=trace"), LevelFilter::WARN);
        assert!(filter.to_string().contains("catalog=trace"));
    }
}
