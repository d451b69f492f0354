use std::path::PathBuf;

use catalog::CatalogStore;

use crate::{
    app::task_manager::{TaskId, TaskManagerHandle},
    config::Config,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// One-line message shown in the footer until the next one replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

/// State shared by pages and popups. Dialog commits run against it.
pub struct AppState {
    pub config: Config,
    pub store: CatalogStore,
    pub tasks: TaskManagerHandle,
    pub status: Option<Status>,
    /// tmux session to attach once the TUI is torn down.
    pub attach: Option<String>,
    /// Where import/export dialogs start looking.
    pub exports_dir: PathBuf,
    next_task: TaskId,
}

impl AppState {
    pub fn new(config: Config, store: CatalogStore, tasks: TaskManagerHandle) -> Self {
        let exports_dir = store
            .path()
            .parent()
            .map(|p| p.join("exports"))
            .unwrap_or_else(|| PathBuf::from("exports"));
        Self {
            config,
            store,
            tasks,
            status: None,
            attach: None,
            exports_dir,
            next_task: 1,
        }
    }

    pub fn with_exports_dir(mut self, dir: PathBuf) -> Self {
        self.exports_dir = dir;
        self
    }

    pub fn next_task_id(&mut self) -> TaskId {
        let id = self.next_task;
        self.next_task += 1;
        id
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.status = Some(Status {
            level: StatusLevel::Info,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.status = Some(Status {
            level: StatusLevel::Error,
            message: message.into(),
        });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use catalog::{Catalog, CatalogStore, Group, Host};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::AppState;
    use crate::{
        app::task_manager::{TaskCommand, TaskManagerHandle},
        config::Config,
    };

    /// Empty catalog in a fresh temp dir, removed with the returned guard;
    /// the task channel goes nowhere.
    pub(crate) fn test_state() -> (AppState, TempDir) {
        let (state, dir, _rx) = state_with(Catalog::new());
        (state, dir)
    }

    /// Two hosts (`web`, `db`) and a profile `prod` holding `web`.
    pub(crate) fn seeded_state() -> (AppState, TempDir) {
        let (state, dir, _rx) = seeded_state_with_tasks();
        (state, dir)
    }

    /// Like `seeded_state`, keeping the receiving end of the task channel.
    pub(crate) fn seeded_state_with_tasks()
    -> (AppState, TempDir, UnboundedReceiver<TaskCommand>) {
        let mut catalog = Catalog::new();
        catalog.add_host(Host::new("web", "web.example.org")).unwrap();
        catalog.add_host(Host::new("db", "10.0.0.5")).unwrap();
        catalog.add_group(Group::new("prod")).unwrap();
        catalog.assign("web", "prod").unwrap();
        state_with(catalog)
    }

    fn state_with(catalog: Catalog) -> (AppState, TempDir, UnboundedReceiver<TaskCommand>) {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::with_catalog(dir.path().join("catalog.toml"), catalog);
        let (tasks, rx) = TaskManagerHandle::detached();
        (AppState::new(Config::default(), store, tasks), dir, rx)
    }
}
