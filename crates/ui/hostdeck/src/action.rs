use strum::Display;

use crate::app::task_manager::TaskId;

/// Dialogs the pages can ask the app to open.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Dialog {
    AddHost,
    EditHost(String),
    DeleteHost(String),
    NewProfile,
    EditProfile(String),
    DeleteProfile(String),
    Assign { host: Option<String> },
    Unassign { profile: Option<String> },
    Import,
    Export { profile: Option<String> },
    Connect(ConnectTarget),
}

/// What a connect dialog opens: a single host or every host of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConnectTarget {
    Host(String),
    Profile(String),
}

impl ConnectTarget {
    pub fn name(&self) -> &str {
        match self {
            ConnectTarget::Host(name) | ConnectTarget::Profile(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    Refresh,
    Error(String),
    Notify(String),
    Navigate(usize),
    Update,
    Open(Dialog),
    ClosePopup,
    RemoveHost(String),
    RemoveProfile(String),
    /// Quit and attach to this tmux session once the terminal is restored.
    Attach(String),
    /// A background operation finished; `Ok` carries the tmux session it opened.
    TaskFinished {
        id: TaskId,
        result: Result<String, String>,
    },
}
