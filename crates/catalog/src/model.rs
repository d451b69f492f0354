use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

pub const DEFAULT_SSH_PORT: u16 = 22;

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// How ssh authenticates against a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum AuthKind {
    Key {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<String>,
    },
    Password {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    Agent,
}

impl Default for AuthKind {
    fn default() -> Self {
        AuthKind::Key { identity: None }
    }
}

impl AuthKind {
    pub fn method(&self) -> AuthMethod {
        match self {
            AuthKind::Key { .. } => AuthMethod::Key,
            AuthKind::Password { .. } => AuthMethod::Password,
            AuthKind::Agent => AuthMethod::Agent,
        }
    }
}

/// Discriminant of [`AuthKind`], used for selection lists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Key,
    Password,
    Agent,
}

/// tmux layout applied to a profile's panes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Layout {
    #[default]
    Tiled,
    EvenHorizontal,
    EvenVertical,
    MainHorizontal,
    MainVertical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub auth: AuthKind,
}

impl Host {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            port: DEFAULT_SSH_PORT,
            user: None,
            auth: AuthKind::default(),
        }
    }

    /// `user@hostname`, or just the hostname when no user is set.
    pub fn destination(&self) -> String {
        match self.user.as_deref() {
            Some(user) if !user.is_empty() => format!("{user}@{}", self.hostname),
            _ => self.hostname.clone(),
        }
    }
}

/// A named set of hosts opened together ("profile").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            layout: Layout::default(),
            hosts: Vec::new(),
        }
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
    }
}
