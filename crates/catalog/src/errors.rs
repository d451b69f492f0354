use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("host `{0}` already exists")]
    DuplicateHost(String),

    #[error("profile `{0}` already exists")]
    DuplicateGroup(String),

    #[error("unknown host `{0}`")]
    UnknownHost(String),

    #[error("unknown profile `{0}`")]
    UnknownGroup(String),

    #[error("host `{host}` is already in profile `{group}`")]
    AlreadyMember { host: String, group: String },

    #[error("host `{host}` is not in profile `{group}`")]
    NotMember { host: String, group: String },

    #[error("unsupported bundle version {0}")]
    UnsupportedVersion(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("toml error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
