//! Host catalog: SSH hosts, profiles grouping them, and their on-disk forms.
//!
//! - `Catalog` is the in-memory model with all mutating operations.
//! - `CatalogStore` persists it as TOML (atomic write under an advisory lock).
//! - `Bundle` is the JSON import/export format.

mod bundle;
mod catalog;
mod errors;
mod model;
mod store;

pub use bundle::{BUNDLE_VERSION, Bundle, ImportMode, ImportSummary};
pub use catalog::Catalog;
pub use errors::CatalogError;
pub use model::{AuthKind, AuthMethod, Group, Host, Layout, DEFAULT_SSH_PORT};
pub use store::{CatalogStore, write_atomic};
