//! Form engine behind every hostdeck dialog.
//!
//! - `field` / `schema`: declarative description of a dialog (fields, actions, mode)
//! - `visibility`: which fields are currently shown, from sibling values
//! - `focus`: cyclic navigation over visible fields and trailing buttons
//! - `validation`: error taxonomy and the per-field check
//! - `controller`: `Form<C>`, the registry plus submit/cancel protocol
//! - `popup` / `render`: the `Component` adapter and its drawing
mod controller;
mod field;
mod focus;
mod popup;
mod render;
mod schema;
mod validation;
pub mod visibility;

pub use controller::{CancelFn, Commit, Form, FormPhase, SubmitFn, SubmitOutcome};
pub use field::{FieldValues, FormField, FormFieldKind};
pub use focus::{FocusSequencer, FocusTarget};
pub use popup::FormPopup;
pub use schema::{BrowseHandler, FormAction, FormSchema, ValidationMode};
pub use validation::{FormError, FormErrors};
