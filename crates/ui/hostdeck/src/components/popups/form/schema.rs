//! Form schema: the ordered fields of a dialog plus presentation metadata
//! (title, description, sizing hints), the trailing action buttons and the
//! validation mode.
//!
//! ```ignore
//! use crate::components::popups::form::{FormSchema, FormField, FormFieldKind};
//!
//! let schema = FormSchema::new("Add host", vec![
//!     FormField::new("name", "Name", FormFieldKind::Text).required(),
//!     FormField::new("port", "Port", FormFieldKind::Text)
//!         .default_value("22")
//!         .validator(|v| v.parse::<u16>()
//!             .map(|_| ()).map_err(|_| "Must be a valid port".into())),
//! ]).description("Register a new SSH host");
//! ```
use strum::Display;

use super::FormField;

/// Action buttons trailing the fields, always in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FormAction {
    Browse,
    Submit,
    Cancel,
}

impl FormAction {
    pub const ORDER: [FormAction; 3] = [FormAction::Browse, FormAction::Submit, FormAction::Cancel];
}

/// When field validators run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Only `submit`/`collect`/`validate_all` validate.
    #[default]
    OnSubmitOnly,
    /// Every `set_value` re-validates the field and the fields depending on it.
    Immediate,
}

pub type BrowseFn = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The `Browse` button: computes a new value for `target` from its current one.
pub struct BrowseHandler {
    pub target: String,
    pub(super) handler: BrowseFn,
}

impl BrowseHandler {
    pub fn run(&self, current: &str) -> Option<String> {
        (self.handler)(current)
    }
}

/// Declarative schema for a multi-field form.
pub struct FormSchema {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    pub submit_label: String,
    pub validation_mode: ValidationMode,
    pub browse: Option<BrowseHandler>,
    pub min_width: u16,
    pub min_height: u16,
}

impl FormSchema {
    /// Create a new schema with default sizing (width=60, height=16) and no description.
    pub fn new(title: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields,
            submit_label: FormAction::Submit.to_string(),
            validation_mode: ValidationMode::default(),
            browse: None,
            min_width: 60,
            min_height: 16,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Override minimum size hints (clamped to sensible lower bounds).
    pub fn min_size(mut self, w: u16, h: u16) -> Self {
        self.min_width = w.max(40);
        self.min_height = h.max(10);
        self
    }

    pub fn submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    pub fn validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = mode;
        self
    }

    /// Add a `Browse` button that rewrites `target` through `handler`.
    pub fn browse<F>(mut self, target: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.browse = Some(BrowseHandler {
            target: target.into(),
            handler: Box::new(handler),
        });
        self
    }

    /// Action buttons of this form in display order.
    pub fn actions(&self) -> Vec<FormAction> {
        FormAction::ORDER
            .into_iter()
            .filter(|a| *a != FormAction::Browse || self.browse.is_some())
            .collect()
    }

    pub fn field_by_key(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub(super) fn field_by_key_mut(&mut self, key: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|f| f.key == key)
    }
}
