//! Field definitions: `FormFieldKind` and the declarative `FormField` builder.
//!
//! A field carries everything the controller needs to treat it without
//! per-dialog code: its kind, requiredness, default value, validator (with the
//! sibling fields the validator reads), visibility predicate (with the
//! sibling fields it reads) and an optional change hook.

use std::collections::HashMap;

/// Current values of all fields of a form, keyed by field key.
pub type FieldValues = HashMap<String, String>;

pub type Validator = Box<dyn Fn(&str, &FieldValues) -> Result<(), String> + Send + Sync>;
pub type VisibilityPredicate = Box<dyn Fn(&FieldValues) -> bool + Send + Sync>;
pub type ChangeHook = Box<dyn FnMut(&str) + Send>;

/// The kinds of input a dialog can ask for.
///
/// - Text/Secret render as single-line editors (Secret draws its value masked)
/// - Select cycles between its options; the stored value is the option label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormFieldKind {
    Text,
    Secret,
    Select { options: Vec<String> },
}

impl FormFieldKind {
    pub fn select<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FormFieldKind::Select {
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

pub(super) struct Visibility {
    pub(super) depends_on: Vec<String>,
    pub(super) predicate: VisibilityPredicate,
}

/// Declarative description of a form field.
pub struct FormField {
    pub key: String,
    pub label: String,
    pub kind: FormFieldKind,
    pub help: Option<String>,
    pub required: bool,
    pub default: Option<String>,
    validator: Option<Validator>,
    validator_deps: Vec<String>,
    visibility: Option<Visibility>,
    on_change: Option<ChangeHook>,
}

impl FormField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FormFieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            help: None,
            required: false,
            default: None,
            validator: None,
            validator_deps: Vec::new(),
            visibility: None,
            on_change: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// An empty (or whitespace-only) value is an error, before any custom validator runs.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(move |value, _| f(value)));
        self.validator_deps.clear();
        self
    }

    /// Validator that also reads sibling values. In immediate mode it re-runs
    /// whenever one of `depends_on` changes.
    pub fn validator_with<I, S, F>(mut self, depends_on: I, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &FieldValues) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(f));
        self.validator_deps = depends_on.into_iter().map(Into::into).collect();
        self
    }

    /// Visible iff `field` currently equals `equals`.
    pub fn visible_when(self, field: impl Into<String>, equals: impl Into<String>) -> Self {
        let field = field.into();
        let equals = equals.into();
        let key = field.clone();
        self.visible_if([field], move |values| {
            values.get(&key).map(String::as_str) == Some(equals.as_str())
        })
    }

    pub fn visible_if<I, S, F>(mut self, depends_on: I, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&FieldValues) -> bool + Send + Sync + 'static,
    {
        self.visibility = Some(Visibility {
            depends_on: depends_on.into_iter().map(Into::into).collect(),
            predicate: Box::new(f),
        });
        self
    }

    /// Called synchronously after every successful `set_value` on this field.
    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn is_textual(&self) -> bool {
        matches!(self.kind, FormFieldKind::Text | FormFieldKind::Secret)
    }

    pub fn is_secret(&self) -> bool {
        matches!(self.kind, FormFieldKind::Secret)
    }

    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            FormFieldKind::Select { options } => Some(options),
            _ => None,
        }
    }

    /// Value before any input: the default, else the first option of a
    /// select, else the empty string.
    pub fn initial_value(&self) -> String {
        if let Some(default) = &self.default {
            return default.clone();
        }
        self.options()
            .and_then(|o| o.first().cloned())
            .unwrap_or_default()
    }

    /// Sibling fields read by the validator.
    pub fn validator_deps(&self) -> &[String] {
        &self.validator_deps
    }

    /// Sibling fields read by the visibility predicate.
    pub fn visibility_deps(&self) -> &[String] {
        self.visibility
            .as_ref()
            .map(|v| v.depends_on.as_slice())
            .unwrap_or(&[])
    }

    pub(super) fn run_validator(&self, value: &str, values: &FieldValues) -> Result<(), String> {
        match &self.validator {
            Some(validate) => validate(value, values),
            None => Ok(()),
        }
    }

    pub(super) fn is_visible(&self, values: &FieldValues) -> bool {
        match &self.visibility {
            Some(v) => (v.predicate)(values),
            None => true,
        }
    }

    pub(super) fn notify_change(&mut self, value: &str) {
        if let Some(hook) = self.on_change.as_mut() {
            hook(value);
        }
    }
}

impl std::fmt::Debug for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validator_deps", &self.validator_deps)
            .field("visibility_deps", &self.visibility_deps())
            .finish_non_exhaustive()
    }
}
