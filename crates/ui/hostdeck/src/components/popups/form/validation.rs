use std::fmt;

use thiserror::Error;

use super::{FieldValues, FormField, FormFieldKind};

/// Everything that can go wrong while editing or submitting a form.
///
/// `UnknownField`, `DuplicateField` and option mismatches found while building
/// a form are wiring defects; the rest are user-facing and are shown next to
/// the offending field (or at the top of the form when not field-scoped).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{0}` is declared twice")]
    DuplicateField(String),

    #[error("`{value}` is not a valid choice")]
    InvalidOption { field: String, value: String },

    #[error("{label} is required")]
    RequiredFieldEmpty { field: String, label: String },

    #[error("{message}")]
    CustomValidationFailed { field: String, message: String },

    #[error("{message}")]
    CommitFailed { message: String },

    #[error("an operation is still in progress")]
    Busy,

    #[error("form is closed")]
    Closed,
}

impl FormError {
    /// The field this error belongs to, if it is field-scoped.
    pub fn field(&self) -> Option<&str> {
        match self {
            FormError::UnknownField(field) | FormError::DuplicateField(field) => Some(field),
            FormError::InvalidOption { field, .. }
            | FormError::RequiredFieldEmpty { field, .. }
            | FormError::CustomValidationFailed { field, .. } => Some(field),
            FormError::CommitFailed { .. } | FormError::Busy | FormError::Closed => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Non-empty list of errors in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormErrors(Vec<FormError>);

impl FormErrors {
    pub fn new(first: FormError) -> Self {
        Self(vec![first])
    }

    /// `None` when `errors` is empty.
    pub fn from_vec(errors: Vec<FormError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    /// The first-error-wins answer.
    pub fn first(&self) -> &FormError {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormError> {
        self.0.iter()
    }

    pub fn for_field(&self, key: &str) -> Option<&FormError> {
        self.0.iter().find(|e| e.field() == Some(key))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<FormError> {
        self.0
    }
}

impl From<FormError> for FormErrors {
    fn from(err: FormError) -> Self {
        FormErrors::new(err)
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// Required check, option check, then the field's own validator, against
/// `candidate` (which need not be the stored value).
pub(super) fn check(
    field: &FormField,
    candidate: &str,
    values: &FieldValues,
) -> Result<(), FormError> {
    if field.required && candidate.trim().is_empty() {
        return Err(FormError::RequiredFieldEmpty {
            field: field.key.clone(),
            label: field.label.clone(),
        });
    }
    if let FormFieldKind::Select { options } = &field.kind {
        if !options.iter().any(|o| o == candidate) {
            return Err(FormError::InvalidOption {
                field: field.key.clone(),
                value: candidate.to_string(),
            });
        }
    }
    field
        .run_validator(candidate, values)
        .map_err(|message| FormError::CustomValidationFailed {
            field: field.key.clone(),
            message,
        })
}
