//! Form controller: owns the field registry, the current values, the focus
//! sequence and the submit/cancel protocol of one dialog instance.
//!
//! Lifecycle: `Editing` -> (`submit`) -> `Submitting` -> `Editing` again with
//! errors attached, or `Closed` once the commit succeeded. `cancel` closes from
//! any open phase without validating. `Closed` is terminal.
//!
//! The commit callback is the only path by which collected values leave the
//! form. It runs against a caller-supplied context `C` (the application state
//! in the TUI) and may either finish synchronously (`Commit::Done`) or hand the
//! work to a background operation (`Commit::Pending`), in which case the form
//! stays in `Submitting` until `finish_pending` is called with the outcome.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::validation::check;
use super::{
    FieldValues, FocusSequencer, FocusTarget, FormAction, FormError, FormErrors, FormField,
    FormSchema, ValidationMode, visibility,
};

/// What the commit callback did with the collected values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Side effect applied, the form may close.
    Done,
    /// Side effect started in the background; `ticket` correlates the
    /// later `finish_pending` call.
    Pending { label: String, ticket: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Editing,
    Submitting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Closed,
    Pending,
}

pub type SubmitFn<C> = Box<dyn FnMut(&FieldValues, &mut C) -> Result<Commit, String> + Send>;
pub type CancelFn<C> = Box<dyn FnMut(&mut C) + Send>;

pub struct Form<C> {
    schema: FormSchema,
    values: FieldValues,
    visible: HashMap<String, bool>,
    field_errors: HashMap<String, FormError>,
    form_errors: Vec<FormError>,
    focus: FocusSequencer,
    phase: FormPhase,
    pending_ticket: Option<u64>,
    in_progress: Option<String>,
    on_submit: SubmitFn<C>,
    on_cancel: CancelFn<C>,
    liveness: CancellationToken,
}

impl<C> Form<C> {
    /// Build a form around `schema`.
    ///
    /// Wiring is checked up front: duplicate keys, dependencies on fields that
    /// do not exist, a browse target that does not exist and select defaults
    /// outside their option list are all rejected.
    pub fn new<S, X>(schema: FormSchema, on_submit: S, on_cancel: X) -> Result<Self, FormError>
    where
        S: FnMut(&FieldValues, &mut C) -> Result<Commit, String> + Send + 'static,
        X: FnMut(&mut C) + Send + 'static,
    {
        check_wiring(&schema)?;

        let values: FieldValues = schema
            .fields
            .iter()
            .map(|f| (f.key.clone(), f.initial_value()))
            .collect();
        let visible = visibility::resolve(&schema.fields, &values);

        let mut form = Self {
            schema,
            values,
            visible,
            field_errors: HashMap::new(),
            form_errors: Vec::new(),
            focus: FocusSequencer::default(),
            phase: FormPhase::Editing,
            pending_ticket: None,
            in_progress: None,
            on_submit: Box::new(on_submit),
            on_cancel: Box::new(on_cancel),
            liveness: CancellationToken::new(),
        };
        form.focus = FocusSequencer::new(form.navigation_sequence());
        Ok(form)
    }

    /// Use `token` as this form's liveness token (so a commit callback can
    /// hand child tokens to background work before the form exists).
    pub fn with_liveness(mut self, token: CancellationToken) -> Self {
        self.liveness = token;
        self
    }

    /// Pre-populate values (edit dialogs). Goes through the same option
    /// checks as `set_value` but runs neither validators nor change hooks.
    pub fn with_values<I, K, V>(mut self, values: I) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in values {
            let key = key.into();
            let value = value.into();
            let field = self
                .schema
                .field_by_key(&key)
                .ok_or_else(|| FormError::UnknownField(key.clone()))?;
            ensure_option(field, &value)?;
            self.values.insert(key, value);
        }
        self.refresh_visibility();
        self.focus = FocusSequencer::new(self.navigation_sequence());
        Ok(self)
    }

    // --- Registry -------------------------------------------------------------------------------

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn field(&self, name: &str) -> Result<&FormField, FormError> {
        self.schema
            .field_by_key(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// Stored value, also for hidden fields.
    pub fn value(&self, name: &str) -> Result<&str, FormError> {
        self.field(name)?;
        Ok(self.values.get(name).map(String::as_str).unwrap_or(""))
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn is_visible(&self, name: &str) -> Result<bool, FormError> {
        self.field(name)?;
        Ok(self.visible.get(name).copied().unwrap_or(true))
    }

    /// Visible fields in declaration order.
    pub fn visible_fields(&self) -> impl Iterator<Item = &FormField> {
        self.schema
            .fields
            .iter()
            .filter(|f| self.visible.get(&f.key).copied().unwrap_or(true))
    }

    /// Store `value` for `name`.
    ///
    /// Afterwards visibility is re-resolved (which may reshape the focus
    /// sequence), immediate-mode validation runs for the field and for the
    /// fields whose validator reads it, and the field's change hook fires.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        self.ensure_editing()?;
        let value = value.into();
        let field = self.field(name)?;
        ensure_option(field, &value)?;

        trace!(field = name, "set value");
        self.values.insert(name.to_string(), value.clone());
        self.refresh_visibility();

        match self.schema.validation_mode {
            ValidationMode::Immediate => {
                let affected: Vec<String> = self
                    .schema
                    .fields
                    .iter()
                    .filter(|f| f.key == name || f.validator_deps().iter().any(|d| d == name))
                    .map(|f| f.key.clone())
                    .collect();
                for key in affected {
                    self.revalidate(&key);
                }
            }
            ValidationMode::OnSubmitOnly => {
                self.field_errors.remove(name);
            }
        }

        if let Some(field) = self.schema.field_by_key_mut(name) {
            field.notify_change(&value);
        }
        Ok(())
    }

    /// Cycle a select field forward, wrapping around.
    pub fn select_next(&mut self, name: &str) -> Result<(), FormError> {
        self.cycle_select(name, 1)
    }

    /// Cycle a select field backward, wrapping around.
    pub fn select_prev(&mut self, name: &str) -> Result<(), FormError> {
        self.cycle_select(name, -1)
    }

    fn cycle_select(&mut self, name: &str, dir: i64) -> Result<(), FormError> {
        let field = self.field(name)?;
        let Some(options) = field.options() else {
            return Ok(());
        };
        if options.is_empty() {
            return Ok(());
        }
        let current = self.values.get(name).map(String::as_str).unwrap_or("");
        let idx = options.iter().position(|o| o == current).unwrap_or(0) as i64;
        let next = (idx + dir).rem_euclid(options.len() as i64) as usize;
        let value = options[next].clone();
        self.set_value(name, value)
    }

    // --- Validation -----------------------------------------------------------------------------

    /// Validate `candidate` as if it were the value of `name`. Pure: stored
    /// values and recorded errors are left alone.
    pub fn validate_field(&self, name: &str, candidate: &str) -> Result<(), FormError> {
        let field = self.field(name)?;
        check(field, candidate, &self.values)
    }

    /// Validate every visible field against its stored value. All failures
    /// are reported, in field order. Hidden fields are skipped.
    pub fn validate_all(&self) -> Result<(), FormErrors> {
        let errors: Vec<FormError> = self
            .visible_fields()
            .filter_map(|f| {
                let value = self.values.get(&f.key).map(String::as_str).unwrap_or("");
                check(f, value, &self.values).err()
            })
            .collect();
        match FormErrors::from_vec(errors) {
            Some(errors) => Err(errors),
            None => Ok(()),
        }
    }

    /// `validate_all`, then a snapshot of every value (hidden ones included).
    pub fn collect(&self) -> Result<FieldValues, FormErrors> {
        self.validate_all()?;
        Ok(self.values.clone())
    }

    /// Error currently attached to `name`.
    pub fn field_error(&self, name: &str) -> Option<&FormError> {
        self.field_errors.get(name)
    }

    /// Errors not tied to a field (commit failures).
    pub fn form_errors(&self) -> &[FormError] {
        &self.form_errors
    }

    fn revalidate(&mut self, name: &str) {
        if !self.visible.get(name).copied().unwrap_or(true) {
            self.field_errors.remove(name);
            return;
        }
        let Some(field) = self.schema.field_by_key(name) else {
            return;
        };
        let value = self.values.get(name).map(String::as_str).unwrap_or("");
        match check(field, value, &self.values) {
            Ok(()) => {
                self.field_errors.remove(name);
            }
            Err(err) => {
                self.field_errors.insert(name.to_string(), err);
            }
        }
    }

    // --- Submit / cancel ------------------------------------------------------------------------

    /// Validate and, only if everything passes, hand the values to the commit
    /// callback. Any failure leaves the form open with the errors attached
    /// and nothing committed.
    pub fn submit(&mut self, ctx: &mut C) -> Result<SubmitOutcome, FormErrors> {
        self.ensure_editing()?;
        self.phase = FormPhase::Submitting;
        self.form_errors.clear();

        let values = match self.collect() {
            Ok(values) => values,
            Err(errors) => {
                self.field_errors = errors
                    .iter()
                    .filter_map(|e| e.field().map(|f| (f.to_string(), e.clone())))
                    .collect();
                self.phase = FormPhase::Editing;
                debug!(form = %self.schema.title, errors = errors.len(), "submit rejected");
                return Err(errors);
            }
        };
        self.field_errors.clear();

        match (self.on_submit)(&values, ctx) {
            Ok(Commit::Done) => {
                debug!(form = %self.schema.title, "submit committed");
                self.close();
                Ok(SubmitOutcome::Closed)
            }
            Ok(Commit::Pending { label, ticket }) => {
                debug!(form = %self.schema.title, ticket, "submit pending");
                self.pending_ticket = Some(ticket);
                self.in_progress = Some(label);
                Ok(SubmitOutcome::Pending)
            }
            Err(message) => {
                debug!(form = %self.schema.title, %message, "commit failed");
                self.phase = FormPhase::Editing;
                let err = FormError::CommitFailed { message };
                self.form_errors.push(err.clone());
                Err(err.into())
            }
        }
    }

    /// Resolve a pending commit. Completions for another ticket, or arriving
    /// after the form left `Submitting`, are ignored.
    pub fn finish_pending(
        &mut self,
        ticket: u64,
        result: Result<(), String>,
    ) -> Result<SubmitOutcome, FormErrors> {
        if self.phase == FormPhase::Closed {
            return Err(FormError::Closed.into());
        }
        if self.phase != FormPhase::Submitting || self.pending_ticket != Some(ticket) {
            debug!(form = %self.schema.title, ticket, "stale completion ignored");
            return Ok(SubmitOutcome::Pending);
        }

        self.pending_ticket = None;
        self.in_progress = None;
        match result {
            Ok(()) => {
                self.close();
                Ok(SubmitOutcome::Closed)
            }
            Err(message) => {
                self.phase = FormPhase::Editing;
                let err = FormError::CommitFailed { message };
                self.form_errors.push(err.clone());
                Err(err.into())
            }
        }
    }

    /// Close without validating. The cancel callback runs once; later calls
    /// are no-ops.
    pub fn cancel(&mut self, ctx: &mut C) {
        if self.phase == FormPhase::Closed {
            return;
        }
        (self.on_cancel)(ctx);
        debug!(form = %self.schema.title, "cancelled");
        self.close();
    }

    fn close(&mut self) {
        self.phase = FormPhase::Closed;
        self.pending_ticket = None;
        self.in_progress = None;
        self.liveness.cancel();
    }

    fn ensure_editing(&self) -> Result<(), FormError> {
        match self.phase {
            FormPhase::Editing => Ok(()),
            FormPhase::Submitting => Err(FormError::Busy),
            FormPhase::Closed => Err(FormError::Closed),
        }
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == FormPhase::Closed
    }

    /// Cancelled once the form closes or is dropped.
    pub fn liveness(&self) -> &CancellationToken {
        &self.liveness
    }

    // --- Operation-in-progress hook -------------------------------------------------------------

    pub fn set_in_progress(&mut self, label: Option<String>) {
        self.in_progress = label;
    }

    pub fn in_progress(&self) -> Option<&str> {
        self.in_progress.as_deref()
    }

    // --- Focus ----------------------------------------------------------------------------------

    pub fn focus_next(&mut self) -> bool {
        if self.phase != FormPhase::Editing {
            return false;
        }
        self.focus.next();
        true
    }

    pub fn focus_prev(&mut self) -> bool {
        if self.phase != FormPhase::Editing {
            return false;
        }
        self.focus.previous();
        true
    }

    pub fn focused(&self) -> Option<&FocusTarget> {
        self.focus.current()
    }

    /// Request focus on a specific element; false if it is not navigable.
    pub fn focus(&mut self, target: &FocusTarget) -> bool {
        self.focus.focus(target)
    }

    pub fn sequence(&self) -> &[FocusTarget] {
        self.focus.sequence()
    }

    pub fn focus_index(&self) -> usize {
        self.focus.index()
    }

    fn refresh_visibility(&mut self) {
        let visible = visibility::resolve(&self.schema.fields, &self.values);
        if visible == self.visible {
            return;
        }
        for (key, shown) in &visible {
            if !shown {
                self.field_errors.remove(key);
            }
        }
        self.visible = visible;
        let sequence = self.navigation_sequence();
        self.focus.recompute(sequence);
    }

    fn navigation_sequence(&self) -> Vec<FocusTarget> {
        self.visible_fields()
            .map(|f| FocusTarget::Field(f.key.clone()))
            .chain(self.schema.actions().into_iter().map(FocusTarget::Action))
            .collect()
    }

    /// Browse handler output for the `Browse` action, applied to its target.
    pub fn browse(&mut self) -> Result<bool, FormError> {
        let Some(browse) = self.schema.browse.as_ref() else {
            return Ok(false);
        };
        let target = browse.target.clone();
        let current = self.value(&target)?.to_string();
        match browse.run(&current) {
            Some(next) => {
                self.set_value(&target, next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn has_action(&self, action: FormAction) -> bool {
        self.schema.actions().contains(&action)
    }
}

impl<C> Drop for Form<C> {
    fn drop(&mut self) {
        self.liveness.cancel();
    }
}

fn ensure_option(field: &FormField, value: &str) -> Result<(), FormError> {
    match field.options() {
        Some(options) if !options.iter().any(|o| o == value) => Err(FormError::InvalidOption {
            field: field.key.clone(),
            value: value.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_wiring(schema: &FormSchema) -> Result<(), FormError> {
    let mut keys = HashSet::new();
    for field in &schema.fields {
        if !keys.insert(field.key.as_str()) {
            return Err(FormError::DuplicateField(field.key.clone()));
        }
    }
    for field in &schema.fields {
        for dep in field.validator_deps().iter().chain(field.visibility_deps()) {
            if !keys.contains(dep.as_str()) {
                return Err(FormError::UnknownField(dep.clone()));
            }
        }
        if field.options().is_some() {
            ensure_option(field, &field.initial_value())?;
        }
    }
    if let Some(browse) = &schema.browse {
        if !keys.contains(browse.target.as_str()) {
            return Err(FormError::UnknownField(browse.target.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::popups::form::FormFieldKind;
    use pretty_assertions::assert_eq;

    /// Records what the callbacks saw.
    #[derive(Default)]
    struct Recorder {
        committed: Vec<FieldValues>,
        cancelled: usize,
        reject_with: Option<String>,
        pending: bool,
    }

    fn recorder_form(schema: FormSchema) -> Form<Recorder> {
        Form::new(
            schema,
            |values: &FieldValues, rec: &mut Recorder| {
                if let Some(msg) = rec.reject_with.clone() {
                    return Err(msg);
                }
                rec.committed.push(values.clone());
                if rec.pending {
                    Ok(Commit::Pending {
                        label: "connecting".into(),
                        ticket: 7,
                    })
                } else {
                    Ok(Commit::Done)
                }
            },
            |rec: &mut Recorder| rec.cancelled += 1,
        )
        .expect("well-formed schema")
    }

    /// name (required text), kind (key/password, default key), secret (visible iff kind=password).
    fn scenario_schema() -> FormSchema {
        FormSchema::new(
            "Scenario",
            vec![
                FormField::new("name", "Name", FormFieldKind::Text).required(),
                FormField::new("kind", "Kind", FormFieldKind::select(["key", "password"]))
                    .default_value("key"),
                FormField::new("secret", "Secret", FormFieldKind::Secret)
                    .visible_when("kind", "password"),
            ],
        )
    }

    #[test]
    fn scenario_a_required_then_conditional_field() {
        let mut form = recorder_form(scenario_schema());

        let errors = form.collect().unwrap_err();
        assert_eq!(
            errors.first(),
            &FormError::RequiredFieldEmpty {
                field: "name".into(),
                label: "Name".into()
            }
        );

        form.set_value("name", "host1").unwrap();
        form.set_value("kind", "password").unwrap();
        assert!(form.is_visible("secret").unwrap());

        let values = form.collect().unwrap();
        assert_eq!(values["name"], "host1");
        assert_eq!(values["kind"], "password");
        assert_eq!(values["secret"], "");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn scenario_b_wraparound_over_fields_and_buttons() {
        let mut form = recorder_form(scenario_schema());
        form.set_value("kind", "password").unwrap();
        assert_eq!(form.sequence().len(), 5);

        assert!(form.focus(&FocusTarget::Action(FormAction::Cancel)));
        form.focus_next();
        assert_eq!(form.focus_index(), 0);
        form.focus_prev();
        assert_eq!(form.focused(), Some(&FocusTarget::Action(FormAction::Cancel)));
    }

    #[test]
    fn scenario_c_invalid_option_leaves_value() {
        let mut form = recorder_form(scenario_schema());
        let err = form.set_value("kind", "certificate").unwrap_err();
        assert_eq!(
            err,
            FormError::InvalidOption {
                field: "kind".into(),
                value: "certificate".into()
            }
        );
        assert_eq!(form.value("kind").unwrap(), "key");
    }

    #[test]
    fn initial_focus_is_first_field() {
        let form = recorder_form(scenario_schema());
        assert_eq!(form.focus_index(), 0);
        assert_eq!(form.focused(), Some(&FocusTarget::Field("name".into())));
        assert_eq!(
            form.sequence(),
            &[
                FocusTarget::Field("name".into()),
                FocusTarget::Field("kind".into()),
                FocusTarget::Action(FormAction::Submit),
                FocusTarget::Action(FormAction::Cancel),
            ]
        );
    }

    #[test]
    fn hiding_focused_field_moves_focus_to_visible_element() {
        let mut form = recorder_form(scenario_schema());
        form.set_value("kind", "password").unwrap();
        assert!(form.focus(&FocusTarget::Field("secret".into())));

        form.set_value("kind", "key").unwrap();
        let focused = form.focused().cloned().unwrap();
        assert_eq!(focused, FocusTarget::Field("name".into()));
        assert!(form.sequence().contains(&focused));
        assert!(!form.is_visible("secret").unwrap());
    }

    #[test]
    fn focus_stays_on_element_that_remains_visible() {
        let mut form = recorder_form(scenario_schema());
        assert!(form.focus(&FocusTarget::Field("kind".into())));
        form.set_value("kind", "password").unwrap();
        assert_eq!(form.focused(), Some(&FocusTarget::Field("kind".into())));
        form.focus_next();
        assert_eq!(form.focused(), Some(&FocusTarget::Field("secret".into())));
    }

    #[test]
    fn unknown_field_is_reported_everywhere() {
        let mut form = recorder_form(scenario_schema());
        let unknown = FormError::UnknownField("port".into());
        assert_eq!(form.set_value("port", "22").unwrap_err(), unknown);
        assert_eq!(form.value("port").unwrap_err(), unknown);
        assert_eq!(form.validate_field("port", "22").unwrap_err(), unknown);
    }

    #[test]
    fn hidden_fields_keep_values_and_skip_validation() {
        let schema = FormSchema::new(
            "Hidden",
            vec![
                FormField::new("kind", "Kind", FormFieldKind::select(["key", "password"])),
                FormField::new("secret", "Secret", FormFieldKind::Secret)
                    .required()
                    .visible_when("kind", "password"),
            ],
        );
        let mut form = recorder_form(schema);
        form.set_value("kind", "password").unwrap();
        assert!(form.validate_all().is_err());

        form.set_value("secret", "pw").unwrap();
        form.set_value("kind", "key").unwrap();
        assert_eq!(form.value("secret").unwrap(), "pw");

        form.set_value("kind", "password").unwrap();
        form.set_value("secret", "").unwrap();
        form.set_value("kind", "key").unwrap();
        assert!(form.validate_all().is_ok());
        assert_eq!(form.collect().unwrap()["secret"], "");
    }

    #[test]
    fn validate_field_does_not_mutate() {
        let mut form = recorder_form(scenario_schema());
        form.set_value("name", "web").unwrap();
        assert!(form.validate_field("name", "").is_err());
        assert_eq!(form.value("name").unwrap(), "web");
        assert!(form.field_error("name").is_none());
    }

    #[test]
    fn validate_all_collects_every_error_in_field_order() {
        let schema = FormSchema::new(
            "Many",
            vec![
                FormField::new("a", "A", FormFieldKind::Text).required(),
                FormField::new("b", "B", FormFieldKind::Text)
                    .validator(|v| if v == "ok" { Ok(()) } else { Err("say ok".into()) }),
                FormField::new("c", "C", FormFieldKind::Text).required(),
            ],
        );
        let form = recorder_form(schema);
        let errors = form.validate_all().unwrap_err();
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
        assert_eq!(errors.first().field(), Some("a"));
    }

    #[test]
    fn collect_agrees_with_validate_all() {
        let mut form = recorder_form(scenario_schema());
        for (name, kind) in [("", "key"), ("web", "key"), ("web", "password"), (" ", "password")] {
            form.set_value("name", name).unwrap();
            form.set_value("kind", kind).unwrap();
            assert_eq!(form.collect().is_err(), form.validate_all().is_err());
        }
    }

    #[test]
    fn select_values_always_stay_in_options() {
        let mut form = recorder_form(scenario_schema());
        for attempt in ["password", "nope", "key", "", "KEY", "password"] {
            let _ = form.set_value("kind", attempt);
            let value = form.value("kind").unwrap();
            assert!(value == "key" || value == "password", "drifted to {value:?}");
        }
        form.select_next("kind").unwrap();
        form.select_next("kind").unwrap();
        assert_eq!(form.value("kind").unwrap(), "password");
        form.select_prev("kind").unwrap();
        assert_eq!(form.value("kind").unwrap(), "key");
    }

    #[test]
    fn immediate_mode_revalidates_dependents() {
        let schema = FormSchema::new(
            "Immediate",
            vec![
                FormField::new("auth", "Auth", FormFieldKind::select(["key", "password"])),
                FormField::new("password", "Password", FormFieldKind::Secret).validator_with(
                    ["auth"],
                    |value, values| {
                        if values.get("auth").map(String::as_str) == Some("password")
                            && value.is_empty()
                        {
                            Err("Password is required for password auth".into())
                        } else {
                            Ok(())
                        }
                    },
                ),
            ],
        )
        .validation_mode(ValidationMode::Immediate);
        let mut form = recorder_form(schema);

        form.set_value("auth", "password").unwrap();
        assert_eq!(
            form.field_error("password").map(FormError::message),
            Some("Password is required for password auth".to_string())
        );

        form.set_value("password", "pw").unwrap();
        assert!(form.field_error("password").is_none());
    }

    #[test]
    fn on_submit_only_clears_stale_error_of_edited_field() {
        let mut form = recorder_form(scenario_schema());
        let mut rec = Recorder::default();
        assert!(form.submit(&mut rec).is_err());
        assert!(form.field_error("name").is_some());

        form.set_value("name", "").unwrap();
        assert!(form.field_error("name").is_none());
        assert!(rec.committed.is_empty());
    }

    #[test]
    fn change_hook_runs_synchronously() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let schema = FormSchema::new(
            "Hook",
            vec![
                FormField::new("name", "Name", FormFieldKind::Text)
                    .on_change(move |v| sink.lock().unwrap().push(v.to_string())),
            ],
        );
        let mut form = recorder_form(schema);
        form.set_value("name", "a").unwrap();
        form.set_value("name", "ab").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "ab"]);
    }

    #[test]
    fn submit_commits_once_and_closes() {
        let mut form = recorder_form(scenario_schema());
        let mut rec = Recorder::default();
        form.set_value("name", "web").unwrap();

        assert_eq!(form.submit(&mut rec).unwrap(), SubmitOutcome::Closed);
        assert_eq!(rec.committed.len(), 1);
        assert!(form.is_closed());
        assert!(form.liveness().is_cancelled());
        assert_eq!(form.submit(&mut rec).unwrap_err().first(), &FormError::Closed);
        assert_eq!(form.set_value("name", "x").unwrap_err(), FormError::Closed);
    }

    #[test]
    fn invalid_submit_never_reaches_commit() {
        let mut form = recorder_form(scenario_schema());
        let mut rec = Recorder::default();
        let errors = form.submit(&mut rec).unwrap_err();
        assert_eq!(errors.first().field(), Some("name"));
        assert!(rec.committed.is_empty());
        assert_eq!(form.phase(), FormPhase::Editing);
        assert!(!form.liveness().is_cancelled());
    }

    #[test]
    fn commit_failure_keeps_form_open() {
        let mut form = recorder_form(scenario_schema());
        let mut rec = Recorder {
            reject_with: Some("host `web` already exists".into()),
            ..Recorder::default()
        };
        form.set_value("name", "web").unwrap();

        let errors = form.submit(&mut rec).unwrap_err();
        assert_eq!(
            errors.first(),
            &FormError::CommitFailed {
                message: "host `web` already exists".into()
            }
        );
        assert_eq!(form.form_errors().len(), 1);
        assert_eq!(form.phase(), FormPhase::Editing);
        assert_eq!(form.value("name").unwrap(), "web");

        rec.reject_with = None;
        assert_eq!(form.submit(&mut rec).unwrap(), SubmitOutcome::Closed);
        assert_eq!(rec.committed.len(), 1);
    }

    #[test]
    fn pending_commit_resolves_later() {
        let mut form = recorder_form(scenario_schema());
        let mut rec = Recorder {
            pending: true,
            ..Recorder::default()
        };
        form.set_value("name", "web").unwrap();

        assert_eq!(form.submit(&mut rec).unwrap(), SubmitOutcome::Pending);
        assert_eq!(form.phase(), FormPhase::Submitting);
        assert_eq!(form.in_progress(), Some("connecting"));
        assert!(!form.focus_next());
        assert_eq!(form.set_value("name", "x").unwrap_err(), FormError::Busy);

        // wrong ticket is ignored
        assert_eq!(form.finish_pending(3, Ok(())).unwrap(), SubmitOutcome::Pending);
        assert_eq!(form.phase(), FormPhase::Submitting);

        let errors = form.finish_pending(7, Err("tmux not found".into())).unwrap_err();
        assert_eq!(errors.first().message(), "tmux not found");
        assert_eq!(form.phase(), FormPhase::Editing);
        assert_eq!(form.in_progress(), None);

        assert_eq!(form.submit(&mut rec).unwrap(), SubmitOutcome::Pending);
        assert_eq!(form.finish_pending(7, Ok(())).unwrap(), SubmitOutcome::Closed);
        assert!(form.is_closed());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut form = recorder_form(scenario_schema());
        let mut rec = Recorder::default();
        form.cancel(&mut rec);
        form.cancel(&mut rec);
        assert_eq!(rec.cancelled, 1);
        assert!(form.is_closed());
        assert!(form.liveness().is_cancelled());
    }

    #[test]
    fn cancel_during_pending_commit_clears_liveness() {
        let mut form = recorder_form(scenario_schema());
        let mut rec = Recorder {
            pending: true,
            ..Recorder::default()
        };
        form.set_value("name", "web").unwrap();
        form.submit(&mut rec).unwrap();
        let child = form.liveness().child_token();

        form.cancel(&mut rec);
        assert!(child.is_cancelled());
        assert_eq!(form.finish_pending(7, Ok(())).unwrap_err().first(), &FormError::Closed);
    }

    #[test]
    fn dropping_form_clears_liveness() {
        let form = recorder_form(scenario_schema());
        let token = form.liveness().clone();
        drop(form);
        assert!(token.is_cancelled());
    }

    #[test]
    fn wiring_errors_are_caught_at_construction() {
        let dup = FormSchema::new(
            "Dup",
            vec![
                FormField::new("a", "A", FormFieldKind::Text),
                FormField::new("a", "A again", FormFieldKind::Text),
            ],
        );
        assert_eq!(
            Form::<()>::new(dup, |_, _| Ok(Commit::Done), |_| {}).err(),
            Some(FormError::DuplicateField("a".into()))
        );

        let dangling = FormSchema::new(
            "Dangling",
            vec![FormField::new("a", "A", FormFieldKind::Text).visible_when("missing", "x")],
        );
        assert_eq!(
            Form::<()>::new(dangling, |_, _| Ok(Commit::Done), |_| {}).err(),
            Some(FormError::UnknownField("missing".into()))
        );

        let bad_default = FormSchema::new(
            "Default",
            vec![FormField::new("a", "A", FormFieldKind::select(["x"])).default_value("y")],
        );
        assert!(matches!(
            Form::<()>::new(bad_default, |_, _| Ok(Commit::Done), |_| {}).err(),
            Some(FormError::InvalidOption { .. })
        ));
    }

    #[test]
    fn browse_rewrites_its_target() {
        let schema = FormSchema::new(
            "Import",
            vec![FormField::new("path", "Path", FormFieldKind::Text)],
        )
        .browse("path", |current| Some(format!("{current}/next.json")));
        let mut form = recorder_form(schema);
        assert!(form.has_action(FormAction::Browse));
        assert_eq!(
            form.sequence()[1..],
            [
                FocusTarget::Action(FormAction::Browse),
                FocusTarget::Action(FormAction::Submit),
                FocusTarget::Action(FormAction::Cancel),
            ]
        );
        form.set_value("path", "/tmp").unwrap();
        assert!(form.browse().unwrap());
        assert_eq!(form.value("path").unwrap(), "/tmp/next.json");
    }

    #[test]
    fn prefilled_values_drive_visibility() {
        let form = recorder_form(scenario_schema())
            .with_values([("name", "db"), ("kind", "password"), ("secret", "pw")])
            .unwrap();
        assert!(form.is_visible("secret").unwrap());
        assert_eq!(form.focused(), Some(&FocusTarget::Field("name".into())));
        assert_eq!(form.values()["secret"], "pw");
    }
}
