use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use tracing::{debug, warn};
use tui_input::{Input, backend::crossterm::EventHandler};

use crate::{
    action::Action,
    components::Component,
    state::AppState,
    tui::{EventResponse, Frame},
};

use super::{FocusTarget, Form, FormAction, FormError, FormField, FormFieldKind, SubmitOutcome};

/// Interactive multi-field form popup (key handling only; drawing lives in `render.rs`).
///
/// Responsibilities:
/// - Translating keys into `Form` operations (navigation, edits, submit, cancel)
/// - The inline line editor for text and secret fields
/// - Resolving pending commits when their background task reports back
pub struct FormPopup {
    form: Form<AppState>,
    editing: bool,
    input: Input,
    scroll: usize,
}

impl FormPopup {
    pub fn new(form: Form<AppState>) -> Self {
        Self {
            form,
            editing: false,
            input: Input::default(),
            scroll: 0,
        }
    }

    pub fn form(&self) -> &Form<AppState> {
        &self.form
    }

    // --- Accessors used by the renderer --------------------------------------------------------

    pub(super) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(super) fn input(&self) -> &Input {
        &self.input
    }

    pub(super) fn scroll(&self) -> usize {
        self.scroll
    }

    /// Keep the focused field inside a window of `max_visible` fields.
    pub(super) fn ensure_visible(&mut self, max_visible: usize) {
        let last = self.form.visible_fields().count().saturating_sub(1);
        self.scroll = self.scroll.min(last);
        let Some(focused) = self.focused_field_position() else {
            return;
        };
        let max_visible = max_visible.max(1);
        if focused < self.scroll {
            self.scroll = focused;
        } else if focused >= self.scroll + max_visible {
            self.scroll = focused + 1 - max_visible;
        }
    }

    /// Position of the focused field among the visible fields.
    pub(super) fn focused_field_position(&self) -> Option<usize> {
        let key = self.form.focused()?.field()?;
        self.form.visible_fields().position(|f| f.key == key)
    }

    /// Display string for a field's current value.
    pub(super) fn display_value(&self, field: &FormField) -> String {
        let value = self.form.value(&field.key).unwrap_or_default();
        match &field.kind {
            FormFieldKind::Secret if !value.is_empty() => "•".repeat(value.chars().count()),
            FormFieldKind::Select { .. } => format!("‹ {value} ›"),
            _ => value.to_string(),
        }
    }

    // --- Editing -------------------------------------------------------------------------------

    fn focused_field(&self) -> Option<&FormField> {
        let key = self.form.focused()?.field()?;
        self.form.field(key).ok()
    }

    fn start_editing(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        if !field.is_textual() {
            return;
        }
        let value = self.form.value(&field.key).unwrap_or_default().to_string();
        self.input = Input::new(value);
        self.editing = true;
    }

    fn cancel_editing(&mut self) {
        self.editing = false;
        self.input = Input::default();
    }

    fn commit_editing(&mut self) {
        let key = self.focused_field().map(|f| f.key.clone());
        let value = self.input.value().to_string();
        self.cancel_editing();
        if let Some(key) = key {
            if let Err(err) = self.form.set_value(&key, value) {
                warn!(field = %key, %err, "edit rejected");
            }
        }
    }

    fn cycle_select(&mut self, forward: bool) {
        let Some(key) = self
            .focused_field()
            .filter(|f| f.options().is_some())
            .map(|f| f.key.clone())
        else {
            return;
        };
        let res = if forward {
            self.form.select_next(&key)
        } else {
            self.form.select_prev(&key)
        };
        if let Err(err) = res {
            warn!(field = %key, %err, "select rejected");
        }
    }

    // --- Actions -------------------------------------------------------------------------------

    fn activate(&mut self, state: &mut AppState) -> Action {
        match self.form.focused().cloned() {
            Some(FocusTarget::Field(_)) => {
                if self.focused_field().is_some_and(|f| f.is_textual()) {
                    self.start_editing();
                } else {
                    self.cycle_select(true);
                }
                Action::Update
            }
            Some(FocusTarget::Action(FormAction::Browse)) => {
                if let Err(err) = self.form.browse() {
                    warn!(%err, "browse failed");
                }
                Action::Update
            }
            Some(FocusTarget::Action(FormAction::Submit)) => self.submit(state),
            Some(FocusTarget::Action(FormAction::Cancel)) => self.cancel(state),
            None => Action::Update,
        }
    }

    fn submit(&mut self, state: &mut AppState) -> Action {
        match self.form.submit(state) {
            Ok(SubmitOutcome::Closed) => Action::ClosePopup,
            Ok(SubmitOutcome::Pending) => Action::Update,
            Err(errors) => {
                debug!(form = %self.form.schema().title, %errors, "submit rejected");
                if let Some(field) = errors.first().field() {
                    let target = FocusTarget::Field(field.to_string());
                    self.form.focus(&target);
                }
                Action::Update
            }
        }
    }

    fn cancel(&mut self, state: &mut AppState) -> Action {
        self.form.cancel(state);
        Action::ClosePopup
    }
}

impl Component for FormPopup {
    fn popup_min_size(&self) -> Option<(u16, u16)> {
        let schema = self.form.schema();
        Some((schema.min_width, schema.min_height))
    }

    fn handle_key_events(
        &mut self,
        key: KeyEvent,
        state: &mut AppState,
    ) -> Result<Option<EventResponse<Action>>> {
        // While a commit is pending only Esc is honoured.
        if self.form.in_progress().is_some() {
            let action = match key.code {
                KeyCode::Esc => self.cancel(state),
                _ => Action::Update,
            };
            return Ok(Some(EventResponse::Stop(action)));
        }

        if self.editing {
            match key.code {
                KeyCode::Enter => self.commit_editing(),
                KeyCode::Esc => self.cancel_editing(),
                _ => {
                    self.input.handle_event(&crossterm::event::Event::Key(key));
                }
            }
            return Ok(Some(EventResponse::Stop(Action::Update)));
        }

        let action = match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.form.focus_next();
                Action::Update
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.form.focus_prev();
                Action::Update
            }
            KeyCode::Left => {
                self.cycle_select(false);
                Action::Update
            }
            KeyCode::Right | KeyCode::Char(' ') => {
                self.cycle_select(true);
                Action::Update
            }
            KeyCode::Enter => self.activate(state),
            KeyCode::Esc => self.cancel(state),
            _ => return Ok(None),
        };
        Ok(Some(EventResponse::Stop(action)))
    }

    fn update(&mut self, action: Action, state: &mut AppState) -> Result<Option<Action>> {
        match action {
            Action::TaskFinished { id, result } => {
                let session = result.as_ref().ok().cloned();
                match self.form.finish_pending(id, result.map(|_| ())) {
                    Ok(SubmitOutcome::Closed) => {
                        return Ok(Some(match session {
                            Some(session) => Action::Attach(session),
                            None => Action::ClosePopup,
                        }));
                    }
                    Ok(SubmitOutcome::Pending) => {}
                    // the dialog went away before the work finished
                    Err(errors) if matches!(errors.first(), FormError::Closed) => {
                        debug!(id, "completion for a closed form dropped");
                    }
                    Err(errors) => state.error(errors.to_string()),
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect, _state: &AppState) -> Result<()> {
        super::render::render_form_popup(self, f, area)
    }
}
