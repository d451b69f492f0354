use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};

use crate::{
    action::Action,
    components::Component,
    state::AppState,
    tui::{EventResponse, Frame},
};

use super::{centered_rect_fixed, draw_popup_frame, inner_rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Ok,
    Cancel,
}

/// Modal confirmation popup with selectable OK/Cancel buttons.
///
/// Behavior:
/// - Arrow Left/Right or Tab/BackTab: switch selected button
/// - Enter on OK: emits the stored `on_confirm` action
/// - Enter on Cancel, or Esc: emits `Action::ClosePopup`
///
/// When `on_confirm` comes back through `update`, the popup answers with
/// `Action::ClosePopup`, so the app handles the action first and closes after.
pub struct ConfirmPopup {
    title: String,
    question: String,
    ok_label: String,
    cancel_label: String,
    on_confirm: Action,
    selected: Choice,
    min_width: u16,
    min_height: u16,
}

impl ConfirmPopup {
    pub fn new<T: Into<String>, Q: Into<String>>(title: T, question: Q, on_confirm: Action) -> Self {
        Self {
            title: title.into(),
            question: question.into(),
            ok_label: "OK".into(),
            cancel_label: "Cancel".into(),
            on_confirm,
            selected: Choice::Cancel,
            min_width: 60,
            min_height: 9,
        }
    }

    pub fn ok_label<S: Into<String>>(mut self, label: S) -> Self {
        self.ok_label = label.into();
        self
    }

    fn confirm_action(&self) -> Action {
        match self.selected {
            Choice::Ok => self.on_confirm.clone(),
            Choice::Cancel => Action::ClosePopup,
        }
    }

    fn toggle_selection(&mut self) {
        self.selected = match self.selected {
            Choice::Ok => Choice::Cancel,
            Choice::Cancel => Choice::Ok,
        };
    }

    fn button(&self, label: &str, choice: Choice) -> Span<'static> {
        let text = format!("[ {label} ]");
        if self.selected == choice {
            Span::styled(text, Style::default().fg(Color::Black).bg(Color::White).bold())
        } else {
            Span::styled(text, Style::default().fg(Color::White).bg(Color::Black))
        }
    }
}

impl Component for ConfirmPopup {
    fn popup_min_size(&self) -> Option<(u16, u16)> {
        Some((self.min_width, self.min_height))
    }

    fn handle_key_events(
        &mut self,
        key: KeyEvent,
        _state: &mut AppState,
    ) -> Result<Option<EventResponse<Action>>> {
        let action = match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                self.toggle_selection();
                Action::Update
            }
            KeyCode::Enter => self.confirm_action(),
            KeyCode::Esc => Action::ClosePopup,
            _ => return Ok(None),
        };
        Ok(Some(EventResponse::Stop(action)))
    }

    fn update(&mut self, action: Action, _state: &mut AppState) -> Result<Option<Action>> {
        if action == self.on_confirm {
            return Ok(Some(Action::ClosePopup));
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect, _state: &AppState) -> Result<()> {
        if area.width < 5 || area.height < 5 {
            return Ok(());
        }

        let dialog = centered_rect_fixed(area, self.min_width, self.min_height);
        let _ = draw_popup_frame(f, dialog, &self.title);
        let inner = inner_rect(dialog);

        let mut lines: Vec<Line> = self
            .question
            .lines()
            .map(|l| Line::from(Span::raw(l.to_string())))
            .collect();
        if inner.height >= 3 {
            lines.push(Line::raw(""));
        }

        let spacing = "   ";
        let buttons_len = (4 + self.ok_label.len()) + spacing.len() + (4 + self.cancel_label.len());
        let pad = (inner.width as usize).saturating_sub(buttons_len) / 2;
        lines.push(Line::from(vec![
            Span::raw(" ".repeat(pad)),
            self.button(&self.ok_label, Choice::Ok),
            Span::raw(spacing),
            self.button(&self.cancel_label, Choice::Cancel),
        ]));

        if inner.height >= 4 {
            lines.push(Line::raw(""));
            lines.push(
                Line::from(vec![
                    Span::styled("←/→/Tab", Style::default().fg(Color::White)),
                    Span::raw(": Select   "),
                    Span::styled("Enter", Style::default().fg(Color::White)),
                    Span::raw(": Confirm   "),
                    Span::styled("Esc", Style::default().fg(Color::White)),
                    Span::raw(": Cancel"),
                ])
                .fg(Color::DarkGray),
            );
        }

        f.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
        Ok(())
    }
}
