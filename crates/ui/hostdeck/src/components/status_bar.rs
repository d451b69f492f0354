use color_eyre::Result;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::{
    action::Action,
    components::Component,
    state::{AppState, StatusLevel},
    tui::Frame,
};

/// Bottom bar: the latest status message on the first line, key hints for
/// the active page on the second.
#[derive(Default)]
pub struct StatusBar {
    hints: Vec<(&'static str, &'static str)>,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hints(&mut self, hints: &[(&'static str, &'static str)]) {
        self.hints = hints.to_vec();
    }

    fn hint_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (key, label) in &self.hints {
            spans.push(Span::styled(*key, Style::default().fg(Color::White)));
            spans.push(Span::raw(format!(": {label}   ")));
        }
        Line::from(spans).fg(Color::DarkGray)
    }
}

impl Component for StatusBar {
    fn update(&mut self, action: Action, state: &mut AppState) -> Result<Option<Action>> {
        match action {
            Action::Notify(message) => state.info(message),
            Action::Error(message) => state.error(message),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect, state: &AppState) -> Result<()> {
        let [status_area, hint_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

        let status = match &state.status {
            Some(status) => {
                let color = match status.level {
                    StatusLevel::Info => Color::Green,
                    StatusLevel::Error => Color::Red,
                };
                Line::from(Span::styled(status.message.clone(), Style::default().fg(color)))
            }
            None => Line::from(Span::styled(
                format!(
                    "{} hosts, {} profiles · {}",
                    state.store.catalog().hosts().len(),
                    state.store.catalog().groups().len(),
                    state.store.path().display()
                ),
                Style::default().fg(Color::DarkGray),
            )),
        };
        f.render_widget(Paragraph::new(status), status_area);
        f.render_widget(Paragraph::new(self.hint_line()), hint_area);
        Ok(())
    }
}
