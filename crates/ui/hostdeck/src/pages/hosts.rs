use catalog::Host;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};

use crate::{
    action::{Action, ConnectTarget, Dialog},
    state::AppState,
    tui::Frame,
};

use super::{Cursor, Page};

const HINTS: &[(&str, &str)] = &[
    ("Enter", "Connect"),
    ("a", "Add"),
    ("e", "Edit"),
    ("d", "Delete"),
    ("p", "Add to profile"),
    ("i/x", "Import/Export"),
    ("Tab", "Profiles"),
    ("q", "Quit"),
];

/// Table of all hosts with the profiles each belongs to.
#[derive(Default)]
pub struct HostsPage {
    cursor: Cursor,
}

impl HostsPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn selected<'a>(&self, state: &'a AppState) -> Option<&'a Host> {
        let hosts = state.store.catalog().hosts();
        self.cursor.get(hosts.len()).map(|i| &hosts[i])
    }

    /// `action` for the selected host, or a hint when the list is empty.
    fn on_selected(&self, state: &AppState, action: impl FnOnce(String) -> Action) -> Action {
        match self.selected(state) {
            Some(host) => action(host.name.clone()),
            None => Action::Notify("no host selected".into()),
        }
    }
}

impl Page for HostsPage {
    fn name(&self) -> &'static str {
        "Hosts"
    }

    fn hints(&self) -> &'static [(&'static str, &'static str)] {
        HINTS
    }

    fn handle_key_events(&mut self, key: KeyEvent, state: &mut AppState) -> Result<Option<Action>> {
        let len = state.store.catalog().hosts().len();
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor.up();
                Action::Update
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor.down(len);
                Action::Update
            }
            KeyCode::Enter | KeyCode::Char('c') => self.on_selected(state, |name| {
                Action::Open(Dialog::Connect(ConnectTarget::Host(name)))
            }),
            KeyCode::Char('a') => Action::Open(Dialog::AddHost),
            KeyCode::Char('e') => self.on_selected(state, |n| Action::Open(Dialog::EditHost(n))),
            KeyCode::Char('d') | KeyCode::Delete => {
                self.on_selected(state, |n| Action::Open(Dialog::DeleteHost(n)))
            }
            KeyCode::Char('p') => Action::Open(Dialog::Assign {
                host: self.selected(state).map(|h| h.name.clone()),
            }),
            KeyCode::Char('i') => Action::Open(Dialog::Import),
            KeyCode::Char('x') => Action::Open(Dialog::Export { profile: None }),
            _ => return Ok(None),
        };
        Ok(Some(action))
    }

    fn update(&mut self, action: Action, state: &mut AppState) -> Result<Option<Action>> {
        if matches!(action, Action::Refresh | Action::ClosePopup) {
            self.cursor.clamp(state.store.catalog().hosts().len());
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &AppState) -> Result<()> {
        let catalog = state.store.catalog();
        let rows: Vec<Row> = catalog
            .hosts()
            .iter()
            .map(|host| {
                let profiles: Vec<&str> = catalog
                    .groups_of(&host.name)
                    .into_iter()
                    .map(|g| g.name.as_str())
                    .collect();
                Row::new(vec![
                    Cell::from(host.name.clone()),
                    Cell::from(host.destination()),
                    Cell::from(host.port.to_string()),
                    Cell::from(host.auth.method().to_string()),
                    Cell::from(profiles.join(", ")),
                ])
            })
            .collect();

        let block = Block::default()
            .title(format!(" Hosts ({}) ", catalog.hosts().len()))
            .borders(Borders::ALL);
        if rows.is_empty() {
            let empty = ratatui::widgets::Paragraph::new(Line::from(
                "No hosts yet. Press `a` to add one or `i` to import a bundle.",
            ))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
            frame.render_widget(empty, area);
            return Ok(());
        }

        let header = Row::new(vec!["Name", "Destination", "Port", "Auth", "Profiles"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [
                Constraint::Length(18),
                Constraint::Fill(2),
                Constraint::Length(6),
                Constraint::Length(9),
                Constraint::Fill(1),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

        let mut table_state = TableState::default();
        table_state.select(self.cursor.get(catalog.hosts().len()));
        frame.render_stateful_widget(table, area, &mut table_state);
        Ok(())
    }
}
