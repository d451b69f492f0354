use catalog::Group;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::{
    action::{Action, ConnectTarget, Dialog},
    state::AppState,
    tui::Frame,
};

use super::{Cursor, Page};

const HINTS: &[(&str, &str)] = &[
    ("Enter", "Open"),
    ("n", "New"),
    ("e", "Edit"),
    ("d", "Delete"),
    ("a/u", "Assign/Unassign"),
    ("x", "Export"),
    ("Tab", "Hosts"),
    ("q", "Quit"),
];

/// Profiles on the left, members and details of the selected one on the right.
#[derive(Default)]
pub struct ProfilesPage {
    cursor: Cursor,
}

impl ProfilesPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn selected<'a>(&self, state: &'a AppState) -> Option<&'a Group> {
        let groups = state.store.catalog().groups();
        self.cursor.get(groups.len()).map(|i| &groups[i])
    }

    fn on_selected(&self, state: &AppState, action: impl FnOnce(String) -> Action) -> Action {
        match self.selected(state) {
            Some(group) => action(group.name.clone()),
            None => Action::Notify("no profile selected".into()),
        }
    }

    fn draw_details(&self, frame: &mut Frame<'_>, area: Rect, state: &AppState) {
        let block = Block::default().title(" Members ").borders(Borders::ALL);
        let Some(group) = self.selected(state) else {
            frame.render_widget(block, area);
            return;
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Layout: ", Style::default().fg(Color::DarkGray)),
                Span::raw(group.layout.to_string()),
            ]),
        ];
        if !group.description.is_empty() {
            lines.push(Line::from(Span::styled(
                group.description.clone(),
                Style::default().fg(Color::Gray),
            )));
        }
        lines.push(Line::raw(""));
        if group.hosts.is_empty() {
            lines.push(Line::from(Span::styled(
                "No hosts. Press `a` to assign one.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        let catalog = state.store.catalog();
        for name in &group.hosts {
            let destination = catalog
                .host(name)
                .map(|h| h.destination())
                .unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled(format!("{name:<18}"), Style::default().fg(Color::Cyan)),
                Span::raw(destination),
            ]));
        }
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            area,
        );
    }
}

impl Page for ProfilesPage {
    fn name(&self) -> &'static str {
        "Profiles"
    }

    fn hints(&self) -> &'static [(&'static str, &'static str)] {
        HINTS
    }

    fn handle_key_events(&mut self, key: KeyEvent, state: &mut AppState) -> Result<Option<Action>> {
        let len = state.store.catalog().groups().len();
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor.up();
                Action::Update
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor.down(len);
                Action::Update
            }
            KeyCode::Enter | KeyCode::Char('o') => self.on_selected(state, |name| {
                Action::Open(Dialog::Connect(ConnectTarget::Profile(name)))
            }),
            KeyCode::Char('n') => Action::Open(Dialog::NewProfile),
            KeyCode::Char('e') => self.on_selected(state, |n| Action::Open(Dialog::EditProfile(n))),
            KeyCode::Char('d') | KeyCode::Delete => {
                self.on_selected(state, |n| Action::Open(Dialog::DeleteProfile(n)))
            }
            KeyCode::Char('a') => Action::Open(Dialog::Assign { host: None }),
            KeyCode::Char('u') => Action::Open(Dialog::Unassign {
                profile: self.selected(state).map(|g| g.name.clone()),
            }),
            KeyCode::Char('x') => Action::Open(Dialog::Export {
                profile: self.selected(state).map(|g| g.name.clone()),
            }),
            _ => return Ok(None),
        };
        Ok(Some(action))
    }

    fn update(&mut self, action: Action, state: &mut AppState) -> Result<Option<Action>> {
        if matches!(action, Action::Refresh | Action::ClosePopup) {
            self.cursor.clamp(state.store.catalog().groups().len());
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &AppState) -> Result<()> {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);
        let groups = state.store.catalog().groups();

        let items: Vec<ListItem> = groups
            .iter()
            .map(|g| ListItem::new(format!("{} ({})", g.name, g.hosts.len())))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" Profiles ({}) ", groups.len()))
                    .borders(Borders::ALL),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
        let mut list_state = ListState::default();
        list_state.select(self.cursor.get(groups.len()));
        frame.render_stateful_widget(list, left, &mut list_state);

        self.draw_details(frame, right, state);
        Ok(())
    }
}
