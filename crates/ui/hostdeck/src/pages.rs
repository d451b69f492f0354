use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::layout::Rect;

use crate::{action::Action, state::AppState, tui::Frame};

mod hosts;
mod profiles;

pub use hosts::HostsPage;
pub use profiles::ProfilesPage;

/// A full-screen view below the tab bar. Pages read the catalog from the
/// shared state and ask for dialogs through `Action::Open`.
pub trait Page {
    fn name(&self) -> &'static str;

    /// Key hints shown in the status bar while the page is active.
    fn hints(&self) -> &'static [(&'static str, &'static str)];

    fn handle_key_events(&mut self, key: KeyEvent, state: &mut AppState) -> Result<Option<Action>> {
        let _ = (key, state);
        Ok(None)
    }

    fn update(&mut self, action: Action, state: &mut AppState) -> Result<Option<Action>> {
        let _ = (action, state);
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &AppState) -> Result<()>;
}

/// Cursor over a list whose length changes underneath it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    index: usize,
}

impl Cursor {
    pub fn up(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn down(&mut self, len: usize) {
        self.index = (self.index + 1).min(len.saturating_sub(1));
    }

    /// Current position, clamped to `len`. `None` for an empty list.
    pub fn get(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.index.min(len - 1))
    }

    pub fn clamp(&mut self, len: usize) {
        self.index = self.get(len).unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_stays_in_bounds() {
        let mut c = Cursor::default();
        assert_eq!(c.get(0), None);
        c.down(3);
        c.down(3);
        c.down(3);
        assert_eq!(c.get(3), Some(2));
        // list shrank
        assert_eq!(c.get(1), Some(0));
        c.clamp(1);
        c.up();
        assert_eq!(c.get(5), Some(0));
    }
}
