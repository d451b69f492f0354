use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use catalog::CatalogStore;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Paragraph, Tabs},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    components::{
        Component,
        popups::{dialogs, render_backdrop},
        status_bar::StatusBar,
    },
    config::Config,
    pages::{HostsPage, Page, ProfilesPage},
    state::AppState,
    tui::{Event, EventResponse, Frame, Tui},
};

pub mod task_manager;

use task_manager::TaskManager;

/// How long shutdown waits for the task manager to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub struct App {
    pub state: AppState,
    pages: Vec<Box<dyn Page>>,
    active_page: usize,
    status_bar: StatusBar,
    popup: Option<Box<dyn Component>>,
    should_quit: bool,
    should_suspend: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    root: CancellationToken,
    tasks_join: Option<JoinHandle<()>>,
    terminate: Arc<AtomicBool>,
}

impl App {
    /// Must be called inside the tokio runtime (the task manager is spawned here).
    pub fn new(config: Config, store: CatalogStore, exports_dir: PathBuf) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let root = CancellationToken::new();
        let (tasks, tasks_join) = TaskManager::new(action_tx.clone(), root.clone());

        let terminate = Arc::new(AtomicBool::new(false));
        for signal in [
            signal_hook::consts::SIGINT,
            signal_hook::consts::SIGTERM,
            signal_hook::consts::SIGHUP,
        ] {
            signal_hook::flag::register(signal, Arc::clone(&terminate))?;
        }

        let state = AppState::new(config, store, tasks).with_exports_dir(exports_dir);
        let pages: Vec<Box<dyn Page>> = vec![Box::new(HostsPage::new()), Box::new(ProfilesPage::new())];
        let mut status_bar = StatusBar::new();
        status_bar.set_hints(pages[0].hints());

        Ok(Self {
            state,
            pages,
            active_page: 0,
            status_bar,
            popup: None,
            should_quit: false,
            should_suspend: false,
            action_tx,
            action_rx,
            root,
            tasks_join: Some(tasks_join),
            terminate,
        })
    }

    /// Run the UI until quit. Returns the tmux session to attach, if a
    /// connect dialog succeeded.
    pub async fn run(&mut self) -> Result<Option<String>> {
        let mut tui = self.new_tui()?;
        tui.enter()?;

        loop {
            if let Some(e) = tui.next().await {
                self.handle_event(e)?;
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.handle_action(action, &mut tui)?;
            }

            if self.should_suspend {
                tui.suspend()?;
                self.action_tx.send(Action::Resume)?;
                tui = self.new_tui()?;
                tui.enter()?;
            } else if self.should_quit {
                tui.stop()?;
                break;
            }
        }
        tui.exit()?;
        self.shutdown().await;
        Ok(self.state.attach.take())
    }

    fn new_tui(&self) -> Result<Tui> {
        Ok(Tui::new()?
            .tick_rate(self.state.config.tick_rate)
            .frame_rate(self.state.config.frame_rate))
    }

    /// Popup first, then the active page, then global keys.
    fn handle_event(&mut self, e: Event) -> Result<()> {
        let tx = self.action_tx.clone();
        let forward = |response: Option<EventResponse<Action>>| match response {
            Some(EventResponse::Continue(action)) => {
                tx.send(action).ok();
                false
            }
            Some(EventResponse::Stop(action)) => {
                tx.send(action).ok();
                true
            }
            None => false,
        };

        if let Some(popup) = self.popup.as_mut() {
            let response = popup.handle_events(e.clone(), &mut self.state)?;
            // a popup is modal: keys never fall through to the page
            if forward(response) || matches!(e, Event::Key(_)) {
                return Ok(());
            }
        }

        match e {
            Event::Key(key) => {
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                if let Some(page) = self.pages.get_mut(self.active_page).filter(|_| !ctrl) {
                    if let Some(action) = page.handle_key_events(key, &mut self.state)? {
                        self.action_tx.send(action)?;
                        return Ok(());
                    }
                }
                if let Some(action) = self.global_key(key) {
                    self.action_tx.send(action)?;
                }
            }
            Event::Quit => self.action_tx.send(Action::Quit)?,
            Event::Tick => self.action_tx.send(Action::Tick)?,
            Event::Render => self.action_tx.send(Action::Render)?,
            Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
            _ => {}
        }
        Ok(())
    }

    fn global_key(&self, key: KeyEvent) -> Option<Action> {
        let pages = self.pages.len();
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
            KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Suspend)
            }
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Tab => Some(Action::Navigate((self.active_page + 1) % pages)),
            KeyCode::BackTab => Some(Action::Navigate((self.active_page + pages - 1) % pages)),
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                (idx < pages).then_some(Action::Navigate(idx))
            }
            _ => None,
        }
    }

    fn handle_action(&mut self, action: Action, tui: &mut Tui) -> Result<()> {
        if !matches!(action, Action::Tick | Action::Render) {
            debug!(?action, "action");
        }
        match &action {
            Action::Tick => {
                if self.terminate.load(Ordering::Relaxed) {
                    info!("termination signal received");
                    self.should_quit = true;
                }
            }
            Action::Quit => self.should_quit = true,
            Action::Suspend => self.should_suspend = true,
            Action::Resume => self.should_suspend = false,
            Action::Resize(w, h) => {
                tui.resize(Rect::new(0, 0, *w, *h))?;
                self.draw(tui)?;
            }
            Action::Render => self.draw(tui)?,
            Action::Refresh => match self.state.store.reload() {
                Ok(()) => self.state.info("catalog reloaded"),
                Err(err) => self.state.error(format!("reload failed: {err}")),
            },
            Action::Navigate(idx) => {
                if let Some(page) = self.pages.get(*idx) {
                    self.active_page = *idx;
                    self.status_bar.set_hints(page.hints());
                }
            }
            Action::Open(dialog) => match dialogs::open(dialog, &self.state) {
                Ok(popup) => self.popup = Some(popup),
                Err(err) => self.state.error(err.to_string()),
            },
            Action::RemoveHost(name) => {
                match self.state.store.update(|c| c.remove_host(name)) {
                    Ok(_) => self.state.info(format!("host `{name}` deleted")),
                    Err(err) => self.state.error(err.to_string()),
                }
            }
            Action::RemoveProfile(name) => {
                match self.state.store.update(|c| c.remove_group(name)) {
                    Ok(_) => self.state.info(format!("profile `{name}` deleted")),
                    Err(err) => self.state.error(err.to_string()),
                }
            }
            Action::Attach(session) => {
                info!(%session, "connected; attaching after exit");
                self.state.attach = Some(session.clone());
                self.should_quit = true;
            }
            Action::TaskFinished {
                id,
                result: Err(err),
            } => warn!(id, %err, "background task failed"),
            _ => {}
        }

        if let Some(popup) = self.popup.as_mut() {
            if let Some(next) = popup.update(action.clone(), &mut self.state)? {
                self.action_tx.send(next)?;
            }
        } else if let Some(page) = self.pages.get_mut(self.active_page) {
            if let Some(next) = page.update(action.clone(), &mut self.state)? {
                self.action_tx.send(next)?;
            }
        }
        if let Some(next) = self.status_bar.update(action.clone(), &mut self.state)? {
            self.action_tx.send(next)?;
        }

        // Closing drops the popup, which cancels its form's liveness token.
        if action == Action::ClosePopup {
            self.popup = None;
            for page in self.pages.iter_mut() {
                page.update(Action::ClosePopup, &mut self.state)?;
            }
        }
        Ok(())
    }

    fn draw(&mut self, tui: &mut Tui) -> Result<()> {
        let tx = self.action_tx.clone();
        tui.draw(|f| {
            if let Err(err) = self.render(f) {
                tx.send(Action::Error(format!("Failed to draw: {err:?}"))).ok();
            }
        })?;
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let [tabs_area, page_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(2),
        ])
        .areas(frame.area());

        let titles: Vec<Line> = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, p)| Line::from(format!("{} {}", i + 1, p.name())))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.active_page)
            .style(Style::default().fg(Color::DarkGray))
            .highlight_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, tabs_area);

        if let Some(page) = self.pages.get_mut(self.active_page) {
            page.draw(frame, page_area, &self.state)?;
        }
        self.status_bar.draw(frame, status_area, &self.state)?;

        if let Some(popup) = self.popup.as_mut() {
            let area = frame.area();
            render_backdrop(frame, area);
            if let Some((w, h)) = popup.popup_min_size() {
                if area.width < w || area.height < h {
                    let msg = format!("Terminal too small for this dialog (needs {w}x{h})");
                    frame.render_widget(
                        Paragraph::new(msg).style(Style::default().fg(Color::Yellow)).centered(),
                        area,
                    );
                    return Ok(());
                }
            }
            popup.draw(frame, area, &self.state)?;
        }
        Ok(())
    }

    /// Cancel background work, drop any open dialog and wait briefly for the
    /// task manager to finish.
    async fn shutdown(&mut self) {
        self.popup = None;
        self.root.cancel();
        self.state.tasks.shutdown().ok();
        if let Some(join) = self.tasks_join.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, join).await.is_err() {
                warn!("task manager did not stop in time");
            }
        }
        info!("shutdown complete");
    }
}
