mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::chat::ChatManager;
use crate::config::ProgressConfig;
use crate::models::{DeliveryStatus, MessageRole, TabType};
use crate::progress::{self, Milestone, ProgressSummary, WeeklySummary};
use crate::reconciler::{ChatTransport, SendRequest};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Chat,
    Tracks,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Chat,
            View::Chat => View::Tracks,
            View::Tracks => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Tracks,
            View::Chat => View::Dashboard,
            View::Tracks => View::Chat,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// Per-tab figures for the chat tab bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabBadge {
    pub tab: TabType,
    pub count: usize,
    pub unresolved: bool,
}

/// Work the key handler cannot finish synchronously.
enum Pending {
    Deliver(SendRequest),
    Retry(String),
    LoadHistory(TabType),
}

pub struct App<'a> {
    pub store: &'a mut Store,
    transport: &'a dyn ChatTransport,
    progress_config: ProgressConfig,
    pub view: View,
    pub tracks: StatefulList<String>,
    pub summary: ProgressSummary,
    pub milestones: Vec<Milestone>,
    pub weeks: Vec<WeeklySummary>,
    pub tab_badges: Vec<TabBadge>,
    pub loading: bool,
    pub input: String,
    pub input_mode: bool,
    pub notice: Option<String>,
    pending: Option<Pending>,
    pub should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(
        store: &'a mut Store,
        transport: &'a dyn ChatTransport,
        progress_config: ProgressConfig,
    ) -> Self {
        let mut app = Self {
            summary: progress::summary(store),
            store,
            transport,
            progress_config,
            view: View::Dashboard,
            tracks: StatefulList::with_items(Vec::new()),
            milestones: Vec::new(),
            weeks: Vec::new(),
            tab_badges: Vec::new(),
            loading: false,
            input: String::new(),
            input_mode: false,
            notice: None,
            pending: None,
            should_quit: false,
        };
        app.refresh_data();
        app.refresh_chat();
        app
    }

    pub fn refresh_chat(&mut self) {
        let chat = self.chat();
        let badges = TabType::ALL
            .iter()
            .map(|&tab| TabBadge {
                tab,
                count: chat.get_message_count(tab),
                unresolved: chat.has_unread_messages(tab),
            })
            .collect();
        let loading = chat.is_loading();
        self.tab_badges = badges;
        self.loading = loading;
    }

    pub fn refresh_data(&mut self) {
        let selected = self.tracks.selected;
        self.tracks =
            StatefulList::with_items(self.store.tracks().map(|t| t.track_id.clone()).collect());
        if let Some(i) = selected.filter(|i| *i < self.tracks.items.len()) {
            self.tracks.selected = Some(i);
        }
        self.summary = progress::summary(self.store);
        self.milestones = progress::next_milestones(self.store);
        self.weeks = progress::weekly_progress(self.store);
    }

    pub fn selected_track(&self) -> Option<&str> {
        self.tracks.selected_item().map(String::as_str)
    }

    pub fn progress_config(&self) -> &ProgressConfig {
        &self.progress_config
    }

    fn chat(&mut self) -> ChatManager<'_, dyn ChatTransport + 'a> {
        ChatManager::new(&mut *self.store, self.transport)
    }

    fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        match self.chat().prepare_send(&text) {
            Ok(request) => {
                self.notice = None;
                self.pending = Some(Pending::Deliver(request));
            }
            Err(e) => {
                self.input = text;
                self.notice = Some(e.to_string());
            }
        }
    }

    fn retry_last_failed(&mut self) {
        let tab = self.store.active_tab();
        let failed = self
            .store
            .messages(tab)
            .iter()
            .rev()
            .find(|m| m.status == DeliveryStatus::Failed && m.role == MessageRole::User)
            .map(|m| m.client_id.clone());
        match failed {
            Some(client_id) => self.pending = Some(Pending::Retry(client_id)),
            None => self.notice = Some("Nothing to retry.".to_string()),
        }
    }

    /// Runs whatever the last key press queued. The pending message has
    /// already been drawn by the time this is awaited.
    async fn run_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let result = match pending {
            Pending::Deliver(request) => self.chat().deliver(&request).await.map(|_| ()),
            Pending::Retry(client_id) => self.chat().retry_message(&client_id).await.map(|_| ()),
            Pending::LoadHistory(tab) => self.chat().load_history(tab).await.map(|_| ()),
        };
        // Transport failures already show as the tab error
        if let Err(e) = result {
            tracing::debug!(error = %e, "chat action failed");
        }
    }

    fn handle_input_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.input_mode = false,
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if self.input_mode {
            self.handle_input_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                if self.view == View::Chat {
                    self.pending = Some(Pending::LoadHistory(self.store.active_tab()));
                } else {
                    self.refresh_data();
                }
            }

            KeyCode::Char('h') | KeyCode::Left => self.view = self.view.prev(),
            KeyCode::Char('l') | KeyCode::Right => self.view = self.view.next(),

            // Chat tabs
            KeyCode::Tab if self.view == View::Chat => {
                let next = self.store.active_tab().next();
                self.chat().switch_tab(next);
            }
            KeyCode::Char(c @ '1'..='4') if self.view == View::Chat => {
                let index = c as usize - '1' as usize;
                self.chat().switch_tab(TabType::ALL[index]);
            }
            KeyCode::Char('i') | KeyCode::Enter if self.view == View::Chat => {
                self.input_mode = true;
                self.notice = None;
            }
            KeyCode::Char('r') if self.view == View::Chat => self.retry_last_failed(),
            KeyCode::Esc if self.view == View::Chat => {
                self.notice = None;
                self.chat().clear_error();
            }

            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::BackTab => self.view = self.view.prev(),

            KeyCode::Char('j') | KeyCode::Down if self.view == View::Tracks => self.tracks.next(),
            KeyCode::Char('k') | KeyCode::Up if self.view == View::Tracks => {
                self.tracks.previous()
            }

            _ => {}
        }
    }
}

pub async fn run(
    store: &mut Store,
    transport: &dyn ChatTransport,
    progress_config: ProgressConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, transport, progress_config);

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.refresh_chat();
        terminal.draw(|f| ui::draw(f, app))?;

        if app.pending.is_some() {
            app.run_pending().await;
            app.refresh_data();
            continue;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::reconciler::test_transport::ScriptedTransport;
    use crate::store::SendReceipt;

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[test]
    fn view_cycles() {
        assert_eq!(View::Dashboard.next(), View::Chat);
        assert_eq!(View::Dashboard.prev(), View::Tracks);
        assert_eq!(View::Tracks.next(), View::Dashboard);
    }

    #[test]
    fn stateful_list_wraps() {
        let mut list = StatefulList::with_items(vec!["a", "b"]);
        list.next();
        list.next();
        assert_eq!(list.selected, Some(0));
        list.previous();
        assert_eq!(list.selected_item(), Some(&"b"));

        let mut empty: StatefulList<&str> = StatefulList::with_items(vec![]);
        empty.next();
        assert_eq!(empty.selected, None);
    }

    #[tokio::test]
    async fn typed_message_is_pending_until_delivered() {
        let mut store = Store::new();
        let transport = ScriptedTransport::with(vec![Ok(SendReceipt::default())]);
        let mut app = App::new(&mut store, &transport, ProgressConfig::default());

        app.handle_key(KeyCode::Char('l'), KeyModifiers::NONE);
        assert_eq!(app.view, View::Chat);
        app.handle_key(KeyCode::Char('i'), KeyModifiers::NONE);
        type_text(&mut app, "hello");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        assert!(app.input.is_empty());
        assert_eq!(
            app.store.messages(TabType::Home)[0].status,
            DeliveryStatus::Pending
        );
        assert!(transport.sent.borrow().is_empty());

        app.run_pending().await;
        assert_eq!(app.store.messages(TabType::Home)[0].status, DeliveryStatus::Sent);
        assert_eq!(transport.sent.borrow().len(), 1);
    }

    #[tokio::test]
    async fn retry_key_resends_failed_message() {
        let mut store = Store::new();
        let transport = ScriptedTransport::with(vec![
            Err(ApiError::RateLimited),
            Ok(SendReceipt::default()),
        ]);
        let mut app = App::new(&mut store, &transport, ProgressConfig::default());
        app.view = View::Chat;
        app.input_mode = true;
        type_text(&mut app, "again");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        app.run_pending().await;
        assert!(app.store.error(TabType::Home).is_some());

        app.input_mode = false;
        app.handle_key(KeyCode::Char('r'), KeyModifiers::NONE);
        app.run_pending().await;
        assert_eq!(app.store.messages(TabType::Home)[0].status, DeliveryStatus::Sent);
        assert!(app.store.error(TabType::Home).is_none());
    }

    #[tokio::test]
    async fn tab_badges_track_unresolved_messages() {
        let mut store = Store::new();
        let transport = ScriptedTransport::with(vec![Err(ApiError::Network("down".into()))]);
        let mut app = App::new(&mut store, &transport, ProgressConfig::default());
        app.view = View::Chat;
        app.input_mode = true;
        type_text(&mut app, "hi");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        app.refresh_chat();
        assert!(app.loading);
        assert_eq!(
            app.tab_badges[0],
            TabBadge {
                tab: TabType::Home,
                count: 1,
                unresolved: true
            }
        );
        assert!(!app.tab_badges[1].unresolved);

        app.run_pending().await;
        app.refresh_chat();
        assert!(!app.loading);
        assert!(app.tab_badges[0].unresolved);
    }

    #[test]
    fn empty_input_shows_notice() {
        let mut store = Store::new();
        let transport = ScriptedTransport::default();
        let mut app = App::new(&mut store, &transport, ProgressConfig::default());
        app.view = View::Chat;
        app.input_mode = true;
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert!(app.notice.is_some());
        assert!(app.pending.is_none());
    }

    #[test]
    fn number_keys_switch_chat_tabs() {
        let mut store = Store::new();
        let transport = ScriptedTransport::default();
        let mut app = App::new(&mut store, &transport, ProgressConfig::default());
        app.view = View::Chat;
        app.handle_key(KeyCode::Char('3'), KeyModifiers::NONE);
        assert_eq!(app.store.active_tab(), TabType::Review);
        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.store.active_tab(), TabType::Explore);
    }
}
