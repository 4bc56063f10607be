use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use opass_core::{
    AppConfig, CredentialRedeemer, EventCatalog, EventSummary, FeatureEntry, HandshakeError,
    HandshakeState, LastEventState, ManifestClient, ManifestError, SessionController, UserInfo,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{
    spawn,
    sync::{mpsc, oneshot},
};
use tracing::{error, info, warn};

use crate::navigator::{new_stack, Screen, ScreenStack, UiNavigator};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_FIELD_LEN: usize = 128;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

pub(crate) enum AppEvent {
    Input(Event),
    Tick,
    Dismiss(oneshot::Sender<()>),
    EventsLoaded(Result<usize, ManifestError>),
    EventOpened(Result<String, ManifestError>),
    Handshake(HandshakeState),
    LoginFinished(Result<UserInfo, HandshakeError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginField {
    EventId,
    Token,
}

#[derive(Debug, Clone)]
struct LoginForm {
    event_id: String,
    token: String,
    focus: LoginField,
}

impl LoginForm {
    fn new(event_id: String) -> Self {
        let focus = if event_id.is_empty() {
            LoginField::EventId
        } else {
            LoginField::Token
        };
        Self {
            event_id,
            token: String::new(),
            focus,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::EventId => &mut self.event_id,
            LoginField::Token => &mut self.token,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::EventId => LoginField::Token,
            LoginField::Token => LoginField::EventId,
        };
    }

    fn insert(&mut self, ch: char) {
        let field = self.field_mut();
        if field.chars().count() < MAX_FIELD_LEN {
            field.push(ch);
        }
    }

    fn backspace(&mut self) {
        self.field_mut().pop();
    }

    fn is_complete(&self) -> bool {
        !self.event_id.trim().is_empty() && !self.token.trim().is_empty()
    }
}

struct UiState {
    events: Vec<EventSummary>,
    picker_cursor: usize,
    feature_cursor: usize,
    more_only: bool,
    filter: String,
    filtering: bool,
    status: String,
    handshake: HandshakeState,
    loading: bool,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            picker_cursor: 0,
            feature_cursor: 0,
            more_only: false,
            filter: String::new(),
            filtering: false,
            status: "Ready".to_string(),
            handshake: HandshakeState::Idle,
            loading: false,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn move_picker_cursor(&mut self, delta: isize) {
        self.picker_cursor = step(self.picker_cursor, delta, self.events.len());
    }

    fn move_feature_cursor(&mut self, delta: isize, total: usize) {
        self.feature_cursor = step(self.feature_cursor, delta, total);
    }

    fn selected_event(&self) -> Option<&EventSummary> {
        self.events.get(self.picker_cursor)
    }
}

fn step(cursor: usize, delta: isize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (cursor as isize + delta).clamp(0, total as isize - 1) as usize
}

/// Terminal frontend for browsing events and logging in.
pub struct OPassApp {
    config: AppConfig,
    catalog: EventCatalog,
    controller: Arc<SessionController>,
    screens: ScreenStack,
    state: UiState,
    login_form: Option<LoginForm>,
    pending_login: Option<(String, String)>,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: Option<mpsc::Receiver<AppEvent>>,
    theme: Theme,
}

impl OPassApp {
    pub fn new(
        config: AppConfig,
        client: Arc<dyn ManifestClient>,
        redeemer: Arc<dyn CredentialRedeemer>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<AppEvent>(128);
        let screens = new_stack();
        let navigator = Arc::new(UiNavigator::new(screens.clone(), event_tx.clone()));
        let controller = SessionController::new(
            Default::default(),
            client.clone(),
            redeemer,
            navigator,
            config.request_timeout(),
        )
        .with_last_event(LastEventState::new(config.state_path.clone()));

        Self {
            catalog: EventCatalog::new(client),
            controller: Arc::new(controller),
            screens,
            state: UiState::default(),
            login_form: None,
            pending_login: None,
            event_tx,
            event_rx: Some(event_rx),
            theme: Theme::default(),
            config,
        }
    }

    /// Run a login handshake as soon as the UI is up.
    pub fn queue_login(&mut self, event_id: String, token: String) {
        self.pending_login = Some((event_id, token));
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut event_rx = self
            .event_rx
            .take()
            .context("application is already running")?;

        if let Some(event_id) = self.controller.restore_last_event().await {
            info!(%event_id, "Reopened last event");
            self.push_screen(Screen::EventHome);
            self.state.set_status(format!("Reopened {event_id}"));
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        spawn_input_thread(self.event_tx.clone());
        self.forward_handshake_states();
        self.refresh_events();
        if let Some((event_id, token)) = self.pending_login.take() {
            self.start_login(event_id, token);
        }

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)
    }

    fn forward_handshake_states(&self) {
        let mut states = self.controller.subscribe();
        let sender = self.event_tx.clone();
        spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                if sender.send(AppEvent::Handshake(state)).await.is_err() {
                    break;
                }
            }
        });
    }

    fn top_screen(&self) -> Screen {
        self.screens
            .read()
            .last()
            .copied()
            .unwrap_or(Screen::EventPicker)
    }

    fn push_screen(&mut self, screen: Screen) {
        self.screens.write().push(screen);
    }

    fn pop_screen(&mut self) {
        let popped = {
            let mut screens = self.screens.write();
            if screens.len() > 1 {
                screens.pop()
            } else {
                None
            }
        };
        if popped == Some(Screen::LoginPrompt) {
            self.login_form = None;
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => true,
            Some(AppEvent::Dismiss(done)) => {
                self.pop_screen();
                let _ = done.send(());
                true
            }
            Some(AppEvent::EventsLoaded(result)) => {
                self.state.loading = false;
                match result {
                    Ok(total) => {
                        self.apply_filter();
                        self.state.set_status(format!("Loaded {total} events"));
                    }
                    Err(err) => {
                        error!(%err, "Event list refresh failed");
                        self.state.set_status(format!("Failed to load events: {err}"));
                    }
                }
                true
            }
            Some(AppEvent::EventOpened(result)) => {
                self.state.loading = false;
                match result {
                    Ok(event_id) => {
                        self.state.feature_cursor = 0;
                        if self.top_screen() == Screen::EventPicker {
                            self.push_screen(Screen::EventHome);
                        }
                        self.state.set_status(format!("Opened {event_id}"));
                    }
                    Err(err) => {
                        error!(%err, "Opening event failed");
                        self.state.set_status(format!("Failed to open event: {err}"));
                    }
                }
                true
            }
            Some(AppEvent::Handshake(state)) => {
                if let Some(message) = handshake_message(&state) {
                    self.state.set_status(message);
                }
                self.state.handshake = state;
                true
            }
            Some(AppEvent::LoginFinished(result)) => {
                match result {
                    Ok(user) => {
                        let event_id = self.controller.store().current_event_id();
                        self.state.feature_cursor = 0;
                        if self.top_screen() == Screen::EventPicker {
                            self.push_screen(Screen::EventHome);
                        }
                        self.state.set_status(format!(
                            "Signed in to {event_id} as {} ({})",
                            user.user_id,
                            if user.role.is_empty() { "no role" } else { user.role.as_str() }
                        ));
                    }
                    Err(HandshakeError::Superseded) => {}
                    Err(err) => {
                        warn!(%err, "Login failed");
                        self.state.set_status(format!("Login failed: {err}"));
                    }
                }
                true
            }
            None => false,
        }
    }

    fn apply_filter(&mut self) {
        self.state.events = self.catalog.events_matching(&self.state.filter);
        self.state.move_picker_cursor(0);
    }

    fn refresh_events(&mut self) {
        if self.state.loading {
            return;
        }
        self.state.loading = true;
        self.state.set_status("Loading events…");
        let catalog = self.catalog.clone();
        let sender = self.event_tx.clone();
        spawn(async move {
            let result = catalog.refresh().await.map(|events| events.len());
            let _ = sender.send(AppEvent::EventsLoaded(result)).await;
        });
    }

    fn open_selected_event(&mut self) {
        let Some(event) = self.state.selected_event().cloned() else {
            self.state.set_status("No event selected");
            return;
        };
        self.state.loading = true;
        self.state
            .set_status(format!("Opening {}…", event.label(&self.config.language)));
        let controller = self.controller.clone();
        let sender = self.event_tx.clone();
        spawn(async move {
            let result = controller
                .open_event(&event.event_id)
                .await
                .map(|manifest| manifest.event_id.clone());
            let _ = sender.send(AppEvent::EventOpened(result)).await;
        });
    }

    fn start_login(&mut self, event_id: String, token: String) {
        info!(%event_id, "Login requested");
        let controller = self.controller.clone();
        let sender = self.event_tx.clone();
        spawn(async move {
            let result = controller.login(&event_id, &token).await;
            let _ = sender.send(AppEvent::LoginFinished(result)).await;
        });
    }

    fn prompt_login(&mut self) {
        let event_id = match self.top_screen() {
            Screen::EventPicker => self
                .state
                .selected_event()
                .map(|event| event.event_id.clone())
                .unwrap_or_default(),
            _ => self.controller.store().current_event_id(),
        };
        self.login_form = Some(LoginForm::new(event_id));
        self.push_screen(Screen::LoginPrompt);
    }

    fn switch_event(&mut self) {
        let controller = self.controller.clone();
        spawn(async move { controller.leave_event().await });
        self.state.more_only = false;
        self.screens.write().truncate(1);
        self.login_form = None;
        self.state.set_status("Select an event");
    }

    fn current_entries(&self) -> Vec<FeatureEntry> {
        self.controller
            .store()
            .listing(&self.config.language)
            .map(|listing| {
                if self.state.more_only {
                    listing.menu_entries().into_iter().cloned().collect()
                } else {
                    listing.entries().to_vec()
                }
            })
            .unwrap_or_default()
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        match self.top_screen() {
            Screen::EventPicker => self.handle_picker_key(key),
            Screen::EventHome => self.handle_home_key(key),
            Screen::FeatureDetail(_) => self.handle_detail_key(key),
            Screen::LoginPrompt => self.handle_login_key(key),
        }
        Ok(())
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        if self.state.filtering {
            match key.code {
                KeyCode::Esc => {
                    self.state.filtering = false;
                    self.state.filter.clear();
                    self.apply_filter();
                }
                KeyCode::Enter => self.state.filtering = false,
                KeyCode::Backspace => {
                    self.state.filter.pop();
                    self.apply_filter();
                }
                KeyCode::Char(ch) => {
                    self.state.filter.push(ch);
                    self.apply_filter();
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.move_picker_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_picker_cursor(-1),
            KeyCode::Char('/') => {
                self.state.filtering = true;
                self.state.set_status("Type to filter, Enter to keep, Esc to clear");
            }
            KeyCode::Char('r') => self.refresh_events(),
            KeyCode::Char('l') => self.prompt_login(),
            KeyCode::Enter => self.open_selected_event(),
            _ => {}
        }
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        let entries = self.current_entries();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.pop_screen(),
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.move_feature_cursor(1, entries.len())
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.move_feature_cursor(-1, entries.len())
            }
            KeyCode::Char('l') => self.prompt_login(),
            KeyCode::Char('s') => self.switch_event(),
            KeyCode::Char('m') => {
                self.state.more_only = !self.state.more_only;
                self.state.feature_cursor = 0;
            }
            KeyCode::Enter => {
                let index = self.state.feature_cursor;
                let Some(entry) = entries.get(index) else {
                    return;
                };
                if !entry.interactive {
                    let role = self.controller.store().context().role;
                    self.state
                        .set_status(format!("{} is not available for role {role}", entry.label));
                } else if entry.url.is_none() {
                    self.state
                        .set_status(format!("{} has no link", display_label(entry)));
                } else {
                    self.push_screen(Screen::FeatureDetail(index));
                }
            }
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace) {
            self.pop_screen();
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        let Some(form) = self.login_form.as_mut() else {
            self.pop_screen();
            return;
        };
        match key.code {
            KeyCode::Esc => self.pop_screen(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.toggle_focus(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => form.insert(ch),
            KeyCode::Enter => {
                if !form.is_complete() {
                    self.state.set_status("Event id and token are required");
                    return;
                }
                let event_id = form.event_id.trim().to_string();
                let token = form.token.trim().to_string();
                self.start_login(event_id, token);
            }
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        let screens = self.screens.read().clone();
        let base = screens
            .iter()
            .rev()
            .find(|screen| **screen != Screen::LoginPrompt)
            .copied()
            .unwrap_or(Screen::EventPicker);
        match base {
            Screen::EventPicker => self.render_picker(frame, chunks[0]),
            Screen::EventHome => self.render_home(frame, chunks[0]),
            Screen::FeatureDetail(index) => self.render_detail(frame, chunks[0], index),
            Screen::LoginPrompt => {}
        }
        self.render_status(frame, chunks[1]);

        if screens.last() == Some(&Screen::LoginPrompt) {
            if let Some(form) = &self.login_form {
                self.render_login(frame, area, form);
            }
        }
    }

    fn render_picker(&self, frame: &mut Frame, area: Rect) {
        let language = &self.config.language;
        let items: Vec<ListItem> = self
            .state
            .events
            .iter()
            .map(|event| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        event.label(language),
                        Style::default().fg(self.theme.primary_fg),
                    ),
                    Span::styled(
                        format!("  {}", event.event_id),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();

        let title = if self.state.filtering || !self.state.filter.is_empty() {
            format!("Events (filter: {})", self.state.filter)
        } else {
            "Events".to_string()
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        if !self.state.events.is_empty() {
            list_state.select(Some(self.state.picker_cursor));
        }
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_home(&self, frame: &mut Frame, area: Rect) {
        let store = self.controller.store();
        let Some(manifest) = store.manifest() else {
            let empty = Paragraph::new("No event loaded")
                .block(Block::default().borders(Borders::ALL).title("Event"));
            frame.render_widget(empty, area);
            return;
        };
        let language = &self.config.language;
        let title = match manifest.display_name.get(language) {
            "" => manifest.event_id.clone(),
            name => name.to_string(),
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let session = match store.user_info() {
            Some(user) if store.is_authenticated() => Line::from(Span::styled(
                format!("Signed in as {} · role {}", user.user_id, user.role),
                Style::default().fg(self.theme.success),
            )),
            _ => Line::from(Span::styled(
                "Not signed in · press l to log in",
                Style::default().fg(self.theme.warning),
            )),
        };
        frame.render_widget(
            Paragraph::new(session).block(Block::default().borders(Borders::ALL).title(title)),
            chunks[0],
        );

        let entries = self.current_entries();
        let items: Vec<ListItem> = entries
            .iter()
            .map(|entry| {
                let style = if entry.interactive {
                    Style::default().fg(self.theme.primary_fg)
                } else {
                    Style::default()
                        .fg(self.theme.muted)
                        .add_modifier(Modifier::DIM)
                };
                let suffix = match entry.kind {
                    Some(kind) => kind.to_string(),
                    None => format!("{} (unsupported)", entry.feature.kind),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(display_label(entry), style),
                    Span::styled(format!("  {suffix}"), Style::default().fg(self.theme.muted)),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(if self.state.more_only {
                "More (m for all features)"
            } else {
                "Features (m for more)"
            }))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        if !entries.is_empty() {
            list_state.select(Some(self.state.feature_cursor.min(entries.len() - 1)));
        }
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, index: usize) {
        let entries = self.current_entries();
        let Some(entry) = entries.get(index) else {
            frame.render_widget(
                Paragraph::new("Feature no longer available")
                    .block(Block::default().borders(Borders::ALL)),
                area,
            );
            return;
        };

        let mut lines = vec![
            Line::from(format!("Kind: {}", entry.feature.kind)),
            Line::from(match &entry.url {
                Some(url) => format!("URL: {url}"),
                None => "URL: (none)".to_string(),
            }),
        ];
        if let Some(icon) = &entry.feature.icon {
            lines.push(Line::from(format!("Icon: {icon}")));
        }
        if let Some(roles) = &entry.feature.visible_roles {
            let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
            lines.push(Line::from(format!("Roles: {}", roles.join(", "))));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Esc to go back",
            Style::default().fg(self.theme.muted),
        )));

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(display_label(entry)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_login(&self, frame: &mut Frame, area: Rect, form: &LoginForm) {
        let popup = centered_rect(56.min(area.width), 8.min(area.height), area);
        frame.render_widget(Clear, popup);

        let field = |label: &str, value: String, focused: bool| {
            let style = if focused {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            let cursor = if focused { "_" } else { "" };
            Line::from(vec![
                Span::styled(format!("{label:>9}: "), Style::default().fg(self.theme.muted)),
                Span::styled(format!("{value}{cursor}"), style),
            ])
        };
        let masked = "•".repeat(form.token.chars().count());
        let lines = vec![
            field(
                "Event",
                form.event_id.clone(),
                form.focus == LoginField::EventId,
            ),
            field("Token", masked, form.focus == LoginField::Token),
            Line::from(""),
            Line::from(Span::styled(
                "Tab switch field · Enter log in · Esc cancel",
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Log in"))
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, popup);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let color = match self.state.handshake {
            HandshakeState::Failed(_) => self.theme.danger,
            HandshakeState::Authenticated => self.theme.success,
            HandshakeState::Idle => self.theme.primary_fg,
            _ => self.theme.warning,
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            self.state.status.clone(),
            Style::default().fg(color),
        )))
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn display_label(entry: &FeatureEntry) -> String {
    if entry.label.is_empty() {
        entry.feature.kind.clone()
    } else {
        entry.label.clone()
    }
}

fn handshake_message(state: &HandshakeState) -> Option<String> {
    match state {
        HandshakeState::Unwinding => Some("Returning to event list…".to_string()),
        HandshakeState::LoadingEvent => Some("Loading event…".to_string()),
        HandshakeState::Redeeming => Some("Redeeming token…".to_string()),
        HandshakeState::Idle | HandshakeState::Authenticated | HandshakeState::Failed(_) => None,
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        let event = match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => AppEvent::Input(evt),
                Err(_) => break,
            },
            Ok(false) => AppEvent::Tick,
            Err(_) => break,
        };
        if sender.blocking_send(event).is_err() {
            break;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_steps_are_clamped() {
        assert_eq!(step(0, -1, 3), 0);
        assert_eq!(step(2, 1, 3), 2);
        assert_eq!(step(1, 1, 3), 2);
        assert_eq!(step(5, 0, 0), 0);
        assert_eq!(step(5, 0, 2), 1);
    }

    #[test]
    fn login_form_edits_focused_field() {
        let mut form = LoginForm::new(String::new());
        assert_eq!(form.focus, LoginField::EventId);
        for ch in "SITCON".chars() {
            form.insert(ch);
        }
        form.toggle_focus();
        form.insert('t');
        form.insert('x');
        form.backspace();
        assert_eq!(form.event_id, "SITCON");
        assert_eq!(form.token, "t");
        assert!(form.is_complete());

        let prefilled = LoginForm::new("COSCUP".to_string());
        assert_eq!(prefilled.focus, LoginField::Token);
        assert!(!prefilled.is_complete());
    }
}
