use std::collections::BTreeMap;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use serde_json::{json, Value};
use shrike_core::browse::{BrowseContext, NamespaceBrowseState, SetInfo};
use shrike_core::dispatcher::{ExecutorError, QueryDispatcher, QueryExecutor, QueryRequest, RequestTicket};
use shrike_core::history::{FileQueryHistory, HistoryOutcome, HistoryRecord};
use shrike_core::notice::{NoticeCenter, NoticeKind};
use shrike_core::profiles::{ConnectionProfile, FileProfileStore};
use shrike_core::query_spec::{parse, ParseContext, QuerySpec};
use shrike_core::result_set::Record;
use shrike_core::session::NodeInfo;
use thiserror::Error;

const TICK_RATE: Duration = Duration::from_millis(120);
const QUERY_DURATION_TICKS: u8 = 6;
// Roughly three seconds at the tick rate, matching the old toast autohide.
const NOTICE_TICKS: u8 = 25;
const HISTORY_TAIL: usize = 50;

const SAMPLE_QUERIES: [&str; 6] = [
    r#"{"$pk": []}"#,
    r#"{"$pk": ["user-1"]}"#,
    r#"{"$pk": ["user-1", "user-2"], "$select": ["name", "age"]}"#,
    r#"{"$eq": {"city": "london"}}"#,
    r#"{"filter": {"kind": "click"}}"#,
    "{}",
];

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Connections,
    Cluster,
    Browse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WizardField {
    Nickname,
    Hosts,
    Username,
    Password,
    Port,
}

impl WizardField {
    fn next(self) -> Self {
        match self {
            Self::Nickname => Self::Hosts,
            Self::Hosts => Self::Username,
            Self::Username => Self::Password,
            Self::Password => Self::Port,
            Self::Port => Self::Nickname,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Nickname => Self::Port,
            Self::Hosts => Self::Nickname,
            Self::Username => Self::Hosts,
            Self::Password => Self::Username,
            Self::Port => Self::Password,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Nickname => "Nickname",
            Self::Hosts => "Hosts",
            Self::Username => "Username",
            Self::Password => "Password",
            Self::Port => "Port",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnectionForm {
    nickname: String,
    hosts: String,
    username: String,
    password: String,
    port: String,
    save_profile: bool,
    active_field: WizardField,
}

impl Default for ConnectionForm {
    fn default() -> Self {
        Self {
            nickname: "local".to_string(),
            hosts: "127.0.0.1:3000".to_string(),
            username: String::new(),
            password: String::new(),
            port: "3000".to_string(),
            save_profile: true,
            active_field: WizardField::Nickname,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    NextField,
    Submit,
    Scan,
    Back,
    Disconnect,
    ToggleSaveProfile,
    CycleSample(i8),
    Navigate(DirectionKey),
    Tick,
}

/// Fixture cluster backing the interactive shell. Queries run against it
/// with the same semantics the bridge would apply remotely.
#[derive(Debug, Clone, Default)]
struct DemoCluster;

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect::<BTreeMap<_, _>>()
}

impl DemoCluster {
    fn node_infos(&self) -> Vec<NodeInfo> {
        vec![NodeInfo {
            name: "BB9020011AC4202".to_string(),
            namespaces: vec!["test".to_string(), "bar".to_string()],
        }]
    }

    fn sets(&self, ns: &str) -> Vec<SetInfo> {
        match ns {
            "test" => vec![
                SetInfo::new("users", 3, 12_288),
                SetInfo::new("events", 4, 65_536),
            ],
            "bar" => vec![SetInfo::new("audit", 2, 8_192)],
            _ => Vec::new(),
        }
    }

    fn records(&self, ns: &str, set: &str) -> Vec<Record> {
        match (ns, set) {
            ("test", "users") => vec![
                record(&[
                    ("pk", json!("user-1")),
                    ("name", json!("ada")),
                    ("age", json!(36)),
                    ("city", json!("london")),
                ]),
                record(&[
                    ("pk", json!("user-2")),
                    ("name", json!("grace")),
                    ("age", json!(85)),
                    ("city", json!("nyc")),
                ]),
                record(&[
                    ("pk", json!("user-3")),
                    ("name", json!("linus")),
                    ("city", json!("helsinki")),
                ]),
            ],
            ("test", "events") => vec![
                record(&[("pk", json!(1)), ("kind", json!("click")), ("at", json!(17))]),
                record(&[("pk", json!(2)), ("kind", json!("view")), ("at", json!(19))]),
                record(&[("pk", json!(3)), ("kind", json!("click")), ("at", json!(23))]),
                record(&[("pk", json!(4)), ("kind", json!("purchase"))]),
            ],
            ("bar", "audit") => vec![
                record(&[("pk", json!("a-1")), ("actor", json!("admin"))]),
                record(&[("pk", json!("a-2")), ("actor", json!("ops"))]),
            ],
            _ => Vec::new(),
        }
    }

    fn run(&self, spec: &QuerySpec, ns: &str, set: &str) -> Vec<Record> {
        let records = self.records(ns, set);
        match spec {
            QuerySpec::Scan => records,
            QuerySpec::PkLookup { keys, select } => records
                .into_iter()
                .filter(|row| row.get("pk").is_some_and(|pk| keys.contains(pk)))
                .map(|row| match select {
                    Some(fields) => row
                        .into_iter()
                        .filter(|(key, _)| fields.iter().any(|field| field == key))
                        .collect(),
                    None => row,
                })
                .collect(),
            QuerySpec::EqualityFilter { criteria } => records
                .into_iter()
                .filter(|row| {
                    criteria
                        .iter()
                        .all(|(field, value)| row.get(field) == Some(value))
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl QueryExecutor for DemoCluster {
    async fn query_set(&self, request: &QueryRequest) -> Result<Vec<Record>, ExecutorError> {
        Ok(self.run(&request.spec, &request.ns, &request.set))
    }

    async fn scan_set(&self, ns: &str, set: &str) -> Result<Vec<Record>, ExecutorError> {
        Ok(self.run(&QuerySpec::Scan, ns, set))
    }
}

#[derive(Debug)]
struct PendingQuery {
    ticket: RequestTicket,
    spec: QuerySpec,
    ticks_remaining: u8,
}

#[derive(Debug)]
struct TuiApp {
    cluster: DemoCluster,
    dispatcher: QueryDispatcher<DemoCluster>,
    profiles: Option<FileProfileStore>,
    history: Option<FileQueryHistory>,
    recent_history: Vec<HistoryRecord>,
    notices: NoticeCenter,
    parse_context: ParseContext,
    pane: Pane,
    form: ConnectionForm,
    connected_host: Option<String>,
    session_nodes: Vec<NodeInfo>,
    selected_namespace: usize,
    browse: Option<NamespaceBrowseState>,
    query_editor_text: String,
    sample_index: usize,
    pending: Option<PendingQuery>,
    should_quit: bool,
    show_help: bool,
    status_line: String,
}

impl Default for TuiApp {
    fn default() -> Self {
        let parse_context = ParseContext::default();
        Self {
            cluster: DemoCluster,
            dispatcher: QueryDispatcher::new(DemoCluster),
            profiles: None,
            history: None,
            recent_history: Vec::new(),
            notices: NoticeCenter::new(NOTICE_TICKS),
            parse_context,
            pane: Pane::Connections,
            form: ConnectionForm::default(),
            connected_host: None,
            session_nodes: Vec::new(),
            selected_namespace: 0,
            browse: None,
            query_editor_text: parse_context.seed_document().to_string(),
            sample_index: 0,
            pending: None,
            should_quit: false,
            show_help: false,
            status_line: "Fill connection details and press Enter to connect".to_string(),
        }
    }
}

impl TuiApp {
    fn with_profiles(mut self, profiles: FileProfileStore) -> Self {
        self.profiles = Some(profiles);
        self
    }

    fn with_history(mut self, history: FileQueryHistory) -> Self {
        self.recent_history = history.recent(HISTORY_TAIL).unwrap_or_default();
        self.history = Some(history);
        self
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => self.show_help = !self.show_help,
            Msg::NextField => {
                if self.pane == Pane::Connections {
                    self.form.active_field = self.form.active_field.next();
                    self.status_line = format!("Field: {}", self.form.active_field.label());
                }
            }
            Msg::Submit => self.submit(),
            Msg::Scan => self.run_scan(),
            Msg::Back => self.leave_browse(),
            Msg::Disconnect => self.disconnect(),
            Msg::ToggleSaveProfile => {
                if self.pane == Pane::Connections {
                    self.form.save_profile = !self.form.save_profile;
                    self.status_line = if self.form.save_profile {
                        "Profile will be saved on connect".to_string()
                    } else {
                        "Connecting without saving a profile".to_string()
                    };
                }
            }
            Msg::CycleSample(step) => self.cycle_sample(step),
            Msg::Navigate(direction) => self.navigate(direction),
            Msg::Tick => self.on_tick(),
        }
    }

    fn submit(&mut self) {
        match self.pane {
            Pane::Connections => self.connect_from_form(),
            Pane::Cluster => self.enter_selected_namespace(),
            Pane::Browse => self.run_query(),
        }
    }

    fn connect_from_form(&mut self) {
        let Ok(port) = self.form.port.parse::<u16>() else {
            self.notices.error("port must be a number between 0 and 65535");
            return;
        };

        let mut profile = ConnectionProfile::new(self.form.nickname.clone(), self.form.hosts.clone());
        profile.port = port;
        if !self.form.username.is_empty() {
            profile.username = Some(self.form.username.clone());
        }
        if !self.form.password.is_empty() {
            profile.password = Some(self.form.password.clone());
        }

        // Saving is checked before anything session-like happens, so a
        // nickname collision cannot burn a connection attempt.
        if self.form.save_profile {
            if let Some(store) = &mut self.profiles {
                if let Err(error) = store.add(profile.clone()) {
                    self.notices.error(error.to_string());
                    return;
                }
                if let Err(error) = store.persist() {
                    self.notices.error(error.to_string());
                }
            }
        }

        self.session_nodes = self.cluster.node_infos();
        self.connected_host = Some(profile.hosts.clone());
        self.selected_namespace = 0;
        self.pane = Pane::Cluster;
        self.notices.success("Connected");
        self.status_line = format!("Connected to {}", profile.hosts);
    }

    fn namespaces(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for node in &self.session_nodes {
            for ns in &node.namespaces {
                if !seen.contains(ns) {
                    seen.push(ns.clone());
                }
            }
        }
        seen
    }

    fn enter_selected_namespace(&mut self) {
        let namespaces = self.namespaces();
        let Some(ns) = namespaces.get(self.selected_namespace) else {
            self.status_line = "No namespace selected".to_string();
            return;
        };
        let browse = NamespaceBrowseState::from_sets(ns.clone(), self.cluster.sets(ns));
        self.browse = Some(browse);
        self.query_editor_text = self.parse_context.seed_document().to_string();
        self.sample_index = 0;
        self.pane = Pane::Browse;
        self.status_line = format!("Browsing namespace {ns}");
    }

    fn leave_browse(&mut self) {
        if self.pane != Pane::Browse {
            return;
        }
        // Anything still in flight for this screen must arrive as a no-op.
        self.dispatcher.invalidate();
        self.browse = None;
        self.pane = Pane::Cluster;
        self.status_line = "Back to cluster view".to_string();
    }

    fn disconnect(&mut self) {
        if self.connected_host.is_none() {
            return;
        }
        self.dispatcher.invalidate();
        self.browse = None;
        self.session_nodes.clear();
        self.connected_host = None;
        self.pane = Pane::Connections;
        self.notices.success("Disconnected");
        self.status_line = "Disconnected".to_string();
    }

    fn cycle_sample(&mut self, step: i8) {
        if self.pane != Pane::Browse {
            return;
        }
        let len = SAMPLE_QUERIES.len();
        self.sample_index = if step >= 0 {
            (self.sample_index + 1) % len
        } else {
            (self.sample_index + len - 1) % len
        };
        self.query_editor_text = SAMPLE_QUERIES[self.sample_index].to_string();
        self.status_line = format!("Sample query {}/{len}", self.sample_index + 1);
    }

    fn run_query(&mut self) {
        let document = self.query_editor_text.clone();
        match parse(&document, &self.parse_context) {
            Ok(spec) => self.dispatch(spec, &document),
            Err(error) => {
                self.record_history(&document, HistoryOutcome::Rejected, Some(error.to_string()));
                self.notices.error(error.to_string());
            }
        }
    }

    fn run_scan(&mut self) {
        if self.pane != Pane::Browse {
            return;
        }
        // Scans never pass through the document parser.
        self.dispatch(QuerySpec::Scan, "scan");
    }

    fn dispatch(&mut self, spec: QuerySpec, document: &str) {
        let Some(context) = self.browse.as_ref().and_then(NamespaceBrowseState::snapshot) else {
            self.status_line = "No set selected".to_string();
            return;
        };
        match self.dispatcher.begin(context) {
            Ok(ticket) => {
                self.record_history(document, HistoryOutcome::Accepted, None);
                self.status_line = format!("Running {} ...", spec.kind());
                self.pending = Some(PendingQuery {
                    ticket,
                    spec,
                    ticks_remaining: QUERY_DURATION_TICKS,
                });
            }
            Err(error) => self.notices.error(error.to_string()),
        }
    }

    fn record_history(&mut self, document: &str, outcome: HistoryOutcome, detail: Option<String>) {
        let (ns, set) = self
            .browse
            .as_ref()
            .and_then(NamespaceBrowseState::snapshot)
            .map_or_else(
                || (String::new(), String::new()),
                |context| (context.ns, context.set),
            );
        let record = HistoryRecord {
            timestamp_unix_ms: shrike_core::history::unix_timestamp_millis(),
            ns,
            set,
            document: document.to_string(),
            outcome,
            detail,
        };
        if let Some(history) = &self.history {
            if let Err(error) = history.append(&record) {
                self.status_line = format!("History write failed: {error}");
            }
        }
        self.recent_history.push(record);
        let excess = self.recent_history.len().saturating_sub(HISTORY_TAIL);
        if excess > 0 {
            self.recent_history.drain(..excess);
        }
    }

    fn on_tick(&mut self) {
        self.notices.tick();

        let Some(mut pending) = self.pending.take() else {
            return;
        };
        if pending.ticks_remaining > 0 {
            pending.ticks_remaining -= 1;
            self.pending = Some(pending);
            return;
        }

        let context: BrowseContext = pending.ticket.context().clone();
        let rows = self.cluster.run(&pending.spec, &context.ns, &context.set);
        match self.dispatcher.complete(pending.ticket, rows) {
            Some(results) => {
                let count = results.len();
                if let Some(browse) = &mut self.browse {
                    browse.attach_results(&context.set, results);
                }
                self.notices.success(format!("Got {count} record(s)"));
                self.status_line = format!("{}/{} ready", context.ns, context.set);
            }
            None => {
                // Stale ticket: the screen that issued it is gone.
                self.status_line = "Dropped a stale response".to_string();
            }
        }
    }

    fn navigate(&mut self, direction: DirectionKey) {
        match self.pane {
            Pane::Connections => {
                self.form.active_field = match direction {
                    DirectionKey::Up | DirectionKey::Left => self.form.active_field.previous(),
                    DirectionKey::Down | DirectionKey::Right => self.form.active_field.next(),
                };
                self.status_line = format!("Field: {}", self.form.active_field.label());
            }
            Pane::Cluster => {
                let count = self.namespaces().len();
                if count == 0 {
                    self.status_line = "No namespaces reported".to_string();
                    return;
                }
                self.selected_namespace = match direction {
                    DirectionKey::Up | DirectionKey::Left => self.selected_namespace.saturating_sub(1),
                    DirectionKey::Down | DirectionKey::Right => {
                        (self.selected_namespace + 1).min(count - 1)
                    }
                };
            }
            Pane::Browse => self.navigate_sets(direction),
        }
    }

    fn navigate_sets(&mut self, direction: DirectionKey) {
        let Some(browse) = &mut self.browse else {
            return;
        };
        let count = browse.sets().len();
        if count == 0 {
            self.status_line = "Namespace has no sets".to_string();
            return;
        }
        let target = match direction {
            DirectionKey::Up | DirectionKey::Left => browse.active_set_index().saturating_sub(1),
            DirectionKey::Down | DirectionKey::Right => {
                (browse.active_set_index() + 1).min(count - 1)
            }
        };
        if browse.select_set(target).is_ok() {
            if let Some(active) = browse.active_set() {
                self.status_line = format!("Set {} ({} objects)", active.set, active.objects);
            }
        }
    }

    fn pane_name(&self) -> &'static str {
        match self.pane {
            Pane::Connections => "Connections",
            Pane::Cluster => "Cluster",
            Pane::Browse => "Namespace",
        }
    }
}

#[must_use]
pub fn ui_name() -> &'static str {
    "shrike-tui"
}

pub fn run() -> Result<(), TuiError> {
    let mut app = TuiApp::default();
    if let Ok(store) = FileProfileStore::load_default() {
        app = app.with_profiles(store);
    }
    if let Ok(history) = FileQueryHistory::load_default() {
        app = app.with_history(history);
    }

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, app);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: TuiApp,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, &app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key) {
                        app.handle(message);
                    }
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.handle(Msg::Tick);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.pane_name()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!(
            "Host: {}",
            app.connected_host.as_deref().unwrap_or("not connected")
        )),
        Span::raw(" | "),
        Span::raw(format!(
            "Namespace: {}",
            app.browse
                .as_ref()
                .map_or("-", NamespaceBrowseState::ns)
        )),
        Span::raw(" | "),
        Span::raw(format!(
            "Query: {}",
            if app.pending.is_some() { "running" } else { "idle" }
        )),
    ]))
    .block(Block::default().borders(Borders::ALL).title("shrike"));
    frame.render_widget(header, chunks[0]);

    let body = Paragraph::new(body_lines(app, chunks[1]))
        .block(Block::default().borders(Borders::ALL).title("Workspace"))
        .alignment(Alignment::Left);
    frame.render_widget(body, chunks[1]);

    let toast_line = match app.notices.current() {
        Some(notice) => {
            let (marker, color) = match notice.kind {
                NoticeKind::Success => ("ok", Color::Green),
                NoticeKind::Error => ("error", Color::Red),
            };
            Line::from(Span::styled(
                format!("[{marker}] {}", notice.message),
                Style::default().fg(color),
            ))
        }
        None => Line::from(""),
    };
    let footer = Paragraph::new(vec![
        Line::from(keymap_line(app.pane)),
        Line::from(format!("Status: {}", app.status_line)),
        toast_line,
    ])
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(footer, chunks[2]);

    if app.show_help {
        render_help_popup(frame);
    }
}

fn body_lines(app: &TuiApp, area: Rect) -> Vec<Line<'static>> {
    match app.pane {
        Pane::Connections => {
            let fields = [
                (WizardField::Nickname, app.form.nickname.as_str()),
                (WizardField::Hosts, app.form.hosts.as_str()),
                (WizardField::Username, app.form.username.as_str()),
                (WizardField::Password, app.form.password.as_str()),
                (WizardField::Port, app.form.port.as_str()),
            ];

            let mut lines = vec![
                Line::from("Connect to a cluster"),
                Line::from("Enter: connect | p: toggle profile saving | Tab: next field"),
                Line::from(""),
            ];
            for (field, value) in fields {
                let marker = if app.form.active_field == field { ">" } else { " " };
                let shown = if field == WizardField::Password && !value.is_empty() {
                    "********"
                } else {
                    value
                };
                lines.push(Line::from(format!("{marker} {}: {shown}", field.label())));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "Save profile: {}",
                if app.form.save_profile { "yes" } else { "no" }
            )));

            if let Some(store) = &app.profiles {
                lines.push(Line::from(""));
                lines.push(Line::from("Saved profiles:"));
                if store.profiles().is_empty() {
                    lines.push(Line::from("  (none yet)"));
                }
                for profile in store.profiles() {
                    lines.push(Line::from(format!(
                        "  {} -> {}:{}",
                        profile.nickname, profile.hosts, profile.port
                    )));
                }
            }

            if !app.recent_history.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from("Recent queries:"));
                for entry in app.recent_history.iter().rev().take(5) {
                    lines.push(Line::from(format!(
                        "  {}/{} {:?}: {}",
                        entry.ns, entry.set, entry.outcome, entry.document
                    )));
                }
            }
            lines
        }
        Pane::Cluster => {
            let mut lines = vec![
                Line::from("Cluster nodes and namespaces"),
                Line::from("Enter: browse namespace | d: disconnect"),
                Line::from(""),
            ];
            for node in &app.session_nodes {
                lines.push(Line::from(format!("Node: {}", node.name)));
            }
            lines.push(Line::from(""));
            for (index, ns) in app.namespaces().iter().enumerate() {
                let marker = if index == app.selected_namespace { ">" } else { " " };
                lines.push(Line::from(format!("{marker} {ns}")));
            }
            lines
        }
        Pane::Browse => browse_lines(app, area),
    }
}

fn browse_lines(app: &TuiApp, area: Rect) -> Vec<Line<'static>> {
    let Some(browse) = &app.browse else {
        return vec![Line::from("No namespace entered")];
    };

    let mut lines = vec![
        Line::from("Enter: run query | s: scan | [ ]: sample query | b: back"),
        Line::from(""),
        Line::from(format!("Query: {}", app.query_editor_text)),
        Line::from(""),
    ];

    for (index, set) in browse.sets().iter().enumerate() {
        let marker = if index == browse.active_set_index() { ">" } else { " " };
        lines.push(Line::from(format!(
            "{marker} {} (count: {}, bytes: {})",
            set.set, set.objects, set.size_bytes
        )));
    }
    lines.push(Line::from(""));

    if let Some(active) = browse.active_set() {
        match &active.records {
            Some(results) if !results.is_empty() => {
                lines.push(Line::from(results.header_keys.join(" | ")));
                let visible = usize::from(area.height.saturating_sub(12)).max(1);
                for index in 0..results.len().min(visible) {
                    lines.push(Line::from(results.row_cells(index).join(" | ")));
                }
            }
            Some(_) => lines.push(Line::from("Query matched no records")),
            None => lines.push(Line::from("No records fetched yet")),
        }
    }
    lines
}

fn keymap_line(pane: Pane) -> &'static str {
    match pane {
        Pane::Connections => "q: quit | ?: help | Enter: connect | Tab: field | p: save toggle",
        Pane::Cluster => "q: quit | ?: help | Enter: browse | arrows: select | d: disconnect",
        Pane::Browse => "q: quit | Enter: run | s: scan | [ ]: samples | b: back | d: disconnect",
    }
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Global keymap"),
        Line::from("q: quit"),
        Line::from("?: toggle help"),
        Line::from("Enter: connect / browse namespace / run query (by view)"),
        Line::from("Tab: next connection field"),
        Line::from("p: toggle profile saving"),
        Line::from("s: scan the active set"),
        Line::from("[ and ]: cycle sample query documents"),
        Line::from("b: back to cluster view"),
        Line::from("d: disconnect"),
        Line::from("Arrows or hjkl: navigation"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(key: KeyEvent) -> Option<Msg> {
    match key.code {
        KeyCode::Char('q') => Some(Msg::Quit),
        KeyCode::Char('?') => Some(Msg::ToggleHelp),
        KeyCode::Tab => Some(Msg::NextField),
        KeyCode::Enter => Some(Msg::Submit),
        KeyCode::Char('s') => Some(Msg::Scan),
        KeyCode::Char('b') => Some(Msg::Back),
        KeyCode::Char('d') => Some(Msg::Disconnect),
        KeyCode::Char('p') => Some(Msg::ToggleSaveProfile),
        KeyCode::Char('[') => Some(Msg::CycleSample(-1)),
        KeyCode::Char(']') => Some(Msg::CycleSample(1)),
        KeyCode::Up | KeyCode::Char('k') => Some(Msg::Navigate(DirectionKey::Up)),
        KeyCode::Down | KeyCode::Char('j') => Some(Msg::Navigate(DirectionKey::Down)),
        KeyCode::Left | KeyCode::Char('h') => Some(Msg::Navigate(DirectionKey::Left)),
        KeyCode::Right | KeyCode::Char('l') => Some(Msg::Navigate(DirectionKey::Right)),
        _ => None,
    }
}
