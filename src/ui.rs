use anyhow::Result;
use building_register::{
    AddressSearchResponse, Field, FormState, LookupKind, LookupResult, RegisterOutcome, RegistryRecord,
    ResultView, Services,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

const PAGE_JUMP: usize = 20;

/// Results of background lookups, handed back to the draw loop
#[derive(Debug)]
pub enum Message {
    Address(LookupResult<AddressSearchResponse>),
    Register(LookupResult<RegisterOutcome>),
}

pub struct App {
    pub form: FormState,
    pub state: TableState,
    pub show_detail: bool,
    services: Services,
    runtime: Handle,
    export_dir: PathBuf,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
}

impl App {
    pub fn new(form: FormState, services: Services, runtime: Handle, export_dir: PathBuf) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            form,
            state: TableState::default(),
            show_detail: false,
            services,
            runtime,
            export_dir,
            tx,
            rx,
        }
    }

    pub fn search_address(&mut self) {
        let Some(keyword) = self.form.begin_address_search() else {
            return;
        };
        let services = self.services.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = services.address.search(&keyword).await;
            let _ = tx.send(Message::Address(result));
        });
    }

    pub fn search_register(&mut self) {
        let Some((kind, query)) = self.form.begin_register_search() else {
            return;
        };
        let services = self.services.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = services.lookup(kind, &query).await;
            let _ = tx.send(Message::Register(result));
        });
    }

    pub fn apply(&mut self, message: Message) {
        match message {
            Message::Address(result) => self.form.finish_address_search(result),
            Message::Register(result) => {
                self.form.finish_register_search(result);
                self.reset_selection();
            }
        }
    }

    /// Apply whatever the background tasks finished since the last frame
    pub fn drain_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    pub fn export(&mut self) {
        if let Err(e) = self.form.export_csv(&self.export_dir) {
            tracing::error!(error = %e, "CSV export failed");
            self.form.error = Some(format!("CSV export failed: {e}"));
        }
    }

    fn reset_selection(&mut self) {
        if self.form.has_result() {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn next_view(&mut self) {
        self.form.next_view();
        self.reset_selection();
    }

    pub fn previous_view(&mut self) {
        self.form.previous_view();
        self.reset_selection();
    }

    pub fn selected_record(&self) -> Option<&RegistryRecord> {
        self.state
            .selected()
            .and_then(|i| self.form.current_records().get(i))
    }

    pub fn next(&mut self) {
        let len = self.form.current_records().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.form.current_records().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.form.current_records().len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + PAGE_JUMP).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE_JUMP));
        self.state.select(Some(i));
    }

    /// Returns true when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Tab => self.form.focus_next(),
            KeyCode::BackTab => self.form.focus_previous(),
            KeyCode::F(2) => self.form.toggle_kind(),
            KeyCode::F(5) => self.search_register(),
            KeyCode::F(8) => self.export(),
            KeyCode::Enter => match self.form.focus {
                Field::Keyword => self.search_address(),
                Field::Results => self.show_detail = !self.show_detail,
                _ => self.search_register(),
            },
            _ if self.form.focus == Field::Results => self.handle_results_key(key),
            KeyCode::Char(c) => self.form.input_char(c),
            KeyCode::Backspace => self.form.backspace(),
            _ => {}
        }
        false
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.state.select(Some(0)),
            KeyCode::End => {
                let len = self.form.current_records().len();
                if len > 0 {
                    self.state.select(Some(len - 1));
                }
            }
            KeyCode::Right | KeyCode::Char('l') => self.next_view(),
            KeyCode::Left | KeyCode::Char('h') => self.previous_view(),
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.drain_messages();
        terminal.draw(|f| ui(f, app))?;

        // Poll so finished lookups are picked up without a key press
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with lookup kind + result tabs
            Constraint::Length(3), // Address search
            Constraint::Length(1), // Address notice / error
            Constraint::Length(3), // Registry codes
            Constraint::Length(1), // Lookup notice / error
            Constraint::Min(0),    // Results
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_address(f, chunks[1], app);
    render_message(f, chunks[2], app.form.address_error.as_deref(), app.form.address_notice.as_deref());
    render_codes(f, chunks[3], app);
    render_message(f, chunks[4], app.form.error.as_deref(), app.form.notice.as_deref());

    if app.show_detail && app.form.focus == Field::Results {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[5]);
        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[5], app);
    }

    render_status_bar(f, chunks[6], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.form;
    let mut spans = vec![
        Span::styled("건축물대장 조회", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("  |  "),
    ];

    for (i, kind) in [LookupKind::Title, LookupKind::Full].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *kind == form.kind {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(kind.label(), style));
    }

    spans.push(Span::raw("  |  "));
    for (i, view) in ResultView::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        let count = form.records(*view).len();
        let style = if *view == form.view {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{} ({})", view.title(), count), style));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
    f.render_widget(header, area);
}

fn input_block(field: Field, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(format!(" {} ", field.label()))
}

fn render_address(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.form;
    let focused = form.focus == Field::Keyword;
    let mut spans = vec![Span::raw(form.keyword.clone())];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::raw("   "));
    if form.address_loading {
        spans.push(Span::styled("검색 중...", Style::default().fg(Color::DarkGray)));
    } else {
        spans.push(Span::styled("[Enter] 주소 검색", Style::default().fg(Color::Cyan)));
    }

    let input = Paragraph::new(Line::from(spans)).block(input_block(Field::Keyword, focused));
    f.render_widget(input, area);
}

fn render_codes(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.form;
    let fields = [Field::SigunguCd, Field::BjdongCd, Field::PlatGbCd, Field::Bun, Field::Ji];
    let mut constraints = vec![Constraint::Ratio(1, 6); fields.len()];
    constraints.push(Constraint::Ratio(1, 6));

    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let focused = form.focus == *field;
        let mut spans = vec![Span::raw(form.field_value(*field))];
        if focused && *field != Field::PlatGbCd {
            spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
        }
        let input = Paragraph::new(Line::from(spans)).block(input_block(*field, focused));
        f.render_widget(input, cells[i]);
    }

    let button = if form.loading {
        Span::styled("조회 중...", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled("[F5] 건축물대장 조회", Style::default().fg(Color::Cyan))
    };
    let action = Paragraph::new(Line::from(button)).block(Block::default().borders(Borders::ALL));
    f.render_widget(action, cells[fields.len()]);
}

fn render_message(f: &mut Frame, area: Rect, error: Option<&str>, notice: Option<&str>) {
    let line = match (error, notice) {
        (Some(error), _) => Line::from(Span::styled(format!(" ✗ {error}"), Style::default().fg(Color::Red))),
        (None, Some(notice)) => Line::from(Span::styled(format!(" {notice}"), Style::default().fg(Color::Green))),
        (None, None) => Line::from(""),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let columns = app.form.columns();
    let records = app.form.current_records();
    let focused = app.form.focus == Field::Results;
    let title = format!(" {} ({} rows) ", app.form.view.title(), records.len());
    let border = if focused { Color::Yellow } else { Color::White };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    if records.is_empty() {
        let text = if app.form.loading { "조회 중..." } else { "조회 결과가 없습니다." };
        let empty = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(Color::DarkGray))))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header_cells = columns.iter().map(|(_, label)| {
        Cell::from(label.clone()).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = records.iter().map(|record| {
        let cells = columns
            .iter()
            .map(|(key, _)| Cell::from(truncate(&record.text(key), 40)));
        Row::new(cells).height(1)
    });

    let n = columns.len().max(1) as u32;
    let widths = vec![Constraint::Ratio(1, n); columns.len()];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Detail ");

    let Some(record) = app.selected_record() else {
        f.render_widget(Paragraph::new("No record selected").block(block), area);
        return;
    };

    let lines: Vec<Line> = record
        .keys()
        .map(|key| {
            Line::from(vec![
                Span::styled(format!("  {key}: "), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::raw(record.text(key)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!("Focus: {}", app.form.focus.label()),
        Style::default().fg(Color::Cyan),
    )];

    let hints: [(&str, &str, Color); 7] = [
        ("Tab", " Field", Color::Yellow),
        ("Enter", " Search", Color::Yellow),
        ("F2", " Kind", Color::Yellow),
        ("F5", " Lookup", Color::Yellow),
        ("F8", " CSV", Color::Yellow),
        ("←/→", " Section", Color::Yellow),
        ("Esc", " Quit", Color::Red),
    ];
    for (key, label, color) in hints {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(color)));
        status_spans.push(Span::raw(label));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use building_register::{AppConfig, FullInfo};
    use crossterm::event::KeyEvent;
    use serde_json::json;

    fn app() -> App {
        let services = Services::from_config(&AppConfig::default());
        App::new(FormState::new(), services, Handle::current(), std::env::temp_dir())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn wait_for_message(app: &mut App) {
        for _ in 0..100 {
            if app.drain_messages() > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no message arrived");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("개포동", 5), "개포동");
        assert_eq!(truncate("서울특별시 강남구 개포동", 6), "서울특...");
    }

    #[tokio::test]
    async fn test_missing_key_reports_inline_error() {
        let mut app = app();
        assert!(!app.handle_key(key(KeyCode::Enter)));
        assert!(app.form.address_loading);

        wait_for_message(&mut app).await;
        assert!(!app.form.address_loading);
        assert_eq!(
            app.form.address_error.as_deref(),
            Some("JUSO_API_KEY is not configured")
        );
    }

    #[tokio::test]
    async fn test_keys_edit_focused_field() {
        let mut app = app();
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.form.focus, Field::SigunguCd);
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Char('9')));
        assert_eq!(app.form.sigungu_cd, "11689");

        app.handle_key(key(KeyCode::F(2)));
        assert_eq!(app.form.kind, LookupKind::Full);
        assert!(app.handle_key(key(KeyCode::Esc)));
    }

    #[tokio::test]
    async fn test_results_navigation_wraps() {
        let mut app = app();
        app.form.focus = Field::Results;
        app.apply(Message::Register(Ok(RegisterOutcome::Full(FullInfo {
            title_info: vec![
                RegistryRecord::from_json(json!({ "platPlc": "a" })),
                RegistryRecord::from_json(json!({ "platPlc": "b" })),
            ],
            ..FullInfo::default()
        }))));
        assert_eq!(app.state.selected(), Some(0));

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.state.selected(), Some(0));
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.selected_record().unwrap().text("platPlc"), "b");

        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.form.view, ResultView::Expos);
        assert_eq!(app.state.selected(), None);
    }
}
