use anyhow::Result;
use chrono::{Local, NaiveDate};
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
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rust_decimal::Decimal;
use std::io;
use std::time::{Duration, Instant};
use tax_records::view::{
    DeleteConfirm, FormKind, ListView, RecordForm, TaxYearWindow, YearPage, YearsPage,
};
use tax_records::{LineItem, Store, TaxYearLabel};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Years,
    YearDetail,
}

impl Page {
    pub fn title(&self) -> &str {
        match self {
            Page::Years => "Tax Years",
            Page::YearDetail => "Year Detail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Income,
    Expenses,
}

impl Section {
    fn toggle(self) -> Self {
        match self {
            Section::Income => Section::Expenses,
            Section::Expenses => Section::Income,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Browse,
    AddYear(String),
    Form(RecordForm),
}

pub struct YearDetail {
    pub page: YearPage,
    pub section: Section,
    pub income_state: TableState,
    pub expense_state: TableState,
}

pub struct App {
    store: Store,
    error_ttl: Duration,
    today: NaiveDate,
    pub current_page: Page,
    pub years: YearsPage,
    pub years_state: TableState,
    pub detail: Option<YearDetail>,
    pub mode: Mode,
    pub confirm: DeleteConfirm,
}

impl App {
    pub fn new(store: Store, error_ttl: Duration, today: NaiveDate) -> Self {
        let mut years = YearsPage::new(error_ttl);
        years.load(&store, Instant::now());

        let mut years_state = TableState::default();
        if !years.years.records().is_empty() {
            years_state.select(Some(0));
        }

        Self {
            store,
            error_ttl,
            today,
            current_page: Page::Years,
            years,
            years_state,
            detail: None,
            mode: Mode::Browse,
            confirm: DeleteConfirm::default(),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.years.tick(now);
        if let Some(detail) = self.detail.as_mut() {
            detail.page.tick(now);
        }
    }

    /// Handle one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::AddYear(buffer) => {
                self.handle_add_year_key(key, buffer, now);
                false
            }
            Mode::Form(form) => {
                self.handle_form_key(key, form, now);
                false
            }
            Mode::Browse if self.confirm.pending().is_some() => {
                self.handle_confirm_key(key, now);
                false
            }
            Mode::Browse => self.handle_browse_key(key, now),
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match (self.current_page, key.code) {
            (_, KeyCode::Char('q')) => return true,
            (Page::Years, KeyCode::Esc) => return true,
            (Page::Years, KeyCode::Down) => step(&mut self.years_state, self.years.years.records().len(), 1),
            (Page::Years, KeyCode::Up) => step(&mut self.years_state, self.years.years.records().len(), -1),
            (Page::Years, KeyCode::Enter) => self.open_selected_year(now),
            (Page::Years, KeyCode::Char('a')) => {
                self.mode = Mode::AddYear(TaxYearWindow::year_of(self.today).to_string())
            }
            (Page::Years, KeyCode::Char('d')) => {
                if let Some(year) = self.selected_year() {
                    self.confirm.request(year.id);
                }
            }
            (Page::YearDetail, KeyCode::Esc | KeyCode::Backspace) => self.close_year(now),
            (Page::YearDetail, KeyCode::Tab) => {
                if let Some(detail) = self.detail.as_mut() {
                    detail.section = detail.section.toggle();
                }
            }
            (Page::YearDetail, KeyCode::Down) => self.step_detail(1),
            (Page::YearDetail, KeyCode::Up) => self.step_detail(-1),
            (Page::YearDetail, KeyCode::Char('a')) => {
                if let Some(detail) = &self.detail {
                    let kind = match detail.section {
                        Section::Income => FormKind::Income,
                        Section::Expenses => FormKind::Expense,
                    };
                    self.mode = Mode::Form(RecordForm::new(kind, detail.page.year, self.today));
                }
            }
            (Page::YearDetail, KeyCode::Char('d')) => {
                if let Some(id) = self.detail.as_ref().and_then(selected_record_id) {
                    self.confirm.request(id);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let Some(id) = self.confirm.confirm() else {
                    return;
                };
                match (self.current_page, self.detail.as_mut()) {
                    (Page::YearDetail, Some(detail)) => {
                        match detail.section {
                            Section::Income => detail.page.delete_income(&self.store, id, now),
                            Section::Expenses => detail.page.delete_expense(&self.store, id, now),
                        }
                        clamp(&mut detail.income_state, detail.page.income.records().len());
                        clamp(&mut detail.expense_state, detail.page.expenses.records().len());
                    }
                    _ => {
                        self.years.delete_year(&self.store, id, now);
                        clamp(&mut self.years_state, self.years.years.records().len());
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.confirm.cancel(),
            _ => {}
        }
    }

    fn handle_add_year_key(&mut self, key: KeyEvent, mut buffer: String, now: Instant) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Enter => {
                match buffer.trim().parse::<i32>() {
                    Ok(year) => {
                        if self.years.add_year(&self.store, year, now) {
                            clamp(&mut self.years_state, self.years.years.records().len());
                            return;
                        }
                    }
                    Err(_) => self.years.years.raise(format!("Not a year: {buffer}"), now),
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() && buffer.len() < 4 => buffer.push(c),
            _ => {}
        }
        self.mode = Mode::AddYear(buffer);
    }

    fn handle_form_key(&mut self, key: KeyEvent, mut form: RecordForm, now: Instant) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Backspace => form.pop_char(),
            KeyCode::Enter => {
                if let Some(detail) = self.detail.as_mut() {
                    if detail.page.submit(&self.store, &mut form, now) {
                        clamp(&mut detail.income_state, detail.page.income.records().len());
                        clamp(&mut detail.expense_state, detail.page.expenses.records().len());
                        return;
                    }
                }
            }
            KeyCode::Char(c) => form.push_char(c),
            _ => {}
        }
        self.mode = Mode::Form(form);
    }

    fn selected_year(&self) -> Option<&tax_records::Year> {
        self.years_state
            .selected()
            .and_then(|i| self.years.years.records().get(i))
    }

    fn open_selected_year(&mut self, now: Instant) {
        let Some(year) = self.selected_year().map(|y| y.year) else {
            return;
        };

        let mut page = YearPage::new(year, self.error_ttl);
        page.load(&self.store, now);

        let mut income_state = TableState::default();
        clamp(&mut income_state, page.income.records().len());
        let mut expense_state = TableState::default();
        clamp(&mut expense_state, page.expenses.records().len());

        self.detail = Some(YearDetail {
            page,
            section: Section::Income,
            income_state,
            expense_state,
        });
        self.current_page = Page::YearDetail;
    }

    fn close_year(&mut self, now: Instant) {
        self.detail = None;
        self.current_page = Page::Years;
        self.years.load(&self.store, now);
        clamp(&mut self.years_state, self.years.years.records().len());
    }

    fn step_detail(&mut self, delta: isize) {
        if let Some(detail) = self.detail.as_mut() {
            match detail.section {
                Section::Income => step(&mut detail.income_state, detail.page.income.records().len(), delta),
                Section::Expenses => {
                    step(&mut detail.expense_state, detail.page.expenses.records().len(), delta)
                }
            }
        }
    }

    /// Banner currently shown, if any
    fn banner(&self) -> Option<&str> {
        let detail_banner = self.detail.as_ref().and_then(|d| {
            d.page
                .income
                .banner()
                .or_else(|| d.page.expenses.banner())
                .map(|b| b.message.as_str())
        });
        detail_banner.or_else(|| self.years.years.banner().map(|b| b.message.as_str()))
    }
}

fn selected_record_id(detail: &YearDetail) -> Option<uuid::Uuid> {
    match detail.section {
        Section::Income => selected_id(&detail.income_state, detail.page.income.records()),
        Section::Expenses => selected_id(&detail.expense_state, detail.page.expenses.records()),
    }
}

fn selected_id<R: LineItem>(state: &TableState, records: &[R]) -> Option<uuid::Uuid> {
    state.selected().and_then(|i| records.get(i)).map(LineItem::id)
}

/// Move a wrapping selection by `delta` rows.
fn step(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let i = match state.selected() {
        Some(i) => (i as isize + delta).rem_euclid(len as isize) as usize,
        None => 0,
    };
    state.select(Some(i));
}

/// Keep a selection valid after the list was reloaded.
fn clamp(state: &mut TableState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), len) if i >= len => state.select(Some(len - 1)),
        _ => {}
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.today = Local::now().date_naive();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key, Instant::now()) {
                    return Ok(());
                }
            }
        }
        app.tick(Instant::now());
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Years => render_years(f, chunks[1], app),
        Page::YearDetail => render_year_detail(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);

    match &app.mode {
        Mode::AddYear(buffer) => render_add_year(f, chunks[1], buffer),
        Mode::Form(form) => render_form(f, chunks[1], form),
        Mode::Browse => {}
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Years, Page::YearDetail];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    match &app.detail {
        Some(detail) => {
            let summary = &detail.page.summary;
            tab_spans.push(Span::styled(
                format!("Tax year {}", summary.label),
                Style::default().fg(Color::White),
            ));
            tab_spans.push(Span::raw("  "));
            tab_spans.push(Span::styled(
                format!("↑ {}", summary.income_count),
                Style::default().fg(Color::Green),
            ));
            tab_spans.push(Span::raw("  "));
            tab_spans.push(Span::styled(
                format!("↓ {}", summary.expense_count),
                Style::default().fg(Color::Red),
            ));
        }
        None => tab_spans.push(Span::styled(
            format!("Years: {}", app.years.years.records().len()),
            Style::default().fg(Color::White),
        )),
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn list_title<T>(name: &str, view: &ListView<T>) -> String {
    if view.is_loading() {
        format!(" {name} (loading...) ")
    } else {
        format!(" {name} ({}) ", view.records().len())
    }
}

fn render_years(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.years.years.records().iter().map(|year| {
        Row::new(vec![
            Cell::from(year.year.to_string()),
            Cell::from(year.label().to_string()),
            Cell::from(year.created.format("%Y-%m-%d").to_string()),
        ])
    });

    let table = Table::new(
        rows,
        [Constraint::Length(8), Constraint::Length(14), Constraint::Length(12)],
    )
    .header(header_row(&["Year", "Tax Year", "Created"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(list_title("Tax Years", &app.years.years)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.years_state);
}

fn render_year_detail(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(detail) = app.detail.as_mut() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),      // Summary
            Constraint::Percentage(50), // Income
            Constraint::Min(0),         // Expenses
        ])
        .split(area);

    render_summary(f, chunks[0], detail);

    let focused = |section: Section| {
        if detail.section == section {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        }
    };
    let income_border = focused(Section::Income);
    let expense_border = focused(Section::Expenses);

    let income_rows = detail.page.income.records().iter().map(|r| {
        let mut cells = record_cells(r, Color::Green);
        cells.push(Cell::from(money(r.tax_deductions)));
        Row::new(cells)
    });
    let income_table = Table::new(
        income_rows,
        [
            Constraint::Length(12),
            Constraint::Length(32),
            Constraint::Length(18),
            Constraint::Length(14),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&["Date", "Description", "Category", "Amount", "Deductions"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(income_border)
            .title(list_title("Income", &detail.page.income)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");
    f.render_stateful_widget(income_table, chunks[1], &mut detail.income_state);

    let expense_rows = detail
        .page
        .expenses
        .records()
        .iter()
        .map(|r| Row::new(record_cells(r, Color::Red)));
    let expense_table = Table::new(
        expense_rows,
        [
            Constraint::Length(12),
            Constraint::Length(32),
            Constraint::Length(18),
            Constraint::Length(14),
        ],
    )
    .header(header_row(&["Date", "Description", "Category", "Amount"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(expense_border)
            .title(list_title("Expenses", &detail.page.expenses)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");
    f.render_stateful_widget(expense_table, chunks[2], &mut detail.expense_state);
}

fn record_cells<R: LineItem>(record: &R, color: Color) -> Vec<Cell<'static>> {
    vec![
        Cell::from(record.date().to_string()),
        Cell::from(truncate(record.description(), 30)),
        Cell::from(truncate(record.category(), 16)),
        Cell::from(money(record.amount())).style(Style::default().fg(color)),
    ]
}

fn render_summary(f: &mut Frame, area: Rect, detail: &YearDetail) {
    let summary = &detail.page.summary;
    let net_color = if summary.is_net_positive() { Color::Green } else { Color::Red };

    let lines = vec![
        Line::from(vec![
            Span::styled("Income: ", Style::default().fg(Color::DarkGray)),
            Span::styled(money(summary.total_income), Style::default().fg(Color::Green)),
            Span::raw("   "),
            Span::styled("Expenses: ", Style::default().fg(Color::DarkGray)),
            Span::styled(money(summary.total_expenses), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("Deductions: ", Style::default().fg(Color::DarkGray)),
            Span::styled(money(summary.total_deductions), Style::default().fg(Color::Cyan)),
            Span::raw("   "),
            Span::styled("Net: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                money(summary.net_amount),
                Style::default().fg(net_color).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Summary {} ", summary.label)),
    );
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let status_spans = if let Some(message) = app.banner() {
        vec![Span::styled(
            format!(" ⚠ {message}"),
            Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD),
        )]
    } else if app.confirm.pending().is_some() {
        vec![
            Span::styled(" Delete selected? ", Style::default().fg(Color::Red)),
            key("y"),
            Span::raw(" Confirm | "),
            key("n"),
            Span::raw(" Cancel"),
        ]
    } else {
        match (&app.mode, app.current_page) {
            (Mode::Form(_), _) | (Mode::AddYear(_), _) => vec![
                Span::raw(" "),
                key("Enter"),
                Span::raw(" Save | "),
                key("Tab"),
                Span::raw(" Next field | "),
                key("Esc"),
                Span::raw(" Cancel"),
            ],
            (Mode::Browse, Page::Years) => vec![
                Span::raw(" "),
                key("Enter"),
                Span::raw(" Open | "),
                key("a"),
                Span::raw(" Add year | "),
                key("d"),
                Span::raw(" Delete | "),
                key("↑/↓"),
                Span::raw(" Nav | "),
                Span::styled("q", Style::default().fg(Color::Red)),
                Span::raw(" Quit"),
            ],
            (Mode::Browse, Page::YearDetail) => vec![
                Span::raw(" "),
                key("Tab"),
                Span::raw(" Income/Expenses | "),
                key("a"),
                Span::raw(" Add | "),
                key("d"),
                Span::raw(" Delete | "),
                key("Esc"),
                Span::raw(" Back | "),
                Span::styled("q", Style::default().fg(Color::Red)),
                Span::raw(" Quit"),
            ],
        }
    };

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_add_year(f: &mut Frame, area: Rect, buffer: &str) {
    let popup = centered(area, 40, 5);
    let paragraph = Paragraph::new(vec![Line::from(vec![
        Span::styled("Year: ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{buffer}_"), Style::default().fg(Color::Yellow)),
    ])])
    .block(Block::default().borders(Borders::ALL).title(" Add Tax Year "));

    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

fn render_form(f: &mut Frame, area: Rect, form: &RecordForm) {
    let fields = form.fields();
    let popup = centered(area, 60, fields.len() as u16 + 2);
    let focused = form.focused();

    let lines: Vec<Line> = fields
        .iter()
        .map(|field| {
            let style = if *field == focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let cursor = if *field == focused { "_" } else { "" };
            Line::from(vec![
                Span::styled(format!("{:<16}", field.label()), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{}{cursor}", form.value(*field)), style),
            ])
        })
        .collect();

    let title = match form.kind {
        FormKind::Income => format!(" Add Income {} ", TaxYearLabel(form.year)),
        FormKind::Expense => format!(" Add Expense {} ", TaxYearLabel(form.year)),
    };

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        popup,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn money(value: Decimal) -> String {
    tax_records::summary::present(value).to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE), Instant::now())
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn test_app() -> App {
        let store = Store::open_in_memory().unwrap();
        App::new(store, Duration::from_secs(5), NaiveDate::from_ymd_opt(2023, 10, 10).unwrap())
    }

    #[test]
    fn test_add_year_and_open_detail() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('a'));
        // 2023-10-10 falls in the tax year ending April 2024
        assert_eq!(app.mode, Mode::AddYear("2024".to_string()));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.years.years.records().len(), 1);
        assert_eq!(app.years_state.selected(), Some(0));

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.current_page, Page::YearDetail);
        assert_eq!(app.detail.as_ref().unwrap().page.year, 2024);
    }

    #[test]
    fn test_add_year_prompt_can_be_edited() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "3");
        assert_eq!(app.mode, Mode::AddYear("2023".to_string()));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.years.years.records()[0].year, 2023);
    }

    #[test]
    fn test_selected_id_follows_table_state() {
        let store = Store::open_in_memory().unwrap();
        let mut page = YearPage::new(2024, Duration::from_secs(5));
        let mut form = RecordForm::new(FormKind::Expense, 2024, NaiveDate::from_ymd_opt(2023, 10, 10).unwrap());
        form.description = "Rent".to_string();
        form.category = "Housing".to_string();
        form.amount = "500".to_string();
        assert!(page.submit(&store, &mut form, Instant::now()));

        let mut state = TableState::default();
        assert_eq!(selected_id(&state, page.expenses.records()), None);
        state.select(Some(0));
        assert_eq!(
            selected_id(&state, page.expenses.records()),
            Some(page.expenses.records()[0].id)
        );
        state.select(Some(5));
        assert_eq!(selected_id(&state, page.expenses.records()), None);
    }

    #[test]
    fn test_add_expense_then_delete_with_confirmation() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "2024");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);

        // Switch to expenses and fill the form: date is pre-filled
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Rent");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Housing");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "500");
        press(&mut app, KeyCode::Enter);

        let detail = app.detail.as_ref().unwrap();
        assert_eq!(detail.page.expenses.records().len(), 1);
        assert_eq!(money(detail.page.summary.net_amount), "-500.00");

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.detail.as_ref().unwrap().page.expenses.records().len(), 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        let detail = app.detail.as_ref().unwrap();
        assert!(detail.page.expenses.records().is_empty());
        assert_eq!(detail.expense_state.selected(), None);
    }

    #[test]
    fn test_invalid_form_stays_open_with_banner() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "2024");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Form(_)));
        assert!(app.banner().is_some());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(app.handle_key(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Instant::now()
        ));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("£££££££", 5), "££...");
    }
}
