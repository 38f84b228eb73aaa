use anyhow::Result;
use battery_ea_dashboard::{
    AnimationController, BubbleFigure, ChoroplethFigure, Dashboard, PlayState,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
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
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Map,
    Bubbles,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Map => Page::Bubbles,
            Page::Bubbles => Page::Map,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Map => "Revenue Map",
            Page::Bubbles => "Bubble Chart",
        }
    }
}

pub struct App {
    dashboard: Dashboard,
    controller: AnimationController,
    pub current_page: Page,
    pub year: i32,
    pub battery_capacity: u32,
    pub daily_cycle_limit: u32,
    pub clicks: u64,
    pub map: ChoroplethFigure,
    pub bubbles: BubbleFigure,
    pub state: TableState,
}

impl App {
    pub fn new(dashboard: Dashboard) -> Self {
        let controller = dashboard.new_controller();
        let options = dashboard.options().clone();
        let year = controller.frame().year;

        let map = dashboard.choropleth().build(
            year,
            options.default_battery_capacity,
            options.default_daily_cycle_limit,
        );
        let bubbles = dashboard
            .bubble()
            .build(options.default_battery_capacity, options.default_daily_cycle_limit);

        let mut state = TableState::default();
        state.select(Some(0));

        Self {
            dashboard,
            controller,
            current_page: Page::Map,
            year,
            battery_capacity: options.default_battery_capacity,
            daily_cycle_limit: options.default_daily_cycle_limit,
            clicks: 0,
            map,
            bubbles,
            state,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.dashboard.options().interval_ms)
    }

    pub fn play_state(&self) -> PlayState {
        self.controller.state().play_state
    }

    fn rebuild_map(&mut self) {
        self.map = self
            .dashboard
            .choropleth()
            .build(self.year, self.battery_capacity, self.daily_cycle_limit);
    }

    fn rebuild_all(&mut self) {
        self.rebuild_map();
        self.bubbles = self
            .dashboard
            .bubble()
            .build(self.battery_capacity, self.daily_cycle_limit);
    }

    pub fn toggle_play(&mut self) {
        self.clicks += 1;
        self.controller.toggle(Some(self.clicks));
    }

    pub fn tick(&mut self) {
        let frame = self.controller.tick(self.year);
        if frame.year != self.year {
            self.year = frame.year;
            self.rebuild_map();
        }
    }

    /// Move the year slider by `step`, clamped to the slider range
    pub fn step_year(&mut self, step: i32) {
        let years = &self.dashboard.options().slider_years;
        let (Some(&first), Some(&last)) = (years.first(), years.last()) else {
            return;
        };
        let year = (self.year + step).clamp(first, last);
        self.year = self.controller.select_year(year).year;
        self.rebuild_map();
    }

    pub fn cycle_capacity(&mut self) {
        self.battery_capacity = next_value(&self.dashboard.options().battery_capacities, self.battery_capacity);
        self.rebuild_all();
    }

    pub fn cycle_daily_limit(&mut self) {
        self.daily_cycle_limit = next_value(&self.dashboard.options().daily_cycle_limits, self.daily_cycle_limit);
        self.rebuild_all();
    }

    fn row_count(&self) -> usize {
        match self.current_page {
            Page::Map => self.map.zones.len(),
            Page::Bubbles => self.bubbles.zones().len(),
        }
    }

    pub fn next(&mut self) {
        let len = self.row_count();
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
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.state.select(Some(0));
    }

    /// Returns `true` when the user asked to quit
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char(' ') | KeyCode::Char('p') => self.toggle_play(),
            KeyCode::Left | KeyCode::Char('h') => self.step_year(-1),
            KeyCode::Right | KeyCode::Char('l') => self.step_year(1),
            KeyCode::Char('c') => self.cycle_capacity(),
            KeyCode::Char('d') => self.cycle_daily_limit(),
            KeyCode::Tab => self.next_page(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            _ => {}
        }
        false
    }
}

fn next_value(values: &[u32], current: u32) -> u32 {
    match values.iter().position(|v| *v == current) {
        Some(i) => values[(i + 1) % values.len()],
        None => values.first().copied().unwrap_or(current),
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

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        // timer keeps running while paused; ticks are ignored by the controller
        let timeout = app.interval().saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key.code, key.modifiers) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= app.interval() {
            app.tick();
            last_tick = Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Controls
            Constraint::Min(0),    // Chart
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Map => render_map(f, chunks[1], app),
        Page::Bubbles => render_bubbles(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::Map, Page::Bubbles].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    let play_color = match app.play_state() {
        PlayState::Playing => Color::Green,
        PlayState::Paused => Color::DarkGray,
    };

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(format!("Year {}", app.year), Style::default().fg(Color::White)));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Capacity {} h", app.battery_capacity),
        Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Cycle limit {}", app.daily_cycle_limit),
        Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        match app.play_state() {
            PlayState::Playing => "▶ playing",
            PlayState::Paused => "⏸ paused",
        },
        Style::default().fg(play_color),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

/// Inferno-ish ramp for terminal cells
fn revenue_color(revenue: f64) -> Color {
    match revenue {
        r if r < 40_000.0 => Color::Magenta,
        r if r < 80_000.0 => Color::Red,
        r if r < 120_000.0 => Color::LightRed,
        _ => Color::Yellow,
    }
}

fn revenue_bar(revenue: f64, width: usize) -> String {
    let filled = ((revenue / 160_000.0).clamp(0.0, 1.0) * width as f64).round() as usize;
    "█".repeat(filled)
}

fn render_map(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(["Zone", "Revenue [€/MW/year]", ""].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.map.zones.iter().map(|zone| match zone.revenue {
        Some(revenue) => Row::new(vec![
            Cell::from(zone.zone.clone()),
            Cell::from(format!("{:>12.2}", revenue)),
            Cell::from(revenue_bar(revenue, 40)).style(Style::default().fg(revenue_color(revenue))),
        ]),
        None => Row::new(vec![
            Cell::from(zone.zone.clone()).style(Style::default().fg(Color::DarkGray)),
            Cell::from(format!("{:>12}", "no data")).style(Style::default().fg(Color::DarkGray)),
            Cell::from(""),
        ]),
    });

    let title = format!(
        " {} · {} of {} zones with data ",
        app.map.year,
        app.map.colored_zone_count(),
        app.map.zones.len()
    );

    let table = Table::new(
        rows,
        [Constraint::Length(14), Constraint::Length(22), Constraint::Min(10)],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_bubbles(f: &mut Frame, area: Rect, app: &mut App) {
    let years = app.dashboard.store().years();

    let mut header_cells = vec![Cell::from("Zone")];
    header_cells.extend(years.iter().map(|y| Cell::from(y.to_string())));
    let header = Row::new(header_cells)
        .style(Style::default().fg(Color::Yellow).bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .height(1);

    // k€ revenue and spread per (zone, year)
    let rows: Vec<Row> = app
        .bubbles
        .zones()
        .into_iter()
        .map(|zone| {
            let mut cells = vec![Cell::from(zone.to_string())];
            for year in &years {
                let point = app
                    .bubbles
                    .points
                    .iter()
                    .find(|p| p.zone == zone && p.year == *year);
                cells.push(match point {
                    Some(p) => Cell::from(format!(
                        "{:.0}k ({:.0})",
                        p.revenue / 1000.0,
                        p.average_daily_spread
                    ))
                    .style(Style::default().fg(revenue_color(p.revenue))),
                    None => Cell::from("·").style(Style::default().fg(Color::DarkGray)),
                });
            }
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(12)];
    widths.extend(years.iter().map(|_| Constraint::Length(12)));

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Revenue k€/MW/year (average daily spread €) "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, _app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let spans = vec![
        Span::raw(" "),
        key("Space"),
        Span::raw(" Play/Pause | "),
        key("←/→"),
        Span::raw(" Year | "),
        key("c"),
        Span::raw(" Capacity | "),
        key("d"),
        Span::raw(" Cycle limit | "),
        key("Tab"),
        Span::raw(" Page | "),
        key("q"),
        Span::raw(" Quit"),
    ];

    let status = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}
