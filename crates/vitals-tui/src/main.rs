use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use vitals_lib::{
    catalog::{Catalog, CategorySummary, PatientRecord},
    config::ViewerConfig,
    io::{catalog as catalog_io, telemetry as telemetry_io},
    player::{Autoplay, PlaybackState},
    scrub::ScrubFrame,
    session::CaseSession,
    signal::format_hms,
};

fn main() -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(ViewerConfig::default());
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal.draw(|f| draw(f, &mut app))?;
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    restore_terminal()?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("initializing terminal")
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Tab {
    Browse,
    Monitor,
}

impl Tab {
    fn title(&self) -> &'static str {
        match self {
            Tab::Browse => "Browse",
            Tab::Monitor => "Monitor",
        }
    }

    fn all() -> [Tab; 2] {
        [Tab::Browse, Tab::Monitor]
    }

    fn next(self) -> Self {
        match self {
            Tab::Browse => Tab::Monitor,
            Tab::Monitor => Tab::Browse,
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Browse => 0,
            Tab::Monitor => 1,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Focus {
    None,
    CatalogPath,
    DataDir,
}

struct TextField {
    value: String,
}

impl TextField {
    fn new(default: &str) -> Self {
        Self {
            value: default.to_string(),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.value.push(c);
                true
            }
            KeyCode::Backspace => {
                self.value.pop();
                true
            }
            _ => false,
        }
    }
}

struct App {
    tab: Tab,
    focus: Focus,
    status: String,
    should_quit: bool,
    config: ViewerConfig,
    catalog_path: TextField,
    data_dir: TextField,
    catalog: Option<Catalog>,
    summaries: Vec<CategorySummary>,
    category_state: ListState,
    patient_state: ListState,
    session: CaseSession,
    autoplay: Autoplay,
    frame: Option<ScrubFrame>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let scrub_config = config.scrub_config();
        Self {
            tab: Tab::Browse,
            focus: Focus::None,
            status: "press 'e' to edit paths, 'l' to load the catalog, 'q' to quit".into(),
            should_quit: false,
            config,
            catalog_path: TextField::new("test_data/catalog_sample.csv"),
            data_dir: TextField::new("test_data"),
            catalog: None,
            summaries: Vec::new(),
            category_state: ListState::default(),
            patient_state: ListState::default(),
            session: CaseSession::new(scrub_config),
            autoplay: Autoplay::default(),
            frame: None,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.focus != Focus::None {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => {
                    self.focus = Focus::None;
                }
                _ => {
                    let field = match self.focus {
                        Focus::CatalogPath => &mut self.catalog_path,
                        Focus::DataDir => &mut self.data_dir,
                        Focus::None => return,
                    };
                    field.handle_key(&key);
                }
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::Char('e') => self.focus = Focus::CatalogPath,
            KeyCode::Char('d') => self.focus = Focus::DataDir,
            KeyCode::Char('l') => self.load_catalog(),
            KeyCode::Up => self.select_prev(),
            KeyCode::Down => self.select_next(),
            KeyCode::Enter => self.load_selected_case(),
            KeyCode::Char(' ') => self.toggle_autoplay(),
            KeyCode::Left => self.manual_scrub(-1.0),
            KeyCode::Right => self.manual_scrub(1.0),
            _ => {}
        }
    }

    fn on_tick(&mut self) {
        if let Some(percent) = self.autoplay.tick() {
            self.scrub_to(percent);
        }
    }

    fn load_catalog(&mut self) {
        match catalog_io::read_catalog_csv(&PathBuf::from(&self.catalog_path.value)) {
            Ok(catalog) => {
                self.summaries = catalog.category_summaries(None, false);
                self.catalog = Some(catalog);
                self.category_state.select(if self.summaries.is_empty() {
                    None
                } else {
                    Some(0)
                });
                self.patient_state.select(None);
                self.status = format!(
                    "{} cases across {} categories",
                    self.catalog.as_ref().map(Catalog::len).unwrap_or(0),
                    self.summaries.len()
                );
            }
            Err(err) => self.status = format!("catalog load failed: {err:#}"),
        }
    }

    fn selected_category(&self) -> Option<&CategorySummary> {
        self.category_state
            .selected()
            .and_then(|idx| self.summaries.get(idx))
    }

    fn patients_in_selected_category(&self) -> Vec<&PatientRecord> {
        match (&self.catalog, self.selected_category()) {
            (Some(catalog), Some(summary)) => {
                catalog.cases_in_category(&summary.category).collect()
            }
            _ => Vec::new(),
        }
    }

    fn select_prev(&mut self) {
        if self.tab == Tab::Browse {
            move_selection(&mut self.category_state, self.summaries.len(), -1);
            self.patient_state.select(None);
        } else {
            let count = self.patients_in_selected_category().len();
            move_selection(&mut self.patient_state, count, -1);
        }
    }

    fn select_next(&mut self) {
        if self.tab == Tab::Browse {
            move_selection(&mut self.category_state, self.summaries.len(), 1);
            self.patient_state.select(None);
        } else {
            let count = self.patients_in_selected_category().len();
            move_selection(&mut self.patient_state, count, 1);
        }
    }

    /// Load the highlighted patient's telemetry and restart playback.
    ///
    /// The load runs through the session's token gate, so a selection made
    /// while an earlier load is pending can never be overwritten by it.
    fn load_selected_case(&mut self) {
        let selected: Option<PatientRecord> = self.patient_state.selected().and_then(|idx| {
            self.patients_in_selected_category()
                .get(idx)
                .map(|record| (*record).clone())
        });
        let record = match selected {
            Some(record) => record,
            None => {
                if self.tab == Tab::Browse {
                    self.tab = Tab::Monitor;
                    let count = self.patients_in_selected_category().len();
                    self.patient_state
                        .select(if count == 0 { None } else { Some(0) });
                }
                return;
            }
        };
        let path = PathBuf::from(&self.data_dir.value).join(format!("case_{}.csv", record.case_id));
        let token = self.session.begin_load();
        match telemetry_io::read_case_csv(&path, self.config.channel()) {
            Ok(series) => {
                let case_id = record.case_id;
                if self.session.complete_load(token, record, series) {
                    self.autoplay.start(0.0);
                    self.scrub_to(0.0);
                    self.status = format!("monitoring case {case_id}");
                }
            }
            Err(err) => self.status = format!("telemetry load failed: {err:#}"),
        }
    }

    fn scrub_to(&mut self, percent: f64) {
        if let Some(case) = self.session.case_mut() {
            self.frame = Some(case.scrubber.advance_to(percent));
        }
    }

    fn toggle_autoplay(&mut self) {
        match self.autoplay.state() {
            PlaybackState::Playing => self.autoplay.cancel(),
            _ => {
                let percent = self.frame.as_ref().map(|f| f.percent).unwrap_or(0.0);
                self.autoplay.start(if percent >= 100.0 { 0.0 } else { percent });
            }
        }
    }

    /// Direct input takes the playhead over; autoplay stops first so the
    /// two drivers never interleave.
    fn manual_scrub(&mut self, delta: f64) {
        self.autoplay.cancel();
        let percent = self.frame.as_ref().map(|f| f.percent).unwrap_or(0.0);
        self.scrub_to((percent + delta).clamp(0.0, 100.0));
    }
}

fn move_selection(state: &mut ListState, len: usize, delta: i64) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as i64;
    let next = (current + delta).clamp(0, len as i64 - 1) as usize;
    state.select(Some(next));
}

fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(f.size());

    let titles: Vec<Line> = Tab::all().iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).title("vitals"))
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    match app.tab {
        Tab::Browse => draw_browse(f, app, chunks[1]),
        Tab::Monitor => draw_monitor(f, app, chunks[1]),
    }

    let status = Paragraph::new(app.status.clone())
        .block(Block::default().borders(Borders::ALL).title("status"))
        .wrap(Wrap { trim: true });
    f.render_widget(status, chunks[2]);
}

fn draw_browse(f: &mut Frame, app: &mut App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);

    let paths = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("catalog (e): ", Style::default().fg(Color::DarkGray)),
            Span::raw(field_text(app, Focus::CatalogPath)),
        ]),
        Line::from(vec![
            Span::styled("data dir (d): ", Style::default().fg(Color::DarkGray)),
            Span::raw(field_text(app, Focus::DataDir)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("sources"));
    f.render_widget(paths, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let items: Vec<ListItem> = app
        .summaries
        .iter()
        .map(|s| {
            let rate = s
                .mean_heart_rate
                .map(|r| format!("{:.0} bpm", r))
                .unwrap_or_else(|| "-".into());
            ListItem::new(format!("{} ({} cases, {})", s.category, s.count, rate))
        })
        .collect();
    let categories = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("surgery categories"))
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    f.render_stateful_widget(categories, columns[0], &mut app.category_state);

    let description = app
        .selected_category()
        .and_then(|s| s.description.clone())
        .unwrap_or_else(|| "select a category, then press Enter to pick patients".into());
    let detail = Paragraph::new(description)
        .block(Block::default().borders(Borders::ALL).title("about"))
        .wrap(Wrap { trim: true });
    f.render_widget(detail, columns[1]);
}

fn draw_monitor(f: &mut Frame, app: &mut App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(40)])
        .split(area);

    let patients = app.patients_in_selected_category();
    let items: Vec<ListItem> = patients
        .iter()
        .map(|p| ListItem::new(format!("case {} (age {:.0}, {})", p.case_id, p.age, p.sex)))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("patients"))
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, columns[0], &mut app.patient_state);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(6)])
        .split(columns[1]);

    draw_chart(f, app, rows[0]);
    draw_readout(f, app, rows[1]);
}

fn draw_chart(f: &mut Frame, app: &App, area: Rect) {
    let frame = match &app.frame {
        Some(frame) if frame.has_data() => frame,
        _ => {
            let empty = Paragraph::new("no telemetry loaded (Enter on a patient to start)")
                .block(Block::default().borders(Borders::ALL).title("heart rate"));
            f.render_widget(empty, area);
            return;
        }
    };

    let segments: Vec<Vec<(f64, f64)>> = frame
        .segments
        .iter()
        .map(|segment| {
            segment
                .iter()
                .filter(|s| s.is_valid())
                .map(|s| (s.second as f64, s.heart_rate.unwrap_or_default()))
                .collect()
        })
        .collect();

    let rates: Vec<f64> = segments.iter().flatten().map(|p| p.1).collect();
    if rates.is_empty() {
        let empty = Paragraph::new("no valid readings in the visible window")
            .block(Block::default().borders(Borders::ALL).title("heart rate"));
        f.render_widget(empty, area);
        return;
    }
    let y_min = rates.iter().cloned().fold(f64::MAX, f64::min);
    let y_max = rates.iter().cloned().fold(f64::MIN, f64::max);
    let y_lo = ((y_min / 10.0).floor() * 10.0).max(0.0);
    let y_hi = (y_max / 10.0).ceil() * 10.0;
    let x_lo = frame.window_start as f64;
    let x_hi = (frame.current_second as f64).max(x_lo + 1.0);

    let zones = frame.zones;
    let guides: Vec<(String, Vec<(f64, f64)>)> = [
        ("resting", zones.resting_floor),
        ("moderate", zones.moderate),
        ("vigorous", zones.vigorous),
        ("peak", zones.peak),
    ]
    .into_iter()
    .filter(|(_, rate)| *rate >= y_lo && *rate <= y_hi)
    .map(|(name, rate)| (name.to_string(), vec![(x_lo, rate), (x_hi, rate)]))
    .collect();

    let mut datasets: Vec<Dataset> = guides
        .iter()
        .map(|(name, points)| {
            Dataset::default()
                .name(name.clone())
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::DarkGray))
                .data(points)
        })
        .collect();
    for points in &segments {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Green))
                .data(points),
        );
    }

    let title = if frame.gap_in_render_window {
        "heart rate (signal interrupted)"
    } else {
        "heart rate"
    };
    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .bounds([x_lo, x_hi])
                .labels(vec![
                    Span::raw(format_hms(x_lo as u32)),
                    Span::raw(format_hms(x_hi as u32)),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([y_lo, y_hi])
                .labels(vec![
                    Span::raw(format!("{y_lo:.0}")),
                    Span::raw(format!("{y_hi:.0}")),
                ]),
        );
    f.render_widget(chart, area);
}

fn draw_readout(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    if let Some(case) = app.session.case() {
        let record = &case.record;
        lines.push(Line::from(format!(
            "case {}: {} ({})",
            record.case_id, record.surgery_name, record.diagnosis
        )));
        lines.push(Line::from(format!(
            "age {:.0}  htn {}  dm {}  mortality {}",
            record.age,
            yes_no(record.hypertension),
            yes_no(record.diabetes),
            yes_no(record.mortality)
        )));
    }
    if let Some(frame) = &app.frame {
        lines.push(Line::from(format!(
            "{} ({:.0}% through the procedure)",
            format_hms(frame.current_second),
            frame.percent
        )));
        let average = match (frame.is_missing, frame.average) {
            (true, Some(avg)) => format!("signal lost, last average {avg:.0} bpm"),
            (true, None) => "signal lost".into(),
            (false, Some(avg)) => format!("average {avg:.0} bpm"),
            (false, None) => "no readings yet".into(),
        };
        lines.push(Line::from(average));
        let playing = match app.autoplay.state() {
            PlaybackState::Playing => "playing (space pauses, arrows scrub)",
            PlaybackState::Finished => "finished (space replays)",
            PlaybackState::Idle => "paused (space plays, arrows scrub)",
        };
        lines.push(Line::from(Span::styled(
            playing,
            Style::default().fg(Color::DarkGray),
        )));
    }
    let readout = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("readout"))
        .wrap(Wrap { trim: true });
    f.render_widget(readout, area);
}

fn field_text(app: &App, focus: Focus) -> String {
    let (value, active) = match focus {
        Focus::CatalogPath => (&app.catalog_path.value, app.focus == Focus::CatalogPath),
        Focus::DataDir => (&app.data_dir.value, app.focus == Focus::DataDir),
        Focus::None => return String::new(),
    };
    if active {
        format!("{value}_")
    } else {
        value.clone()
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
