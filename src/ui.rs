use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mdrm_explorer::{
    explorer, Action, Catalog, ChartSeries, ExplorerInput, ExplorerView, ItemType, ResultRow,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

/// Text fields the user can type into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Mnemonic,
    ItemCode,
    ReportingForm,
}

impl Field {
    pub fn title(&self) -> &str {
        match self {
            Field::Mnemonic => "Mnemonic",
            Field::ItemCode => "Item Code",
            Field::ReportingForm => "Reporting Form",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartTab {
    Mnemonics,
    ItemTypes,
    Confidentiality,
}

impl ChartTab {
    pub fn next(&self) -> Self {
        match self {
            ChartTab::Mnemonics => ChartTab::ItemTypes,
            ChartTab::ItemTypes => ChartTab::Confidentiality,
            ChartTab::Confidentiality => ChartTab::Mnemonics,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            ChartTab::Mnemonics => ChartTab::Confidentiality,
            ChartTab::ItemTypes => ChartTab::Mnemonics,
            ChartTab::Confidentiality => ChartTab::ItemTypes,
        }
    }
}

const CONFIDENTIALITY_CHOICES: [&str; 3] = ["all", "N", "Y"];

pub struct App<'a> {
    catalog: &'a Catalog,
    pub input: ExplorerInput,
    pub view: ExplorerView,
    pub state: TableState,
    pub editing: Option<Field>,
    pub show_detail: bool,
    pub chart_tab: ChartTab,
    /// 0 = any item type, otherwise index + 1 into ItemType::KNOWN
    item_type_cursor: usize,
    confidentiality_cursor: usize,
}

impl<'a> App<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let input = ExplorerInput {
            confidentiality: Some(CONFIDENTIALITY_CHOICES[0].to_string()),
            ..ExplorerInput::default()
        };
        let view = explorer::handle(catalog, Action::Initial, &input);

        let mut app = Self {
            catalog,
            input,
            view,
            state: TableState::default(),
            editing: None,
            show_detail: true,
            chart_tab: ChartTab::Mnemonics,
            item_type_cursor: 0,
            confidentiality_cursor: 0,
        };
        app.reset_selection();
        app
    }

    fn reset_selection(&mut self) {
        if self.view.rows.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn search(&mut self) {
        self.view = explorer::handle(self.catalog, Action::Search, &self.input);
        self.reset_selection();
    }

    pub fn reset(&mut self) {
        self.view = explorer::handle(self.catalog, Action::Reset, &self.input);
        self.reset_selection();
    }

    pub fn selected_row(&self) -> Option<&ResultRow> {
        self.state.selected().and_then(|i| self.view.rows.get(i))
    }

    pub fn detail_text(&self) -> String {
        let selection = self
            .selected_row()
            .map(|row| (row.mnemonic.as_str(), row.item_code.as_str()));
        explorer::item_details(self.catalog, selection)
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    // ------------------------------------------------------------------------
    // Filter controls
    // ------------------------------------------------------------------------

    fn field_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Mnemonic => &mut self.input.mnemonic,
            Field::ItemCode => &mut self.input.item_code,
            Field::ReportingForm => &mut self.input.reporting_form,
        }
    }

    pub fn field_value(&self, field: Field) -> &str {
        let value = match field {
            Field::Mnemonic => &self.input.mnemonic,
            Field::ItemCode => &self.input.item_code,
            Field::ReportingForm => &self.input.reporting_form,
        };
        value.as_deref().unwrap_or("")
    }

    pub fn start_editing(&mut self, field: Field) {
        self.editing = Some(field);
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.editing {
            let c = if field == Field::Mnemonic {
                c.to_ascii_uppercase()
            } else {
                c
            };
            self.field_mut(field).get_or_insert_with(String::new).push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.editing {
            if let Some(value) = self.field_mut(field) {
                value.pop();
            }
        }
    }

    /// Leave edit mode; `submit` runs the search like the Search button
    pub fn finish_editing(&mut self, submit: bool) {
        self.editing = None;
        if submit {
            self.search();
        }
    }

    pub fn cycle_item_type(&mut self) {
        self.item_type_cursor = (self.item_type_cursor + 1) % (ItemType::KNOWN.len() + 1);
        self.input.item_type = match self.item_type_cursor {
            0 => None,
            i => Some(ItemType::KNOWN[i - 1].code().to_string()),
        };
    }

    pub fn cycle_confidentiality(&mut self) {
        self.confidentiality_cursor = (self.confidentiality_cursor + 1) % CONFIDENTIALITY_CHOICES.len();
        self.input.confidentiality =
            Some(CONFIDENTIALITY_CHOICES[self.confidentiality_cursor].to_string());
    }

    pub fn item_type_label(&self) -> String {
        match self.item_type_cursor {
            0 => "Any".to_string(),
            i => ItemType::KNOWN[i - 1].label(),
        }
    }

    pub fn confidentiality_label(&self) -> &str {
        CONFIDENTIALITY_CHOICES[self.confidentiality_cursor]
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn next(&mut self) {
        let len = self.view.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.view.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.view.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(20),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn current_chart(&self) -> &ChartSeries {
        match self.chart_tab {
            ChartTab::Mnemonics => &self.view.charts.mnemonics,
            ChartTab::ItemTypes => &self.view.charts.item_types,
            ChartTab::Confidentiality => &self.view.charts.confidentiality,
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

    // Run the app
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

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };

        // Typing into a filter field
        if app.editing.is_some() {
            match key.code {
                KeyCode::Enter => app.finish_editing(true),
                KeyCode::Esc => app.finish_editing(false),
                KeyCode::Backspace => app.pop_char(),
                KeyCode::Char(c) => app.push_char(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Enter => app.search(),
            KeyCode::Char('r') => app.reset(),
            KeyCode::Char('/') => app.start_editing(Field::ItemCode),
            KeyCode::Char('m') => app.start_editing(Field::Mnemonic),
            KeyCode::Char('f') => app.start_editing(Field::ReportingForm),
            KeyCode::Char('t') => app.cycle_item_type(),
            KeyCode::Char('c') => app.cycle_confidentiality(),
            KeyCode::Char('d') => app.toggle_detail(),
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    app.chart_tab = app.chart_tab.previous();
                } else {
                    app.chart_tab = app.chart_tab.next();
                }
            }
            KeyCode::BackTab => app.chart_tab = app.chart_tab.previous(),
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::PageDown => app.page_down(),
            KeyCode::PageUp => app.page_up(),
            KeyCode::Home => app.state.select(Some(0)),
            KeyCode::End => {
                if !app.view.rows.is_empty() {
                    app.state.select(Some(app.view.rows.len() - 1));
                }
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter bar
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_filter_bar(f, chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60), // Results table
            Constraint::Percentage(40), // Chart + details
        ])
        .split(chunks[1]);

    render_table(f, content_chunks[0], app);

    if app.show_detail {
        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(content_chunks[1]);
        render_chart(f, side[0], app);
        render_detail_panel(f, side[1], app);
    } else {
        render_chart(f, content_chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_filter_bar(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut spans = vec![];
    for (i, field) in [Field::Mnemonic, Field::ItemCode, Field::ReportingForm]
        .iter()
        .enumerate()
    {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let editing = app.editing == Some(*field);
        let value_style = if editing {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::White)
        };
        let mut value = app.field_value(*field).to_string();
        if editing {
            value.push('▏');
        }
        spans.push(Span::styled(format!("{}: ", field.title()), label));
        spans.push(Span::styled(value, value_style));
    }

    spans.push(Span::raw(" │ "));
    spans.push(Span::styled("Type: ", label));
    spans.push(Span::raw(app.item_type_label()));
    spans.push(Span::raw(" │ "));
    spans.push(Span::styled("Confidentiality: ", label));
    spans.push(Span::raw(app.confidentiality_label().to_string()));

    let bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" MDRM Explorer "),
    );

    f.render_widget(bar, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Mnemonic", "Item Code", "Item Name", "Type", "Form", "Conf", "Start", "End"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.view.rows.iter().map(|row| {
        let conf_color = match row.confidentiality.as_str() {
            "Y" => Color::Red,
            "N" => Color::Green,
            _ => Color::Yellow,
        };

        let cells = vec![
            Cell::from(row.mnemonic.clone()),
            Cell::from(row.item_code.clone()),
            Cell::from(truncate(&row.item_name, 40)),
            Cell::from(row.item_type.clone()),
            Cell::from(truncate(&row.reporting_form, 14)),
            Cell::from(row.confidentiality.clone()).style(Style::default().fg(conf_color)),
            Cell::from(row.start_date.clone()),
            Cell::from(row.end_date.clone()),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Min(20),
            Constraint::Length(5),
            Constraint::Length(15),
            Constraint::Length(5),
            Constraint::Length(11),
            Constraint::Length(11),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", app.view.count_text)),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let series = app.current_chart();
    let data: Vec<(&str, u64)> = series
        .points
        .iter()
        .map(|p| (p.label.as_str(), p.value as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta))
                .title(format!(" {} (Tab) ", series.title)),
        )
        .data(data.as_slice())
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

    f.render_widget(chart, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let detail = Paragraph::new(app.detail_text())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Item Details "),
        );

    f.render_widget(detail, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.view.rows.len();
    let key = Style::default().fg(Color::Yellow);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if app.view.truncated {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("TRUNCATED", Style::default().fg(Color::Red)));
    }

    if app.editing.is_some() {
        status_spans.push(Span::raw(" | Editing: "));
        status_spans.push(Span::styled("Enter", key));
        status_spans.push(Span::raw(" Search | "));
        status_spans.push(Span::styled("Esc", key));
        status_spans.push(Span::raw(" Done"));
    } else {
        for (k, label) in [
            ("m", " Mnemonic | "),
            ("/", " Item Code | "),
            ("f", " Form | "),
            ("t", " Type | "),
            ("c", " Conf | "),
            ("Enter", " Search | "),
            ("r", " Reset | "),
            ("d", " Details | "),
        ] {
            status_spans.push(Span::styled(k, key));
            status_spans.push(Span::raw(label));
        }
        status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
        status_spans.push(Span::raw(" Quit"));
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
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdrm_explorer::{CatalogEntry, Confidentiality};

    fn catalog() -> Catalog {
        let entries = (0..30)
            .map(|i| CatalogEntry {
                mnemonic: if i < 20 { "AAAA".to_string() } else { "BBBB".to_string() },
                item_code: Some(format!("{:04}", i)),
                item_name: format!("Item {}", i),
                item_type: if i % 3 == 0 { ItemType::Derived } else { ItemType::Financial },
                confidentiality: if i % 2 == 0 {
                    Confidentiality::Public
                } else {
                    Confidentiality::Confidential
                },
                ..CatalogEntry::default()
            })
            .collect();
        Catalog::from_entries(entries)
    }

    #[test]
    fn test_initial_view_selects_first_row() {
        let catalog = catalog();
        let app = App::new(&catalog);

        assert_eq!(app.view.rows.len(), 30);
        assert_eq!(app.state.selected(), Some(0));
        assert!(app.detail_text().contains("MDRM Identifier: AAAA0000"));
    }

    #[test]
    fn test_typed_mnemonic_is_uppercased_and_searched() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        app.start_editing(Field::Mnemonic);
        for c in "bbbb".chars() {
            app.push_char(c);
        }
        app.finish_editing(true);

        assert_eq!(app.field_value(Field::Mnemonic), "BBBB");
        assert_eq!(app.view.rows.len(), 10);
        assert!(app.editing.is_none());
    }

    #[test]
    fn test_backspace_edits_field() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        app.start_editing(Field::ItemCode);
        app.push_char('0');
        app.push_char('9');
        app.pop_char();
        app.finish_editing(false);

        assert_eq!(app.field_value(Field::ItemCode), "0");
        // not submitted, view unchanged
        assert_eq!(app.view.rows.len(), 30);
    }

    #[test]
    fn test_cycle_item_type_wraps_to_any() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        app.cycle_item_type();
        assert_eq!(app.input.item_type.as_deref(), Some("F"));
        app.search();
        assert_eq!(app.view.rows.len(), 20);

        for _ in 0..ItemType::KNOWN.len() {
            app.cycle_item_type();
        }
        assert_eq!(app.input.item_type, None);
        assert_eq!(app.item_type_label(), "Any");
    }

    #[test]
    fn test_cycle_confidentiality() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        assert_eq!(app.confidentiality_label(), "all");
        app.cycle_confidentiality();
        app.search();
        assert_eq!(app.confidentiality_label(), "N");
        assert_eq!(app.view.rows.len(), 15);
    }

    #[test]
    fn test_reset_previews_ten_rows() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        app.cycle_confidentiality();
        app.reset();
        assert_eq!(app.view.rows.len(), 10);
    }

    #[test]
    fn test_navigation_wraps() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        app.previous();
        assert_eq!(app.state.selected(), Some(29));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(20));
        app.page_down();
        assert_eq!(app.state.selected(), Some(29));
        app.page_up();
        assert_eq!(app.state.selected(), Some(9));
    }

    #[test]
    fn test_empty_result_shows_placeholder() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        app.start_editing(Field::Mnemonic);
        app.push_char('z');
        app.finish_editing(true);

        assert!(app.view.rows.is_empty());
        assert_eq!(app.state.selected(), None);
        assert_eq!(app.detail_text(), explorer::NO_SELECTION_MESSAGE);
    }

    #[test]
    fn test_chart_tabs_cycle() {
        let catalog = catalog();
        let mut app = App::new(&catalog);

        assert_eq!(app.current_chart().title, "Top 10 Most Common Mnemonics");
        app.chart_tab = app.chart_tab.next();
        assert_eq!(app.current_chart().title, "Distribution of Item Types");
        app.chart_tab = app.chart_tab.previous().previous();
        assert_eq!(app.current_chart().title, "Distribution of Confidentiality");
    }

    #[test]
    fn test_truncate_handles_multibyte() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ÄÖÜÄÖÜÄÖÜÄÖÜ", 6), "ÄÖÜ...");
    }
}
