use crate::chart::{ChartPanel, ChartRegistry};
use crate::filterprompt::{FilterField, FilterInput, FilterOutput, FilterPrompt, FilterPromptState};
use crate::help::Help;
use crate::jumpto::{JumpTo, JumpToInput, JumpToOutput, JumpToState};
use crate::report::ReportSource;
use crate::selector::{
    CalendarDay, DateRange, GRID_HEIGHT, GRID_WIDTH, ListenerId, MonthView, Preset,
    RangeSelector, Role, SelectionPhase, generate_calendar_days,
};
use crate::store::{FilterStore, Filters, GroupBy, StoreError};
use crate::theme::{BASE_STYLE, HINT_STYLE, notice::ERROR_STYLE, notice::INFO_STYLE};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, read};
use ratatui::{
    Terminal,
    backend::Backend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Block, Paragraph, StatefulWidget, Widget},
};
use std::io::{self, Write};
use std::sync::mpsc::{Receiver, Sender, channel};
use time::{Date, Duration};

#[derive(Debug)]
pub(crate) struct App<S> {
    selector: RangeSelector,
    changes: Receiver<DateRange>,
    sender: Sender<DateRange>,
    listener: ListenerId,
    module: String,
    store: S,
    group_by: GroupBy,
    category: String,
    asin: String,
    source: Option<Box<dyn ReportSource>>,
    charts: ChartRegistry,
    focus: Role,
    cursor: Date,
    notice: Option<Notice>,
    state: AppState,
}

impl<S: FilterStore> App<S> {
    /// Restores the filters saved for `module` and performs the first fetch
    pub(crate) fn new(
        today: Date,
        module: String,
        store: S,
        source: Option<Box<dyn ReportSource>>,
    ) -> Result<App<S>, StoreError> {
        let filters = Filters::load(&store, &module, today)?;
        let mut selector = RangeSelector::new(today);
        let (sender, changes) = channel();
        let listener = subscribe_channel(&mut selector, sender.clone());
        selector.seed(filters.range);
        let mut app = App {
            cursor: filters.range.start().unwrap_or(today),
            selector,
            changes,
            sender,
            listener,
            module,
            store,
            group_by: filters.group_by,
            category: filters.category,
            asin: filters.asin,
            source,
            charts: ChartRegistry::new(),
            focus: Role::Start,
            notice: None,
            state: AppState::Picking,
        };
        app.process_changes();
        Ok(app)
    }

    pub(crate) fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        while !self.quitting() {
            self.draw(terminal)?;
            self.handle_input()?;
        }
        Ok(())
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        terminal.draw(|frame| frame.render_widget(self, frame.area()))?;
        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        let normal_modifiers = KeyModifiers::NONE | KeyModifiers::SHIFT;
        if let Some(KeyEvent {
            code, modifiers, ..
        }) = read()?.as_key_press_event()
        {
            if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
                self.state = AppState::Quitting;
            } else if !normal_modifiers.contains(modifiers) || !self.handle_key(code) {
                self.beep()?;
            }
        }
        Ok(())
    }

    // Returns `false` if the user pressed an invalid key
    fn handle_key(&mut self, key: KeyCode) -> bool {
        self.notice = None;
        let valid = match &mut self.state {
            AppState::Picking => self.handle_picking_key(key),
            AppState::Helping => {
                self.state = AppState::Picking;
                true
            }
            AppState::Jumping(state) => {
                if matches!(key, KeyCode::Char('q' | 'g') | KeyCode::Esc) {
                    self.state = AppState::Picking;
                    true
                } else {
                    let output = match key {
                        KeyCode::Char(c) => match c.to_digit(10).map(u8::try_from) {
                            Some(Ok(d)) => state.handle_input(JumpToInput::Digit(d)),
                            _ => JumpToOutput::Invalid,
                        },
                        KeyCode::Backspace | KeyCode::Delete => {
                            state.handle_input(JumpToInput::Backspace)
                        }
                        KeyCode::Enter => state.handle_input(JumpToInput::Enter),
                        _ => JumpToOutput::Invalid,
                    };
                    match output {
                        JumpToOutput::Ok => true,
                        JumpToOutput::Invalid => false,
                        JumpToOutput::Jump(date) => {
                            self.state = AppState::Picking;
                            self.cursor = date;
                            true
                        }
                    }
                }
            }
            AppState::Filtering(state) => {
                if key == KeyCode::Esc {
                    self.state = AppState::Picking;
                    true
                } else {
                    let output = match key {
                        KeyCode::Char(c) => state.handle_input(FilterInput::Char(c)),
                        KeyCode::Backspace | KeyCode::Delete => {
                            state.handle_input(FilterInput::Backspace)
                        }
                        KeyCode::Enter => state.handle_input(FilterInput::Enter),
                        _ => FilterOutput::Invalid,
                    };
                    match output {
                        FilterOutput::Ok => true,
                        FilterOutput::Invalid => false,
                        FilterOutput::Submit(field, value) => {
                            self.state = AppState::Picking;
                            self.set_filter(field, value);
                            true
                        }
                    }
                }
            }
            AppState::Quitting => false,
        };
        self.process_changes();
        valid
    }

    fn handle_picking_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('q') => self.state = AppState::Quitting,
            KeyCode::Esc if self.selector.is_open() => self.selector.close(),
            KeyCode::Esc => self.state = AppState::Quitting,
            KeyCode::Char('o' | ' ') => {
                self.selector.toggle_open();
                if self.selector.is_open() {
                    self.focus_on(Role::Start);
                }
            }
            KeyCode::Char('?') => self.state = AppState::Helping,
            KeyCode::Char('b') => {
                self.group_by = self.group_by.next();
                self.persist();
                self.refresh();
            }
            KeyCode::Char('f') => {
                self.state = AppState::Filtering(FilterPromptState::new(
                    FilterField::Category,
                    &self.category,
                ));
            }
            KeyCode::Char('a') => {
                self.state =
                    AppState::Filtering(FilterPromptState::new(FilterField::Asin, &self.asin));
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('c') => self.clear_filters(),
            _ if self.selector.is_open() => return self.handle_open_key(key),
            _ => return false,
        }
        true
    }

    fn handle_open_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('h') | KeyCode::Left => self.move_cursor(-1),
            KeyCode::Char('l') | KeyCode::Right => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-7),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(7),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus_on(self.focus.other());
                true
            }
            KeyCode::Enter => {
                self.pick_cursor();
                true
            }
            KeyCode::Char('1') => self.pick_preset(Preset::Last7),
            KeyCode::Char('2') => self.pick_preset(Preset::Last30),
            KeyCode::Char('3') => self.pick_preset(Preset::ThisMonth),
            KeyCode::Char('t') => {
                self.cursor = self.selector.today();
                true
            }
            KeyCode::Char('g') => {
                self.state = AppState::Jumping(JumpToState::new());
                true
            }
            _ => false,
        }
    }

    fn beep(&self) -> io::Result<()> {
        io::stdout().write_all(b"\x07")
    }

    fn quitting(&self) -> bool {
        self.state == AppState::Quitting
    }

    fn focus_on(&mut self, role: Role) {
        let range = self.selector.range();
        let endpoint = match role {
            Role::Start => range.start(),
            Role::End => range.end().or(range.start()),
        };
        self.focus = role;
        self.cursor = endpoint.unwrap_or(self.selector.today());
    }

    // Returns `false` at the ends of time
    fn move_cursor(&mut self, days: i64) -> bool {
        match self.cursor.checked_add(Duration::days(days)) {
            Some(date) => {
                self.cursor = date;
                true
            }
            None => false,
        }
    }

    /// The focused month is drawn around the cursor; the other one around its
    /// endpoint
    fn view_days(&self, role: Role) -> Vec<CalendarDay> {
        if role == self.focus {
            generate_calendar_days(self.cursor, self.selector.today())
        } else {
            match role {
                Role::Start => self.selector.start_calendar_days(),
                Role::End => self.selector.end_calendar_days(),
            }
        }
    }

    fn pick_cursor(&mut self) {
        let days = self.view_days(self.focus);
        let Some(day) = days.iter().find(|d| d.date == self.cursor) else {
            return;
        };
        if self.selector.select_date(self.focus, day)
            && self.selector.range().phase() == SelectionPhase::StartOnly
        {
            self.focus = Role::End;
        }
    }

    fn pick_preset(&mut self, preset: Preset) -> bool {
        self.selector.select_preset(preset);
        self.notice = Some(Notice::Info(format!("{} selected", preset.label())));
        true
    }

    fn clear_filters(&mut self) {
        if let Err(e) = Filters::clear(&mut self.store, &self.module) {
            log::error!("Failed to clear saved filters: {e}");
            self.notice = Some(Notice::Error(e.to_string()));
            return;
        }
        log::info!("Cleared saved filters for {:?}", self.module);
        self.group_by = GroupBy::default();
        self.category.clear();
        self.asin.clear();
        // Reset the range unheard so that the defaults are not saved back
        self.selector.unsubscribe(self.listener);
        self.selector.initialize();
        self.listener = subscribe_channel(&mut self.selector, self.sender.clone());
        self.refresh();
        self.notice = Some(Notice::Info(String::from("Saved filters cleared")));
    }

    fn set_filter(&mut self, field: FilterField, value: String) {
        log::info!("{field:?} filter set to {value:?}");
        match field {
            FilterField::Category => self.category = value,
            FilterField::Asin => self.asin = value,
        }
        self.persist();
        self.refresh();
    }

    fn filters(&self) -> Filters {
        Filters {
            range: self.selector.range(),
            group_by: self.group_by,
            category: self.category.clone(),
            asin: self.asin.clone(),
        }
    }

    /// Handles every change notification received since the last call.
    /// Bursts are coalesced into a single save and fetch.
    fn process_changes(&mut self) {
        if self.changes.try_iter().last().is_none() {
            return;
        }
        self.persist();
        self.refresh();
    }

    fn describe_filters(&self) -> String {
        let mut parts = vec![self.group_by.to_string()];
        if !self.category.is_empty() {
            parts.push(format!("category {}", self.category));
        }
        if !self.asin.is_empty() {
            parts.push(format!("ASIN {}", self.asin));
        }
        format!("{}   ({})", self.selector.format_date_range(), parts.join(", "))
    }

    fn persist(&mut self) {
        if let Err(e) = self.filters().save(&mut self.store, &self.module) {
            log::error!("Failed to save filters: {e}");
            self.notice = Some(Notice::Error(e.to_string()));
        }
    }

    fn refresh(&mut self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let filters = self.filters();
        match source.fetch(&filters) {
            Ok(payload) => match self.charts.sync(&payload) {
                Ok(()) => {
                    log::info!(
                        "Loaded {} points for {} grouped {}",
                        payload.points(),
                        filters.range,
                        filters.group_by
                    );
                    if self.notice.is_none() {
                        self.notice = Some(Notice::Info(format!(
                            "Data updated: {} points",
                            payload.points()
                        )));
                    }
                }
                Err(e) => {
                    log::error!("Failed to update charts: {e}");
                    self.notice = Some(Notice::Error(e.to_string()));
                }
            },
            Err(e) => {
                log::error!("Failed to load report: {e}");
                self.notice = Some(Notice::Error(e.to_string()));
            }
        }
    }
}

impl<S: FilterStore> Widget for &mut App<S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, BASE_STYLE);
        let picker_height = if self.selector.is_open() {
            GRID_HEIGHT + 3
        } else {
            0
        };
        let [label_area, picker_area, charts_area, status_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(picker_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);
        Paragraph::new(self.describe_filters())
            .block(Block::bordered().title(" Date Range "))
            .render(label_area, buf);
        if self.selector.is_open() {
            self.render_picker(picker_area, buf);
        }
        if self.source.is_some() {
            ChartPanel(&self.charts).render(charts_area, buf);
        } else {
            Paragraph::new("No report source; pass --report FILE")
                .style(HINT_STYLE)
                .render(charts_area, buf);
        }
        let status = match &self.notice {
            Some(Notice::Info(msg)) => Line::styled(msg.as_str(), INFO_STYLE),
            Some(Notice::Error(msg)) => Line::styled(msg.as_str(), ERROR_STYLE),
            None => Line::styled("? help  o open/close  q quit", HINT_STYLE),
        };
        status.render(status_area, buf);
        if self.state == AppState::Helping {
            Help.render(area, buf);
        } else if let AppState::Jumping(ref mut state) = self.state {
            JumpTo.render(area, buf, state);
        } else if let AppState::Filtering(ref mut state) = self.state {
            FilterPrompt.render(area, buf, state);
        }
    }
}

impl<S: FilterStore> App<S> {
    fn render_picker(&self, area: Rect, buf: &mut Buffer) {
        let [views_area, presets_area] =
            Layout::vertical([Constraint::Length(GRID_HEIGHT + 2), Constraint::Length(1)])
                .areas(area);
        let [start_area, end_area] = Layout::horizontal([
            Constraint::Length(GRID_WIDTH + 2),
            Constraint::Length(GRID_WIDTH + 2),
        ])
        .areas(views_area);
        let range = self.selector.range();
        for (role, view_area) in [(Role::Start, start_area), (Role::End, end_area)] {
            let days = self.view_days(role);
            MonthView::new(role, &days, range)
                .cursor(self.cursor)
                .focused(role == self.focus)
                .render(view_area, buf);
        }
        let presets = Preset::ALL
            .iter()
            .zip(1..)
            .map(|(p, n)| format!("{n} {}", p.label()))
            .collect::<Vec<_>>()
            .join("  ");
        Line::styled(presets, HINT_STYLE).render(presets_area, buf);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Notice {
    Info(String),
    Error(String),
}

fn subscribe_channel(selector: &mut RangeSelector, sender: Sender<DateRange>) -> ListenerId {
    selector.subscribe(move |range| {
        // The receiver only goes away along with the app
        let _ = sender.send(range);
    })
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum AppState {
    Picking,
    Helping,
    Jumping(JumpToState),
    Filtering(FilterPromptState),
    Quitting,
}
