//! Date range selection state shared by both month views of the picker
mod days;
mod widget;
pub(crate) use self::days::{CalendarDay, first_of_month, generate_calendar_days};
pub(crate) use self::widget::{GRID_HEIGHT, GRID_WIDTH, MonthView};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::{Date, Duration};

/// Number of days before today at which the default range starts
const DEFAULT_SPAN_DAYS: i64 = 30;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) struct DateRange {
    start: Option<Date>,
    end: Option<Date>,
}

impl DateRange {
    /// Returns a complete range, failing if `end` precedes `start`
    pub(crate) fn new(start: Date, end: Date) -> Result<DateRange, InvertedRangeError> {
        if end < start {
            Err(InvertedRangeError { start, end })
        } else {
            Ok(DateRange {
                start: Some(start),
                end: Some(end),
            })
        }
    }

    /// A selection in progress: a start with no end yet
    pub(crate) fn starting(start: Date) -> DateRange {
        DateRange {
            start: Some(start),
            end: None,
        }
    }

    /// The thirty days up to and including `today`
    pub(crate) fn default_for(today: Date) -> DateRange {
        DateRange {
            start: Some(days_before(today, DEFAULT_SPAN_DAYS)),
            end: Some(today),
        }
    }

    pub(crate) fn start(&self) -> Option<Date> {
        self.start
    }

    pub(crate) fn end(&self) -> Option<Date> {
        self.end
    }

    pub(crate) fn phase(&self) -> SelectionPhase {
        match (self.start, self.end) {
            (None, _) => SelectionPhase::NoRange,
            (Some(_), None) => SelectionPhase::StartOnly,
            (Some(_), Some(_)) => SelectionPhase::Complete,
        }
    }

    /// True if `date` lies between the two endpoints, inclusive.  A range
    /// without an end contains only its start.
    pub(crate) fn contains(&self, date: Date) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= date && date <= end,
            (Some(start), None) => start == date,
            _ => false,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "Select date range"),
            (Some(start), None) => write!(f, "From {start}"),
            (Some(start), Some(end)) => write!(f, "{start} - {end}"),
            (None, Some(end)) => write!(f, "Until {end}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("range end {end} precedes range start {start}")]
pub(crate) struct InvertedRangeError {
    start: Date,
    end: Date,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum SelectionPhase {
    NoRange,
    StartOnly,
    Complete,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Role {
    Start,
    End,
}

impl Role {
    pub(crate) fn other(self) -> Role {
        match self {
            Role::Start => Role::End,
            Role::End => Role::Start,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Preset {
    Last7,
    Last30,
    ThisMonth,
}

impl Preset {
    pub(crate) const ALL: [Preset; 3] = [Preset::Last7, Preset::Last30, Preset::ThisMonth];

    /// Both endpoints are inclusive, so "last 7 days" starts six days ago
    pub(crate) fn range(self, today: Date) -> DateRange {
        let start = match self {
            Preset::Last7 => days_before(today, 6),
            Preset::Last30 => days_before(today, 29),
            Preset::ThisMonth => first_of_month(today),
        };
        DateRange {
            start: Some(start),
            end: Some(today),
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Preset::Last7 => "Last 7 days",
            Preset::Last30 => "Last 30 days",
            Preset::ThisMonth => "This month",
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Preset::Last7 => "last7",
            Preset::Last30 => "last30",
            Preset::ThisMonth => "thisMonth",
        }
    }
}

impl FromStr for Preset {
    type Err = UnknownPresetError;

    fn from_str(s: &str) -> Result<Preset, UnknownPresetError> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| UnknownPresetError(s.to_owned()))
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown date range preset {0:?}")]
pub(crate) struct UnknownPresetError(String);

/// Handle returned by [`RangeSelector::subscribe`], used to unsubscribe
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct ListenerId(u64);

type Listener = Box<dyn FnMut(DateRange)>;

pub(crate) struct RangeSelector {
    today: Date,
    range: DateRange,
    is_open: bool,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl RangeSelector {
    /// Creates a closed selector with no range selected.  Call
    /// [`initialize`](Self::initialize) or [`seed`](Self::seed) once listeners
    /// are in place.
    pub(crate) fn new(today: Date) -> RangeSelector {
        RangeSelector {
            today,
            range: DateRange::default(),
            is_open: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub(crate) fn today(&self) -> Date {
        self.today
    }

    pub(crate) fn range(&self) -> DateRange {
        self.range
    }

    pub(crate) fn is_open(&self) -> bool {
        self.is_open
    }

    pub(crate) fn toggle_open(&mut self) {
        self.is_open = !self.is_open;
    }

    pub(crate) fn close(&mut self) {
        self.is_open = false;
    }

    /// Installs the default range and notifies listeners
    pub(crate) fn initialize(&mut self) {
        self.seed(DateRange::default_for(self.today));
    }

    /// Installs a range restored from elsewhere and notifies listeners
    pub(crate) fn seed(&mut self, range: DateRange) {
        self.range = range;
        self.notify();
    }

    pub(crate) fn format_date_range(&self) -> String {
        self.range.to_string()
    }

    pub(crate) fn start_calendar_days(&self) -> Vec<CalendarDay> {
        generate_calendar_days(self.range.start.unwrap_or(self.today), self.today)
    }

    pub(crate) fn end_calendar_days(&self) -> Vec<CalendarDay> {
        generate_calendar_days(self.range.end.unwrap_or(self.today), self.today)
    }

    /// Applies a click on `day` in the view for `role`.  Returns `false` for
    /// disabled days, which change nothing.
    pub(crate) fn select_date(&mut self, role: Role, day: &CalendarDay) -> bool {
        if day.disabled {
            return false;
        }
        match role {
            Role::Start => {
                self.range.start = Some(day.date);
                if self.range.end.is_some_and(|end| end < day.date) {
                    self.range.end = None;
                }
            }
            Role::End => match self.range.start {
                Some(start) if day.date >= start => self.range.end = Some(day.date),
                // Picking an end before the start restarts the selection
                _ => {
                    self.range.start = Some(day.date);
                    self.range.end = None;
                }
            },
        }
        log::debug!("{role:?} date picked; range is now {}", self.range);
        self.notify();
        true
    }

    pub(crate) fn select_preset(&mut self, preset: Preset) {
        self.range = preset.range(self.today);
        self.is_open = false;
        log::debug!("Preset {} applied; range is now {}", preset.name(), self.range);
        self.notify();
    }

    pub(crate) fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(DateRange) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not (or no longer) subscribed
    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        let range = self.range;
        for (_, listener) in &mut self.listeners {
            listener(range);
        }
    }
}

impl fmt::Debug for RangeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeSelector")
            .field("today", &self.today)
            .field("range", &self.range)
            .field("is_open", &self.is_open)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

fn days_before(date: Date, days: i64) -> Date {
    date.checked_sub(Duration::days(days)).unwrap_or(Date::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use time::macros::date;

    fn day(date: Date) -> CalendarDay {
        CalendarDay {
            date,
            day_of_month: date.day(),
            disabled: false,
            is_today: false,
        }
    }

    fn recording(selector: &mut RangeSelector) -> Rc<RefCell<Vec<DateRange>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        selector.subscribe(move |range| sink.borrow_mut().push(range));
        seen
    }

    fn with_range(start: Date, end: Date) -> RangeSelector {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        selector.seed(DateRange::new(start, end).unwrap());
        selector
    }

    #[test]
    fn test_initialize() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        let seen = recording(&mut selector);
        assert_eq!(selector.range().phase(), SelectionPhase::NoRange);
        selector.initialize();
        let expected = DateRange::new(date!(2024 - 05 - 21), date!(2024 - 06 - 20)).unwrap();
        assert_eq!(selector.range(), expected);
        assert_eq!(*seen.borrow(), vec![expected]);
        assert!(!selector.is_open());
    }

    #[test]
    fn test_disabled_day_is_ignored() {
        let mut selector = with_range(date!(2024 - 06 - 10), date!(2024 - 06 - 20));
        let seen = recording(&mut selector);
        let mut padding = day(date!(2024 - 05 - 31));
        padding.disabled = true;
        assert!(!selector.select_date(Role::Start, &padding));
        assert!(!selector.select_date(Role::End, &padding));
        assert_eq!(
            selector.range(),
            DateRange::new(date!(2024 - 06 - 10), date!(2024 - 06 - 20)).unwrap()
        );
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_start_after_end_clears_end() {
        let mut selector = with_range(date!(2024 - 06 - 10), date!(2024 - 06 - 20));
        assert!(selector.select_date(Role::Start, &day(date!(2024 - 06 - 25))));
        assert_eq!(selector.range().start(), Some(date!(2024 - 06 - 25)));
        assert_eq!(selector.range().end(), None);
        assert_eq!(selector.range().phase(), SelectionPhase::StartOnly);
    }

    #[test]
    fn test_start_before_end_keeps_end() {
        let mut selector = with_range(date!(2024 - 06 - 10), date!(2024 - 06 - 20));
        selector.select_date(Role::Start, &day(date!(2024 - 06 - 01)));
        assert_eq!(
            selector.range(),
            DateRange::new(date!(2024 - 06 - 01), date!(2024 - 06 - 20)).unwrap()
        );
        selector.select_date(Role::Start, &day(date!(2024 - 06 - 20)));
        assert_eq!(selector.range().end(), Some(date!(2024 - 06 - 20)));
    }

    #[test]
    fn test_end_without_start_becomes_start() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        let seen = recording(&mut selector);
        selector.select_date(Role::End, &day(date!(2024 - 06 - 05)));
        assert_eq!(selector.range().start(), Some(date!(2024 - 06 - 05)));
        assert_eq!(selector.range().end(), None);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_end_before_start_restarts_selection() {
        let mut selector = with_range(date!(2024 - 06 - 10), date!(2024 - 06 - 20));
        selector.select_date(Role::End, &day(date!(2024 - 06 - 03)));
        assert_eq!(selector.range().start(), Some(date!(2024 - 06 - 03)));
        assert_eq!(selector.range().end(), None);
    }

    #[test]
    fn test_end_completes_range() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        selector.select_date(Role::Start, &day(date!(2024 - 06 - 03)));
        assert_eq!(selector.range().phase(), SelectionPhase::StartOnly);
        selector.select_date(Role::End, &day(date!(2024 - 06 - 03)));
        assert_eq!(selector.range().phase(), SelectionPhase::Complete);
        assert_eq!(selector.format_date_range(), "2024-06-03 - 2024-06-03");
    }

    #[test]
    fn test_no_range_never_jumps_to_complete() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        for role in [Role::Start, Role::End] {
            let mut fresh = RangeSelector::new(selector.today());
            fresh.select_date(role, &day(date!(2024 - 06 - 12)));
            assert_eq!(fresh.range().phase(), SelectionPhase::StartOnly);
        }
        selector.select_date(Role::End, &day(date!(2024 - 06 - 12)));
        assert_ne!(selector.range().phase(), SelectionPhase::Complete);
    }

    #[test]
    fn test_preset_last7() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        let seen = recording(&mut selector);
        selector.toggle_open();
        assert!(selector.is_open());
        selector.select_preset(Preset::Last7);
        assert_eq!(selector.range().start(), Some(date!(2024 - 06 - 14)));
        assert_eq!(selector.range().end(), Some(date!(2024 - 06 - 20)));
        assert!(!selector.is_open());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_other_presets() {
        let today = date!(2024 - 03 - 05);
        assert_eq!(
            Preset::Last30.range(today),
            DateRange::new(date!(2024 - 02 - 05), today).unwrap()
        );
        assert_eq!(
            Preset::ThisMonth.range(today),
            DateRange::new(date!(2024 - 03 - 01), today).unwrap()
        );
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("last7".parse::<Preset>(), Ok(Preset::Last7));
        assert_eq!("thisMonth".parse::<Preset>(), Ok(Preset::ThisMonth));
        assert!("lastYear".parse::<Preset>().is_err());
    }

    #[test]
    fn test_format_date_range() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        assert_eq!(selector.format_date_range(), "Select date range");
        selector.select_date(Role::Start, &day(date!(2024 - 06 - 14)));
        assert_eq!(selector.format_date_range(), "From 2024-06-14");
        selector.select_date(Role::End, &day(date!(2024 - 06 - 20)));
        assert_eq!(selector.format_date_range(), "2024-06-14 - 2024-06-20");
    }

    #[test]
    fn test_listeners_in_registration_order() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let order = Rc::clone(&order);
            selector.subscribe(move |_| order.borrow_mut().push(n));
        }
        selector.initialize();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_listener_sees_mutated_state() {
        let mut selector = with_range(date!(2024 - 06 - 10), date!(2024 - 06 - 20));
        let seen = recording(&mut selector);
        selector.select_date(Role::End, &day(date!(2024 - 06 - 12)));
        assert_eq!(
            *seen.borrow(),
            vec![DateRange::new(date!(2024 - 06 - 10), date!(2024 - 06 - 12)).unwrap()]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = selector.subscribe(move |_| *sink.borrow_mut() += 1);
        selector.initialize();
        assert!(selector.unsubscribe(id));
        assert!(!selector.unsubscribe(id));
        selector.select_preset(Preset::ThisMonth);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_calendar_views_follow_endpoints() {
        let mut selector = RangeSelector::new(date!(2024 - 06 - 20));
        assert!(selector
            .start_calendar_days()
            .iter()
            .any(|d| d.is_today && !d.disabled));
        selector.seed(DateRange::new(date!(2024 - 02 - 10), date!(2024 - 04 - 02)).unwrap());
        let start_days = selector.start_calendar_days();
        let end_days = selector.end_calendar_days();
        assert!(start_days
            .iter()
            .filter(|d| !d.disabled)
            .all(|d| d.date.month() == time::Month::February));
        assert!(end_days
            .iter()
            .filter(|d| !d.disabled)
            .all(|d| d.date.month() == time::Month::April));
        let range = selector.range();
        assert_eq!(
            start_days
                .iter()
                .filter(|d| range.start() == Some(d.date))
                .count(),
            1
        );
        assert_eq!(
            end_days.iter().filter(|d| range.end() == Some(d.date)).count(),
            1
        );
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(DateRange::new(date!(2024 - 06 - 20), date!(2024 - 06 - 19)).is_err());
        assert!(DateRange::new(date!(2024 - 06 - 20), date!(2024 - 06 - 20)).is_ok());
    }

    #[test]
    fn test_contains() {
        let range = DateRange::new(date!(2024 - 06 - 10), date!(2024 - 06 - 20)).unwrap();
        assert!(range.contains(date!(2024 - 06 - 10)));
        assert!(range.contains(date!(2024 - 06 - 20)));
        assert!(!range.contains(date!(2024 - 06 - 21)));
        assert!(!DateRange::default().contains(date!(2024 - 06 - 21)));
    }
}
