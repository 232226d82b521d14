use std::iter::successors;
use time::{Date, Month, Weekday};

/// Number of cells in a month grid: six weeks of seven days
pub(crate) const GRID_CELLS: usize = 42;

pub(crate) const DAYS_IN_WEEK: usize = 7;

pub(crate) trait WeekdayExt {
    fn index0(&self) -> u16;
}

impl WeekdayExt for Weekday {
    fn index0(&self) -> u16 {
        self.number_days_from_sunday().into()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct CalendarDay {
    pub(crate) date: Date,
    pub(crate) day_of_month: u8,
    /// Set for padding days belonging to the previous or next month
    pub(crate) disabled: bool,
    pub(crate) is_today: bool,
}

impl CalendarDay {
    fn padding(date: Date) -> CalendarDay {
        CalendarDay {
            date,
            day_of_month: date.day(),
            disabled: true,
            is_today: false,
        }
    }

    fn in_month(date: Date, today: Date) -> CalendarDay {
        CalendarDay {
            date,
            day_of_month: date.day(),
            disabled: false,
            is_today: date == today,
        }
    }
}

/// Returns the 42 days shown for the month containing `base`, starting on the
/// Sunday on or before the first of the month.
///
/// At the very ends of representable time the grid is cut short rather than
/// wrapping around.
pub(crate) fn generate_calendar_days(base: Date, today: Date) -> Vec<CalendarDay> {
    let (year, month) = (base.year(), base.month());
    let first = first_of_month(base);
    let leading = usize::from(first.weekday().index0());
    let mut days = Vec::with_capacity(GRID_CELLS);
    let mut before = iter_days_before(first)
        .take(leading)
        .map(CalendarDay::padding)
        .collect::<Vec<_>>();
    before.reverse();
    days.extend(before);
    days.extend(
        successors(Some(first), |&d| d.next_day())
            .take(usize::from(days_in_month(year, month)))
            .map(|d| CalendarDay::in_month(d, today)),
    );
    if let Some(last) = days.last().map(|cd| cd.date) {
        let trailing = GRID_CELLS.saturating_sub(days.len());
        days.extend(
            iter_days_after(last)
                .take(trailing)
                .map(CalendarDay::padding),
        );
    }
    days
}

pub(crate) fn first_of_month(date: Date) -> Date {
    // Day 1 exists in every month
    date.replace_day(1).unwrap_or(date)
}

pub(crate) fn days_in_month(year: i32, month: Month) -> u8 {
    let next_first = if month == Month::December {
        year.checked_add(1)
            .and_then(|y| Date::from_calendar_date(y, Month::January, 1).ok())
    } else {
        Date::from_calendar_date(year, month.next(), 1).ok()
    };
    match next_first.and_then(Date::previous_day) {
        Some(last) => last.day(),
        // Only December of the last representable year gets here
        None => 31,
    }
}

fn iter_days_after(date: Date) -> impl Iterator<Item = Date> {
    successors(Some(date), |&d| d.next_day()).skip(1)
}

fn iter_days_before(date: Date) -> impl Iterator<Item = Date> {
    successors(Some(date), |&d| d.previous_day()).skip(1)
}
