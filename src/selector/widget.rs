use super::days::{CalendarDay, DAYS_IN_WEEK, WeekdayExt};
use super::{DateRange, Role};
use crate::theme::{
    CURSOR_STYLE, DISABLED_DAY_STYLE, ENDPOINT_STYLE, FOCUSED_BORDER_STYLE, IN_RANGE_STYLE,
    TITLE_STYLE, WEEKDAY_STYLE,
};
use ratatui::{
    buffer::Buffer,
    layout::{HorizontalAlignment, Rect},
    style::Style,
    widgets::{Block, Widget},
};
use time::Date;

static HEADER: &str = " Su  Mo  Tu  We  Th  Fr  Sa ";

/// Number of columns per day of week
const DAY_WIDTH: u16 = 4;

/// Width of the grid in columns, not counting the border
pub(crate) const GRID_WIDTH: u16 = 28;

/// Height of the grid in lines (header plus six weeks), not counting the
/// border
pub(crate) const GRID_HEIGHT: u16 = 7;

/// One month of the picker, drawn inside a bordered block whose title names
/// the role and month
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct MonthView<'a> {
    role: Role,
    days: &'a [CalendarDay],
    range: DateRange,
    cursor: Option<Date>,
    focused: bool,
}

impl<'a> MonthView<'a> {
    pub(crate) fn new(role: Role, days: &'a [CalendarDay], range: DateRange) -> Self {
        MonthView {
            role,
            days,
            range,
            cursor: None,
            focused: false,
        }
    }

    pub(crate) fn cursor(mut self, cursor: Date) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub(crate) fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn title(&self) -> String {
        let role = match self.role {
            Role::Start => "Start",
            Role::End => "End",
        };
        match self.days.iter().find(|d| !d.disabled) {
            Some(d) => format!(" {role}: {} {} ", d.date.month(), d.date.year()),
            None => format!(" {role} "),
        }
    }

    fn day_style(&self, day: &CalendarDay) -> Style {
        let mut style = if day.disabled {
            DISABLED_DAY_STYLE
        } else if self.range.start() == Some(day.date) || self.range.end() == Some(day.date) {
            ENDPOINT_STYLE
        } else if self.range.contains(day.date) {
            IN_RANGE_STYLE
        } else {
            Style::new()
        };
        if self.focused && self.cursor == Some(day.date) {
            style = style.patch(CURSOR_STYLE);
        }
        style
    }
}

impl Widget for MonthView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut block = Block::bordered()
            .title(self.title())
            .title_alignment(HorizontalAlignment::Center)
            .title_style(TITLE_STYLE);
        if self.focused {
            block = block.border_style(FOCUSED_BORDER_STYLE);
        }
        let inner = block.inner(area);
        block.render(area, buf);
        let mut canvas = GridCanvas::new(inner, buf);
        canvas.draw_header();
        for (i, day) in self.days.iter().enumerate() {
            let Ok(week_no) = u16::try_from(i / DAYS_IN_WEEK) else {
                break;
            };
            let s = if day.is_today {
                format!("[{:2}]", day.day_of_month)
            } else {
                format!(" {:2} ", day.day_of_month)
            };
            canvas.draw_day(week_no, day.date.weekday().index0(), &s, self.day_style(day));
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
struct GridCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl<'a> GridCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer) -> Self {
        Self { area, buf }
    }

    fn draw_header(&mut self) {
        self.mvprint(0, 0, HEADER, WEEKDAY_STYLE);
    }

    fn draw_day(&mut self, week_no: u16, wd_index: u16, s: &str, style: Style) {
        self.mvprint(week_no + 1, DAY_WIDTH * wd_index, s, style);
    }

    // Text extending past the right edge of the area is truncated
    fn mvprint(&mut self, y: u16, x: u16, s: &str, style: Style) {
        if y < self.area.height && x < self.area.width {
            self.buf.set_stringn(
                x + self.area.x,
                y + self.area.y,
                s,
                usize::from(self.area.width - x),
                style,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::generate_calendar_days;
    use ratatui::style::Modifier;
    use time::macros::date;

    fn line(buf: &Buffer, y: u16) -> String {
        (buf.area.left()..buf.area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect()
    }

    #[test]
    fn test_render_june_2024() {
        let days = generate_calendar_days(date!(2024 - 06 - 01), date!(2024 - 06 - 20));
        let range = DateRange::new(date!(2024 - 06 - 10), date!(2024 - 06 - 12)).unwrap();
        let area = Rect::new(0, 0, GRID_WIDTH + 2, GRID_HEIGHT + 2);
        let mut buf = Buffer::empty(area);
        MonthView::new(Role::Start, &days, range).render(area, &mut buf);
        assert!(line(&buf, 0).contains(" Start: June 2024 "));
        assert_eq!(line(&buf, 1), "│ Su  Mo  Tu  We  Th  Fr  Sa │");
        assert_eq!(line(&buf, 2), "│ 26  27  28  29  30  31   1 │");
        assert_eq!(line(&buf, 5), "│ 16  17  18  19 [20] 21  22 │");
        assert_eq!(line(&buf, 7), "│ 30   1   2   3   4   5   6 │");
        // June 10th is a Monday in the third row
        assert_eq!(buf[(5, 4)].style().add_modifier, ENDPOINT_STYLE.add_modifier);
        assert_eq!(buf[(1, 2)].fg, DISABLED_DAY_STYLE.fg.unwrap_or_default());
        assert_eq!(buf[(9, 4)].bg, IN_RANGE_STYLE.bg.unwrap_or_default());
    }

    #[test]
    fn test_cursor_only_when_focused() {
        let days = generate_calendar_days(date!(2024 - 06 - 01), date!(2024 - 01 - 01));
        let area = Rect::new(0, 0, GRID_WIDTH + 2, GRID_HEIGHT + 2);
        let mut buf = Buffer::empty(area);
        MonthView::new(Role::End, &days, DateRange::default())
            .cursor(date!(2024 - 06 - 01))
            .render(area, &mut buf);
        assert!(!buf[(26, 2)].modifier.contains(Modifier::REVERSED));
        let mut buf = Buffer::empty(area);
        MonthView::new(Role::End, &days, DateRange::default())
            .cursor(date!(2024 - 06 - 01))
            .focused(true)
            .render(area, &mut buf);
        assert!(buf[(26, 2)].modifier.contains(Modifier::REVERSED));
        assert!(line(&buf, 0).contains(" End: June 2024 "));
    }

    #[test]
    fn test_narrow_area_truncates() {
        let days = generate_calendar_days(date!(2024 - 06 - 01), date!(2024 - 06 - 20));
        let area = Rect::new(0, 0, 12, 4);
        let mut buf = Buffer::empty(area);
        MonthView::new(Role::Start, &days, DateRange::default()).render(area, &mut buf);
        assert_eq!(line(&buf, 1), "│ Su  Mo  T│");
    }
}
