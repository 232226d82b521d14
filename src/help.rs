use crate::theme::{BASE_STYLE, TITLE_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::{Flex, HorizontalAlignment, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Widget},
};

/// Width of the key column
const KEYS_WIDTH: usize = 16;

static COMMANDS: &[(&str, &str)] = &[
    ("o, SPACE", "Open or close the picker"),
    ("TAB", "Switch between start and end"),
    ("h j k l, ARROWS", "Move the cursor"),
    ("ENTER", "Pick the day under the cursor"),
    ("1 / 2 / 3", "Last 7 days / last 30 days / this month"),
    ("t", "Move the cursor to today"),
    ("g", "Input date to go to"),
    ("b", "Cycle daily / weekly / monthly"),
    ("f", "Filter by product category"),
    ("a", "Filter by ASIN"),
    ("r", "Reload the report"),
    ("c", "Forget saved filters"),
    ("?", "Show this help"),
    ("q, ESC", "Quit"),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Help;

impl Help {
    fn text() -> Text<'static> {
        let mut lines = COMMANDS
            .iter()
            .map(|&(keys, what)| {
                Line::from_iter([
                    Span::styled(format!("{keys:KEYS_WIDTH$}"), TITLE_STYLE),
                    Span::styled(what, BASE_STYLE),
                ])
            })
            .collect::<Vec<_>>();
        lines.push(Line::raw(""));
        lines.push(Line::raw("Press the Any Key to dismiss."));
        Text::from(lines)
    }
}

impl Widget for Help {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text = Help::text();
        let height = u16::try_from(text.height())
            .unwrap_or(u16::MAX)
            .saturating_add(2)
            .min(area.height);
        let width = u16::try_from(text.width())
            .unwrap_or(u16::MAX)
            .saturating_add(2)
            .min(area.width);
        let [help_area] = Layout::horizontal([width]).flex(Flex::Center).areas(area);
        let [help_area] = Layout::vertical([height])
            .flex(Flex::Center)
            .areas(help_area);
        Clear.render(help_area, buf);
        Paragraph::new(text)
            .block(
                Block::bordered()
                    .title(" Commands ")
                    .title_alignment(HorizontalAlignment::Center),
            )
            .style(BASE_STYLE)
            .render(help_area, buf);
    }
}
