use crate::theme::{
    BASE_STYLE,
    filterprompt::{INPUT_STYLE, PLACEHOLDER_STYLE},
};
use ratatui::{
    buffer::Buffer,
    layout::{Flex, HorizontalAlignment, Layout, Margin, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Clear, StatefulWidget, Widget},
};

const OUTER_WIDTH: u16 = 40;
const OUTER_HEIGHT: u16 = 8;

/// Longest filter value that can be typed
const MAX_CHARS: usize = 32;

/// A text filter applied on top of the date range
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum FilterField {
    Category,
    Asin,
}

impl FilterField {
    fn title(self) -> &'static str {
        match self {
            FilterField::Category => " Category ",
            FilterField::Asin => " ASIN ",
        }
    }

    // ASINs are ten uppercase letters and digits
    fn accept(self, ch: char) -> Option<char> {
        match self {
            FilterField::Category if !ch.is_control() => Some(ch),
            FilterField::Asin if ch.is_ascii_alphanumeric() => Some(ch.to_ascii_uppercase()),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct FilterPrompt;

impl StatefulWidget for FilterPrompt {
    type State = FilterPromptState;

    /*
     * ........................................
     * .┌────────────── Category ────────────┐.
     * .│                                    │.
     * .│              Kitchen_              │.
     * .│                                    │.
     * .│              [ENTER]               │.
     * .└────────────────────────────────────┘.
     * ........................................
     */

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let [outer_area] = Layout::horizontal([OUTER_WIDTH])
            .flex(Flex::Center)
            .areas(area);
        let [outer_area] = Layout::vertical([OUTER_HEIGHT])
            .flex(Flex::Center)
            .areas(outer_area);
        Clear.render(outer_area, buf);
        Block::new().style(BASE_STYLE).render(outer_area, buf);
        let block_area = outer_area.inner(Margin::new(1, 1));
        Block::bordered()
            .title(state.field.title())
            .title_alignment(HorizontalAlignment::Center)
            .render(block_area, buf);
        let text_area = block_area.inner(Margin::new(1, 1));
        state.to_text().render(text_area, buf);
    }
}

/// Text typed so far into a category or ASIN prompt
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct FilterPromptState {
    field: FilterField,
    text: String,
}

impl FilterPromptState {
    /// Starts out holding the filter's current value
    pub(crate) fn new(field: FilterField, current: &str) -> FilterPromptState {
        FilterPromptState {
            field,
            text: current.to_owned(),
        }
    }

    fn to_text(&self) -> Text<'static> {
        let input = if self.text.is_empty() {
            Line::styled("(any)", PLACEHOLDER_STYLE)
        } else {
            Line::from(Span::styled(format!("{}_", self.text), INPUT_STYLE))
        };
        Text::from_iter([
            Line::styled("", BASE_STYLE),
            input,
            Line::styled("", BASE_STYLE),
            Line::styled("[ENTER]", BASE_STYLE),
        ])
        .centered()
    }

    pub(crate) fn handle_input(&mut self, input: FilterInput) -> FilterOutput {
        match input {
            FilterInput::Char(ch) if self.text.chars().count() < MAX_CHARS => {
                match self.field.accept(ch) {
                    Some(ch) => {
                        self.text.push(ch);
                        FilterOutput::Ok
                    }
                    None => FilterOutput::Invalid,
                }
            }
            FilterInput::Backspace if self.text.pop().is_some() => FilterOutput::Ok,
            FilterInput::Enter => FilterOutput::Submit(self.field, self.text.trim().to_owned()),
            _ => FilterOutput::Invalid,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum FilterInput {
    Char(char),
    Backspace,
    Enter,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum FilterOutput {
    Ok,
    Invalid,
    /// The value to filter by; empty to stop filtering
    Submit(FilterField, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(state: &mut FilterPromptState, s: &str) {
        for ch in s.chars() {
            assert_eq!(state.handle_input(FilterInput::Char(ch)), FilterOutput::Ok);
        }
    }

    #[test]
    fn test_category() {
        let mut state = FilterPromptState::new(FilterField::Category, "");
        type_text(&mut state, "Home & Kitchen ");
        assert_eq!(
            state.handle_input(FilterInput::Enter),
            FilterOutput::Submit(FilterField::Category, String::from("Home & Kitchen"))
        );
    }

    #[test]
    fn test_asin_is_uppercased_alphanumerics() {
        let mut state = FilterPromptState::new(FilterField::Asin, "");
        type_text(&mut state, "b07xj8");
        assert_eq!(
            state.handle_input(FilterInput::Char('-')),
            FilterOutput::Invalid
        );
        assert_eq!(
            state.handle_input(FilterInput::Enter),
            FilterOutput::Submit(FilterField::Asin, String::from("B07XJ8"))
        );
    }

    #[test]
    fn test_backspace_and_clearing() {
        let mut state = FilterPromptState::new(FilterField::Category, "Toys");
        for _ in 0..4 {
            assert_eq!(state.handle_input(FilterInput::Backspace), FilterOutput::Ok);
        }
        assert_eq!(
            state.handle_input(FilterInput::Backspace),
            FilterOutput::Invalid
        );
        assert_eq!(
            state.handle_input(FilterInput::Enter),
            FilterOutput::Submit(FilterField::Category, String::new())
        );
    }

    #[test]
    fn test_length_limit() {
        let mut state = FilterPromptState::new(FilterField::Category, &"x".repeat(MAX_CHARS));
        assert_eq!(
            state.handle_input(FilterInput::Char('y')),
            FilterOutput::Invalid
        );
    }

    #[test]
    fn test_render() {
        let area = Rect::new(0, 0, 60, 12);
        let mut buf = Buffer::empty(area);
        let mut state = FilterPromptState::new(FilterField::Asin, "B01");
        FilterPrompt.render(area, &mut buf, &mut state);
        let rows = (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>();
        assert!(rows.iter().any(|r| r.contains(" ASIN ")));
        assert!(rows.iter().any(|r| r.contains("B01_")));
    }
}
