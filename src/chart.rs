//! Chart configuration, the registry of live charts, and their widget
use crate::report::ReportPayload;
use crate::theme::{HINT_STYLE, TITLE_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph, Widget},
};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_COLOR: Color = Color::Rgb(0x6b, 0x72, 0x80);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum ChartType {
    Line,
    Bar,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum ValueFormat {
    Currency,
    Percentage,
    Number,
}

impl ValueFormat {
    pub(crate) fn format(self, value: f64) -> String {
        let sign = if value < 0.0 { "-" } else { "" };
        match self {
            ValueFormat::Currency => {
                format!("{sign}${}", group_thousands(&format!("{:.2}", value.abs())))
            }
            ValueFormat::Percentage => format!("{value:.2}%"),
            ValueFormat::Number if value.fract() == 0.0 => {
                format!("{sign}{}", group_thousands(&format!("{:.0}", value.abs())))
            }
            ValueFormat::Number => {
                format!("{sign}{}", group_thousands(&format!("{:.2}", value.abs())))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ChartConfig {
    label: String,
    chart_type: ChartType,
    color: Color,
    background_color: Option<Color>,
    value_format: ValueFormat,
}

impl ChartConfig {
    pub(crate) fn new<S: Into<String>>(
        label: S,
        chart_type: ChartType,
        value_format: ValueFormat,
    ) -> Result<ChartConfig, ChartConfigError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ChartConfigError::EmptyLabel);
        }
        Ok(ChartConfig {
            label,
            chart_type,
            color: DEFAULT_COLOR,
            background_color: None,
            value_format,
        })
    }

    /// Sets the series colour from a `#rrggbb` string or a colour name
    pub(crate) fn color(mut self, name: &str) -> Result<ChartConfig, ChartConfigError> {
        self.color = parse_color(name)?;
        Ok(self)
    }

    pub(crate) fn background_color(mut self, name: &str) -> Result<ChartConfig, ChartConfigError> {
        self.background_color = Some(parse_color(name)?);
        Ok(self)
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub(crate) fn value_format(&self) -> ValueFormat {
        self.value_format
    }
}

fn parse_color(name: &str) -> Result<Color, ChartConfigError> {
    Color::from_str(name).map_err(|_| ChartConfigError::Color(name.to_owned()))
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum ChartConfigError {
    #[error("chart label must not be empty")]
    EmptyLabel,
    #[error("invalid chart colour {0:?}")]
    Color(String),
}

/// Configuration used for a metric that the report does not describe
/// itself
pub(crate) fn default_config(metric_id: &str) -> ChartConfig {
    let (label, chart_type, value_format, color) = match metric_id {
        "total_revenue" => (
            "Total Revenue",
            ChartType::Line,
            ValueFormat::Currency,
            Color::Rgb(0x3b, 0x82, 0xf6),
        ),
        "total_orders" => (
            "Total Orders",
            ChartType::Bar,
            ValueFormat::Number,
            Color::Rgb(0x10, 0xb9, 0x81),
        ),
        "total_sessions" => (
            "Total Sessions",
            ChartType::Bar,
            ValueFormat::Number,
            Color::Rgb(0x8b, 0x5c, 0xf6),
        ),
        "conversion_rate" => (
            "Conversion Rate",
            ChartType::Line,
            ValueFormat::Percentage,
            Color::Rgb(0xf5, 0x9e, 0x0b),
        ),
        "average_order_value" => (
            "Average Order Value",
            ChartType::Line,
            ValueFormat::Currency,
            Color::Rgb(0xef, 0x44, 0x44),
        ),
        _ => (metric_id, ChartType::Line, ValueFormat::Number, DEFAULT_COLOR),
    };
    ChartConfig {
        label: label.to_owned(),
        chart_type,
        color,
        background_color: None,
        value_format,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ChartHandle {
    config: ChartConfig,
    labels: Vec<String>,
    values: Vec<f64>,
    /// Percentage change over the previous period, if the report gave one
    growth: Option<f64>,
}

impl ChartHandle {
    pub(crate) fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub(crate) fn labels(&self) -> &[String] {
        &self.labels
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn latest(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub(crate) fn growth(&self) -> Option<f64> {
        self.growth
    }
}

/// All charts currently on screen, keyed by metric ID
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ChartRegistry {
    charts: BTreeMap<String, ChartHandle>,
}

impl ChartRegistry {
    pub(crate) fn new() -> ChartRegistry {
        ChartRegistry::default()
    }

    /// Creates an empty chart.  Fails if `id` already has one.
    pub(crate) fn create(&mut self, id: &str, config: ChartConfig) -> Result<(), ChartError> {
        if self.charts.contains_key(id) {
            return Err(ChartError::Exists(id.to_owned()));
        }
        log::debug!("Creating chart {id:?}");
        self.charts.insert(
            id.to_owned(),
            ChartHandle {
                config,
                labels: Vec::new(),
                values: Vec::new(),
                growth: None,
            },
        );
        Ok(())
    }

    pub(crate) fn update(
        &mut self,
        id: &str,
        labels: Vec<String>,
        values: Vec<f64>,
    ) -> Result<(), ChartError> {
        let Some(chart) = self.charts.get_mut(id) else {
            return Err(ChartError::Missing(id.to_owned()));
        };
        if labels.len() != values.len() {
            return Err(ChartError::Length {
                id: id.to_owned(),
                labels: labels.len(),
                values: values.len(),
            });
        }
        chart.labels = labels;
        chart.values = values;
        Ok(())
    }

    /// Returns `false` if there was no chart for `id`
    pub(crate) fn destroy(&mut self, id: &str) -> bool {
        let removed = self.charts.remove(id).is_some();
        if removed {
            log::debug!("Destroyed chart {id:?}");
        }
        removed
    }

    /// Makes the registry hold exactly one chart per series in `payload`
    pub(crate) fn sync(&mut self, payload: &ReportPayload) -> Result<(), ChartError> {
        let stale = self
            .charts
            .keys()
            .filter(|id| !payload.series.contains_key(*id))
            .cloned()
            .collect::<Vec<_>>();
        for id in stale {
            self.destroy(&id);
        }
        for (id, values) in &payload.series {
            if !self.charts.contains_key(id) {
                self.create(id, payload.chart_config(id))?;
            }
            self.update(id, payload.labels.clone(), values.clone())?;
            if let Some(chart) = self.charts.get_mut(id) {
                chart.growth = payload.growth.get(&format!("{id}_growth")).copied();
            }
        }
        Ok(())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &ChartHandle)> + '_ {
        self.charts.iter().map(|(id, chart)| (id.as_str(), chart))
    }

    pub(crate) fn len(&self) -> usize {
        self.charts.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum ChartError {
    #[error("chart {0:?} already exists")]
    Exists(String),
    #[error("no chart {0:?}")]
    Missing(String),
    #[error("chart {id:?} given {labels} labels but {values} values")]
    Length {
        id: String,
        labels: usize,
        values: usize,
    },
}

/// Draws every chart in a registry, stacked vertically
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ChartPanel<'a>(pub(crate) &'a ChartRegistry);

impl Widget for ChartPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.0.is_empty() {
            Paragraph::new("No report data")
                .style(HINT_STYLE)
                .render(area, buf);
            return;
        }
        let Ok(qty) = u32::try_from(self.0.len()) else {
            return;
        };
        let areas = Layout::vertical((0..qty).map(|_| Constraint::Ratio(1, qty))).split(area);
        for ((_, chart), &chart_area) in self.0.iter().zip(areas.iter()) {
            render_chart(chart, chart_area, buf);
        }
    }
}

fn render_chart(chart: &ChartHandle, area: Rect, buf: &mut Buffer) {
    let config = chart.config();
    let value = match chart.latest() {
        Some(v) => format!(": {}", config.value_format().format(v)),
        None => String::new(),
    };
    let growth = match chart.growth() {
        Some(g) if g < 0.0 => format!(" ↓{:.2}%", g.abs()),
        Some(g) => format!(" ↑{g:.2}%"),
        None => String::new(),
    };
    let title = format!(" {}{value}{growth} ", config.label());
    let mut block = Block::bordered().title(title).title_style(TITLE_STYLE);
    if let Some(bg) = config.background_color {
        block = block.style(Style::new().bg(bg));
    }
    if chart.values().is_empty() {
        Paragraph::new("No data for this range")
            .style(HINT_STYLE)
            .block(block)
            .render(area, buf);
        return;
    }
    let points = chart
        .values()
        .iter()
        .enumerate()
        .map(|(i, &v)| (index_to_f64(i), v))
        .collect::<Vec<_>>();
    let (lo, hi) = chart
        .values()
        .iter()
        .fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let last_x = index_to_f64(points.len().saturating_sub(1)).max(1.0);
    let (graph_type, marker) = match config.chart_type() {
        ChartType::Line => (GraphType::Line, Marker::Braille),
        ChartType::Bar => (GraphType::Bar, Marker::HalfBlock),
    };
    let dataset = Dataset::default()
        .marker(marker)
        .graph_type(graph_type)
        .style(Style::new().fg(config.color))
        .data(&points);
    let first_label = chart.labels().first().cloned().unwrap_or_default();
    let last_label = chart.labels().last().cloned().unwrap_or_default();
    Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, last_x])
                .labels([Line::from(first_label), Line::from(last_label)]),
        )
        .y_axis(Axis::default().bounds([lo, hi.max(lo + 1.0)]).labels([
            Line::from(config.value_format().format(lo)),
            Line::from(config.value_format().format(hi)),
        ]))
        .render(area, buf);
}

fn index_to_f64(i: usize) -> f64 {
    f64::from(u32::try_from(i).unwrap_or(u32::MAX))
}

fn group_thousands(digits: &str) -> String {
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let mut out = String::with_capacity(digits.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}
