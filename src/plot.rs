//! A small figure model rendered with ratatui charts.
//!
//! A [`Figure`] is a titled grid of [`Panel`]s, one per channel most of the
//! time, arranged on two rows like the subplot grids of the analysis plots.
//! Figures are either shown in the terminal (see [`crate::gui`]) or drawn
//! into an off-screen buffer and saved as text.

use ratatui::{backend::TestBackend, prelude::*, widgets::*, Terminal};

use std::{fs, io, path::Path};

/// Colors assigned to successive channels.
pub const PALETTE: [Color; 10] = [
    Color::Blue,
    Color::LightRed,
    Color::Green,
    Color::Red,
    Color::Magenta,
    Color::Yellow,
    Color::LightMagenta,
    Color::Gray,
    Color::LightGreen,
    Color::Cyan,
];

/// Color of channel `c`.
pub fn channel_color(c: usize) -> Color {
    PALETTE[c % PALETTE.len()]
}

/// How the points of a series are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Connected points.
    Line,
    /// Single points.
    Scatter,
}

/// One data set within a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Legend entry.
    pub name: String,
    /// `(x, y)` pairs in data units.
    pub points: Vec<(f64, f64)>,
    /// How the points are drawn.
    pub kind: SeriesKind,
    /// Drawing color.
    pub color: Color,
}

impl Series {
    /// A series drawn as connected line.
    pub fn line(name: impl Into<String>, points: Vec<(f64, f64)>, color: Color) -> Self {
        Self {
            name: name.into(),
            points,
            kind: SeriesKind::Line,
            color,
        }
    }

    /// A series of unconnected points.
    pub fn scatter(name: impl Into<String>, points: Vec<(f64, f64)>, color: Color) -> Self {
        Self {
            name: name.into(),
            points,
            kind: SeriesKind::Scatter,
            color,
        }
    }
}

/// A single chart with axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    /// Shown on top of the chart.
    pub title: String,
    /// Label of the x axis.
    pub x_label: String,
    /// Label of the y axis.
    pub y_label: String,
    /// Fixed x range, derived from the data when `None`.
    pub x_bounds: Option<[f64; 2]>,
    /// Fixed y range, derived from the data when `None`.
    pub y_bounds: Option<[f64; 2]>,
    /// Data sets drawn in this panel.
    pub series: Vec<Series>,
}

impl Panel {
    /// An empty panel with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the axis labels.
    pub fn labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    /// Adds a data set.
    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    /// Axis ranges actually used for drawing.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let points = || self.series.iter().flat_map(|s| s.points.iter());
        let x = self
            .x_bounds
            .unwrap_or_else(|| data_range(points().map(|p| p.0)));
        let y = self
            .y_bounds
            .unwrap_or_else(|| data_range(points().map(|p| p.1)));
        (x, y)
    }
}

/// Smallest and largest finite value, widened when they coincide.
fn data_range(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        [0.0, 1.0]
    } else if lo == hi {
        [lo - 1.0, hi + 1.0]
    } else {
        [lo, hi]
    }
}

fn tick(v: f64, span: f64) -> String {
    if span >= 100.0 || v == v.trunc() && span >= 10.0 {
        format!("{:.0}", v)
    } else if span >= 1.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.3}", v)
    }
}

fn axis_labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    let span = bounds[1] - bounds[0];
    [bounds[0], 0.5 * (bounds[0] + bounds[1]), bounds[1]]
        .iter()
        .map(|&v| Span::from(tick(v, span)))
        .collect()
}

/// A titled grid of panels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Figure {
    /// Shown above the grid.
    pub title: String,
    /// Panels in row major order.
    pub panels: Vec<Panel>,
}

impl Figure {
    /// A figure without panels.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            panels: Vec::new(),
        }
    }

    /// Adds the next panel.
    pub fn with_panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    /// Rows and columns of the panel grid.
    pub fn grid(&self) -> (usize, usize) {
        let n = self.panels.len();
        let rows = if n > 1 { 2 } else { 1 };
        (rows, n.div_ceil(rows).max(1))
    }

    /// Draws the figure into `area` of `frame`.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);
        frame.render_widget(
            Paragraph::new(self.title.clone().bold()).alignment(Alignment::Center),
            outer[0],
        );

        let (rows, cols) = self.grid();
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(outer[1]);
        for (r, row_area) in row_areas.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, cols as u32); cols])
                .split(*row_area);
            for (c, cell) in cells.iter().enumerate() {
                if let Some(panel) = self.panels.get(r * cols + c) {
                    render_panel(frame, *cell, panel);
                }
            }
        }
    }

    /// Renders the figure off-screen into `width` × `height` characters.
    pub fn to_text(&self, width: u16, height: u16) -> io::Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height))?;
        terminal.draw(|frame| self.render(frame, frame.size()))?;
        let buffer = terminal.backend().buffer();
        let lines: Vec<String> = buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .map(|line| line.trim_end().to_owned())
            .collect();
        Ok(lines.join("\n") + "\n")
    }

    /// Saves the text rendering of the figure to `path`.
    pub fn save(&self, path: impl AsRef<Path>, width: u16, height: u16) -> io::Result<()> {
        fs::write(path, self.to_text(width, height)?)
    }
}

fn render_panel(frame: &mut Frame, area: Rect, panel: &Panel) {
    let (x_bounds, y_bounds) = panel.bounds();
    let datasets = panel
        .series
        .iter()
        .map(|s| {
            let (marker, graph_type) = match s.kind {
                SeriesKind::Line => (symbols::Marker::Braille, GraphType::Line),
                SeriesKind::Scatter => (symbols::Marker::Dot, GraphType::Scatter),
            };
            Dataset::default()
                .name(s.name.clone())
                .marker(marker)
                .graph_type(graph_type)
                .style(Style::default().fg(s.color))
                .data(&s.points)
        })
        .collect();
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(panel.title.clone())
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title(panel.x_label.clone())
                .style(Style::default().fg(Color::White))
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title(panel.y_label.clone())
                .style(Style::default().fg(Color::White))
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        );
    frame.render_widget(chart, area);
}

/// Reduces `points` to at most about `max_points` by keeping the minimum and
/// maximum of consecutive buckets, so that spikes stay visible.
pub fn decimate(points: &[(f64, f64)], max_points: usize) -> Vec<(f64, f64)> {
    if points.len() <= max_points || max_points < 2 {
        return points.to_vec();
    }
    let bucket = points.len().div_ceil(max_points / 2);
    points
        .chunks(bucket)
        .flat_map(|chunk| {
            let lo = chunk.iter().copied().fold(chunk[0], |a, b| if b.1 < a.1 { b } else { a });
            let hi = chunk.iter().copied().fold(chunk[0], |a, b| if b.1 > a.1 { b } else { a });
            if lo.0 <= hi.0 {
                [lo, hi]
            } else {
                [hi, lo]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figure(n: usize) -> Figure {
        (0..n).fold(Figure::new("test figure"), |fig, c| {
            fig.with_panel(
                Panel::new(format!("channel {}", c))
                    .labels("x", "y")
                    .with_series(Series::line(
                        c.to_string(),
                        vec![(0.0, 0.0), (1.0, c as f64), (2.0, 0.0)],
                        channel_color(c),
                    )),
            )
        })
    }

    #[test]
    fn grid_has_two_rows() {
        assert_eq!(figure(1).grid(), (1, 1));
        assert_eq!(figure(2).grid(), (2, 1));
        assert_eq!(figure(8).grid(), (2, 4));
        assert_eq!(figure(5).grid(), (2, 3));
    }

    #[test]
    fn bounds_follow_data_unless_fixed() {
        let mut panel = figure(3).panels.remove(2);
        assert_eq!(panel.bounds(), ([0.0, 2.0], [0.0, 2.0]));
        panel.y_bounds = Some([-5.0, 5.0]);
        assert_eq!(panel.bounds().1, [-5.0, 5.0]);
        assert_eq!(Panel::new("empty").bounds(), ([0.0, 1.0], [0.0, 1.0]));
        assert_eq!(data_range([3.0, f64::NEG_INFINITY].into_iter()), [2.0, 4.0]);
    }

    #[test]
    fn text_rendering_contains_titles() {
        let text = figure(4).to_text(100, 30).unwrap();
        assert_eq!(text.lines().count(), 30);
        assert!(text.lines().next().unwrap().contains("test figure"));
        assert!(text.contains("channel 0"));
        assert!(text.contains("channel 3"));
    }

    #[test]
    fn save_writes_text_file() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        figure(2).save(tempfile.path(), 80, 24).unwrap();
        let text = std::fs::read_to_string(tempfile.path()).unwrap();
        assert!(text.contains("channel 1"));
    }

    #[test]
    fn decimation_keeps_extremes() {
        let points: Vec<(f64, f64)> = (0..1000)
            .map(|i| (i as f64, if i == 500 { 100.0 } else { 0.0 }))
            .collect();
        let reduced = decimate(&points, 100);
        assert!(reduced.len() <= 100);
        assert!(reduced.contains(&(500.0, 100.0)));
        assert!(reduced.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(decimate(&points[..10], 100).len(), 10);
    }
}
