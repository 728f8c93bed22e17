//! Periods of square wave test signals, within single recordings and
//! across the boundaries of successive recordings.

use crate::metadata::RecordingInfo;
use crate::plot::{channel_color, Figure, Panel, Series};
use crate::recording::{Recording, RecordingError};
use crate::stats::{self, Histogram};

use log::{debug, warn};
use ratatui::style::Color;

use std::{fmt, path::Path};

/// A square wave needs this many integer units beyond zero.
const SQUARE_LEVEL: i32 = 10240;

/// Largest tolerated relative deviation of an interval from the period.
const MAX_DEVIATION: f64 = 0.05;

/// Indices `i` at which the data cross `thresh` between `i` and `i + 1`,
/// upwards and downwards.
pub fn threshold_crossings(data: &[i32], thresh: i32) -> (Vec<usize>, Vec<usize>) {
    let mut up = Vec::new();
    let mut down = Vec::new();
    for (i, w) in data.windows(2).enumerate() {
        if w[0] <= thresh && w[1] > thresh {
            up.push(i);
        } else if w[0] > thresh && w[1] <= thresh {
            down.push(i);
        }
    }
    (up, down)
}

/// Differences of successive indices.
pub fn intervals(indices: &[i64]) -> Vec<i64> {
    indices.windows(2).map(|w| w[1] - w[0]).collect()
}

fn interval_histogram(isis: &[i64]) -> Option<Histogram> {
    let lo = *isis.iter().min()?;
    let hi = *isis.iter().max()?;
    Some(Histogram::unit_bins(isis.iter().copied(), lo - 1, hi + 3))
}

/// Histograms of the intervals between upward zero crossings, one panel per
/// channel with more than ten intervals.
pub fn cycles_figure(path: &Path, rec: &Recording) -> Result<Figure, RecordingError> {
    let info = RecordingInfo::from(&rec.info);
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut figure = Figure::new(title);
    for c in 0..rec.channels {
        let (up, _) = threshold_crossings(&rec.channel(c)?, 0);
        let up: Vec<i64> = up.into_iter().map(|i| i as i64).collect();
        let isis = intervals(&up);
        if isis.len() <= 10 {
            debug!("channel {}: only {} intervals", c, isis.len());
            continue;
        }
        if let Some(hist) = interval_histogram(&isis) {
            figure = figure.with_panel(
                Panel::new(format!("channel {}", info.channel_label(c)))
                    .labels("Interval [samples]", "count")
                    .with_series(Series::line(
                        info.channel_label(c),
                        hist.points(0),
                        channel_color(c),
                    )),
            );
        }
    }
    Ok(figure)
}

/// Whether `data` looks like a square wave around zero.
fn is_square(data: &[i32]) -> bool {
    let n = data.len();
    let nup = data.iter().filter(|&&v| v > SQUARE_LEVEL).count();
    let ndown = data.iter().filter(|&&v| v < -SQUARE_LEVEL).count();
    n > 0 && 2 * (nup + ndown) >= n && 10 * nup.min(ndown) >= n
}

/// Crossings of one channel in one file.
#[derive(Debug, Clone, Copy)]
struct Edges {
    /// Samples before the first crossing, -1 for a crossing right at the
    /// start of the file.
    head: i64,
    /// Samples after the last crossing.
    tail: i64,
}

/// Timing of one channel across a sequence of recordings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelContinuity {
    /// Index of the channel.
    pub channel: usize,
    /// Frequency of the square wave in Hertz.
    pub frequency: Option<f64>,
    /// Median interval in samples.
    pub period: Option<f64>,
    /// Intervals across file boundaries.
    pub boundaries: Vec<i64>,
    /// File pairs whose boundary interval deviates from the period, with
    /// the interval.
    pub deviations: Vec<(String, String, i64)>,
}

impl fmt::Display for ChannelContinuity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.frequency, self.period) {
            (Some(freq), Some(period)) => write!(
                f,
                "channel {:2}: frequency={:8.3}Hz, period={:.1} samples",
                self.channel, freq, period
            )?,
            _ => write!(f, "channel {:2}: no square wave", self.channel)?,
        }
        for (a, b, interval) in &self.deviations {
            write!(
                f,
                "\n  interval of {} samples between {} and {} deviates from period",
                interval, a, b
            )?;
        }
        Ok(())
    }
}

/// Accumulates the crossings of square waves over successive recordings.
#[derive(Debug, Clone, Default)]
pub struct Continuity {
    rate: f64,
    channels: usize,
    files: Vec<String>,
    /// Intervals within files, per channel.
    isis: Vec<Vec<i64>>,
    /// Per channel and file.
    edges: Vec<Vec<Option<Edges>>>,
    last_frame: Option<Vec<i32>>,
}

impl Continuity {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accumulated recordings.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no recording has been added yet.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Adds the next recording of the sequence. Returns `false`, without
    /// adding anything, when its channel count differs from the first one.
    pub fn add(&mut self, name: impl Into<String>, rec: &Recording) -> Result<bool, RecordingError> {
        if self.files.is_empty() {
            self.rate = rec.rate;
            self.channels = rec.channels;
            self.isis = vec![Vec::new(); rec.channels];
            self.edges = vec![Vec::new(); rec.channels];
        } else if rec.channels != self.channels {
            warn!(
                "{} channels instead of {}, stopping",
                rec.channels, self.channels
            );
            return Ok(false);
        }

        let frames = rec.frames();
        for c in 0..self.channels {
            let data = rec.channel(c)?;
            if !is_square(&data) {
                debug!("channel {} carries no square wave", c);
                self.edges[c].push(None);
                continue;
            }
            let (up, _) = threshold_crossings(&data, 0);
            let mut up: Vec<i64> = up.into_iter().map(|i| i as i64).collect();
            let rises_at_start = self
                .last_frame
                .as_ref()
                .and_then(|last| last.get(c))
                .map_or(false, |&prev| prev <= 0 && data[0] > 0);
            if rises_at_start {
                up.insert(0, -1);
            }
            let edges = match (up.first(), up.last()) {
                (Some(&first), Some(&last)) => Some(Edges {
                    head: first,
                    tail: frames as i64 - last,
                }),
                _ => None,
            };
            self.isis[c].extend(intervals(&up));
            self.edges[c].push(edges);
        }
        self.last_frame = frames
            .checked_sub(1)
            .map(|i| rec.samples[i * rec.channels..(i + 1) * rec.channels].to_vec());
        self.files.push(name.into());
        Ok(true)
    }

    /// Intervals across the boundaries between successive files of
    /// channel `c`, with the index of the file before the boundary.
    fn boundary_intervals(&self, c: usize) -> Vec<(usize, i64)> {
        self.edges[c]
            .windows(2)
            .enumerate()
            .filter_map(|(k, w)| match (w[0], w[1]) {
                (Some(prev), Some(next)) => Some((k, prev.tail + next.head)),
                _ => None,
            })
            .collect()
    }

    /// Frequency of every channel and the file boundaries at which the
    /// period deviates by more than 5 %.
    pub fn report(&self) -> Vec<ChannelContinuity> {
        (0..self.channels)
            .map(|c| {
                let isis: Vec<f64> = self.isis[c].iter().map(|&v| v as f64).collect();
                let period = stats::median(&isis);
                let frequency = (!isis.is_empty()).then(|| self.rate / stats::mean(&isis));
                let boundaries = self.boundary_intervals(c);
                let deviations = match period {
                    Some(p) if p > 0.0 => boundaries
                        .iter()
                        .filter(|(_, v)| ((*v as f64 - p) / p).abs() > MAX_DEVIATION)
                        .map(|&(k, v)| (self.files[k].clone(), self.files[k + 1].clone(), v))
                        .collect(),
                    _ => Vec::new(),
                };
                ChannelContinuity {
                    channel: c,
                    frequency,
                    period,
                    boundaries: boundaries.into_iter().map(|(_, v)| v).collect(),
                    deviations,
                }
            })
            .collect()
    }

    /// Interval histograms of every channel, intervals across file
    /// boundaries on top.
    pub fn figure(&self) -> Figure {
        let title = match (self.files.first(), self.files.last()) {
            (Some(a), Some(b)) if a != b => format!("{} - {}", a, b),
            (Some(a), _) => a.clone(),
            _ => String::new(),
        };
        let mut figure = Figure::new(title);
        for (c, channel) in self.report().iter().enumerate() {
            let Some(hist) = interval_histogram(&self.isis[c]) else {
                continue;
            };
            let mut panel = Panel::new(match channel.frequency {
                Some(freq) => format!("channel {}: {:.3}Hz", c, freq),
                None => format!("channel {}", c),
            })
            .labels("Interval [samples]", "count")
            .with_series(Series::line("within", hist.points(0), channel_color(c)));
            if let Some(bounds) = interval_histogram(&channel.boundaries) {
                let scale = 0.5 * hist.max_count() as f64 / bounds.max_count().max(1) as f64;
                let points = bounds
                    .points(0)
                    .into_iter()
                    .map(|(x, n)| (x, scale * n))
                    .collect();
                panel = panel.with_series(Series::scatter("boundaries", points, Color::White));
            }
            figure = figure.with_panel(panel);
        }
        figure
    }
}
