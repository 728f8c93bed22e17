//! Time traces of a segment of a recording.

use crate::metadata::{RecordingInfo, FULL_SCALE};
use crate::plot::{channel_color, decimate, Figure, Panel, Series};
use crate::recording::{Recording, RecordingError};

use std::{
    ops::Range,
    path::{Path, PathBuf},
};

/// Most points per trace handed to the chart.
const MAX_POINTS: usize = 4000;

/// Default threshold of [`unwrap`].
pub const UNWRAP_THRESHOLD: f64 = -0.01;

/// Undoes the wrap-around of data in the range -1 to 1.
///
/// Values beyond ±1 stored as integers wrap around to the other end of the
/// range. A sample below `-thresh` reached by a step of -1 or less gets 2
/// added, a sample above `thresh` reached by a step of 1 or more gets 2
/// subtracted. Passes repeat until nothing changes, at most 1000 times.
pub fn unwrap(data: &mut [f64], thresh: f64) {
    for _ in 0..1000 {
        let mut changed = false;
        // Backwards, so every step is taken from the data of the previous pass.
        for i in (1..data.len()).rev() {
            let step = data[i] - data[i - 1];
            if data[i] < -thresh && step <= -1.0 {
                data[i] += 2.0;
                changed = true;
            } else if data[i] > thresh && step >= 1.0 {
                data[i] -= 2.0;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Unwraps integer samples by scaling them to ±1 and back.
fn unwrap_integers(trace: &mut [f64]) {
    trace.iter_mut().for_each(|v| *v /= FULL_SCALE);
    unwrap(trace, UNWRAP_THRESHOLD);
    trace.iter_mut().for_each(|v| *v *= FULL_SCALE);
}

/// What `teerec traces` shows.
#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    /// Show only this channel.
    pub channel: Option<usize>,
    /// Start of the segment in seconds.
    pub offset: f64,
    /// Maximum length of the segment in seconds.
    pub max_time: f64,
    /// Shift of successive channels in integer units.
    pub step: f64,
    /// Scale the traces by the gain stored in the metadata.
    pub gain: bool,
    /// Unwrap clipped data, implies `gain`.
    pub unwrap: bool,
    /// Raw readings: shift by half the integer range.
    pub raw: bool,
    /// Show the difference of the first two channels.
    pub diff: bool,
    /// Fit the y axis to the data instead of the full range.
    pub auto_y: bool,
    /// Title from the acquisition settings in the metadata.
    pub metadata_title: bool,
    /// Save the figure instead of showing it.
    pub save: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            channel: None,
            offset: 0.0,
            max_time: 1.0,
            step: 0.0,
            gain: false,
            unwrap: false,
            raw: false,
            diff: false,
            auto_y: false,
            metadata_title: false,
            save: false,
        }
    }
}

impl TraceOptions {
    fn use_gain(&self) -> bool {
        self.gain || self.unwrap
    }
}

/// Frame indices of the segment starting at `offset` seconds and lasting at
/// most `max_time` seconds.
pub fn time_window(frames: usize, rate: f64, offset: f64, max_time: f64) -> Range<usize> {
    if frames == 0 {
        return 0..0;
    }
    let start = ((offset * rate) as usize).min(frames);
    let last_time = (frames - 1) as f64 / rate;
    let span = (last_time - offset).min(max_time);
    let end = (((offset + span) * rate).round().max(0.0) as usize).clamp(start, frames);
    start..end
}

/// Channel 1 minus channel 0, optionally unwrapping both first.
pub fn difference(rec: &Recording, unwrap: bool) -> Result<Vec<f64>, RecordingError> {
    let mut data0 = rec.channel_f64(0)?;
    let mut data1 = rec.channel_f64(1)?;
    if unwrap {
        unwrap_integers(&mut data0);
        unwrap_integers(&mut data1);
    }
    Ok(data1.iter().zip(&data0).map(|(b, a)| b - a).collect())
}

/// The traces of the selected channels in a single panel.
pub fn traces_figure(
    path: &Path,
    rec: &Recording,
    opts: &TraceOptions,
) -> Result<Figure, RecordingError> {
    let info = RecordingInfo::from(&rec.info);
    let columns: Vec<Vec<f64>> = if opts.diff {
        vec![difference(rec, opts.unwrap)?]
    } else {
        (0..rec.channels)
            .map(|c| rec.channel_f64(c))
            .collect::<Result<_, _>>()?
    };
    if let Some(c) = opts.channel {
        if c >= columns.len() {
            return Err(RecordingError::MissingChannel {
                channel: c,
                channels: columns.len(),
            });
        }
    }

    let (scale, unit) = match (&info.gain, opts.use_gain()) {
        (Some(gain), true) => (gain.scale(), gain.unit.clone()),
        _ => (1.0, "integer".to_owned()),
    };
    let offs = if opts.raw { FULL_SCALE } else { 0.0 };
    let window = time_window(rec.frames(), rec.rate, opts.offset, opts.max_time);

    let mut panel = Panel::new("").labels("Time [ms]", format!("Recording [{}]", unit));
    for (c, column) in columns.iter().enumerate() {
        if opts.channel.map_or(false, |sel| sel != c) {
            continue;
        }
        let mut trace = column.clone();
        if opts.use_gain() && opts.unwrap {
            unwrap_integers(&mut trace);
        }
        let shift = offs + opts.step * c as f64;
        let points: Vec<(f64, f64)> = window
            .clone()
            .map(|i| (1000.0 * i as f64 / rec.rate, scale * trace[i] + scale * shift))
            .collect();
        let label = if opts.diff {
            format!("{}-{}", info.channel_label(1), info.channel_label(0))
        } else {
            info.channel_label(c)
        };
        panel = panel.with_series(Series::line(
            label,
            decimate(&points, MAX_POINTS),
            channel_color(c),
        ));
    }

    if !opts.auto_y {
        let maxy = 40000.0 + columns.len() as f64 * opts.step;
        panel.y_bounds = Some(if opts.raw {
            [0.0, 2.0 * maxy * scale]
        } else {
            [-40000.0 * scale, maxy * scale]
        });
    }

    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = if opts.metadata_title {
        info.title(rec.rate).unwrap_or(basename)
    } else {
        basename
    };
    Ok(Figure::new(title).with_panel(panel))
}

/// `<stem>-traces.txt`, or `<stem>-unwrapped-traces.txt` for unwrapped
/// traces, next to the recording.
pub fn save_path(path: &Path, opts: &TraceOptions) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = if opts.use_gain() && opts.unwrap {
        "unwrapped-traces"
    } else {
        "traces"
    };
    path.with_file_name(format!("{}-{}.txt", stem, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::riff::InfoList;

    fn wrap(v: f64) -> f64 {
        if v > 1.0 {
            v - 2.0
        } else if v < -1.0 {
            v + 2.0
        } else {
            v
        }
    }

    #[test]
    fn unwrap_restores_clipped_sine() {
        let original: Vec<f64> = (0..200)
            .map(|i| 1.4 * (2.0 * std::f64::consts::PI * i as f64 / 50.0).sin())
            .collect();
        let mut data: Vec<f64> = original.iter().map(|&v| wrap(v)).collect();
        assert_ne!(data, original);
        unwrap(&mut data, UNWRAP_THRESHOLD);
        for (a, b) in data.iter().zip(&original) {
            assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
        }
    }

    #[test]
    fn unwrap_leaves_smooth_data_alone() {
        let mut data = vec![0.1, 0.5, 0.9, 0.2, -0.7, -0.1];
        let copy = data.clone();
        unwrap(&mut data, UNWRAP_THRESHOLD);
        assert_eq!(data, copy);
    }

    #[test]
    fn window_is_clipped_to_recording() {
        assert_eq!(time_window(1000, 1000.0, 0.0, 0.5), 0..500);
        assert_eq!(time_window(1000, 1000.0, 0.2, 10.0), 200..999);
        assert_eq!(time_window(1000, 1000.0, 5.0, 1.0), 1000..1000);
        assert_eq!(time_window(0, 1000.0, 0.0, 1.0), 0..0);
    }

    fn recording() -> Recording {
        Recording::from_channels(
            1000.0,
            16,
            vec![vec![0, 100, 200, 300], vec![10, 110, 230, 300]],
            InfoList::new().with("PINS", "A0,A1").with("GAIN", "32.768mV"),
        )
    }

    #[test]
    fn difference_of_first_two_channels() {
        assert_eq!(difference(&recording(), false).unwrap(), vec![10.0, 10.0, 30.0, 0.0]);
        let mono = Recording::from_channels(1000.0, 16, vec![vec![1, 2]], InfoList::new());
        assert!(difference(&mono, false).is_err());
    }

    #[test]
    fn gain_scales_traces() {
        let opts = TraceOptions {
            gain: true,
            step: 1000.0,
            channel: Some(1),
            ..TraceOptions::default()
        };
        let fig = traces_figure(Path::new("rec.wav"), &recording(), &opts).unwrap();
        let panel = &fig.panels[0];
        assert_eq!(fig.title, "rec.wav");
        assert_eq!(panel.y_label, "Recording [mV]");
        assert_eq!(panel.series.len(), 1);
        assert_eq!(panel.series[0].name, "A1");
        let (t, y) = panel.series[0].points[1];
        assert_eq!(t, 1.0);
        assert!((y - 0.001 * (110.0 + 1000.0)).abs() < 1e-12);
        let [lo, hi] = panel.y_bounds.unwrap();
        assert!((lo + 40.0).abs() < 1e-9 && (hi - 42.0).abs() < 1e-9);
    }

    #[test]
    fn raw_and_integer_defaults() {
        let opts = TraceOptions {
            raw: true,
            ..TraceOptions::default()
        };
        let fig = traces_figure(Path::new("rec.wav"), &recording(), &opts).unwrap();
        let panel = &fig.panels[0];
        assert_eq!(panel.y_label, "Recording [integer]");
        assert_eq!(panel.series.len(), 2);
        assert_eq!(panel.series[0].points[0], (0.0, 32768.0));
        assert_eq!(panel.y_bounds, Some([0.0, 80000.0]));
    }

    #[test]
    fn diff_trace_and_metadata_title() {
        let mut rec = recording();
        rec.info.set("BITS", "16");
        let opts = TraceOptions {
            diff: true,
            auto_y: true,
            metadata_title: true,
            ..TraceOptions::default()
        };
        let fig = traces_figure(Path::new("rec.wav"), &rec, &opts).unwrap();
        assert_eq!(fig.title, "1.0kHz@16bits");
        assert_eq!(fig.panels[0].series[0].name, "A1-A0");
        assert_eq!(fig.panels[0].y_bounds, None);
    }

    #[test]
    fn save_paths() {
        let unwrapped = TraceOptions {
            unwrap: true,
            ..TraceOptions::default()
        };
        assert_eq!(
            save_path(Path::new("d/rec.wav"), &unwrapped),
            PathBuf::from("d/rec-unwrapped-traces.txt")
        );
        assert_eq!(
            save_path(Path::new("d/rec.wav"), &TraceOptions::default()),
            PathBuf::from("d/rec-traces.txt")
        );
    }
}
