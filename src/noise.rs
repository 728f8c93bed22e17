//! Noise analysis of recorded zero signals: mean and standard deviation per
//! channel as a console table, and amplitude histograms.

use crate::metadata::{FileSettings, RecordingInfo};
use crate::plot::{channel_color, Figure, Panel, Series};
use crate::recording::{Recording, RecordingError};
use crate::stats::{self, Histogram};

use ratatui::style::Color;

use std::{fmt::Write, path::Path};

/// Histogram range of the integer samples.
const AMPLITUDE_RANGE: (i64, i64) = (-32768, 32768);

/// What `teerec noise` does beyond printing the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseOptions {
    /// Center the histograms on the mean.
    pub subtract_mean: bool,
    /// Draw the histograms, not just the table.
    pub plot: bool,
    /// Save the histograms instead of showing them.
    pub save: bool,
}

/// Mean and standard deviation of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelNoise {
    /// Mean of the samples.
    pub mean: f64,
    /// Population standard deviation of the samples.
    pub std: f64,
}

/// Per channel noise statistics.
pub fn channel_noise(rec: &Recording) -> Result<Vec<ChannelNoise>, RecordingError> {
    (0..rec.channels)
        .map(|c| {
            let data = rec.channel_f64(c)?;
            Ok(ChannelNoise {
                mean: stats::mean(&data),
                std: stats::std(&data),
            })
        })
        .collect()
}

/// Header line of the noise table.
pub fn noise_header(channels: usize) -> String {
    let mut line = "rate bits convers  sampling avrg".to_owned();
    for c in 0..channels {
        let _ = write!(line, " c{:<3}", c);
    }
    line
}

/// One line of the noise table: settings followed by the standard
/// deviation of every channel.
pub fn noise_row(rec: &Recording, settings: Option<&FileSettings>, noise: &[ChannelNoise]) -> String {
    let mut line = match settings {
        Some(s) => format!(
            "{:4.0} {:4} {:8} {:8} {:4}",
            0.001 * s.rate,
            s.bits,
            s.conversion,
            s.sampling,
            s.averaging
        ),
        None => format!(
            "{:4.0} {:4} {:8} {:8} {:>4}",
            0.001 * rec.rate,
            rec.bits,
            "-",
            "-",
            "-"
        ),
    };
    for n in noise {
        let _ = write!(line, " {:4.1}", n.std);
    }
    line
}

/// Amplitude histograms of all channels.
pub fn noise_figure(
    path: &Path,
    rec: &Recording,
    settings: Option<&FileSettings>,
    noise: &[ChannelNoise],
    subtract_mean: bool,
) -> Result<Figure, RecordingError> {
    let info = RecordingInfo::from(&rec.info);
    let title = settings
        .map(FileSettings::title)
        .unwrap_or_else(|| path.display().to_string());
    let mut figure = Figure::new(title);

    for (c, n) in noise.iter().enumerate() {
        let data = rec.channel(c)?;
        let hist = Histogram::unit_bins(
            data.iter().map(|&v| v as i64),
            AMPLITUDE_RANGE.0,
            AMPLITUDE_RANGE.1,
        );
        let nmax = hist.max_count() as f64;
        let (shift, center) = if subtract_mean {
            (n.mean as i64, 0.0)
        } else {
            (0, n.mean)
        };

        let panel = Panel::new(format!(
            "channel {}: μ={:.0} σ={:.1}",
            info.channel_label(c),
            n.mean,
            n.std
        ))
        .labels("Amplitude [integer]", "count")
        .with_series(Series::line(
            info.channel_label(c),
            hist.points(shift),
            channel_color(c),
        ))
        .with_series(Series::line(
            "",
            vec![(center, 0.0), (center, nmax)],
            Color::White,
        ))
        .with_series(Series::line(
            "",
            vec![(center - n.std, 0.1 * nmax), (center + n.std, 0.1 * nmax)],
            Color::White,
        ));
        figure = figure.with_panel(panel);
    }
    Ok(figure)
}

/// Where a saved noise plot goes: the file's base name with `-noise.txt`,
/// in the working directory.
pub fn save_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}-noise.txt", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::riff::InfoList;

    fn recording() -> Recording {
        Recording::from_channels(
            100_000.0,
            16,
            vec![vec![10, 12, 10, 12], vec![-1, 1, -3, 3]],
            InfoList::new().with("PINS", "A4,A5"),
        )
    }

    #[test]
    fn statistics_per_channel() {
        let noise = channel_noise(&recording()).unwrap();
        assert_eq!(noise[0], ChannelNoise { mean: 11.0, std: 1.0 });
        assert_eq!(noise[1].mean, 0.0);
        assert_eq!(noise[1].std, 5.0f64.sqrt());
    }

    #[test]
    fn table_lines() {
        assert_eq!(noise_header(2), "rate bits convers  sampling avrg c0   c1  ");
        let rec = recording();
        let noise = channel_noise(&rec).unwrap();
        let settings = FileSettings {
            rate: 100_000.0,
            bits: 12,
            conversion: "high".to_owned(),
            sampling: "med".to_owned(),
            averaging: 4,
        };
        assert_eq!(
            noise_row(&rec, Some(&settings), &noise),
            " 100   12 high     med         4  1.0  2.2"
        );
        assert_eq!(
            noise_row(&rec, None, &noise),
            " 100   16 -        -           -  1.0  2.2"
        );
    }

    #[test]
    fn histograms_centered_on_mean() {
        let rec = recording();
        let noise = channel_noise(&rec).unwrap();
        let fig = noise_figure(Path::new("x.wav"), &rec, None, &noise, true).unwrap();
        assert_eq!(fig.title, "x.wav");
        assert_eq!(fig.panels.len(), 2);
        assert_eq!(fig.panels[0].title, "channel A4: μ=11 σ=1.0");
        assert_eq!(
            fig.panels[0].series[0].points,
            vec![(-1.0, 2.0), (0.0, 0.0), (1.0, 2.0)]
        );
        assert_eq!(fig.panels[0].series[1].points, vec![(0.0, 0.0), (0.0, 2.0)]);

        let fig = noise_figure(Path::new("x.wav"), &rec, None, &noise, false).unwrap();
        assert_eq!(fig.panels[0].series[0].points[0], (10.0, 2.0));
        assert_eq!(fig.panels[0].series[2].points, vec![(10.0, 0.2), (12.0, 0.2)]);
    }

    #[test]
    fn saved_next_to_working_directory() {
        assert_eq!(save_path(Path::new("/data/rec-1.wav")), "rec-1-noise.txt");
    }
}
