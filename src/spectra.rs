//! Power spectra of recorded signals with peak annotation.

use crate::metadata::RecordingInfo;
use crate::plot::{channel_color, Figure, Panel, Series};
use crate::recording::{Recording, RecordingError};
use crate::spectrum::{detect_peaks, psd};
use crate::stats;

use ratatui::style::Color;

use std::{fmt, path::Path, path::PathBuf};

/// FFT length of the Welch segments.
pub const NFFT: usize = 8192;

/// Overlap of successive segments.
pub const NOVERLAP: usize = NFFT / 2;

/// Peaks need to stand out by this many decibels.
pub const PEAK_THRESHOLD: f64 = 10.0;

/// What `teerec spectra` shows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectraOptions {
    /// Show only this channel.
    pub channel: Option<usize>,
    /// Upper limit of the frequency axis and of reported peaks, in Hertz.
    pub max_freq: Option<f64>,
    /// Save the figure instead of showing it.
    pub save: bool,
}

impl SpectraOptions {
    /// Scale and unit of the frequency axis.
    pub fn frequency_unit(&self) -> (f64, &'static str) {
        match self.max_freq {
            Some(f) if f < 1200.0 => (1.0, "Hz"),
            _ => (0.001, "kHz"),
        }
    }
}

/// Spectral peaks of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPeaks {
    /// Index of the channel.
    pub channel: usize,
    /// Label of the channel from the metadata.
    pub label: String,
    /// Peak frequencies in Hertz.
    pub freqs: Vec<f64>,
    /// Peak power in decibel.
    pub power: Vec<f64>,
}

impl fmt::Display for ChannelPeaks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "channel {}:", self.label)?;
        if self.freqs.is_empty() {
            return write!(f, " no peaks");
        }
        for (freq, db) in self.freqs.iter().zip(&self.power) {
            write!(f, " {:.0}Hz ({:.1}dB)", freq, db)?;
        }
        Ok(())
    }
}

/// Power spectra of the selected channels, one panel each, together with
/// the detected peaks.
pub fn spectra_figure(
    path: &Path,
    rec: &Recording,
    opts: &SpectraOptions,
) -> Result<(Figure, Vec<ChannelPeaks>), RecordingError> {
    let info = RecordingInfo::from(&rec.info);
    let channels: Vec<usize> = match opts.channel {
        Some(c) => vec![c],
        None => (0..rec.channels).collect(),
    };
    let (fscale, funit) = opts.frequency_unit();
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut figure = Figure::new(title);
    let mut all_peaks = Vec::with_capacity(channels.len());

    for (k, &c) in channels.iter().enumerate() {
        let mut data = rec.channel_f64(c)?;
        let m = stats::mean(&data);
        data.iter_mut().for_each(|v| *v -= m);

        let spectrum = psd(&data, rec.rate, NFFT, NOVERLAP);
        let db = spectrum.decibel();
        let (peaks, _troughs) = detect_peaks(&db, PEAK_THRESHOLD);
        let peaks: Vec<usize> = peaks
            .into_iter()
            .filter(|&p| opts.max_freq.map_or(true, |f| spectrum.freqs[p] < f))
            .collect();

        let shown = |f: f64| opts.max_freq.map_or(true, |max| f <= max);
        let trace: Vec<(f64, f64)> = spectrum
            .freqs
            .iter()
            .zip(&db)
            .filter(|(f, d)| d.is_finite() && shown(**f))
            .map(|(f, d)| (fscale * f, *d))
            .collect();
        let marks: Vec<(f64, f64)> = peaks
            .iter()
            .map(|&p| (fscale * spectrum.freqs[p], db[p]))
            .collect();

        let label = info.channel_label(c);
        let mut panel = Panel::new(format!("channel {}", label))
            .labels(format!("Frequency [{}]", funit), "Power [dB rel max range]")
            .with_series(Series::line(label.clone(), trace, channel_color(k)))
            .with_series(Series::scatter("peaks", marks, Color::Gray));
        if let Some(max) = opts.max_freq {
            panel.x_bounds = Some([0.0, fscale * max]);
        }
        figure = figure.with_panel(panel);

        all_peaks.push(ChannelPeaks {
            channel: c,
            label,
            freqs: peaks.iter().map(|&p| spectrum.freqs[p]).collect(),
            power: peaks.iter().map(|&p| db[p]).collect(),
        });
    }
    Ok((figure, all_peaks))
}

/// `<file without extension>-spectra.txt`, next to the recording.
pub fn save_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}-spectra.txt", stem))
}
