//! Commandline argument parsers using clap for the teerec tools

use clap::{Args, Parser, Subcommand};

use std::path::PathBuf;

use crate::{
    noise::NoiseOptions, recording::BinFormat, spectra::SpectraOptions, test_signal::TestSignal,
    traces::TraceOptions,
};

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Analysis tools for recordings of the teensy recorder
pub struct TeeRecArgs {
    #[command(subcommand)]
    /// Which analysis to run
    pub command: CommandTask,
}

/// The tools of the `teerec` binary.
#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Print tables of data rates and file sizes
    #[command(about)]
    Datarates(DataratesCommand),

    /// Noise statistics of recordings of a zero signal
    #[command(about)]
    Noise(NoiseCommand),

    /// Power spectra with detected peaks
    #[command(about)]
    Spectra(SpectraCommand),

    /// Time traces of a segment of the recordings
    #[command(about)]
    Traces(TracesCommand),

    /// Merge channel c of the c-th file into a single wave file
    #[command(about)]
    Merge(MergeCommand),

    /// Histograms of the periods of square wave recordings
    #[command(about)]
    Cycles(CyclesCommand),

    /// Check the periods of square waves across successive recordings
    #[command(about)]
    Continuity(CyclesCommand),

    /// Plot a sensor log
    #[command(about)]
    Sensors(SensorsCommand),

    /// Write a synthetic recording
    #[command(about, name = "testsignal")]
    TestSignal(TestSignalCommand),
}

/// Layout of raw binary dumps. Files are read as wave files unless one of
/// these is given.
#[derive(Debug, Args, Clone, Default)]
pub struct BinArgs {
    /// Read raw 16 bit samples starting at this byte offset
    #[arg(id = "bin_offset", long = "bin-offset")]
    pub offset: Option<u64>,

    /// Number of channels of raw data
    #[arg(long = "bin-channels")]
    pub channels: Option<usize>,

    /// Sampling rate of raw data in Hertz
    #[arg(long = "bin-rate")]
    pub rate: Option<f64>,
}

impl BinArgs {
    /// The raw layout if any raw option is given, defaults for the others.
    pub fn format(&self) -> Option<BinFormat> {
        if self.offset.is_none() && self.channels.is_none() && self.rate.is_none() {
            return None;
        }
        let defaults = BinFormat::default();
        Some(BinFormat {
            offset: self.offset.unwrap_or(defaults.offset),
            channels: self.channels.unwrap_or(defaults.channels),
            rate: self.rate.unwrap_or(defaults.rate),
        })
    }
}

/// Options of `teerec datarates`.
#[derive(Debug, Args, Clone)]
pub struct DataratesCommand {
    /// Sample widths to tabulate
    #[arg(default_values_t = [16u32, 24, 32])]
    pub bits: Vec<u32>,
}

/// Options of `teerec noise`.
#[derive(Debug, Args, Clone)]
pub struct NoiseCommand {
    /// Subtract mean from data traces
    #[arg(short = 'm')]
    pub subtract_mean: bool,

    /// Plot distribution of samples
    #[arg(short = 'p')]
    pub plot: bool,

    /// Save plot to file "<name>-noise.txt"
    #[arg(short = 's')]
    pub save: bool,

    /// Layout of raw binary files
    #[command(flatten)]
    pub bin: BinArgs,

    /// Wave files from the averaging sketch
    #[clap(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

impl NoiseCommand {
    /// Analysis options given on the command line.
    pub fn options(&self) -> NoiseOptions {
        NoiseOptions {
            subtract_mean: self.subtract_mean,
            plot: self.plot,
            save: self.save,
        }
    }
}

/// Options of `teerec spectra`.
#[derive(Debug, Args, Clone)]
pub struct SpectraCommand {
    /// Show spectrum of channel CHANNEL only
    #[arg(short = 'c', value_name = "CHANNEL")]
    pub channel: Option<usize>,

    /// Maximum frequency shown in the plot in Hertz
    #[arg(short = 'f', value_name = "MAXFREQ")]
    pub max_freq: Option<f64>,

    /// Save plot to text file
    #[arg(short = 's')]
    pub save: bool,

    /// Layout of raw binary files
    #[command(flatten)]
    pub bin: BinArgs,

    /// Wave files containing the data to be shown
    #[clap(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

impl SpectraCommand {
    /// Analysis options given on the command line.
    pub fn options(&self) -> SpectraOptions {
        SpectraOptions {
            channel: self.channel,
            max_freq: self.max_freq,
            save: self.save,
        }
    }
}

/// Options of `teerec traces`.
#[derive(Debug, Args, Clone)]
pub struct TracesCommand {
    /// Show trace of channel CHANNEL only
    #[arg(short = 'c', value_name = "CHANNEL")]
    pub channel: Option<usize>,

    /// Show from this time on in seconds
    #[arg(short = 'o', value_name = "OFFS", default_value_t = 0.0)]
    pub offset: f64,

    /// Maximum time to show in seconds
    #[arg(short = 't', value_name = "TMAX", default_value_t = 1.0)]
    pub max_time: f64,

    /// Shift each channel by STEP integers upwards
    #[arg(short = 'S', value_name = "STEP", default_value_t = 0)]
    pub step: i64,

    /// Use gain stored in metadata for proper scaling
    #[arg(short = 'g')]
    pub gain: bool,

    /// Raw voltage readings without offset
    #[arg(short = 'r')]
    pub raw: bool,

    /// Auto scale y-axis
    #[arg(short = 'a')]
    pub auto_y: bool,

    /// Write info section from metadata into title of plot
    #[arg(short = 'i')]
    pub metadata: bool,

    /// Unwrap clipped data
    #[arg(short = 'u')]
    pub unwrap: bool,

    /// Take the difference between the first two channels
    #[arg(short = 'd')]
    pub diff: bool,

    /// Save plot to text file
    #[arg(short = 's')]
    pub save: bool,

    /// Layout of raw binary files
    #[command(flatten)]
    pub bin: BinArgs,

    /// Wave files containing the data to be shown
    #[clap(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

impl TracesCommand {
    /// Plot options given on the command line.
    pub fn options(&self) -> TraceOptions {
        TraceOptions {
            channel: self.channel,
            offset: self.offset,
            max_time: self.max_time,
            step: self.step as f64,
            gain: self.gain,
            unwrap: self.unwrap,
            raw: self.raw,
            diff: self.diff,
            auto_y: self.auto_y,
            metadata_title: self.metadata,
            save: self.save,
        }
    }
}

/// Options of `teerec merge`.
#[derive(Debug, Args, Clone)]
pub struct MergeCommand {
    /// Print on console what is going on
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Output file with the merged channels
    #[arg(short = 'o', value_name = "OUTFILE", default_value = "merged.wav")]
    pub outfile: PathBuf,

    /// Wave files
    #[clap(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

/// Options of `teerec cycles` and `teerec continuity`.
#[derive(Debug, Args, Clone)]
pub struct CyclesCommand {
    /// Save plot to text file
    #[arg(short = 's')]
    pub save: bool,

    /// Layout of raw binary files
    #[command(flatten)]
    pub bin: BinArgs,

    /// Wave files with square waves, in recording order
    #[clap(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

/// Options of `teerec sensors`.
#[derive(Debug, Args, Clone)]
pub struct SensorsCommand {
    /// Save plot to text file
    #[arg(short = 's')]
    pub save: bool,

    /// CSV file containing the sensor data to be shown
    pub file: PathBuf,
}

/// Options of `teerec testsignal`.
#[derive(Debug, Args, Clone)]
pub struct TestSignalCommand {
    /// Output wave file
    #[arg(short = 'o', long = "out")]
    pub outfile: PathBuf,

    /// Sampling rate in Hertz
    #[arg(short = 'r', long = "rate", default_value_t = 44100.0)]
    pub rate: f64,

    /// Number of channels
    #[arg(short = 'n', long = "channels", default_value_t = 4)]
    pub channels: usize,

    /// Sample width in bits
    #[arg(short = 'b', long = "bits", default_value_t = 16)]
    pub bits: u16,

    /// Duration in seconds
    #[arg(short = 't', long = "time", default_value_t = 1.0)]
    pub duration: f64,

    /// Sine amplitude relative to full range
    #[arg(short = 'a', long = "amplitude", default_value_t = 0.5)]
    pub amplitude: f64,

    /// Noise amplitude relative to full range
    #[arg(long = "noise", default_value_t = 0.01)]
    pub noise: f64,

    /// Frequency of the first channel in Hertz
    #[arg(short = 'f', long = "frequency", default_value_t = 500.0)]
    pub frequency: f64,
}

impl TestSignalCommand {
    /// The signal described by the command line.
    pub fn signal(&self) -> TestSignal {
        TestSignal {
            rate: self.rate,
            channels: self.channels,
            bits: self.bits,
            duration: self.duration,
            amplitude: self.amplitude,
            noise: self.noise,
            frequency: self.frequency,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Line based terminal for recorder boards on serial ports
pub struct MonitorArgs {
    /// List all serial ports and the boards on them
    #[arg(long = "list")]
    pub list: bool,

    /// Serial device, the first known board if not given
    #[arg(short = 'd', long = "device")]
    pub device: Option<PathBuf>,

    /// Baud rate
    #[arg(short = 'b', long = "baud", default_value_t = 9600)]
    pub baud: u32,

    /// RON file replacing the built-in table of board models
    #[arg(long = "models")]
    pub models: Option<PathBuf>,

    /// Append received lines to this file
    #[arg(short = 'l', long = "log")]
    pub logfile: Option<PathBuf>,

    /// Do not forward keyboard input to the board
    #[arg(long = "no-input")]
    pub no_input: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traces_flags() {
        let args = TeeRecArgs::parse_from([
            "teerec", "traces", "-c", "1", "-o", "0.5", "-t", "2", "-S", "1000", "-u", "rec.wav",
        ]);
        let CommandTask::Traces(cmd) = args.command else {
            panic!("expected traces");
        };
        let opts = cmd.options();
        assert_eq!(opts.channel, Some(1));
        assert_eq!(opts.offset, 0.5);
        assert_eq!(opts.max_time, 2.0);
        assert_eq!(opts.step, 1000.0);
        assert!(opts.unwrap && !opts.gain);
        assert_eq!(cmd.files, vec![PathBuf::from("rec.wav")]);
        assert!(cmd.bin.format().is_none());
    }

    #[test]
    fn raw_binary_defaults() {
        let args = TeeRecArgs::parse_from(["teerec", "noise", "--bin-channels", "8", "a.bin"]);
        let CommandTask::Noise(cmd) = args.command else {
            panic!("expected noise");
        };
        let format = cmd.bin.format().unwrap();
        assert_eq!(format.channels, 8);
        assert_eq!(format.offset, 0);
        assert_eq!(format.rate, 100_000.0);
    }

    #[test]
    fn merge_and_datarates_defaults() {
        let args = TeeRecArgs::parse_from(["teerec", "merge", "a.wav", "b.wav"]);
        let CommandTask::Merge(cmd) = args.command else {
            panic!("expected merge");
        };
        assert_eq!(cmd.outfile, PathBuf::from("merged.wav"));
        assert_eq!(cmd.files.len(), 2);

        let args = TeeRecArgs::parse_from(["teerec", "datarates"]);
        let CommandTask::Datarates(cmd) = args.command else {
            panic!("expected datarates");
        };
        assert_eq!(cmd.bits, vec![16, 24, 32]);
        assert!(TeeRecArgs::try_parse_from(["teerec", "spectra"]).is_err());
    }

    #[test]
    fn monitor_flags() {
        let args = MonitorArgs::parse_from(["serialmonitor", "-d", "/dev/ttyACM0", "-l", "out.txt"]);
        assert_eq!(args.baud, 9600);
        assert_eq!(args.device, Some(PathBuf::from("/dev/ttyACM0")));
        assert_eq!(args.logfile, Some(PathBuf::from("out.txt")));
        assert!(!args.list && !args.no_input);
    }
}
