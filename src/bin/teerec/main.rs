//! Analysis tools for the recordings of the teensy recorder.

use clap::Parser;
use log::{info, warn};
use teerec::{
    args::{
        CommandTask, CyclesCommand, MergeCommand, NoiseCommand, SensorsCommand, SpectraCommand,
        TeeRecArgs, TestSignalCommand, TracesCommand,
    },
    cycles::{cycles_figure, Continuity},
    datarates::make_report,
    gui::show_figures,
    merge::merge_channels,
    metadata::{FileSettings, RecordingInfo},
    noise::{self, channel_noise, noise_figure, noise_header, noise_row},
    plot::Figure,
    recording::{BinFormat, Recording, RecordingError},
    sensors::{sensors_figure, SensorLog},
    spectra::{self, spectra_figure},
    traces::{self, traces_figure},
};

use std::{
    error::Error,
    path::{Path, PathBuf},
};

/// Size of saved figures in characters.
const SAVE_SIZE: (u16, u16) = (160, 48);

fn main() -> Result<(), Box<dyn Error>> {
    teerec::logger("RUST_LOG").init();
    let args = TeeRecArgs::parse();

    let figures = match args.command {
        CommandTask::Datarates(cmd) => {
            print!("{}", make_report(&cmd.bits));
            Vec::new()
        }
        CommandTask::Noise(cmd) => run_noise(&cmd)?,
        CommandTask::Spectra(cmd) => run_spectra(&cmd)?,
        CommandTask::Traces(cmd) => run_traces(&cmd)?,
        CommandTask::Merge(cmd) => {
            run_merge(&cmd)?;
            Vec::new()
        }
        CommandTask::Cycles(cmd) => run_cycles(&cmd)?,
        CommandTask::Continuity(cmd) => run_continuity(&cmd)?,
        CommandTask::Sensors(cmd) => run_sensors(&cmd)?,
        CommandTask::TestSignal(cmd) => {
            run_test_signal(&cmd)?;
            Vec::new()
        }
    };

    if !figures.is_empty() {
        show_figures(&figures)?;
    }
    Ok(())
}

/// Loads a recording, or logs why it is skipped.
fn load(path: &Path, bin: Option<&BinFormat>) -> Option<Recording> {
    match Recording::load(path, bin) {
        Ok(rec) => Some(rec),
        Err(RecordingError::Empty) => {
            warn!("skipping empty file {}", path.display());
            None
        }
        Err(e) => {
            warn!("skipping {}: {}", path.display(), e);
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<stem>-<suffix>.txt` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}-{}.txt", stem, suffix))
}

/// Saves `figure` when `save` is set, otherwise keeps it for display.
fn keep_or_save(
    figure: Figure,
    save: bool,
    path: impl AsRef<Path>,
    figures: &mut Vec<Figure>,
) -> Result<(), Box<dyn Error>> {
    if save {
        figure.save(&path, SAVE_SIZE.0, SAVE_SIZE.1)?;
        info!("saved {}", path.as_ref().display());
    } else {
        figures.push(figure);
    }
    Ok(())
}

fn run_noise(cmd: &NoiseCommand) -> Result<Vec<Figure>, Box<dyn Error>> {
    let opts = cmd.options();
    let bin = cmd.bin.format();
    let mut figures = Vec::new();
    let mut header = true;
    for path in &cmd.files {
        let Some(rec) = load(path, bin.as_ref()) else {
            continue;
        };
        let info = RecordingInfo::from(&rec.info);
        let settings = FileSettings::resolve(path, &info, rec.rate);
        let stats = channel_noise(&rec)?;
        if header {
            println!("{}", noise_header(rec.channels));
            header = false;
        }
        println!("{}", noise_row(&rec, settings.as_ref(), &stats));
        if opts.plot {
            let figure = noise_figure(path, &rec, settings.as_ref(), &stats, opts.subtract_mean)?;
            keep_or_save(figure, opts.save, noise::save_path(path), &mut figures)?;
        }
    }
    Ok(figures)
}

fn run_spectra(cmd: &SpectraCommand) -> Result<Vec<Figure>, Box<dyn Error>> {
    let opts = cmd.options();
    let bin = cmd.bin.format();
    let mut figures = Vec::new();
    for path in &cmd.files {
        let Some(rec) = load(path, bin.as_ref()) else {
            continue;
        };
        let (figure, peaks) = match spectra_figure(path, &rec, &opts) {
            Ok(result) => result,
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        println!("{}:", path.display());
        for channel in &peaks {
            println!("  {}", channel);
        }
        keep_or_save(figure, opts.save, spectra::save_path(path), &mut figures)?;
    }
    Ok(figures)
}

fn run_traces(cmd: &TracesCommand) -> Result<Vec<Figure>, Box<dyn Error>> {
    let opts = cmd.options();
    let bin = cmd.bin.format();
    let mut figures = Vec::new();
    for path in &cmd.files {
        let Some(rec) = load(path, bin.as_ref()) else {
            continue;
        };
        match traces_figure(path, &rec, &opts) {
            Ok(figure) => {
                keep_or_save(figure, opts.save, traces::save_path(path, &opts), &mut figures)?
            }
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    Ok(figures)
}

fn run_merge(cmd: &MergeCommand) -> Result<(), Box<dyn Error>> {
    let recordings = cmd
        .files
        .iter()
        .map(|path| {
            if cmd.verbose {
                println!("read {}", path.display());
            }
            Recording::load_wave(path)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let Some((merged, warnings)) = merge_channels(&recordings) else {
        return Ok(());
    };
    for warning in &warnings {
        warn!("{}", warning);
    }
    if cmd.verbose {
        for (c, path) in cmd.files.iter().enumerate().take(merged.channels) {
            println!("channel {} from {}", c, path.display());
        }
    }
    merged.write_wave(&cmd.outfile)?;
    if cmd.verbose {
        println!(
            "wrote {} channels, {:.3}s to {}",
            merged.channels,
            merged.duration(),
            cmd.outfile.display()
        );
    }
    Ok(())
}

fn run_cycles(cmd: &CyclesCommand) -> Result<Vec<Figure>, Box<dyn Error>> {
    let bin = cmd.bin.format();
    let mut figures = Vec::new();
    for path in &cmd.files {
        let Some(rec) = load(path, bin.as_ref()) else {
            continue;
        };
        let figure = cycles_figure(path, &rec)?;
        if figure.panels.is_empty() {
            warn!("{}: no periodic signal", path.display());
            continue;
        }
        keep_or_save(figure, cmd.save, sibling(path, "cycles"), &mut figures)?;
    }
    Ok(figures)
}

fn run_continuity(cmd: &CyclesCommand) -> Result<Vec<Figure>, Box<dyn Error>> {
    let bin = cmd.bin.format();
    let mut continuity = Continuity::new();
    for path in &cmd.files {
        let Some(rec) = load(path, bin.as_ref()) else {
            break;
        };
        if !continuity.add(file_name(path), &rec)? {
            break;
        }
    }
    if continuity.is_empty() {
        return Ok(Vec::new());
    }
    println!("{} files", continuity.len());
    for channel in continuity.report() {
        println!("{}", channel);
    }
    let mut figures = Vec::new();
    keep_or_save(
        continuity.figure(),
        cmd.save,
        sibling(&cmd.files[0], "continuity"),
        &mut figures,
    )?;
    Ok(figures)
}

fn run_sensors(cmd: &SensorsCommand) -> Result<Vec<Figure>, Box<dyn Error>> {
    let log = SensorLog::load(&cmd.file)?;
    let mut figures = Vec::new();
    keep_or_save(
        sensors_figure(file_name(&cmd.file), &log),
        cmd.save,
        sibling(&cmd.file, "sensors"),
        &mut figures,
    )?;
    Ok(figures)
}

fn run_test_signal(cmd: &TestSignalCommand) -> Result<(), Box<dyn Error>> {
    let rec = cmd.signal().generate();
    rec.write_wave(&cmd.outfile)?;
    println!(
        "wrote {} channels of {:.1}kHz, {} bits, {:.3}s to {}",
        rec.channels,
        0.001 * rec.rate,
        rec.bits,
        rec.duration(),
        cmd.outfile.display()
    );
    Ok(())
}
