//! A line based serial terminal that survives the board being unplugged.

use super::{discover, ModelTable, SerialError};

use log::{debug, info, warn};
use serial2::SerialPort;

use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread::{sleep, spawn},
    time::Duration,
};

/// Read timeout of the port, so that keyboard input gets a turn.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Interval of looking for the device after a disconnect.
const RECONNECT_POLL: Duration = Duration::from_millis(500);

/// Splits received bytes into lines.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    /// An assembler without pending bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `bytes` and returns the lines completed by them, decoded as
    /// Latin-1 and without trailing whitespace.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                let line: String = self.buffer.iter().map(|&c| c as char).collect();
                lines.push(line.trim_end().to_owned());
                self.buffer.clear();
            } else {
                self.buffer.push(b);
            }
        }
        lines
    }

    /// Bytes of the incomplete last line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drops the incomplete line.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Forwards the lines typed on stdin. The channel closes at end of input.
pub fn spawn_keyboard_forwarder() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    spawn(move || {
        forward_lines(io::stdin().lock(), &tx);
        debug!("keyboard input closed");
    });
    rx
}

/// Sends the lines of `input` until it ends or nobody listens anymore.
fn forward_lines(input: impl BufRead, tx: &Sender<String>) {
    for line in input.lines() {
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("failed to read keyboard input: {}", e);
                break;
            }
        }
    }
}

/// Prints what a board sends and passes keyboard input on to it.
pub struct Monitor {
    device: Option<PathBuf>,
    baud: u32,
    models: ModelTable,
    sysfs_root: PathBuf,
    log: Option<File>,
    keyboard: Option<Receiver<String>>,
    lines: LineAssembler,
}

impl Monitor {
    /// Monitors `device`, or the first known board when `None`.
    pub fn new(device: Option<PathBuf>, baud: u32) -> Self {
        Self {
            device,
            baud,
            models: ModelTable::default(),
            sysfs_root: PathBuf::from(super::discovery::SYSFS_ROOT),
            log: None,
            keyboard: None,
            lines: LineAssembler::new(),
        }
    }

    /// Names the boards with `models` instead of the built-in table.
    pub fn models(mut self, models: ModelTable) -> Self {
        self.models = models;
        self
    }

    /// Appends every received line to the file at `path`.
    pub fn log_file(mut self, path: impl AsRef<Path>) -> Result<Self, SerialError> {
        self.log = Some(OpenOptions::new().create(true).append(true).open(path)?);
        Ok(self)
    }

    /// Sends the lines received on `keyboard` to the board.
    pub fn keyboard(mut self, keyboard: Receiver<String>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Runs until the process is terminated or writing the output fails.
    pub fn run(&mut self) -> Result<(), SerialError> {
        loop {
            let (path, port) = self.connect();
            info!("connected to {}", path.display());
            if let Err(e) = self.session(&port, &mut io::stdout()) {
                if is_output_error(&e) {
                    return Err(e.into());
                }
                warn!("{} disconnected: {}", path.display(), e);
            }
            self.lines.clear();
        }
    }

    /// Where to look for the board right now.
    fn candidate(&self) -> Option<PathBuf> {
        match &self.device {
            Some(path) => path.exists().then(|| path.clone()),
            None => match discover(&self.models, &self.sysfs_root) {
                Ok(devices) => devices.into_iter().find(|d| d.is_known()).map(|d| d.path),
                Err(e) => {
                    debug!("no serial ports: {}", e);
                    None
                }
            },
        }
    }

    /// Polls until the board shows up and its port can be opened.
    fn connect(&self) -> (PathBuf, SerialPort) {
        let mut waiting = false;
        loop {
            if let Some(path) = self.candidate() {
                match open_port(&path, self.baud) {
                    Ok(port) => return (path, port),
                    Err(e) => debug!("failed to open {}: {}", path.display(), e),
                }
            }
            if !waiting {
                info!("waiting for device");
                waiting = true;
            }
            sleep(RECONNECT_POLL);
        }
    }

    /// Relays data until the port fails.
    fn session(&mut self, port: &SerialPort, out: &mut impl Write) -> Result<(), MonitorIoError> {
        let mut buffer = [0u8; 1024];
        loop {
            match port.read(&mut buffer) {
                Ok(0) => {
                    return Err(MonitorIoError::Port(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "end of stream",
                    )))
                }
                Ok(n) => self.receive(&buffer[..n], out).map_err(MonitorIoError::Output)?,
                Err(e) if is_timeout(&e) => {}
                Err(e) => return Err(MonitorIoError::Port(e)),
            }
            while let Some(line) = self.next_keyboard_line() {
                debug!("sending {:?}", line);
                port.write_all(format!("{}\n", line).as_bytes())
                    .map_err(MonitorIoError::Port)?;
            }
        }
    }

    /// Prints and logs the lines completed by `bytes`.
    fn receive(&mut self, bytes: &[u8], out: &mut impl Write) -> io::Result<()> {
        for line in self.lines.push(bytes) {
            writeln!(out, "{}", line)?;
            if let Some(log) = self.log.as_mut() {
                writeln!(log, "{}", line)?;
            }
        }
        out.flush()
    }

    fn next_keyboard_line(&mut self) -> Option<String> {
        let keyboard = self.keyboard.as_ref()?;
        match keyboard.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.keyboard = None;
                None
            }
        }
    }
}

/// Port failures end a session, output failures end the monitor.
#[derive(Debug)]
enum MonitorIoError {
    Port(io::Error),
    Output(io::Error),
}

impl std::fmt::Display for MonitorIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Port(e) | Self::Output(e) => write!(f, "{}", e),
        }
    }
}

impl From<MonitorIoError> for SerialError {
    fn from(value: MonitorIoError) -> Self {
        match value {
            MonitorIoError::Port(e) | MonitorIoError::Output(e) => Self::IoError(e),
        }
    }
}

fn is_output_error(e: &MonitorIoError) -> bool {
    matches!(e, MonitorIoError::Output(_))
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn open_port(path: &Path, baud: u32) -> io::Result<SerialPort> {
    let mut port = SerialPort::open(path, baud)?;
    port.set_read_timeout(READ_TIMEOUT)?;
    port.discard_buffers()?;
    Ok(port)
}
