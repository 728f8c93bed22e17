//! Environmental sensor logs written alongside the recordings.
//!
//! The log is a comma separated table. The first column holds the time of
//! each reading, the other columns one sensor each, titled `name/unit`:
//!
//! ```text
//! time,temperature/°C,humidity/%
//! 2024-05-21T10:30:00,21.50,48.2
//! ```

use crate::plot::{channel_color, Figure, Panel, Series};

use chrono::NaiveDateTime;
use nom::{
    bytes::complete::is_not, character::complete::char, combinator::opt, multi::separated_list1,
    IResult,
};

use std::{borrow::Cow, fmt, fs, io, path::Path};

/// Failures of reading a sensor log.
#[derive(Debug)]
pub enum SensorLogError {
    /// Returned when the file cannot be read.
    IoError(io::Error),
    /// A malformed line, counted from one.
    Parse {
        /// Line number.
        line: usize,
        /// What is wrong with the line.
        msg: String,
    },
}

impl fmt::Display for SensorLogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let description: Cow<str> = match self {
            Self::IoError(e) => Cow::from(format!("IO error: {}", e)),
            Self::Parse { line, msg } => Cow::from(format!("line {}: {}", line, msg)),
        };
        write!(f, "{}", description)
    }
}

impl std::error::Error for SensorLogError {}

impl From<io::Error> for SensorLogError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

/// Readings of a single sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorColumn {
    /// Name of the sensor, from the column header.
    pub name: String,
    /// Unit from the column header, empty if there is none.
    pub unit: String,
    /// One value per row, NaN where the reading is missing.
    pub values: Vec<f64>,
}

impl SensorColumn {
    /// `name [unit]`, or just the name for unitless columns.
    pub fn label(&self) -> String {
        if self.unit.is_empty() {
            self.name.clone()
        } else {
            format!("{} [{}]", self.name, self.unit)
        }
    }
}

/// A sensor log: one row of readings per time stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorLog {
    /// Time stamps of the rows.
    pub times: Vec<NaiveDateTime>,
    /// One column per sensor.
    pub columns: Vec<SensorColumn>,
}

fn fields(input: &str) -> IResult<&str, Vec<Option<&str>>> {
    separated_list1(char(','), opt(is_not(",\r\n")))(input)
}

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

impl SensorLog {
    /// Parses the text of a CSV sensor log. The first line holds the
    /// `name/unit` headers, the first column the time stamps.
    pub fn parse(text: &str) -> Result<Self, SensorLogError> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());
        let (_, header) = lines.next().ok_or(SensorLogError::Parse {
            line: 1,
            msg: "no header".to_owned(),
        })?;
        let titles = match fields(header) {
            Ok((_, titles)) if titles.len() > 1 => titles,
            _ => {
                return Err(SensorLogError::Parse {
                    line: 1,
                    msg: "expected time and sensor columns".to_owned(),
                })
            }
        };
        let mut columns: Vec<SensorColumn> = titles[1..]
            .iter()
            .map(|title| {
                let title = title.unwrap_or("").trim();
                let (name, unit) = title.split_once('/').unwrap_or((title, ""));
                SensorColumn {
                    name: name.to_owned(),
                    unit: unit.to_owned(),
                    values: Vec::new(),
                }
            })
            .collect();

        let mut times = Vec::new();
        for (k, line) in lines {
            let parse_error = |msg: String| SensorLogError::Parse { line: k + 1, msg };
            let (_, row) = fields(line).map_err(|e| parse_error(e.to_string()))?;
            let time = row
                .first()
                .copied()
                .flatten()
                .and_then(parse_time)
                .ok_or_else(|| parse_error("invalid time".to_owned()))?;
            times.push(time);
            for (c, column) in columns.iter_mut().enumerate() {
                let value = match row.get(c + 1).copied().flatten().map(str::trim) {
                    None | Some("") => f64::NAN,
                    Some(s) => s
                        .parse()
                        .map_err(|_| parse_error(format!("invalid value {:?}", s)))?,
                };
                column.values.push(value);
            }
        }
        Ok(Self { times, columns })
    }

    /// Reads and parses the sensor log at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SensorLogError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Seconds since the first reading.
    pub fn seconds(&self) -> Vec<f64> {
        let Some(&start) = self.times.first() else {
            return Vec::new();
        };
        self.times
            .iter()
            .map(|t| (*t - start).num_milliseconds() as f64 / 1000.0)
            .collect()
    }
}

/// One panel per sensor over time.
pub fn sensors_figure(title: impl Into<String>, log: &SensorLog) -> Figure {
    let seconds = log.seconds();
    let start = log
        .times
        .first()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    log.columns
        .iter()
        .enumerate()
        .fold(Figure::new(title), |figure, (k, column)| {
            let points = seconds
                .iter()
                .zip(&column.values)
                .filter(|(_, v)| v.is_finite())
                .map(|(&t, &v)| (t, v))
                .collect();
            figure.with_panel(
                Panel::new(column.name.clone())
                    .labels(format!("Time since {} [s]", start), column.label())
                    .with_series(Series::line(column.name.clone(), points, channel_color(k))),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "time,temperature/°C,humidity/%,light/\n\
                       2024-05-21T10:30:00,21.50,48.2,3\n\
                       2024-05-21 10:30:30.5,21.75,,4\n\
                       \n\
                       2024-05-21T10:31:00,22.00,47.9,5\n";

    #[test]
    fn parse_columns_and_times() {
        let log = SensorLog::parse(LOG).unwrap();
        assert_eq!(log.times.len(), 3);
        assert_eq!(log.columns.len(), 3);
        assert_eq!(log.columns[0].name, "temperature");
        assert_eq!(log.columns[0].unit, "°C");
        assert_eq!(log.columns[0].values, vec![21.5, 21.75, 22.0]);
        assert!(log.columns[1].values[1].is_nan());
        assert_eq!(log.columns[1].label(), "humidity [%]");
        assert_eq!(log.columns[2].label(), "light");
        assert_eq!(log.seconds(), vec![0.0, 30.5, 60.0]);
    }

    #[test]
    fn malformed_lines_are_reported() {
        let err = SensorLog::parse("time,t/C\nyesterday,1\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2: invalid time");
        let err = SensorLog::parse("time,t/C\n2024-05-21T10:30:00,warm\n").unwrap_err();
        assert!(matches!(err, SensorLogError::Parse { line: 2, .. }));
        assert!(SensorLog::parse("time\n").is_err());
        assert!(SensorLog::parse("").is_err());
    }

    #[test]
    fn one_panel_per_sensor() {
        let log = SensorLog::parse(LOG).unwrap();
        let fig = sensors_figure("sensors.csv", &log);
        assert_eq!(fig.panels.len(), 3);
        assert_eq!(fig.panels[0].y_label, "temperature [°C]");
        assert_eq!(fig.panels[0].x_label, "Time since 2024-05-21 10:30:00 [s]");
        assert_eq!(fig.panels[1].series[0].points, vec![(0.0, 48.2), (60.0, 47.9)]);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, LOG.as_bytes()).unwrap();
        assert_eq!(SensorLog::load(file.path()).unwrap().times.len(), 3);
    }
}
