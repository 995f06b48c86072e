// Trailing window expressions: "<positive integer><s|m|h>", e.g. "30s", "5m", "2h".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowUnit {
    Seconds,
    Minutes,
    Hours,
}

impl WindowUnit {
    fn from_suffix(c: char) -> Option<Self> {
        match c {
            's' => Some(WindowUnit::Seconds),
            'm' => Some(WindowUnit::Minutes),
            'h' => Some(WindowUnit::Hours),
            _ => None,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            WindowUnit::Seconds => 's',
            WindowUnit::Minutes => 'm',
            WindowUnit::Hours => 'h',
        }
    }

    /// Largest accepted magnitude: 1 hour of seconds, 24 hours of minutes, 7 days of hours.
    pub fn max_value(self) -> u32 {
        match self {
            WindowUnit::Seconds => 3600,
            WindowUnit::Minutes => 1440,
            WindowUnit::Hours => 168,
        }
    }

    fn seconds(self) -> i64 {
        match self {
            WindowUnit::Seconds => 1,
            WindowUnit::Minutes => 60,
            WindowUnit::Hours => 3600,
        }
    }
}

impl fmt::Display for WindowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowUnit::Seconds => "seconds",
            WindowUnit::Minutes => "minutes",
            WindowUnit::Hours => "hours",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window parameter is empty")]
    Empty,
    #[error("invalid window format: {0} (expected <number><unit>, e.g. 30s, 5m, 2h)")]
    InvalidFormat(String),
    #[error("invalid window value: {0}")]
    InvalidValue(String),
    #[error("window value must be positive")]
    NonPositive,
    #[error("maximum window for {unit} is {max}, got: {got}")]
    ExceedsLimit { unit: WindowUnit, max: u32, got: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSpec {
    value: u32,
    unit: WindowUnit,
}

impl WindowSpec {
    pub fn new(value: u32, unit: WindowUnit) -> Result<Self, WindowError> {
        if value == 0 {
            return Err(WindowError::NonPositive);
        }
        if value > unit.max_value() {
            return Err(WindowError::ExceedsLimit {
                unit,
                max: unit.max_value(),
                got: value,
            });
        }
        Ok(Self { value, unit })
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn unit(&self) -> WindowUnit {
        self.unit
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.value) * self.unit.seconds())
    }

    /// Start of the window ending at `end`.
    pub fn start(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        end - self.duration()
    }
}

impl FromStr for WindowSpec {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(WindowError::Empty);
        }
        let Some(suffix) = s.chars().last() else {
            return Err(WindowError::Empty);
        };
        let digits = &s[..s.len() - suffix.len_utf8()];
        let unit = WindowUnit::from_suffix(suffix)
            .filter(|_| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| WindowError::InvalidFormat(s.to_string()))?;
        let value: u32 = digits
            .parse()
            .map_err(|_| WindowError::InvalidValue(digits.to_string()))?;
        WindowSpec::new(value, unit)
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}
