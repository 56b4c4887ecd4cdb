use serde::Serialize;
use std::fmt;

/// Ordered log levels understood by the record core.
///
/// The five `tracing` levels map onto the first four variants; `DPanic`,
/// `Panic` and `Fatal` are only reachable through [`crate::core::Core`]
/// directly or through [`Level::try_from`] on a numeric level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    DPanic,
    Panic,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Returned when a numeric level falls outside `-1..=5`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown log level {0}")]
pub struct UnknownLevel(pub i8);

impl TryFrom<i8> for Level {
    type Error = UnknownLevel;

    fn try_from(value: i8) -> Result<Self, UnknownLevel> {
        match value {
            -1 => Ok(Level::Debug),
            0 => Ok(Level::Info),
            1 => Ok(Level::Warn),
            2 => Ok(Level::Error),
            3 => Ok(Level::DPanic),
            4 => Ok(Level::Panic),
            5 => Ok(Level::Fatal),
            other => Err(UnknownLevel(other)),
        }
    }
}

/// Cloud Logging `LogSeverity`, restricted to the values a [`Level`] can
/// produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a [`Level`] to the severity written under the `severity` key.
pub const fn severity_of(level: Level) -> Severity {
    match level {
        Level::Debug => Severity::Debug,
        Level::Info => Severity::Info,
        Level::Warn => Severity::Warning,
        Level::Error => Severity::Error,
        Level::DPanic => Severity::Critical,
        Level::Panic => Severity::Alert,
        Level::Fatal => Severity::Emergency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mapping_is_injective_and_ordered() {
        let severities: Vec<Severity> = Level::ALL.iter().map(|l| severity_of(*l)).collect();
        let distinct: HashSet<Severity> = severities.iter().copied().collect();
        assert_eq!(distinct.len(), Level::ALL.len());

        let mut sorted = severities.clone();
        sorted.sort();
        assert_eq!(sorted, severities);
    }

    #[test]
    fn fixed_table() {
        assert_eq!(severity_of(Level::Warn).as_str(), "WARNING");
        assert_eq!(severity_of(Level::DPanic).as_str(), "CRITICAL");
        assert_eq!(severity_of(Level::Panic).as_str(), "ALERT");
        assert_eq!(severity_of(Level::Fatal).to_string(), "EMERGENCY");
    }

    #[test]
    fn tracing_levels() {
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Debug);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
    }

    #[test]
    fn numeric_levels_fail_fast_outside_range() {
        assert_eq!(Level::try_from(5), Ok(Level::Fatal));
        assert_eq!(Level::try_from(-1), Ok(Level::Debug));
        assert_eq!(Level::try_from(6), Err(UnknownLevel(6)));
        assert_eq!(Level::try_from(-2), Err(UnknownLevel(-2)));
    }

    #[test]
    fn severity_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"WARNING\"");
    }
}
