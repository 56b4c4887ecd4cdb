use crate::severity::Level;
use chrono::{DateTime, Utc};
use std::fmt;

/// Call site of a log statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Caller { file: file.into(), line }
    }

    /// `dir/file.rs:line`, keeping only the last directory of the path.
    pub fn short(&self) -> String {
        format!("{}:{}", trim_path(&self.file), self.line)
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

fn trim_path(file: &str) -> &str {
    let Some(last) = file.rfind(['/', '\\']) else {
        return file;
    };
    match file[..last].rfind(['/', '\\']) {
        Some(prev) => &file[prev + 1..],
        None => file,
    }
}

/// A single log event before encoding.
#[derive(Debug, Clone)]
pub struct Entry {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub logger_name: Option<String>,
    pub message: String,
    pub caller: Option<Caller>,
    pub stack: Option<String>,
}

impl Entry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Entry {
            level,
            time: Utc::now(),
            logger_name: None,
            message: message.into(),
            caller: None,
            stack: None,
        }
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_caller_keeps_last_directory() {
        assert_eq!(Caller::new("/home/u/proj/src/core.rs", 12).short(), "src/core.rs:12");
        assert_eq!(Caller::new("src/core.rs", 3).short(), "src/core.rs:3");
        assert_eq!(Caller::new("core.rs", 1).short(), "core.rs:1");
    }
}
