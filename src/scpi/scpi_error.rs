use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::Result;

/// `+0,"No error"` or `-101, Invalid character`, found anywhere in the reply.
static REPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([+-][0-9]+),\s*"?([^"\r\n]*)"?"#).expect("error report grammar is valid")
});

/// Error classes defined by the SCPI standard, keyed on the code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// -100..=-199
    Command,
    /// -200..=-299
    Execution,
    /// -300..=-399
    DeviceSpecific,
    /// -400..=-499
    Query,
    /// Positive codes are reserved for the instrument vendor.
    DeviceDefined,
    Other,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorClass::*;
        match self {
            Command => write!(f, "command error"),
            Execution => write!(f, "execution error"),
            DeviceSpecific => write!(f, "device-dependent error"),
            Query => write!(f, "query error"),
            DeviceDefined => write!(f, "device-defined error"),
            Other => write!(f, "other error"),
        }
    }
}

/// Fault reported by the instrument's error queue for a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{cmd}' returned {code}: {msg}")]
pub struct CommandError {
    cmd: String,
    code: i32,
    msg: String,
}

impl CommandError {
    pub fn new<C: Into<String>, M: AsRef<str>>(cmd: C, code: i32, msg: M) -> Self {
        Self {
            cmd: cmd.into(),
            code,
            msg: msg.as_ref().to_ascii_lowercase(),
        }
    }
    /// The command whose execution was verified, not `SYST:ERR?` itself.
    pub fn command(&self) -> &str {
        &self.cmd
    }
    pub fn code(&self) -> i32 {
        self.code
    }
    pub fn message(&self) -> &str {
        &self.msg
    }
    pub fn class(&self) -> ErrorClass {
        match self.code {
            -199..=-100 => ErrorClass::Command,
            -299..=-200 => ErrorClass::Execution,
            -399..=-300 => ErrorClass::DeviceSpecific,
            -499..=-400 => ErrorClass::Query,
            1..=i32::MAX => ErrorClass::DeviceDefined,
            _ => ErrorClass::Other,
        }
    }
    /// Renders the entry the way an instrument reports it, e.g. `-101,"invalid character"`.
    pub fn to_report(&self) -> String {
        format!("{:+},\"{}\"", self.code, self.msg)
    }
}

/// Error report text matching neither accepted shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid format: {0}")]
pub struct InvalidFormatError(pub String);

/// Checks the reply to `SYST:ERR?` that followed `cmd`.
///
/// Code `0` is success. Any other code becomes a [`CommandError`] attributed to
/// `cmd` with the message folded to lowercase. Text that is not an error report
/// fails with [`InvalidFormatError`] carrying the text verbatim.
pub fn decode(cmd: &str, report: &str) -> Result<()> {
    let invalid = || InvalidFormatError(report.to_string());
    let caps = REPORT.captures(report).ok_or_else(invalid)?;
    let code: i32 = caps[1]
        .trim_start_matches('+')
        .parse()
        .map_err(|_| invalid())?;
    if code == 0 {
        return Ok(());
    }
    Err(CommandError::new(cmd, code, caps[2].trim_end()).into())
}
