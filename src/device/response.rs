//! Parsing of the board log stream into log lines and command responses.
//!
//! A board log line looks like
//!
//! ```text
//! 10516/R-M/I/AUDFLG/ 10 | [AUD][DECODER][SYNC]reset_data
//! ```
//!
//! Responses to harness commands are carried in the message part, one
//! `[MOBLY_TEST]:` line per data line, closed by a status line:
//!
//! ```text
//! [MOBLY_TEST]:bt_addr: 112233445566
//! [MOBLY_TEST]:result: SUCCESS, error_code=0
//! ```

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static LOG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<time>\d+)/(?:.+/)*(?P<level>[VDIWEFS])/(?P<tag>.+?)\s*/.+\|\s*(?P<message>.*)")
        .expect("valid log line regex")
});
static RESPONSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[MOBLY_TEST\]:(?P<message>.*)").expect("valid response regex"));
static RESPONSE_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"result: (?P<status>FAIL|SUCCESS), error_code=(?P<error_code>\d+)")
        .expect("valid status regex")
});

/// One line of board output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Board clock since the last reboot.
    pub time: String,
    pub level: String,
    pub tag: String,
    pub message: String,
    /// Host time when the line was read.
    pub host_time: DateTime<Local>,
    /// The unparsed line.
    pub line: String,
}

/// Turns raw board lines into [`LogLine`]s.
///
/// Lines that do not follow the board format are continuation lines (long
/// HCI dumps wrapped by the UART) and inherit time, level and tag from the
/// previous formatted line. Unformatted lines before the first formatted one
/// are dropped.
#[derive(Debug, Default)]
pub struct LogLineParser {
    last: Option<LogLine>,
}

impl LogLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, raw: &str) -> Option<LogLine> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        let parsed = match LOG_LINE.captures(line) {
            Some(caps) => LogLine {
                time: caps["time"].to_string(),
                level: caps["level"].to_string(),
                tag: caps["tag"].to_string(),
                message: caps["message"].to_string(),
                host_time: Local::now(),
                line: line.to_string(),
            },
            None => {
                let previous = self.last.as_ref()?;
                LogLine {
                    time: previous.time.clone(),
                    level: previous.level.clone(),
                    tag: previous.tag.clone(),
                    message: line.to_string(),
                    host_time: Local::now(),
                    line: line.to_string(),
                }
            }
        };

        self.last = Some(parsed.clone());
        Some(parsed)
    }
}

/// Error classes reported by the board in the response status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    NoError,
    ResourceBusy,
    CommandParam,
    CommandNotSupport,
    Timeout,
    BtStack,
    Unknown,
}

impl ErrorType {
    /// Maps a board error code; codes outside the table are `Unknown`.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::ResourceBusy,
            2 => Self::CommandParam,
            3 => Self::CommandNotSupport,
            4 => Self::Timeout,
            5 => Self::BtStack,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::NoError => 0,
            Self::ResourceBusy => 1,
            Self::CommandParam => 2,
            Self::CommandNotSupport => 3,
            Self::Timeout => 4,
            Self::BtStack => 5,
            Self::Unknown => 6,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "NO_ERROR",
            Self::ResourceBusy => "RESOURCE_BUSY_ERROR",
            Self::CommandParam => "COMMAND_PARAM_ERROR",
            Self::CommandNotSupport => "COMMAND_NOT_SUPPORT_ERROR",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::BtStack => "BT_STACK_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// A complete command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BesResponse {
    /// `SUCCESS` or `FAIL`.
    pub status: String,
    pub error_code: u32,
    /// Data lines joined by `\n`.
    pub message: String,
}

impl BesResponse {
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

/// Accumulates `[MOBLY_TEST]` data lines until a status line closes the
/// response.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    data: Vec<String>,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one log line; returns the response once its status line arrives.
    pub fn feed(&mut self, line: &LogLine) -> Option<BesResponse> {
        let caps = RESPONSE.captures(&line.message)?;
        let message = caps["message"].trim();

        match RESPONSE_STATUS.captures(message) {
            Some(status) => {
                let error_code = status["error_code"].parse().unwrap_or(u32::MAX);
                Some(BesResponse {
                    status: status["status"].to_string(),
                    error_code,
                    message: std::mem::take(&mut self.data).join("\n"),
                })
            }
            None => {
                self.data.push(message.to_string());
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn board(message: &str) -> String {
        format!("10516/R-M/I/MOBLY/ 10 | {message}")
    }

    #[test]
    fn test_parse_formatted_line() {
        let mut parser = LogLineParser::new();
        let line = parser
            .parse("10516/R-M/I/AUDFLG/ 10 | [AUD][DECODER][SYNC]reset_data\r\n")
            .unwrap();

        assert_eq!(line.time, "10516");
        assert_eq!(line.level, "I");
        assert_eq!(line.tag, "AUDFLG");
        assert_eq!(line.message, "[AUD][DECODER][SYNC]reset_data");
    }

    #[test]
    fn test_continuation_inherits_header() {
        let mut parser = LogLineParser::new();
        assert!(parser.parse("0a 0b 0c").is_none());

        parser.parse("200/W/HCI / 1 | dump start").unwrap();
        let cont = parser.parse("0a 0b 0c").unwrap();

        assert_eq!(cont.time, "200");
        assert_eq!(cont.level, "W");
        assert_eq!(cont.tag, "HCI");
        assert_eq!(cont.message, "0a 0b 0c");
        assert!(parser.parse("   ").is_none());
    }

    #[test]
    fn test_collects_multi_line_response() {
        let mut parser = LogLineParser::new();
        let mut collector = ResponseCollector::new();
        let lines = [
            board("unrelated"),
            board("[MOBLY_TEST]:bt_addr: 112233445566"),
            board("[MOBLY_TEST]:bt_name: bt "),
        ];
        for raw in &lines {
            let line = parser.parse(raw).unwrap();
            assert!(collector.feed(&line).is_none());
        }

        let status = parser
            .parse(&board("[MOBLY_TEST]:result: SUCCESS, error_code=0"))
            .unwrap();
        let response = collector.feed(&status).unwrap();

        assert!(response.is_success());
        assert_eq!(response.status, "SUCCESS");
        assert_eq!(response.message, "bt_addr: 112233445566\nbt_name: bt");
    }

    #[test]
    fn test_failed_response_carries_error_code() {
        let mut parser = LogLineParser::new();
        let mut collector = ResponseCollector::new();
        let line = parser
            .parse(&board("[MOBLY_TEST]:result: FAIL, error_code=2"))
            .unwrap();

        let response = collector.feed(&line).unwrap();
        assert_eq!(response.error_code, 2);
        assert_eq!(ErrorType::from_code(response.error_code), ErrorType::CommandParam);
        assert_eq!(response.message, "");
    }

    #[test]
    fn test_error_type_table() {
        assert_eq!(ErrorType::from_code(5), ErrorType::BtStack);
        assert_eq!(ErrorType::from_code(42), ErrorType::Unknown);
        assert_eq!(ErrorType::Unknown.code(), 6);
        assert_eq!(ErrorType::CommandNotSupport.to_string(), "COMMAND_NOT_SUPPORT_ERROR (3)");
    }
}
