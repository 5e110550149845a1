//! Command/response exchange with the board over its UART.
//!
//! The board prints its log and its command responses on the same serial
//! line. [`BoardSession`] reads that stream inline: every complete line is
//! recorded to the host log file, parsed into a [`LogLine`] and queued for
//! whoever is waiting. There is no background reader; each wait pumps the
//! port until its deadline.

use super::error::{DeviceError, DeviceResult};
use super::log_recorder::LogRecorder;
use super::response::{BesResponse, ErrorType, LogLine, LogLineParser, ResponseCollector};
use crate::port::PortAdapter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static COMMAND_NOT_SUPPORTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*command not supported!").expect("static regex"));

const READ_CHUNK: usize = 1024;

/// Longest partial line kept while waiting for its `\n`.
pub const MAX_LINE_LEN: usize = 4096;

/// Timing of the command exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTimings {
    /// Pause before every command so the board can finish the previous one.
    pub command_interval: Duration,
    /// Wait after a reboot completed before sending anything else.
    pub reboot_settle: Duration,
    /// Maximum time for a command response.
    pub execution_timeout: Duration,
    /// Maximum time for each reboot milestone.
    pub reboot_timeout: Duration,
    /// Sleep between polls of an idle port.
    pub poll_interval: Duration,
}

impl Default for CommandTimings {
    fn default() -> Self {
        Self {
            command_interval: Duration::from_secs(1),
            reboot_settle: Duration::from_secs(3),
            execution_timeout: Duration::from_secs(10),
            reboot_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(5),
        }
    }
}

impl CommandTimings {
    /// Short timings for scripted ports.
    pub fn immediate() -> Self {
        Self {
            command_interval: Duration::ZERO,
            reboot_settle: Duration::ZERO,
            execution_timeout: Duration::from_millis(200),
            reboot_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(1),
        }
    }
}

pub struct BoardSession {
    port: PortAdapter,
    recorder: Option<LogRecorder>,
    parser: LogLineParser,
    leftover: Vec<u8>,
    pending: VecDeque<LogLine>,
    timings: CommandTimings,
}

impl BoardSession {
    pub fn new(port: PortAdapter, recorder: Option<LogRecorder>, timings: CommandTimings) -> Self {
        Self {
            port,
            recorder,
            parser: LogLineParser::new(),
            leftover: Vec::new(),
            pending: VecDeque::new(),
            timings,
        }
    }

    pub fn timings(&self) -> &CommandTimings {
        &self.timings
    }

    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    pub fn recorder_mut(&mut self) -> Option<&mut LogRecorder> {
        self.recorder.as_mut()
    }

    /// Read whatever the port has; returns whether any bytes arrived.
    fn pump(&mut self) -> DeviceResult<bool> {
        if self.port.bytes_to_read() == Some(0) {
            return Ok(false);
        }

        let mut buffer = [0u8; READ_CHUNK];
        match self.port.read_bytes(&mut buffer) {
            Ok(0) => Ok(false),
            Ok(n) => {
                self.ingest(&buffer[..n])?;
                Ok(true)
            }
            Err(e) if e.is_idle() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn ingest(&mut self, bytes: &[u8]) -> DeviceResult<()> {
        self.leftover.extend_from_slice(bytes);

        while let Some(end) = self.leftover.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.leftover.drain(..=end).collect();
            self.emit(&raw[..end])?;
        }
        if self.leftover.len() > MAX_LINE_LEN {
            debug!(len = self.leftover.len(), "flushing unterminated board output");
            let raw = std::mem::take(&mut self.leftover);
            self.emit(&raw)?;
        }
        Ok(())
    }

    fn emit(&mut self, raw: &[u8]) -> DeviceResult<()> {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end_matches('\r');

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(text)?;
        }
        if let Some(line) = self.parser.parse(text) {
            self.pending.push_back(line);
        }
        Ok(())
    }

    /// Next parsed line, or `None` once `deadline` passes.
    pub fn next_line(&mut self, deadline: Instant) -> DeviceResult<Option<LogLine>> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            if !self.pump()? {
                std::thread::sleep(self.timings.poll_interval);
            }
        }
    }

    /// First line accepted by `accept` within `timeout`.
    pub fn wait_for<F>(&mut self, timeout: Duration, mut accept: F) -> DeviceResult<Option<LogLine>>
    where
        F: FnMut(&LogLine) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while let Some(line) = self.next_line(deadline)? {
            if accept(&line) {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    /// Record and drop everything the board printed so far.
    ///
    /// A board that never goes quiet is drained for at most the execution
    /// timeout.
    pub fn discard_stale(&mut self) -> DeviceResult<()> {
        let deadline = Instant::now() + self.timings.execution_timeout;
        while Instant::now() < deadline && self.pump()? {
            self.pending.clear();
        }
        self.pending.clear();
        Ok(())
    }

    /// Write one command line.
    pub fn write_command(&mut self, command: &str) -> DeviceResult<()> {
        info!(command, "sending board command");
        let mut bytes = command.trim().as_bytes().to_vec();
        bytes.extend_from_slice(b"\r\n");
        self.port.write_bytes(&bytes)?;
        Ok(())
    }

    /// Send a command and return the data of its response.
    ///
    /// Only output printed after the command was written is considered.
    /// Without `wait_response` the command is fire-and-forget and the
    /// result is empty.
    pub fn send_command(&mut self, command: &str, wait_response: bool) -> DeviceResult<String> {
        std::thread::sleep(self.timings.command_interval);
        self.discard_stale()?;
        self.write_command(command)?;
        if !wait_response {
            return Ok(String::new());
        }

        let response = self.collect_response(command)?;
        info!(
            status = %response.status,
            error_code = response.error_code,
            message = %response.message,
            "board response"
        );
        if !response.is_success() {
            return Err(DeviceError::CommandFailed {
                command: command.to_string(),
                error_type: ErrorType::from_code(response.error_code),
            });
        }
        Ok(response.message)
    }

    fn collect_response(&mut self, command: &str) -> DeviceResult<BesResponse> {
        let deadline = Instant::now() + self.timings.execution_timeout;
        let mut collector = ResponseCollector::new();
        let mut not_supported = false;

        while let Some(line) = self.next_line(deadline)? {
            if COMMAND_NOT_SUPPORTED.is_match(&line.message) {
                debug!(command, "board reported command not supported");
                not_supported = true;
            }
            if let Some(response) = collector.feed(&line) {
                return Ok(response);
            }
        }

        if not_supported {
            return Err(DeviceError::CommandFailed {
                command: command.to_string(),
                error_type: ErrorType::CommandNotSupport,
            });
        }
        warn!(command, timeout = ?self.timings.execution_timeout, "no response from board");
        Err(DeviceError::CommandTimeout(command.to_string()))
    }
}

impl std::fmt::Debug for BoardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("port", &self.port.name())
            .field("pending", &self.pending.len())
            .field("timings", &self.timings)
            .finish()
    }
}
