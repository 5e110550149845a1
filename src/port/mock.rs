//! Mock serial port for driving the board controller without hardware.
//!
//! Besides a plain read queue, the mock can answer writes: a reply rule
//! pairs a trigger with the bytes the "board" prints once a write
//! containing that trigger is seen. Rules fire once, in registration order.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct ReplyRule {
    trigger: Vec<u8>,
    reply: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockPortState {
    read_queue: VecDeque<u8>,
    write_log: Vec<Vec<u8>>,
    replies: Vec<ReplyRule>,
    fail_writes: bool,
}

/// Mock serial port.
///
/// Clones share state, so a test can keep one handle for scripting and
/// inspection while the controller owns another.
///
/// # Example
/// ```
/// use bt_ref_harness::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.reply_to("mobly_test:get_box_state", "[MOBLY_TEST]:box_state=OUT_BOX\n");
///
/// port.write_bytes(b"mobly_test:get_box_state\r\n").unwrap();
/// let mut buffer = [0u8; 64];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert!(std::str::from_utf8(&buffer[..n]).unwrap().contains("OUT_BOX"));
/// assert_eq!(port.written_lines(), vec!["mobly_test:get_box_state"]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockPortState> {
        // A panic in another test thread must not hide this port's state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append raw bytes to the read queue.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.lock().read_queue.extend(data);
    }

    /// Append one line (newline added) to the read queue.
    pub fn enqueue_line(&self, line: &str) {
        let mut state = self.lock();
        state.read_queue.extend(line.as_bytes());
        state.read_queue.push_back(b'\n');
    }

    /// Print `reply` once a write containing `trigger` arrives.
    pub fn reply_to(&self, trigger: &str, reply: &str) {
        self.lock().replies.push(ReplyRule {
            trigger: trigger.as_bytes().to_vec(),
            reply: reply.as_bytes().to_vec(),
        });
    }

    /// Number of reply rules that have not fired yet.
    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }

    /// Make every following write fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Copy of every write, in order.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.lock().write_log.clone()
    }

    /// Writes decoded as text with the trailing line terminator removed.
    pub fn written_lines(&self) -> Vec<String> {
        self.lock()
            .write_log
            .iter()
            .map(|w| String::from_utf8_lossy(w).trim_end().to_string())
            .collect()
    }

    /// Number of bytes still queued for reading.
    pub fn available_bytes(&self) -> usize {
        self.lock().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.lock();

        if state.fail_writes {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock port write failure",
            )));
        }

        state.write_log.push(data.to_vec());

        let fired = state
            .replies
            .iter()
            .position(|rule| contains(data, &rule.trigger));
        if let Some(index) = fired {
            let rule = state.replies.remove(index);
            state.read_queue.extend(rule.reply);
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.lock();

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Option<usize> {
        Some(self.lock().read_queue.len())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_line("10516/R-M/I/AUDFLG/ 10 | ready");

        let mut buffer = [0u8; 64];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"10516/R-M/I/AUDFLG/ 10 | ready\n");
    }

    #[test]
    fn test_reply_fires_once_in_order() {
        let mut port = MockSerialPort::new("MOCK0");
        port.reply_to("reboot", "first\n");
        port.reply_to("reboot", "second\n");

        port.write_bytes(b"mobly_test:reboot\r\n").unwrap();
        assert_eq!(port.pending_replies(), 1);

        let mut buffer = [0u8; 32];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"first\n");

        port.write_bytes(b"mobly_test:volume_plus\r\n").unwrap();
        assert_eq!(port.available_bytes(), 0);
    }

    #[test]
    fn test_write_failure() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_writes(true);
        assert!(port.write_bytes(b"x").is_err());
        assert!(port.get_write_log().is_empty());
    }

    #[test]
    fn test_empty_read_is_idle() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut buffer = [0u8; 10];
        let err = port.read_bytes(&mut buffer).unwrap_err();
        assert!(err.is_idle());
    }

    #[test]
    fn test_bytes_to_read_tracks_queue() {
        let port = MockSerialPort::new("MOCK0");
        assert_eq!(port.bytes_to_read(), Some(0));
        port.enqueue_read(b"stale");
        assert_eq!(port.bytes_to_read(), Some(5));
    }
}
