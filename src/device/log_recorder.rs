//! Host-side copy of the board log.
//!
//! Every line read from the UART is appended to a file with a host
//! timestamp. Test code can later clip the content written since the last
//! clip into an excerpt file.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Host timestamp format prefixed to every recorded line.
pub const LINE_TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S%.3f";

/// Timestamp format used in log and excerpt file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%m-%d-%Y_%H-%M-%S-%3f";

pub fn file_timestamp() -> String {
    Local::now().format(FILE_TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug)]
pub struct LogRecorder {
    path: PathBuf,
    file: File,
    clip_offset: u64,
}

impl LogRecorder {
    /// Opens (or creates) the log file in append mode.
    ///
    /// Existing content is never clipped; the first excerpt starts at the
    /// current end of the file.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let clip_offset = file.metadata()?.len();
        tracing::debug!(path = %path.display(), "Recording board log");
        Ok(Self {
            path,
            file,
            clip_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one board line (without its terminator).
    pub fn record(&mut self, line: &str) -> io::Result<()> {
        let stamp = Local::now().format(LINE_TIMESTAMP_FORMAT);
        writeln!(self.file, "{stamp}\t{line}")?;
        self.file.flush()
    }

    /// Copies everything recorded since the previous clip into `dest`.
    pub fn clip_new_content(&mut self, dest: &Path) -> io::Result<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut source = File::open(&self.path)?;
        source.seek(SeekFrom::Start(self.clip_offset))?;

        let mut out = File::create(dest)?;
        let copied = io::copy(&mut source, &mut out)?;
        self.clip_offset += copied;
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_prefixes_timestamp() {
        let dir = tempdir().unwrap();
        let mut recorder = LogRecorder::create(dir.path().join("board.txt")).unwrap();
        recorder.record("10/I/TAG/ 1 | hello").unwrap();

        let content = fs::read_to_string(recorder.path()).unwrap();
        let (stamp, line) = content.trim_end().split_once('\t').unwrap();
        assert_eq!(line, "10/I/TAG/ 1 | hello");
        assert_eq!(stamp.len(), "01-02 03:04:05.678".len());
    }

    #[test]
    fn test_clip_only_new_content() {
        let dir = tempdir().unwrap();
        let mut recorder = LogRecorder::create(dir.path().join("board.txt")).unwrap();

        recorder.record("first").unwrap();
        let first = dir.path().join("out/first.txt");
        recorder.clip_new_content(&first).unwrap();

        recorder.record("second").unwrap();
        let second = dir.path().join("out/second.txt");
        recorder.clip_new_content(&second).unwrap();

        let first = fs::read_to_string(first).unwrap();
        let second = fs::read_to_string(second).unwrap();
        assert!(first.ends_with("\tfirst\n"));
        assert!(!second.contains("first"));
        assert!(second.ends_with("\tsecond\n"));

        let empty = dir.path().join("out/empty.txt");
        assert_eq!(recorder.clip_new_content(&empty).unwrap(), 0);
    }
}
