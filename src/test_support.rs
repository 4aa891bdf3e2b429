//! Log capture for tests asserting on emitted `tracing` events.

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Events emitted while `f` runs, one formatted line each.
pub struct CapturedLogs {
    lines: Vec<String>,
}

impl CapturedLogs {
    fn at_level(&self, level: &str) -> Vec<&str> {
        self.lines
            .iter()
            .map(|l| l.trim_start())
            .filter(|l| l.starts_with(level))
            .collect()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.at_level("WARN")
    }

    pub fn infos(&self) -> Vec<&str> {
        self.at_level("INFO")
    }
}

pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, CapturedLogs) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap().clone();
    let lines = String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect();
    (result, CapturedLogs { lines })
}
