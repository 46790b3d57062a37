//! The session writer thread.
//!
//! Exactly one writer owns a session file. It drains the capture queue and
//! appends each event as a single JSON line, flushing after every line so a
//! reader tailing the file sees events as they arrive. The writer never panics
//! on I/O failure: it records why it stopped in its [`WriterState`] and exits.

use crate::collector::stats::CaptureStats;
use crate::collector::types::Event;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Item carried by the capture queue.
#[derive(Debug, Clone)]
pub enum WriterMessage {
    Event(Event),
    /// End of stream; everything queued before it has been written.
    Shutdown,
}

/// Why a writer stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Received [`WriterMessage::Shutdown`]
    EndOfStream,
    /// Every sender was dropped without a shutdown marker
    Disconnected,
    /// Opening or writing the session file failed
    Io(String),
}

/// Lifecycle of a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Running,
    Stopped(StopReason),
}

/// Handle to a spawned writer thread.
pub struct WriterHandle {
    state: Arc<Mutex<WriterState>>,
    done: Receiver<StopReason>,
    thread: Option<JoinHandle<()>>,
}

impl WriterHandle {
    /// Current state of the writer.
    pub fn state(&self) -> WriterState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait up to `timeout` for the writer to finish.
    ///
    /// Returns `None` if it is still running when the timeout expires; the
    /// thread is then left detached.
    pub fn wait(&mut self, timeout: Duration) -> Option<StopReason> {
        match self.done.recv_timeout(timeout) {
            Ok(reason) => {
                if let Some(handle) = self.thread.take() {
                    let _ = handle.join();
                }
                Some(reason)
            }
            Err(RecvTimeoutError::Timeout) => None,
            // The thread went away without reporting; read what it left behind.
            Err(RecvTimeoutError::Disconnected) => match self.state() {
                WriterState::Stopped(reason) => Some(reason),
                _ => None,
            },
        }
    }
}

/// Spawn the writer for `path`, draining `receiver` until shutdown.
pub fn spawn_writer(
    path: PathBuf,
    receiver: Receiver<WriterMessage>,
    stats: Arc<CaptureStats>,
) -> std::io::Result<WriterHandle> {
    let state = Arc::new(Mutex::new(WriterState::Running));
    let (done_tx, done_rx) = bounded(1);

    let thread_state = state.clone();
    let thread = thread::Builder::new()
        .name("flowstate-writer".to_string())
        .spawn(move || {
            let reason = run_writer(&path, &receiver, &stats);
            // Senders see a disconnect from here on.
            drop(receiver);
            match &reason {
                StopReason::Io(e) => {
                    tracing::error!(path = %path.display(), error = %e, "session writer stopped")
                }
                other => tracing::debug!(path = %path.display(), reason = ?other, "session writer finished"),
            }
            *thread_state.lock().unwrap_or_else(PoisonError::into_inner) =
                WriterState::Stopped(reason.clone());
            let _ = done_tx.send(reason);
        })?;

    Ok(WriterHandle {
        state,
        done: done_rx,
        thread: Some(thread),
    })
}

fn run_writer(path: &Path, receiver: &Receiver<WriterMessage>, stats: &CaptureStats) -> StopReason {
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => file,
        Err(e) => return StopReason::Io(e.to_string()),
    };
    drain(BufWriter::new(file), receiver, stats)
}

fn drain<W: Write>(mut out: W, receiver: &Receiver<WriterMessage>, stats: &CaptureStats) -> StopReason {
    loop {
        match receiver.recv() {
            Ok(WriterMessage::Event(event)) => {
                if let Err(e) = write_line(&mut out, &event) {
                    return StopReason::Io(e.to_string());
                }
                stats.record_written();
            }
            Ok(WriterMessage::Shutdown) => return StopReason::EndOfStream,
            Err(_) => return StopReason::Disconnected,
        }
    }
}

/// Append one event as a JSON line and flush it to the OS.
pub fn write_line<W: Write>(out: &mut W, event: &Event) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    out.write_all(b"\n")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{EventPayload, MouseScrollData};

    fn scroll(ts: f64) -> Event {
        Event::new(
            ts,
            EventPayload::MouseScroll(MouseScrollData {
                x: 1,
                y: 2,
                dx: 0,
                dy: -1,
            }),
        )
    }

    #[test]
    fn test_writer_appends_lines_until_shutdown() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "existing\n").unwrap();

        let (tx, rx) = bounded(8);
        let stats = Arc::new(CaptureStats::new());
        let mut handle = spawn_writer(path.clone(), rx, stats.clone()).unwrap();

        tx.send(WriterMessage::Event(scroll(1.0))).unwrap();
        tx.send(WriterMessage::Event(scroll(2.0))).unwrap();
        tx.send(WriterMessage::Shutdown).unwrap();

        assert_eq!(
            handle.wait(Duration::from_secs(5)),
            Some(StopReason::EndOfStream)
        );
        assert_eq!(handle.state(), WriterState::Stopped(StopReason::EndOfStream));
        assert_eq!(stats.snapshot().events_written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing");
        let decoded: Event = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(decoded, scroll(2.0));
    }

    #[test]
    fn test_writer_reports_disconnect() {
        let tmp = tempfile::tempdir().unwrap();
        let (tx, rx) = bounded::<WriterMessage>(1);
        let mut handle =
            spawn_writer(tmp.path().join("s.json"), rx, Arc::new(CaptureStats::new())).unwrap();

        drop(tx);
        assert_eq!(
            handle.wait(Duration::from_secs(5)),
            Some(StopReason::Disconnected)
        );
    }

    /// Accepts `budget` bytes, then fails every write.
    struct FullDisk {
        budget: usize,
        written: Vec<u8>,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written.len() + buf.len() > self.budget {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_stops_the_writer() {
        let line_len = serde_json::to_string(&scroll(1.0)).unwrap().len() + 1;
        let mut disk = FullDisk {
            budget: 2 * line_len,
            written: Vec::new(),
        };

        let (tx, rx) = bounded(8);
        for ts in [1.0, 2.0, 3.0, 4.0] {
            tx.send(WriterMessage::Event(scroll(ts))).unwrap();
        }
        tx.send(WriterMessage::Shutdown).unwrap();

        let stats = CaptureStats::new();
        match drain(&mut disk, &rx, &stats) {
            StopReason::Io(e) => assert!(e.contains("no space left")),
            other => panic!("expected I/O stop, got {other:?}"),
        }
        assert_eq!(stats.snapshot().events_written, 2);
        assert_eq!(String::from_utf8(disk.written).unwrap().lines().count(), 2);
        // Nothing after the failed event was consumed.
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn test_writer_open_failure_is_a_terminal_state() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let (_tx, rx) = bounded::<WriterMessage>(1);
        let mut handle =
            spawn_writer(tmp.path().to_path_buf(), rx, Arc::new(CaptureStats::new())).unwrap();

        match handle.wait(Duration::from_secs(5)) {
            Some(StopReason::Io(_)) => {}
            other => panic!("expected I/O stop, got {other:?}"),
        }
        assert!(matches!(
            handle.state(),
            WriterState::Stopped(StopReason::Io(_))
        ));
    }
}
