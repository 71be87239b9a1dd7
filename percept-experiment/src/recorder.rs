use anyhow::{Context, Result};
use percept_core::{EventKind, LogEntry, SyncPort};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

/// Ordered in-memory event log, optionally mirrored pulse-by-pulse to a
/// synchronization port.
///
/// Nothing touches disk until `finish`; a process that dies earlier loses
/// the log, which is accepted for a single-session foreground tool.
pub struct EventRecorder {
    entries: Vec<LogEntry>,
    port: Option<Box<dyn SyncPort>>,
    out_path: PathBuf,
}

impl EventRecorder {
    pub fn new(out_path: PathBuf, port: Option<Box<dyn SyncPort>>) -> Self {
        Self {
            entries: Vec::new(),
            port,
            out_path,
        }
    }

    /// Append an entry and mirror its pulse code to the port, if attached.
    pub fn record(&mut self, event: EventKind, time_secs: f64) -> Result<()> {
        self.entries.push(LogEntry { event, time_secs });
        if let Some(port) = &mut self.port {
            port.pulse(event.sync_code())?;
        }
        Ok(())
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Write the full log as CSV and close the file. Consuming the recorder
    /// makes the once-per-run flush a compile-time guarantee.
    pub fn finish(self) -> Result<PathBuf> {
        let file = File::create(&self.out_path)
            .with_context(|| format!("cannot create event log {}", self.out_path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "Event,Time")?;
        for entry in &self.entries {
            writeln!(writer, "{},{}", entry.event.label(), entry.time_secs)?;
        }
        writer.flush()?;
        debug!(
            path = %self.out_path.display(),
            events = self.entries.len(),
            "event log written"
        );
        Ok(self.out_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct CapturePort(Rc<RefCell<Vec<u8>>>);

    impl SyncPort for CapturePort {
        fn pulse(&mut self, code: u8) -> Result<()> {
            self.0.borrow_mut().push(code);
            Ok(())
        }
    }

    #[test]
    fn pulses_mirror_entries_in_order() {
        let port = CapturePort::default();
        let codes = port.0.clone();
        let mut recorder = EventRecorder::new(PathBuf::from("unused.csv"), Some(Box::new(port)));

        recorder.record(EventKind::FixationBegin, 0.1).unwrap();
        recorder.record(EventKind::FixationEnd, 0.2).unwrap();
        recorder.record(EventKind::SoundEnd, 0.9).unwrap();

        assert_eq!(*codes.borrow(), vec![2, 3, 8]);
        assert_eq!(recorder.entries().len(), 3);
    }

    #[test]
    fn finish_writes_header_and_rows_in_insertion_order() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("run.csv");
        let mut recorder = EventRecorder::new(out.clone(), None);

        recorder.record(EventKind::FixationBegin, 0.5).unwrap();
        recorder.record(EventKind::StimulusBegin, 0.625).unwrap();
        recorder.record(EventKind::UserReaction, 0.75).unwrap();

        let written = recorder.finish().unwrap();
        assert_eq!(written, out);

        let contents = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            contents,
            "Event,Time\nFixation time,0.5\nImage start,0.625\nReaction time,0.75\n"
        );
    }

    #[test]
    fn finish_with_no_entries_writes_only_the_header() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("empty.csv");
        let recorder = EventRecorder::new(out.clone(), None);
        recorder.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Event,Time\n");
    }
}
