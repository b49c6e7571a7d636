// CSV recording state machine: Idle -> Recording -> Idle.
//
// The recorder owns the sink exclusively. Rows are appended synchronously as
// samples arrive; there is no buffering, so a crash loses at most the row in
// flight.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::serial::Sample;

pub const CSV_HEADER: &str = "Timestamp,Temperature_C,Humidity_Pct,Pressure_hPa";

struct RecordingSession {
    path: PathBuf,
    file: File,
    started_at: DateTime<Local>,
}

pub struct Recorder {
    dir: PathBuf,
    session: Option<RecordingSession>,
}

impl Recorder {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, session: None }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn set_dir(&mut self, dir: PathBuf) {
        self.dir = dir;
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.session.as_ref().map(|s| s.started_at)
    }

    /// Name of the file currently being written, for the status banner.
    pub fn file_name(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|s| s.path.file_name())
            .map(|n| n.to_string_lossy().to_string())
    }

    /// Opens a fresh timestamped CSV and writes the header. On any failure
    /// the recorder stays Idle; no partial session is kept.
    pub fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.start_at(Local::now())
    }

    pub fn start_at(&mut self, now: DateTime<Local>) -> Result<(), Box<dyn std::error::Error>> {
        if self.session.is_some() {
            return Err("already recording".into());
        }

        fs::create_dir_all(&self.dir)?;

        let filename = format!("{}_weather.csv", now.format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(filename);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        writeln!(file, "{}", CSV_HEADER)?;

        self.session = Some(RecordingSession {
            path,
            file,
            started_at: now,
        });
        Ok(())
    }

    /// Appends one row while Recording; a no-op while Idle. Flushed per row.
    pub fn append(&mut self, timestamp: &str, sample: &Sample) -> io::Result<()> {
        if let Some(session) = self.session.as_mut() {
            writeln!(
                session.file,
                "{},{},{},{}",
                timestamp, sample.temperature, sample.humidity, sample.pressure
            )?;
            session.file.flush()?;
        }
        Ok(())
    }

    /// Closes the sink and returns the finished file's path, if any.
    pub fn stop(&mut self) -> Option<PathBuf> {
        self.session.take().map(|s| s.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(t: f32, h: f32, p: f32) -> Sample {
        Sample {
            status: "OK".to_string(),
            temperature: t,
            humidity: h,
            pressure: p,
        }
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn start_writes_header_and_names_file_from_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Recorder::new(dir.path().to_path_buf());

        rec.start_at(local(2026, 8, 6, 14, 30, 5)).unwrap();
        assert!(rec.is_recording());
        assert_eq!(rec.file_name().unwrap(), "20260806_143005_weather.csv");
        assert_eq!(rec.started_at(), Some(local(2026, 8, 6, 14, 30, 5)));

        let path = rec.stop().unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents, format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn rows_appended_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Recorder::new(dir.path().to_path_buf());

        rec.start_at(local(2026, 8, 6, 9, 0, 0)).unwrap();
        rec.append("2026-08-06 09:00:01", &sample(23.5, 45.1, 1013.25))
            .unwrap();
        rec.append("2026-08-06 09:00:02", &sample(23.6, 45.0, 1013.2))
            .unwrap();
        rec.append("2026-08-06 09:00:03", &sample(-1.0, -1.0, -1.0))
            .unwrap();
        let path = rec.stop().unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                CSV_HEADER,
                "2026-08-06 09:00:01,23.5,45.1,1013.25",
                "2026-08-06 09:00:02,23.6,45,1013.2",
                "2026-08-06 09:00:03,-1,-1,-1",
            ]
        );
    }

    #[test]
    fn stop_then_start_uses_a_distinct_later_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Recorder::new(dir.path().to_path_buf());

        rec.start_at(local(2026, 8, 6, 9, 0, 0)).unwrap();
        let first = rec.stop().unwrap();

        rec.start_at(local(2026, 8, 6, 9, 0, 1)).unwrap();
        let second = rec.stop().unwrap();

        assert_ne!(first, second);
        assert!(second.file_name() > first.file_name());
    }

    #[test]
    fn start_failure_leaves_recorder_idle() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();

        let mut rec = Recorder::new(blocker);
        assert!(rec.start_at(local(2026, 8, 6, 9, 0, 0)).is_err());
        assert!(!rec.is_recording());
        assert!(rec.stop().is_none());
    }

    #[test]
    fn append_while_idle_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Recorder::new(dir.path().to_path_buf());
        rec.append("2026-08-06 09:00:00", &sample(1.0, 2.0, 3.0))
            .unwrap();
        assert!(!rec.is_recording());
    }

    #[test]
    fn double_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Recorder::new(dir.path().to_path_buf());
        rec.start_at(local(2026, 8, 6, 9, 0, 0)).unwrap();
        assert!(rec.start_at(local(2026, 8, 6, 9, 0, 1)).is_err());
        // the original session is untouched
        assert_eq!(rec.file_name().unwrap(), "20260806_090000_weather.csv");
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("weather");
        let mut rec = Recorder::new(nested.clone());
        rec.start_at(local(2026, 8, 6, 9, 0, 0)).unwrap();
        assert!(nested.is_dir());
        assert!(rec.stop().is_some());
    }
}
