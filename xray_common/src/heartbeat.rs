//! # Heartbeat File Protocol
//!
//! Cross-process liveness contract between the controller (sole writer)
//! and the watchdog (sole reader).
//!
//! ```text
//!   controller ──write tmp──► <path>.tmp ──rename──► <path> ◄──read── watchdog
//!                                                   "1760601234.250000\n"
//! ```
//!
//! The file holds the UNIX timestamp of the last write as decimal seconds.
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a reader sees either the previous value or the new one, never a torn
//! write.
//!
//! A separate [`ShutdownFlag`] file marks an intentional exit: its presence
//! tells the watchdog that a stale heartbeat is expected.

use crate::config::{ConfigError, check_range};
use crate::consts::{
    DEFAULT_HEARTBEAT_FILE, DEFAULT_SHUTDOWN_FLAG, HEARTBEAT_PERIOD_S, HEARTBEAT_TIMEOUT_S,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

// ─── Configuration ──────────────────────────────────────────────────

/// `[heartbeat]` section, read by both the controller and the watchdog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Heartbeat file path.
    pub file: PathBuf,
    /// Clean-shutdown flag path.
    pub shutdown_flag: PathBuf,
    /// Controller write cadence [s].
    pub period_s: f64,
    /// Age beyond which the watchdog declares the controller dead [s].
    pub timeout_s: f64,
}

impl HeartbeatConfig {
    /// Minimum write period [s].
    pub const MIN_PERIOD_S: f64 = 0.01;
    /// Maximum write period [s].
    pub const MAX_PERIOD_S: f64 = 5.0;
    /// Maximum timeout [s].
    pub const MAX_TIMEOUT_S: f64 = 30.0;

    /// Write period as a `Duration`.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.period_s)
    }

    /// Staleness timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_s)
    }

    /// Bounds check; the timeout must cover at least two write periods.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "heartbeat.period_s",
            self.period_s,
            Self::MIN_PERIOD_S,
            Self::MAX_PERIOD_S,
        )?;
        check_range(
            "heartbeat.timeout_s",
            self.timeout_s,
            2.0 * self.period_s,
            Self::MAX_TIMEOUT_S,
        )
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_HEARTBEAT_FILE),
            shutdown_flag: PathBuf::from(DEFAULT_SHUTDOWN_FLAG),
            period_s: HEARTBEAT_PERIOD_S,
            timeout_s: HEARTBEAT_TIMEOUT_S,
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors of the heartbeat / shutdown-flag file protocol.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    /// File system failure on the given path.
    #[error("heartbeat I/O on {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File exists but does not contain a timestamp.
    #[error("malformed heartbeat record in {path}: {content:?}")]
    Malformed {
        /// File that was read.
        path: String,
        /// Offending content (trimmed).
        content: String,
    },
}

impl HeartbeatError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

// ─── Record ─────────────────────────────────────────────────────────

/// Single liveness record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatRecord {
    /// Wall-clock time of the last write.
    pub last_seen: SystemTime,
}

impl HeartbeatRecord {
    /// Record stamped with the current time.
    pub fn now() -> Self {
        Self {
            last_seen: SystemTime::now(),
        }
    }

    /// Text encoding stored in the file.
    pub fn encode(&self) -> String {
        let secs = self
            .last_seen
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        format!("{secs:.6}\n")
    }

    /// Parse the text encoding. Returns `None` on anything but a
    /// non-negative number of seconds representable as a `SystemTime`.
    pub fn decode(text: &str) -> Option<Self> {
        let secs: f64 = text.trim().parse().ok()?;
        let since_epoch = Duration::try_from_secs_f64(secs).ok()?;
        Some(Self {
            last_seen: UNIX_EPOCH.checked_add(since_epoch)?,
        })
    }

    /// Distance between the record and `now`, in either direction.
    pub fn skew(&self, now: SystemTime) -> Duration {
        match now.duration_since(self.last_seen) {
            Ok(age) => age,
            Err(ahead) => ahead.duration(),
        }
    }

    /// `true` if the record lies within `timeout` of `now`.
    ///
    /// A record stamped further than `timeout` in the future is stale: the
    /// wall clock stepped backwards and the stamp says nothing about the
    /// writer.
    pub fn is_fresh(&self, now: SystemTime, timeout: Duration) -> bool {
        self.skew(now) <= timeout
    }
}

/// Heartbeat file at a fixed path.
#[derive(Debug, Clone)]
pub struct HeartbeatFile {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl HeartbeatFile {
    /// Bind to `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        Self {
            path,
            tmp_path: PathBuf::from(tmp),
        }
    }

    /// Target path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the file with `record`.
    pub fn write(&self, record: &HeartbeatRecord) -> Result<(), HeartbeatError> {
        let mut file =
            fs::File::create(&self.tmp_path).map_err(|e| HeartbeatError::io(&self.tmp_path, e))?;
        file.write_all(record.encode().as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| HeartbeatError::io(&self.tmp_path, e))?;
        drop(file);
        fs::rename(&self.tmp_path, &self.path).map_err(|e| HeartbeatError::io(&self.path, e))
    }

    /// Stamp the file with the current time.
    pub fn touch(&self) -> Result<(), HeartbeatError> {
        self.write(&HeartbeatRecord::now())
    }

    /// Read the current record. `Ok(None)` when the file does not exist.
    pub fn read(&self) -> Result<Option<HeartbeatRecord>, HeartbeatError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HeartbeatError::io(&self.path, e)),
        };
        HeartbeatRecord::decode(&content)
            .map(Some)
            .ok_or_else(|| HeartbeatError::Malformed {
                path: self.path.display().to_string(),
                content: content.trim().to_string(),
            })
    }

    /// Liveness check used by the watchdog.
    ///
    /// Missing, unreadable or garbled files count as not alive.
    pub fn is_alive(&self, now: SystemTime, timeout: Duration) -> bool {
        matches!(self.read(), Ok(Some(rec)) if rec.is_fresh(now, timeout))
    }
}

/// Clean-shutdown marker file.
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    path: PathBuf,
}

impl ShutdownFlag {
    /// Bind to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Flag path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the flag before a graceful exit.
    pub fn raise(&self) -> Result<(), HeartbeatError> {
        fs::write(&self.path, b"shutdown\n").map_err(|e| HeartbeatError::io(&self.path, e))
    }

    /// Remove the flag at startup. Returns `true` if a flag was present.
    pub fn clear(&self) -> Result<bool, HeartbeatError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HeartbeatError::io(&self.path, e)),
        }
    }

    /// `true` if the flag file exists.
    pub fn is_raised(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn heartbeat_config_defaults_and_bounds() {
        let cfg = HeartbeatConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.timeout(), Duration::from_secs(1));

        let tight = HeartbeatConfig {
            period_s: 0.5,
            timeout_s: 0.6,
            ..HeartbeatConfig::default()
        };
        assert!(tight.validate().is_err());
    }

    #[test]
    fn record_text_encoding() {
        let rec = HeartbeatRecord {
            last_seen: UNIX_EPOCH + Duration::from_millis(1_500),
        };
        assert_eq!(rec.encode(), "1.500000\n");
        let back = HeartbeatRecord::decode(" 1.5 \n").unwrap();
        assert_eq!(back.last_seen, rec.last_seen);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(HeartbeatRecord::decode("").is_none());
        assert!(HeartbeatRecord::decode("12.3abc").is_none());
        assert!(HeartbeatRecord::decode("-4").is_none());
        assert!(HeartbeatRecord::decode("NaN").is_none());
        assert!(HeartbeatRecord::decode("inf").is_none());
    }

    #[test]
    fn decode_rejects_out_of_range_stamps() {
        assert!(HeartbeatRecord::decode("1e30").is_none());
        assert!(HeartbeatRecord::decode("1e19").is_none());
        assert!(HeartbeatRecord::decode("1e300\n").is_none());
    }

    #[test]
    fn huge_stamp_in_file_is_not_alive() {
        let dir = TempDir::new().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("hb"));
        fs::write(hb.path(), "1e30\n").unwrap();
        assert!(matches!(hb.read(), Err(HeartbeatError::Malformed { .. })));
        assert!(!hb.is_alive(SystemTime::now(), Duration::from_secs(1)));
    }

    #[test]
    fn age_and_freshness() {
        let base = UNIX_EPOCH + Duration::from_secs(1000);
        let rec = HeartbeatRecord { last_seen: base };
        let later = base + Duration::from_millis(1200);
        assert_eq!(rec.skew(later), Duration::from_millis(1200));
        assert!(!rec.is_fresh(later, Duration::from_secs(1)));
        assert!(rec.is_fresh(later, Duration::from_secs(2)));
    }

    #[test]
    fn future_stamp_is_fresh_only_within_timeout() {
        let base = UNIX_EPOCH + Duration::from_secs(1000);
        let rec = HeartbeatRecord {
            last_seen: base + Duration::from_millis(500),
        };
        let timeout = Duration::from_secs(1);
        assert_eq!(rec.skew(base), Duration::from_millis(500));
        assert!(rec.is_fresh(base, timeout));

        let clock_stepped_back = base - Duration::from_secs(3600);
        assert!(!rec.is_fresh(clock_stepped_back, timeout));
    }

    #[test]
    fn write_is_atomic_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("hb"));
        hb.touch().unwrap();
        hb.touch().unwrap();

        assert!(hb.path().exists());
        assert!(!dir.path().join("hb.tmp").exists());
        let rec = hb.read().unwrap().unwrap();
        assert!(rec.is_fresh(SystemTime::now(), Duration::from_secs(5)));
    }

    #[test]
    fn missing_or_garbled_file_is_not_alive() {
        let dir = TempDir::new().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("hb"));
        assert!(hb.read().unwrap().is_none());
        assert!(!hb.is_alive(SystemTime::now(), Duration::from_secs(1)));

        fs::write(hb.path(), "half-writ").unwrap();
        assert!(matches!(hb.read(), Err(HeartbeatError::Malformed { .. })));
        assert!(!hb.is_alive(SystemTime::now(), Duration::from_secs(1)));
    }

    #[test]
    fn stale_file_is_not_alive() {
        let dir = TempDir::new().unwrap();
        let hb = HeartbeatFile::new(dir.path().join("hb"));
        let old = HeartbeatRecord {
            last_seen: SystemTime::now() - Duration::from_secs(10),
        };
        hb.write(&old).unwrap();
        assert!(!hb.is_alive(SystemTime::now(), Duration::from_secs(1)));
    }

    #[test]
    fn shutdown_flag_lifecycle() {
        let dir = TempDir::new().unwrap();
        let flag = ShutdownFlag::new(dir.path().join("flag"));
        assert!(!flag.is_raised());
        assert!(!flag.clear().unwrap());

        flag.raise().unwrap();
        assert!(flag.is_raised());
        assert!(flag.clear().unwrap());
        assert!(!flag.is_raised());
    }
}
