//! GPIO lines through the legacy `/sys/class/gpio` interface.
//!
//! ```text
//!   <root>/export            ← "N"
//!   <root>/gpioN/direction   ← "in" | "low"
//!   <root>/gpioN/value       ↔ "0" | "1"
//! ```
//!
//! Writing `low` to `direction` configures an output and drives it LOW in
//! one step, so a freshly claimed output never glitches HIGH.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use xray_common::hal::driver::{DigitalInput, DigitalOutput, HalError};

/// Export `line` (if needed) and return its directory.
pub(crate) fn export(root: &Path, line: u32) -> Result<PathBuf, HalError> {
    let dir = root.join(format!("gpio{line}"));
    if !dir.exists() {
        // EBUSY from a concurrent exporter is fine as long as the directory appears.
        let res = fs::write(root.join("export"), line.to_string());
        if !dir.exists() {
            let reason = match res {
                Ok(()) => "export did not create line directory".to_string(),
                Err(e) => e.to_string(),
            };
            return Err(HalError::line(line, reason));
        }
        debug!("exported gpio{line}");
    }
    Ok(dir)
}

fn set_direction(dir: &Path, line: u32, direction: &str) -> Result<(), HalError> {
    fs::write(dir.join("direction"), direction).map_err(|e| HalError::line(line, e))
}

fn read_value(dir: &Path, line: u32) -> Result<bool, HalError> {
    let text = fs::read_to_string(dir.join("value")).map_err(|e| HalError::line(line, e))?;
    match text.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(HalError::line(line, format!("unexpected value {other:?}"))),
    }
}

/// sysfs input line.
pub struct SysfsInput {
    line: u32,
    dir: PathBuf,
}

impl SysfsInput {
    /// Export and configure `line` as an input.
    pub fn open(root: &Path, line: u32) -> Result<Self, HalError> {
        let dir = export(root, line)?;
        set_direction(&dir, line, "in")?;
        Ok(Self { line, dir })
    }
}

impl DigitalInput for SysfsInput {
    fn line(&self) -> u32 {
        self.line
    }

    fn read(&self) -> Result<bool, HalError> {
        read_value(&self.dir, self.line)
    }
}

/// sysfs output line.
pub struct SysfsOutput {
    line: u32,
    dir: PathBuf,
}

impl SysfsOutput {
    /// Export and configure `line` as an output driven LOW.
    pub fn open(root: &Path, line: u32) -> Result<Self, HalError> {
        let dir = export(root, line)?;
        set_direction(&dir, line, "low")?;
        let out = Self { line, dir };
        out.write(false)?;
        Ok(out)
    }
}

impl DigitalOutput for SysfsOutput {
    fn line(&self) -> u32 {
        self.line
    }

    fn write(&self, high: bool) -> Result<(), HalError> {
        fs::write(self.dir.join("value"), if high { "1" } else { "0" })
            .map_err(|e| HalError::line(self.line, e))
    }

    fn read_back(&self) -> Result<bool, HalError> {
        read_value(&self.dir, self.line)
    }
}
