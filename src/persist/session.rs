//! Session file locations.
//!
//! Sessions are laid out as `<base>/<YYYY-MM-DD>/session_<HHMMSS>.json`.

use chrono::{Local, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};

/// Wall-clock time used for naming a session.
///
/// Uses `tz` when given, otherwise the host's local time zone.
pub fn session_now(tz: Option<Tz>) -> NaiveDateTime {
    match tz {
        Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
        None => Local::now().naive_local(),
    }
}

/// Path of the session file started at `now`. Does not touch the filesystem.
pub fn session_file_path(base: &Path, now: NaiveDateTime) -> PathBuf {
    base.join(now.format("%Y-%m-%d").to_string())
        .join(format!("session_{}.json", now.format("%H%M%S")))
}

/// Resolve the session file for `now`, creating the date directory (and `base`)
/// if needed.
pub fn create_session_path(base: &Path, now: NaiveDateTime) -> std::io::Result<PathBuf> {
    let path = session_file_path(base, now);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(path)
}
