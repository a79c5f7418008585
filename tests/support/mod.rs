use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use taskdeck::record::Schedule;

/// Scratch directory holding a snapshot file and, optionally, a config
pub struct TestDeck {
    dir: TempDir,
}

impl TestDeck {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.path().join("tasks.csv")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file(".taskdeck.toml", contents)
    }

    pub fn read_snapshot(&self) -> std::io::Result<String> {
        fs::read_to_string(self.snapshot_path())
    }

    /// `taskdeck` running inside this directory with a clean environment
    pub fn cmd(&self) -> Command {
        let mut cmd = taskdeck_cmd();
        cmd.current_dir(self.path());
        cmd
    }
}

pub fn taskdeck_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskdeck").expect("binary");
    cmd.env_remove("TASKDECK_FILE")
        .env_remove("TASKDECK_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// 2024-10-21 at the given hour and minute
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 10, 21)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid time")
}

pub fn slot(hour: u32, minute: u32, minutes: i64) -> Schedule {
    Schedule::new(at(hour, minute), Duration::minutes(minutes)).expect("valid schedule")
}
