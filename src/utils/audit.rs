//! Session audit log.
//!
//! Every event is appended to `session_<stamp>_<session>.txt` as
//! `[YYYY-mm-dd HH:MM:SS] message`, mirrored to the `log` facade and echoed
//! to the console.

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Success,
    Warn,
    Error,
}

pub struct AuditLog {
    path: PathBuf,
    file: File,
    echo: bool,
}

/// `[YYYY-mm-dd HH:MM:SS] message`
pub fn format_line(timestamp: &chrono::DateTime<Local>, message: &str) -> String {
    format!("[{}] {}", timestamp.format("%Y-%m-%d %H:%M:%S"), message)
}

impl AuditLog {
    /// Create the log directory and open a fresh file for this session
    pub fn create(dir: &Path, session: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let name = format!(
            "session_{}_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S"),
            session
        );
        let path = dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        Ok(Self {
            path,
            file,
            echo: true,
        })
    }

    /// Keep writing the file but stop echoing to the console
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, level: AuditLevel, message: &str) {
        let line = format_line(&Local::now(), message);
        if let Err(e) = writeln!(self.file, "{}", line) {
            log::warn!("Audit log write failed: {}", e);
        }
        match level {
            AuditLevel::Info | AuditLevel::Success => log::info!("{}", message),
            AuditLevel::Warn => log::warn!("{}", message),
            AuditLevel::Error => log::error!("{}", message),
        }
        if self.echo {
            let marker = match level {
                AuditLevel::Info => "•".cyan(),
                AuditLevel::Success => "✅".green(),
                AuditLevel::Warn => "⚠️".yellow(),
                AuditLevel::Error => "❌".red(),
            };
            println!("{} {}", marker, message);
        }
    }

    pub fn info(&mut self, message: &str) {
        self.record(AuditLevel::Info, message);
    }

    pub fn success(&mut self, message: &str) {
        self.record(AuditLevel::Success, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.record(AuditLevel::Warn, message);
    }

    pub fn error(&mut self, message: &str) {
        self.record(AuditLevel::Error, message);
    }
}
