//! Event output for the terminal

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use scanwatch_watcher::{EventKind, FileEvent, Fingerprint};

/// Writes one line per event to stdout
pub struct EventPrinter {
    root: PathBuf,
    json: bool,
}

impl EventPrinter {
    pub fn new(root: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            root: root.into(),
            json,
        }
    }

    pub fn print(&self, event: &FileEvent) -> Result<()> {
        let line = if self.json {
            serde_json::to_string(event).context("Failed to encode event")?
        } else {
            self.format_human(event)
        };

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line).context("Failed to write event")?;
        stdout.flush()?;
        Ok(())
    }

    fn format_human(&self, event: &FileEvent) -> String {
        let path = event.relative_path(&self.root).display();

        match event.kind {
            EventKind::Created => format!(
                "{} {} {}",
                "created".green(),
                path,
                short(event.current).dimmed()
            ),
            EventKind::Updated => format!(
                "{} {} {} -> {}",
                "updated".yellow(),
                path,
                short(event.previous).dimmed(),
                short(event.current).dimmed()
            ),
            EventKind::Deleted => format!("{} {}", "deleted".red(), path),
        }
    }
}

fn short(fingerprint: Option<Fingerprint>) -> String {
    fingerprint.map(|fp| fp.short()).unwrap_or_else(|| "-".to_string())
}
