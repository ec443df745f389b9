//! Outcome spool - JSON lines, one service message per line

use anyhow::{Context, Result};
use grantflow_core::ServiceMessage;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const SPOOL_FILE: &str = "outcomes.jsonl";

pub struct OutcomeSpool {
    dir: PathBuf,
}

impl OutcomeSpool {
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME not set")?;
        Self::with_dir(PathBuf::from(home).join(".grantflow"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn file(&self) -> PathBuf {
        self.dir.join(SPOOL_FILE)
    }

    pub fn append(&self, message: &ServiceMessage) -> Result<()> {
        let path = self.file();
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let line = serde_json::to_string(message)?;
        writeln!(f, "{}", line)?;
        f.flush()?;
        Ok(())
    }

    /// All spooled messages, oldest first
    pub fn load(&self) -> Result<Vec<ServiceMessage>> {
        let path = self.file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut messages = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let m: ServiceMessage = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}", path.display(), i + 1))?;
            messages.push(m);
        }
        Ok(messages)
    }

    pub fn latest(&self) -> Result<Option<ServiceMessage>> {
        Ok(self.load()?.pop())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.file();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}
