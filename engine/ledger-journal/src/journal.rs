//! Append-only journal of store mutations
//!
//! Every mutation is written as one JSON line before it is applied in memory.
//! Files are named after the first sequence number they hold and rotate once
//! they grow past `max_file_size`.

use crate::config::JournalConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use roster_ledger::{Result, StoreError, StoreMutation};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const EXTENSION: &str = "jsonl";

/// A single journal line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub mutation: StoreMutation,
}

struct JournalFile {
    writer: BufWriter<File>,
    size: u64,
}

struct JournalState {
    sequence: u64,
    current: Option<JournalFile>,
}

/// Journal writer
pub struct Journal {
    config: JournalConfig,
    dir: PathBuf,
    state: Mutex<JournalState>,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("dir", &self.dir)
            .field("sequence", &self.state.lock().sequence)
            .finish()
    }
}

impl Journal {
    /// Open the journal directory, returning the writer and every entry already on disk
    pub fn open(config: JournalConfig) -> Result<(Self, Vec<JournalEntry>)> {
        config.validate().map_err(StoreError::invalid_operation)?;

        let dir = config.journal_dir();
        std::fs::create_dir_all(&dir)?;

        let entries = read_entries(&dir)?;
        let sequence = entries.last().map_or(0, |e| e.sequence);

        tracing::info!(dir = ?dir, entries = entries.len(), sequence, "journal opened");

        let journal =
            Self { config, dir, state: Mutex::new(JournalState { sequence, current: None }) };
        Ok((journal, entries))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sequence number of the last written entry
    pub fn sequence(&self) -> u64 {
        self.state.lock().sequence
    }

    /// Write one mutation; returns its sequence number once it is on disk
    pub fn append(&self, mutation: &StoreMutation) -> Result<u64> {
        let mut state = self.state.lock();
        let sequence = state.sequence + 1;

        let entry = JournalEntry {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            mutation: mutation.clone(),
        };
        let json = serde_json::to_string(&entry)?;

        if state.current.is_none() {
            state.current = Some(self.create_file(sequence)?);
        }
        if let Some(file) = state.current.as_mut() {
            writeln!(file.writer, "{json}")?;
            file.writer.flush()?;
            if self.config.fsync_every_write {
                file.writer.get_ref().sync_data()?;
            }
            file.size += json.len() as u64 + 1;

            // Rotate
            if file.size >= self.config.max_file_size {
                state.current = None;
            }
        }

        state.sequence = sequence;
        tracing::trace!(sequence, op = mutation.name(), "journal entry written");
        Ok(sequence)
    }

    /// Flush and sync the current file
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(file) = state.current.as_mut() {
            file.writer.flush()?;
            file.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn create_file(&self, first_sequence: u64) -> Result<JournalFile> {
        let suffix = Uuid::new_v4().simple();
        let path = self.dir.join(format!("journal_{first_sequence:016x}_{suffix}.{EXTENSION}"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = ?path, "journal file opened");
        Ok(JournalFile { writer: BufWriter::new(file), size: 0 })
    }
}

fn journal_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some(EXTENSION) {
            files.push(path);
        }
    }
    // Zero-padded hex names sort by first sequence
    files.sort();
    Ok(files)
}

/// Read every entry in sequence order
///
/// A torn last line of a file (crash mid-write) is dropped; any other
/// unreadable line or a gap in the sequence is corruption.
pub fn read_entries(dir: &Path) -> Result<Vec<JournalEntry>> {
    let files = journal_files(dir)?;
    let mut entries: Vec<JournalEntry> = Vec::new();

    for path in &files {
        let lines: Vec<String> =
            BufReader::new(File::open(path)?).lines().collect::<std::io::Result<_>>()?;

        for (line_index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => {
                    let expected = entries.last().map_or(entry.sequence, |e| e.sequence + 1);
                    if entry.sequence != expected {
                        return Err(StoreError::corruption(format!(
                            "{}: expected sequence {expected}, found {}",
                            path.display(),
                            entry.sequence
                        )));
                    }
                    entries.push(entry);
                }
                Err(e) if line_index + 1 == lines.len() => {
                    tracing::warn!(path = ?path, error = %e, "dropping torn journal tail");
                }
                Err(e) => {
                    return Err(StoreError::corruption(format!(
                        "{}:{}: {e}",
                        path.display(),
                        line_index + 1
                    )));
                }
            }
        }
    }

    Ok(entries)
}
