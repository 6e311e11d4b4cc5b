// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log: JSON-lines redo log for store mutations.
//!
//! Every record is appended before the mutating call returns; recovery
//! replays `entries_after(snapshot_seq)` on top of the latest snapshot.
//! A corrupt tail (torn write, bad disk) is quarantined to a `.bak` file
//! and the valid prefix is preserved.

use crate::records::StoreRecord;
use crate::snapshot::rotate_bak_path;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One durable log line: global sequence plus the mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    #[serde(flatten)]
    pub record: StoreRecord,
}

/// Append-only JSON-lines log.
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
}

impl Wal {
    /// Open (or create) the log at `path`.
    ///
    /// Scans existing content; a corrupt or binary tail rotates the original
    /// file to `.bak` and rewrites only the valid prefix.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let (entries, corrupt) = match std::fs::read(path) {
            Ok(bytes) => parse_entries(&bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => (Vec::new(), false),
            Err(err) => return Err(err.into()),
        };

        if corrupt {
            let bak = rotate_bak_path(path);
            tracing::warn!(
                path = %path.display(),
                bak = %bak.display(),
                kept = entries.len(),
                "corrupt log tail; quarantining original"
            );
            std::fs::rename(path, &bak)?;
            let mut clean = BufWriter::new(File::create(path)?);
            for entry in &entries {
                write_line(&mut clean, entry)?;
            }
            clean.flush()?;
        }

        let write_seq = entries.last().map(|entry| entry.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            write_seq,
        })
    }

    /// Append a record; returns its assigned sequence. Not durable until
    /// [`Wal::flush`].
    pub fn append(&mut self, record: &StoreRecord) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = WalEntry {
            seq: self.write_seq,
            record: record.clone(),
        };
        write_line(&mut self.writer, &entry)?;
        Ok(self.write_seq)
    }

    /// Flush buffered entries and sync to disk.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Highest sequence ever written.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// All entries with `seq > after`, stopping at any corruption.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let bytes = std::fs::read(&self.path)?;
        let (entries, _) = parse_entries(&bytes);
        Ok(entries
            .into_iter()
            .filter(|entry| entry.seq > after)
            .collect())
    }

    /// Drop entries with `seq < keep_from`, rewriting the log in place.
    /// Called after a snapshot makes the prefix redundant.
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<(), WalError> {
        self.writer.flush()?;
        let bytes = std::fs::read(&self.path)?;
        let (entries, _) = parse_entries(&bytes);

        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for entry in entries.iter().filter(|entry| entry.seq >= keep_from) {
                write_line(&mut writer, entry)?;
            }
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }
        std::fs::rename(&tmp, &self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}

/// Parse the valid prefix of a log file. Returns the entries and whether
/// trailing corruption was found.
fn parse_entries(bytes: &[u8]) -> (Vec<WalEntry>, bool) {
    let mut entries = Vec::new();
    for line in bytes.split(|b| *b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let parsed = std::str::from_utf8(line)
            .ok()
            .and_then(|text| serde_json::from_str::<WalEntry>(text).ok());
        match parsed {
            Some(entry) => entries.push(entry),
            None => return (entries, true),
        }
    }
    (entries, false)
}

fn write_line(writer: &mut BufWriter<File>, entry: &WalEntry) -> Result<(), WalError> {
    let line = serde_json::to_string(entry)?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
