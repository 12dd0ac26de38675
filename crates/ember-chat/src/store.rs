//! Saving and loading transcripts as JSON documents

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::message::Message;

/// File extension of stored transcripts
pub const EXTENSION: &str = "json";

const PREVIEW_CHARS: usize = 60;

/// Listing entry for a stored transcript
#[derive(Debug, Clone, PartialEq)]
pub struct SavedTranscriptSummary {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
}

impl SavedTranscriptSummary {
    /// Format the modification time for display
    pub fn last_modified_display(&self) -> String {
        self.last_modified
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// Transcript documents stored in one directory.
///
/// Writers do not coordinate: saving under an existing name overwrites it.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a transcript, naming it after the current time when no name is given.
    /// Returns the name it was stored under.
    pub fn save(&self, transcript: &[Message], name: Option<&str>) -> Result<String> {
        self.save_at(transcript, name, Utc::now())
    }

    /// Like [`save`](Self::save), with the timestamp used for default naming supplied
    pub fn save_at(
        &self,
        transcript: &[Message],
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let name = match name {
            Some(name) => validate_name(name)?,
            None => default_name(now),
        };

        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(transcript)?;
        fs::write(self.path_for(&name), content)?;

        tracing::debug!("Saved {} messages as '{}'", transcript.len(), name);
        Ok(name)
    }

    /// Load a stored transcript
    pub fn load(&self, name: &str) -> Result<Vec<Message>> {
        let name = validate_name(name)?;
        let content = match fs::read_to_string(self.path_for(&name)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::NotFound(name)),
            Err(e) => return Err(e.into()),
        };
        parse_document(&content).map_err(|e| Error::CorruptData {
            name,
            reason: e.to_string(),
        })
    }

    /// List stored transcripts, most recently modified first.
    ///
    /// Unreadable entries and documents that fail to parse are skipped.
    pub fn list(&self) -> Result<Vec<SavedTranscriptSummary>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let entries = fs::read_dir(&self.dir)?.map(|entry| entry.map(|e| e.path()));
        Ok(summarize(entries))
    }

    /// Delete a stored transcript
    pub fn delete(&self, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        match fs::remove_file(self.path_for(&name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(name)),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }
}

/// Summaries of the transcript files among `entries`, most recent first.
/// Entries that cannot be read or parsed are skipped with a warning.
fn summarize(
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
) -> Vec<SavedTranscriptSummary> {
    let mut summaries = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        if path.extension().and_then(|s| s.to_str()) != Some(EXTENSION) {
            continue;
        }
        match read_summary(&path) {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::warn!("Skipping transcript {}: {}", path.display(), e),
        }
    }

    summaries.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}

fn parse_document(content: &str) -> serde_json::Result<Vec<Message>> {
    serde_json::from_str(content)
}

fn read_summary(path: &Path) -> Result<SavedTranscriptSummary> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidName(path.display().to_string()))?
        .to_string();
    let last_modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
    let content = fs::read_to_string(path)?;
    let messages = parse_document(&content).map_err(|e| Error::CorruptData {
        name: name.clone(),
        reason: e.to_string(),
    })?;

    Ok(SavedTranscriptSummary {
        name,
        last_modified,
        message_count: messages.len(),
        preview: preview(&messages),
    })
}

/// First user prompt (or first message), flattened to one line and shortened
fn preview(messages: &[Message]) -> String {
    let Some(message) = messages
        .iter()
        .find(|m| m.is_user())
        .or_else(|| messages.first())
    else {
        return String::new();
    };
    let flat = message.content.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = flat.chars();
    let truncated: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Name used when saving without one
pub fn default_name(now: DateTime<Utc>) -> String {
    now.format("chat-%Y%m%d-%H%M%S").to_string()
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    let name = name
        .strip_suffix(&format!(".{}", EXTENSION))
        .unwrap_or(name);
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.chars().any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());
    if invalid {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(name.to_string())
}
