//! /save, /load, /list, /delete - transcript storage commands

use ember_chat::{Conversation, TranscriptStore};

use crate::ui;

pub struct TranscriptCommand;

impl TranscriptCommand {
    pub fn save(store: &TranscriptStore, conversation: &Conversation, name: Option<&str>) -> String {
        if conversation.messages().is_empty() {
            return "Nothing to save yet.".to_string();
        }
        match store.save(conversation.messages(), name) {
            Ok(name) => format!(
                "Saved {} messages as '{}' in {}",
                conversation.messages().len(),
                name,
                store.dir().display()
            ),
            Err(e) => format!("Error saving transcript: {}", e),
        }
    }

    pub fn load(store: &TranscriptStore, conversation: &mut Conversation, name: &str) -> String {
        let messages = match store.load(name) {
            Ok(messages) => messages,
            Err(e) => return format!("Error loading transcript: {}", e),
        };
        let count = messages.len();
        let rendered = ui::render_transcript(&messages);
        match conversation.replace_transcript(messages) {
            Ok(()) => format!("{}\nLoaded '{}' ({} messages)", rendered, name, count),
            Err(e) => format!("Error loading transcript: {}", e),
        }
    }

    pub fn list(store: &TranscriptStore) -> String {
        let summaries = match store.list() {
            Ok(summaries) => summaries,
            Err(e) => return format!("Error listing transcripts: {}", e),
        };
        if summaries.is_empty() {
            return format!("No saved transcripts in {}", store.dir().display());
        }

        let mut output = String::from("Saved transcripts\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        for s in summaries {
            output.push_str(&format!(
                "{}  {:<24} {:>3} msgs  {}\n",
                s.last_modified_display(),
                s.name,
                s.message_count,
                s.preview
            ));
        }
        output
    }

    pub fn delete(store: &TranscriptStore, name: &str) -> String {
        match store.delete(name) {
            Ok(()) => format!("Deleted '{}'", name),
            Err(e) => format!("Error deleting transcript: {}", e),
        }
    }
}
