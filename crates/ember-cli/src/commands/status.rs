//! /status command - show conversation info

use ember_chat::{Conversation, MessageStatus, TranscriptStore};

pub struct StatusCommand;

impl StatusCommand {
    pub fn execute(conversation: &Conversation, store: &TranscriptStore, server_url: &str) -> String {
        let messages = conversation.messages();
        let count = |status: MessageStatus| messages.iter().filter(|m| m.status == status).count();
        let user_msgs = messages.iter().filter(|m| m.is_user()).count();

        let mut output = String::from("Conversation\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("Server:      {}\n", server_url));
        output.push_str(&format!("Transcripts: {}\n", store.dir().display()));
        output.push_str(&format!("State:       {}\n", conversation.state()));
        output.push('\n');
        output.push_str(&format!("Messages:    {} total\n", messages.len()));
        output.push_str(&format!(
            "             {} user, {} assistant\n",
            user_msgs,
            messages.len() - user_msgs
        ));
        let partial = count(MessageStatus::Partial);
        let failed = count(MessageStatus::Failed);
        if partial + failed > 0 {
            output.push_str(&format!(
                "             {} partial, {} failed\n",
                partial, failed
            ));
        }
        output
    }
}
