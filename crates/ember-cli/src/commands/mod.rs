//! Slash commands for interactive mode

mod status;
mod transcript;

pub use status::StatusCommand;
pub use transcript::TranscriptCommand;

/// Result of parsing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Start a new conversation
    New,
    /// Save the transcript, optionally under a name
    Save(Option<String>),
    /// Replace the transcript with a saved one
    Load(String),
    /// List saved transcripts
    List,
    /// Delete a saved transcript
    Delete(String),
    /// Show conversation status
    Status,
    /// Show a message to the user
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command. Returns `None` if `input` is a prompt.
pub fn parse_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "clear" | "c" => CommandResult::New,

        "save" | "s" => CommandResult::Save(non_empty(args)),

        "load" | "l" => match non_empty(args) {
            Some(name) => CommandResult::Load(name),
            None => CommandResult::Message("Usage: /load <name>".to_string()),
        },

        "list" | "ls" => CommandResult::List,

        "delete" | "rm" => match non_empty(args) {
            Some(name) => CommandResult::Delete(name),
            None => CommandResult::Message("Usage: /delete <name>".to_string()),
        },

        "status" => CommandResult::Status,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn non_empty(args: &str) -> Option<String> {
    if args.is_empty() {
        None
    } else {
        Some(args.to_string())
    }
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /clear, /c     Start a new conversation
  /save, /s [name]     Save the transcript (named after the current time if omitted)
  /load, /l <name>     Replace the conversation with a saved transcript
  /list, /ls           List saved transcripts, newest first
  /delete, /rm <name>  Delete a saved transcript
  /status              Show conversation and server info
  /quit, /exit, /q     Exit ember

Anything else is sent to the server as a prompt. Each prompt is answered
on its own; earlier messages are not sent along."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_not_a_command() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("what is 1/2?"), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/new"), Some(CommandResult::New));
        assert_eq!(parse_command("  /Q "), Some(CommandResult::Exit));
        assert_eq!(parse_command("/save"), Some(CommandResult::Save(None)));
        assert_eq!(
            parse_command("/save   my chat "),
            Some(CommandResult::Save(Some("my chat".into())))
        );
        assert_eq!(
            parse_command("/load math"),
            Some(CommandResult::Load("math".into()))
        );
        assert_eq!(parse_command("/ls"), Some(CommandResult::List));
        assert_eq!(
            parse_command("/rm old"),
            Some(CommandResult::Delete("old".into()))
        );
        assert_eq!(parse_command("/status"), Some(CommandResult::Status));
    }

    #[test]
    fn test_missing_arguments() {
        assert!(matches!(
            parse_command("/load"),
            Some(CommandResult::Message(m)) if m.contains("Usage")
        ));
        assert!(matches!(
            parse_command("/delete  "),
            Some(CommandResult::Message(m)) if m.contains("Usage")
        ));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            parse_command("/frobnicate now"),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }
}
