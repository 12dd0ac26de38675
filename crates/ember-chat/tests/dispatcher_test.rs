use std::sync::Arc;

use async_trait::async_trait;
use ember_chat::{ChatEvent, ChatState, Dispatcher, Error, MessageStatus, Role};
use ember_stream::frame::{encode_data, encode_error};
use ember_stream::{ByteStream, FailureReason, Termination, Transport};
use tokio::sync::Mutex;

/// Replays canned responses, one per request
struct ScriptedTransport {
    responses: Mutex<Vec<Response>>,
    prompts: Mutex<Vec<String>>,
}

enum Response {
    Refused(u16, &'static str),
    Chunks(Vec<Result<Vec<u8>, &'static str>>),
}

impl ScriptedTransport {
    fn new(responses: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, prompt: &str) -> ember_stream::Result<ByteStream> {
        self.prompts.lock().await.push(prompt.to_string());
        let response = self.responses.lock().await.remove(0);
        match response {
            Response::Refused(status, body) => Err(ember_stream::Error::status(status, body)),
            Response::Chunks(chunks) => {
                let chunks = chunks.into_iter().map(|c| {
                    c.map_err(|e| ember_stream::Error::InvalidConfig(e.to_string()))
                });
                Ok(Box::pin(futures::stream::iter(chunks.collect::<Vec<_>>())))
            }
        }
    }
}

fn ok(s: &str) -> Result<Vec<u8>, &'static str> {
    Ok(s.as_bytes().to_vec())
}

#[tokio::test]
async fn test_clean_completion() {
    let wire = encode_data("4").unwrap();
    let transport = ScriptedTransport::new(vec![Response::Chunks(vec![ok(&wire)])]);
    let mut dispatcher = Dispatcher::new(transport.clone());

    let report = dispatcher.send("What is 2+2?").await.unwrap();
    assert_eq!(report.termination, Termination::Completed);
    assert_eq!(report.fragments, 1);
    assert!(!report.server_unavailable);

    let messages = dispatcher.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "4");
    assert_eq!(messages[1].status, MessageStatus::Complete);
    assert!(dispatcher.conversation().is_idle());
    assert_eq!(*transport.prompts.lock().await, vec!["What is 2+2?"]);
}

#[tokio::test]
async fn test_partial_preserved_on_transport_fault() {
    let wire = format!("{}{}", encode_data("Hel").unwrap(), encode_data("lo").unwrap());
    let transport = ScriptedTransport::new(vec![Response::Chunks(vec![
        ok(&wire[..7]),
        ok(&wire[7..]),
        Err("connection reset"),
    ])]);
    let mut dispatcher = Dispatcher::new(transport);

    let report = dispatcher.send("Say hello").await.unwrap();
    assert!(matches!(
        report.termination,
        Termination::Failed(FailureReason::Transport(_))
    ));

    let messages = &dispatcher.conversation().messages()[1..];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[0].status, MessageStatus::Partial);
    assert_eq!(messages[1].status, MessageStatus::Failed);
    assert!(messages[1].content.contains("connection reset"));
}

#[tokio::test]
async fn test_truncated_stream() {
    let transport = ScriptedTransport::new(vec![Response::Chunks(vec![
        ok("data: The answer\n\ndata: is 4"),
    ])]);
    let mut dispatcher = Dispatcher::new(transport);

    let report = dispatcher.send("?").await.unwrap();
    assert_eq!(report.termination, Termination::Failed(FailureReason::Truncated));
    let messages = dispatcher.conversation().messages();
    assert_eq!(messages[1].content, "The answer");
    assert_eq!(messages[1].status, MessageStatus::Partial);
    assert!(messages[2].is_failed());
}

#[tokio::test]
async fn test_error_frame() {
    let wire = format!("{}{}", encode_data("x").unwrap(), encode_error("model crashed"));
    let transport = ScriptedTransport::new(vec![Response::Chunks(vec![ok(&wire)])]);
    let mut dispatcher = Dispatcher::new(transport);

    let report = dispatcher.send("go").await.unwrap();
    assert_eq!(
        report.termination,
        Termination::Failed(FailureReason::Remote("model crashed".into()))
    );
    let last = dispatcher.conversation().messages().last().unwrap();
    assert!(last.is_failed());
    assert!(last.content.contains("model crashed"));
}

#[tokio::test]
async fn test_refused_request_has_no_partial() {
    let transport = ScriptedTransport::new(vec![Response::Refused(
        503,
        r#"{"detail":"Model not ready"}"#,
    )]);
    let mut dispatcher = Dispatcher::new(transport);

    let report = dispatcher.send("hi").await.unwrap();
    assert_eq!(report.fragments, 0);
    assert!(report.server_unavailable);
    let messages = dispatcher.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].status, MessageStatus::Failed);
    assert!(messages[1].content.contains("Model not ready"));
    assert!(dispatcher.conversation().is_idle());
}

#[tokio::test]
async fn test_empty_response() {
    let transport = ScriptedTransport::new(vec![Response::Chunks(vec![])]);
    let mut dispatcher = Dispatcher::new(transport);

    let report = dispatcher.send("hi").await.unwrap();
    assert_eq!(report.termination, Termination::Empty);
    let messages = dispatcher.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].status, MessageStatus::Complete);
    assert_eq!(messages[1].content, "");
}

#[tokio::test]
async fn test_blank_prompt_is_usage_error() {
    let transport = ScriptedTransport::new(vec![]);
    let mut dispatcher = Dispatcher::new(transport.clone());
    assert!(matches!(dispatcher.send("   ").await, Err(Error::EmptyPrompt)));
    assert!(transport.prompts.lock().await.is_empty());
}

#[tokio::test]
async fn test_send_rejected_while_busy() {
    let transport = ScriptedTransport::new(vec![]);
    let mut dispatcher = Dispatcher::new(transport.clone());
    dispatcher.conversation_mut().submit("in flight").unwrap();

    let err = dispatcher.send("second").await.unwrap_err();
    assert!(matches!(
        err,
        Error::RejectedState {
            state: ChatState::Submitting,
            ..
        }
    ));
    assert!(transport.prompts.lock().await.is_empty());
    assert_eq!(dispatcher.conversation().messages().len(), 1);
}

#[tokio::test]
async fn test_sequential_exchanges_alternate_roles() {
    let transport = ScriptedTransport::new(vec![
        Response::Chunks(vec![ok(&encode_data("4").unwrap())]),
        Response::Chunks(vec![ok(&encode_data("Paris").unwrap())]),
    ]);
    let mut dispatcher = Dispatcher::new(transport);
    dispatcher.send("2+2?").await.unwrap();
    dispatcher.send("Capital of France?").await.unwrap();

    let roles: Vec<_> = dispatcher
        .conversation()
        .messages()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_previews_track_fragments() {
    let wire = format!(
        "{}{}{}",
        encode_data("The").unwrap(),
        encode_data(" answer").unwrap(),
        encode_data(" is 4").unwrap()
    );
    let transport = ScriptedTransport::new(vec![Response::Chunks(vec![ok(&wire)])]);
    let mut dispatcher = Dispatcher::new(transport);
    let mut rx = dispatcher.subscribe();

    dispatcher.send("?").await.unwrap();

    let mut previews = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ChatEvent::Preview { content, .. } = event {
            previews.push(content);
        }
    }
    assert_eq!(previews, vec!["The", "The answer", "The answer is 4"]);
}
