//! Unit tests for command execution and suggestions.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::json;
use texedit_link::test_support::{ScriptedReply, ScriptedTransport};
use texedit_link::{ConnectionState, MonitorSettings};
use tokio::sync::broadcast::Receiver;

use super::*;

fn settings() -> MonitorSettings {
    MonitorSettings::new(Duration::from_secs(1), Duration::from_secs(6), 15)
}

fn offline_dispatcher() -> (CommandDispatcher, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::unhealthy());
    let monitor = ConnectivityMonitor::new(transport.clone(), settings());
    (CommandDispatcher::new(monitor), transport)
}

async fn connected_dispatcher() -> (CommandDispatcher, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::healthy());
    let monitor = ConnectivityMonitor::new(transport.clone(), settings());
    monitor.start_monitoring();
    monitor
        .wait_until_ready(Duration::from_secs(5))
        .await
        .expect("scripted backend becomes ready");
    monitor.stop_monitoring();
    (CommandDispatcher::new(monitor), transport)
}

fn drain(events: &mut Receiver<DispatcherEvent>) -> Vec<DispatcherEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

fn completed(command: &str, result: CommandResult, output: &str) -> DispatcherEvent {
    DispatcherEvent::CommandExecuted {
        command: command.to_owned(),
        result,
        output: output.to_owned(),
    }
}

#[fixture]
fn offline() -> (CommandDispatcher, Arc<ScriptedTransport>) {
    offline_dispatcher()
}

#[rstest]
#[tokio::test]
async fn offline_only_local_commands_are_valid(
    offline: (CommandDispatcher, Arc<ScriptedTransport>),
) {
    let (dispatcher, _) = offline;
    assert_eq!(dispatcher.valid_commands(), ["clear", "help"]);
    assert_eq!(dispatcher.all_commands().len(), 7);
}

#[tokio::test]
async fn connected_every_command_is_valid() {
    let (dispatcher, _) = connected_dispatcher().await;
    assert_eq!(dispatcher.valid_commands(), dispatcher.all_commands());
}

#[rstest]
#[case::exact_name("help", true)]
#[case::unknown("nonsense", false)]
#[case::summarise_with_percentage("summarise 30", true)]
#[case::summarise_out_of_range("summarise 150", false)]
#[case::mixed_case("Rewrite", true)]
#[case::blank("", false)]
#[tokio::test]
async fn validates_command_text(
    offline: (CommandDispatcher, Arc<ScriptedTransport>),
    #[case] text: &str,
    #[case] expected: bool,
) {
    let (dispatcher, _) = offline;
    assert_eq!(dispatcher.is_command_valid(text), expected);
}

#[rstest]
#[tokio::test]
async fn command_info_uses_none_for_unknown(offline: (CommandDispatcher, Arc<ScriptedTransport>)) {
    let (dispatcher, _) = offline;
    let tone = dispatcher.command_info("tone").expect("tone is registered");
    assert!(tone.requires_server);
    assert!(dispatcher.command_info("nope").is_none());
}

#[rstest]
#[tokio::test]
async fn help_lists_every_command_with_availability(
    offline: (CommandDispatcher, Arc<ScriptedTransport>),
) {
    let (dispatcher, _) = offline;
    let mut events = dispatcher.subscribe();

    let output = dispatcher
        .execute_command("help", "")
        .await
        .expect("help runs offline");

    assert!(output.starts_with("Available commands:\n\n"));
    assert!(output.contains("[x] clear - Clear the input text"));
    assert!(output.contains("[ ] tone - "));
    assert_eq!(output.lines().count(), 9);
    assert_eq!(
        drain(&mut events),
        vec![
            DispatcherEvent::ExecutionStateChanged(ExecutionState::Executing),
            DispatcherEvent::ExecutionStateChanged(ExecutionState::Idle),
            completed("help", CommandResult::Success, &output),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn clear_confirms(offline: (CommandDispatcher, Arc<ScriptedTransport>)) {
    let (dispatcher, _) = offline;
    let output = dispatcher.execute_command("clear", "").await;
    assert_eq!(output.ok().as_deref(), Some("Input cleared"));
}

#[rstest]
#[tokio::test]
async fn server_command_offline_is_a_server_error(
    offline: (CommandDispatcher, Arc<ScriptedTransport>),
) {
    let (dispatcher, transport) = offline;
    let mut events = dispatcher.subscribe();

    let error = dispatcher
        .execute_command("tone", "hello")
        .await
        .expect_err("backend is offline");

    assert_eq!(error.result(), CommandResult::ServerError);
    assert!(error.to_string().contains("server not available for requests"));
    assert!(transport.requests().is_empty());
    assert!(!dispatcher.is_executing());
    assert_eq!(
        drain(&mut events).last(),
        Some(&completed("tone", CommandResult::ServerError, &error.to_string()))
    );
}

#[rstest]
#[case::unknown("frobnicate")]
#[case::bad_percentage("summarise 0")]
#[case::blank("   ")]
#[tokio::test]
async fn unparseable_text_is_invalid(
    offline: (CommandDispatcher, Arc<ScriptedTransport>),
    #[case] text: &str,
) {
    let (dispatcher, _) = offline;
    let error = dispatcher
        .execute_command(text, "input")
        .await
        .expect_err("text does not parse");
    assert_eq!(error.result(), CommandResult::InvalidCommand);
    assert_eq!(dispatcher.execution_state(), ExecutionState::Idle);
}

#[tokio::test]
async fn server_command_requires_input() {
    let (dispatcher, transport) = connected_dispatcher().await;

    let error = dispatcher
        .execute_command("keywords", "  \n ")
        .await
        .expect_err("input is blank");

    assert_eq!(error.result(), CommandResult::ValidationError);
    assert_eq!(error.to_string(), "command 'keywords' requires input text");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn server_command_posts_input_and_formats_result() {
    let (dispatcher, transport) = connected_dispatcher().await;
    transport.push_reply(
        "/api/tone",
        ScriptedReply::json(&json!({"result": "Good afternoon."})),
    );

    let output = dispatcher
        .execute_command("Tone formal", "hiya")
        .await
        .expect("tone succeeds");

    assert_eq!(output, "Good afternoon.");
    let requests = transport.requests();
    let request = requests.first().expect("one request sent");
    assert_eq!(request.endpoint, "/api/tone");
    assert_eq!(request.body["text"], "hiya");
    assert!(request.body["timestamp"].as_u64().is_some_and(|seconds| seconds > 0));
}

#[tokio::test]
async fn summarise_sends_ratio_bounds() {
    let (dispatcher, transport) = connected_dispatcher().await;
    transport.push_reply(
        "/api/summarise",
        ScriptedReply::json(&json!({
            "summary": "Brief.",
            "original_length": 40,
            "summary_length": 20,
            "compression_ratio": 0.5,
        })),
    );

    let output = dispatcher
        .execute_command("summarize 50", "A long text.")
        .await
        .expect("summarise succeeds");

    assert!(output.starts_with("Brief.\n\nSummary stats:"));
    let requests = transport.requests();
    let body = &requests.first().expect("one request sent").body;
    assert_eq!(body["ratio"], json!(0.5));
    assert!(body.get("min_ratio").is_some());
    assert!(body.get("max_ratio").is_some());
}

#[tokio::test]
async fn transport_failure_is_a_server_error() {
    let (dispatcher, transport) = connected_dispatcher().await;
    transport.push_reply("/api/rephrase", ScriptedReply::failure("connection reset"));

    let error = dispatcher
        .execute_command("rephrase", "text")
        .await
        .expect_err("request fails");

    assert_eq!(error.result(), CommandResult::ServerError);
    assert_eq!(dispatcher.monitor().consecutive_failures(), 1);
    assert_eq!(dispatcher.monitor().state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn concurrent_execution_is_rejected() {
    let (dispatcher, transport) = connected_dispatcher().await;
    transport.push_reply(
        "/api/rewrite",
        ScriptedReply::json(&json!({"result": "first"})).after(Duration::from_secs(10)),
    );
    transport.push_reply("/api/rewrite", ScriptedReply::json(&json!({"result": "third"})));

    let background = dispatcher.clone();
    let first =
        tokio::spawn(async move { background.execute_command("rewrite", "draft").await });
    while !dispatcher.is_executing() {
        tokio::task::yield_now().await;
    }
    let mut events = dispatcher.subscribe();

    let second = dispatcher.execute_command("rewrite", "draft").await;

    assert!(matches!(second, Err(CommandError::ExecutionError)));
    assert!(dispatcher.is_executing());
    assert_eq!(
        drain(&mut events),
        vec![completed(
            "rewrite",
            CommandResult::ExecutionError,
            "cannot execute command: another command is already running",
        )]
    );

    let first_output = first.await.expect("task joins").expect("first succeeds");
    assert_eq!(first_output, "first");
    assert!(!dispatcher.is_executing());

    let third = dispatcher.execute_command("rewrite", "draft").await;
    assert_eq!(third.ok().as_deref(), Some("third"));
}

#[tokio::test(start_paused = true)]
async fn cancelled_execution_releases_the_guard() {
    let (dispatcher, transport) = connected_dispatcher().await;
    transport.push_reply(
        "/api/keywords",
        ScriptedReply::json(&json!({"result": "late"})).after(Duration::from_secs(30)),
    );
    let mut events = dispatcher.subscribe();

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        dispatcher.execute_command("keywords", "text"),
    )
    .await;

    assert!(outcome.is_err(), "execution should still be pending");
    assert_eq!(dispatcher.execution_state(), ExecutionState::Idle);
    assert_eq!(
        drain(&mut events),
        vec![
            DispatcherEvent::ExecutionStateChanged(ExecutionState::Executing),
            DispatcherEvent::ExecutionStateChanged(ExecutionState::Idle),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn offline_suggestions_are_local_only(offline: (CommandDispatcher, Arc<ScriptedTransport>)) {
    let (dispatcher, transport) = offline;
    let mut events = dispatcher.subscribe();

    let suggestions = dispatcher.get_suggestions("/re");

    assert_eq!(suggestions, ["rephrase", "rewrite"]);
    assert_eq!(
        drain(&mut events),
        vec![DispatcherEvent::SuggestionsAvailable {
            query: "/re".to_owned(),
            suggestions: suggestions.clone(),
        }]
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn backend_ranking_follows_local_ranking() {
    let (dispatcher, transport) = connected_dispatcher().await;
    transport.push_reply(
        "/api/search",
        ScriptedReply::json(&json!({"results": ["rewrite", "rephrase"]})),
    );
    let mut events = dispatcher.subscribe();

    let local = dispatcher.get_suggestions("re");

    assert_eq!(local, ["rephrase", "rewrite"]);
    let first = events.recv().await.expect("local event");
    assert_eq!(
        first,
        DispatcherEvent::SuggestionsAvailable {
            query: "re".to_owned(),
            suggestions: local,
        }
    );
    let second = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("refined event arrives")
        .expect("channel open");
    assert_eq!(
        second,
        DispatcherEvent::SuggestionsAvailable {
            query: "re".to_owned(),
            suggestions: vec!["rewrite".to_owned(), "rephrase".to_owned()],
        }
    );
    let requests = transport.requests();
    let search = requests.first().expect("search request sent");
    assert_eq!(search.endpoint, "/api/search");
    assert_eq!(search.body["query"], "re");
    assert_eq!(
        search.body["choices"].as_array().map(Vec::len),
        Some(dispatcher.all_commands().len())
    );
}

#[tokio::test]
async fn identical_backend_ranking_is_not_republished() {
    let (dispatcher, transport) = connected_dispatcher().await;
    transport.push_reply(
        "/api/search",
        ScriptedReply::json(&json!({"results": ["tone"]})),
    );
    let mut events = dispatcher.subscribe();

    let local = dispatcher.get_suggestions("tone");
    while transport.requests().is_empty() {
        tokio::task::yield_now().await;
    }
    tokio::task::yield_now().await;

    assert_eq!(local, ["tone"]);
    assert_eq!(drain(&mut events).len(), 1);
}

#[tokio::test]
async fn multi_word_queries_skip_backend_search() {
    let (dispatcher, transport) = connected_dispatcher().await;

    let local = dispatcher.get_suggestions("tone formal");
    tokio::task::yield_now().await;

    assert!(local.is_empty());
    assert!(transport.requests().is_empty());
}
