use super::fake::FakeSessionApi;
use super::*;

#[tokio::test]
async fn create_reply_and_poll_round_trip() {
    let api = FakeSessionApi::new();
    let session_id = api.create_session("coder").await.unwrap();

    api.reply(&session_id, "user", "please implement X").await.unwrap();
    api.push_agent_message(&session_id, "[TASK_DONE] wrote X");

    let messages = api.poll_messages(&session_id, None).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "[TASK_DONE] wrote X");
}

#[tokio::test]
async fn poll_after_cursor_only_returns_new_messages() {
    let api = FakeSessionApi::new();
    let session_id = api.create_session("coder").await.unwrap();
    let first_id = api.reply(&session_id, "user", "first").await.unwrap();
    api.push_agent_message(&session_id, "second");

    let after_first = api.poll_messages(&session_id, Some(&first_id)).await.unwrap();
    assert_eq!(after_first.len(), 1);
    assert_eq!(after_first[0].content, "second");
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let api = FakeSessionApi::new();
    assert!(matches!(api.reply("sess_missing", "user", "x").await, Err(SessionError::NotFound(_))));
}
