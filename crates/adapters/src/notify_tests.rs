use std::time::Duration;

use super::fake::FakeChannelTransport;
use super::*;

fn msg(agent: &str) -> NotifyMessage {
    NotifyMessage {
        agent: agent.to_string(),
        event: "task_completed".to_string(),
        run_id: Some("run_20260101T000000Z".to_string()),
        task_id: Some("tsk_ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string()),
        title: "done".to_string(),
        body: "task finished".to_string(),
    }
}

#[tokio::test]
async fn resolves_explicit_binding_over_wildcard() {
    let mut resolver = ChannelResolver::new();
    resolver.bind_wildcard(NotifyChannel::Log);
    resolver.bind("coder", NotifyChannel::Webhook { url: "https://example.test/hook".into() });

    assert_eq!(resolver.resolve("coder"), Some(&NotifyChannel::Webhook { url: "https://example.test/hook".into() }));
    assert_eq!(resolver.resolve("reviewer"), Some(&NotifyChannel::Log));
}

#[tokio::test]
async fn per_agent_config_beats_wildcard_binding() {
    let mut resolver = ChannelResolver::new();
    resolver.bind_wildcard(NotifyChannel::Log);
    resolver.configure("coder", NotifyChannel::Webhook { url: "https://example.test/hook".into() });

    assert_eq!(resolver.resolve("coder"), Some(&NotifyChannel::Webhook { url: "https://example.test/hook".into() }));
}

#[tokio::test]
async fn log_channel_delivers_without_transport() {
    let mut resolver = ChannelResolver::new();
    resolver.bind_wildcard(NotifyChannel::Log);
    let transport = Arc::new(FakeChannelTransport::new());
    let notifier = Notifier::spawn(resolver, transport.clone(), RetryPolicy::notify());

    notifier.notify(msg("coder"));
    notifier.close(Duration::from_millis(200)).await;

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn webhook_delivery_is_recorded_on_success() {
    let mut resolver = ChannelResolver::new();
    resolver.bind_wildcard(NotifyChannel::Webhook { url: "https://example.test/hook".into() });
    let transport = Arc::new(FakeChannelTransport::new());
    let notifier = Notifier::spawn(resolver, transport.clone(), RetryPolicy::notify());

    notifier.notify(msg("coder"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(transport.calls().len(), 1);
    assert_eq!(notifier.outcomes().len(), 1);
}

#[tokio::test]
async fn delivery_retries_then_succeeds() {
    let mut resolver = ChannelResolver::new();
    resolver.bind_wildcard(NotifyChannel::Webhook { url: "https://example.test/hook".into() });
    let transport = Arc::new(FakeChannelTransport::new());
    transport.fail_next(1);
    let notifier = Notifier::spawn(resolver, transport.clone(), RetryPolicy::notify());

    notifier.notify(msg("coder"));
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(transport.calls().len(), 1);
    let outcomes = notifier.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], DeliveryOutcome::Delivered { .. }));
}

#[tokio::test]
async fn missing_channel_is_recorded_as_failed() {
    let resolver = ChannelResolver::new();
    let transport = Arc::new(FakeChannelTransport::new());
    let notifier = Notifier::spawn(resolver, transport, RetryPolicy::notify());

    notifier.notify(msg("coder"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcomes = notifier.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], DeliveryOutcome::Failed { .. }));
}
