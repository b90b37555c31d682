use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::timeout;

use super::*;
use crate::test_utils::ScriptedFeed;
use crate::BackoffPolicy;
use crate::DeliveryError;
use crate::MockDeviceRegistry;
use crate::MockPushGateway;

const WAIT: Duration = Duration::from_secs(5);

fn fast_config(max_retries: usize) -> WatcherConfig {
    WatcherConfig {
        notify_existing_on_start: true,
        reconnect: BackoffPolicy {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
    }
}

/// Relay whose gateway reports each delivered token on the returned channel.
/// Sends to `failing_token` are rejected.
fn reporting_relay(
    failing_token: Option<&'static str>
) -> (Arc<Relay>, mpsc::UnboundedReceiver<String>) {
    let mut registry = MockDeviceRegistry::new();
    registry
        .expect_device_token()
        .returning(|user_id| Ok(Some(format!("tok-{user_id}"))));

    let (tx, rx) = mpsc::unbounded_channel();
    let mut gateway = MockPushGateway::new();
    gateway.expect_send().returning(move |payload| {
        if Some(payload.token.as_str()) == failing_token {
            return Err(DeliveryError::Rejected {
                status: 404,
                code: "UNREGISTERED".into(),
                message: "Requested entity was not found.".into(),
            }
            .into());
        }
        tx.send(payload.token.clone()).unwrap();
        Ok(format!("projects/smart-fireguard/messages/{}", payload.token))
    });

    (Arc::new(Relay::new(Arc::new(registry), Arc::new(gateway))), rx)
}

fn root_put(data: serde_json::Value) -> StreamEvent {
    StreamEvent::Put {
        path: "/".into(),
        data,
    }
}

fn child_put(
    user_id: &str,
    data: serde_json::Value,
) -> StreamEvent {
    StreamEvent::Put {
        path: format!("/{user_id}"),
        data,
    }
}

async fn wait_for_subscribes(
    feed: &ScriptedFeed,
    expected: usize,
) {
    timeout(WAIT, async {
        while feed.subscribes() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("watcher did not resubscribe");
}

#[tokio::test]
async fn added_children_should_reach_the_gateway() {
    let feed = Arc::new(ScriptedFeed::new(vec![Ok(vec![
        root_put(json!({ "u1": { "-Nk1": { "type": "FLAME DETECTED" } } })),
        StreamEvent::KeepAlive,
        child_put("u2", json!({ "-Nk1": { "type": "EMERGENCY" } })),
    ])]));
    let (relay, mut delivered) = reporting_relay(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let watcher = ChangeWatcher::new(feed.clone(), relay, fast_config(0));
    let handle = tokio::spawn(watcher.run(shutdown_rx));

    let mut tokens = vec![
        timeout(WAIT, delivered.recv()).await.unwrap().unwrap(),
        timeout(WAIT, delivered.recv()).await.unwrap().unwrap(),
    ];
    tokens.sort();
    assert_eq!(tokens, vec!["tok-u1".to_string(), "tok-u2".to_string()]);

    shutdown_tx.send(()).unwrap();
    assert!(timeout(WAIT, handle).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn delivery_failure_should_not_stop_later_events() {
    let feed = Arc::new(ScriptedFeed::new(vec![Ok(vec![
        child_put("stale", json!({ "-Nk1": { "type": "SMOKE DETECTED" } })),
        child_put("u1", json!({ "-Nk1": { "type": "EMERGENCY" } })),
    ])]));
    let (relay, mut delivered) = reporting_relay(Some("tok-stale"));
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(ChangeWatcher::new(feed, relay, fast_config(0)).run(shutdown_rx));

    assert_eq!(timeout(WAIT, delivered.recv()).await.unwrap().unwrap(), "tok-u1");

    shutdown_tx.send(()).unwrap();
    assert!(timeout(WAIT, handle).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn reconnect_snapshot_should_fire_only_for_new_users() {
    let feed = Arc::new(ScriptedFeed::new(vec![
        Ok(vec![root_put(json!({ "u1": { "-Nk1": { "type": "EMERGENCY" } } }))]),
        Ok(vec![root_put(json!({
            "u1": { "-Nk1": { "type": "EMERGENCY" }, "-Nk2": { "type": "EMERGENCY" } },
            "u2": { "-Nk1": { "type": "FLAME DETECTED" } }
        }))]),
    ]));
    let (relay, mut delivered) = reporting_relay(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(ChangeWatcher::new(feed.clone(), relay, fast_config(0)).run(shutdown_rx));

    let mut tokens = vec![
        timeout(WAIT, delivered.recv()).await.unwrap().unwrap(),
        timeout(WAIT, delivered.recv()).await.unwrap().unwrap(),
    ];
    tokens.sort();
    assert_eq!(tokens, vec!["tok-u1".to_string(), "tok-u2".to_string()]);
    wait_for_subscribes(&feed, 3).await;
    assert!(delivered.try_recv().is_err());

    shutdown_tx.send(()).unwrap();
    assert!(timeout(WAIT, handle).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn cancel_should_end_the_session_and_resubscribe() {
    let feed = Arc::new(ScriptedFeed::new(vec![Ok(vec![
        StreamEvent::Cancel("permission denied".into()),
        root_put(json!({ "u1": { "-Nk1": { "type": "EMERGENCY" } } })),
    ])]));
    let (relay, mut delivered) = reporting_relay(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(ChangeWatcher::new(feed.clone(), relay, fast_config(0)).run(shutdown_rx));

    wait_for_subscribes(&feed, 2).await;
    assert!(delivered.try_recv().is_err());

    shutdown_tx.send(()).unwrap();
    assert!(timeout(WAIT, handle).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn exhausted_reconnects_should_fail_the_watcher() {
    let denied = || -> Result<Vec<StreamEvent>> {
        Err(StoreError::Status {
            path: "user_logs".into(),
            status: 401,
        }
        .into())
    };
    let feed = Arc::new(ScriptedFeed::new(vec![denied(), denied(), denied()]));
    let (relay, _delivered) = reporting_relay(None);
    let (_shutdown_tx, shutdown_rx) = watch::channel(());

    let result = timeout(WAIT, ChangeWatcher::new(feed.clone(), relay, fast_config(2)).run(shutdown_rx))
        .await
        .unwrap();

    assert!(matches!(result, Err(Error::RetryTaskFailed(_))));
    assert_eq!(feed.subscribes(), 3);
}

#[tokio::test]
async fn shutdown_should_interrupt_backoff() {
    let denied = || -> Result<Vec<StreamEvent>> {
        Err(StoreError::Status {
            path: "user_logs".into(),
            status: 503,
        }
        .into())
    };
    let feed = Arc::new(ScriptedFeed::new(vec![denied()]));
    let (relay, _delivered) = reporting_relay(None);
    let config = WatcherConfig {
        notify_existing_on_start: true,
        reconnect: BackoffPolicy {
            max_retries: 0,
            base_delay_ms: 3_600_000,
            max_delay_ms: 3_600_000,
        },
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(ChangeWatcher::new(feed.clone(), relay, config).run(shutdown_rx));
    wait_for_subscribes(&feed, 1).await;

    shutdown_tx.send(()).unwrap();
    assert!(timeout(WAIT, handle).await.unwrap().unwrap().is_ok());
    assert_eq!(feed.subscribes(), 1);
}
