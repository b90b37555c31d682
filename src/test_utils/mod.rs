//! Shared fixtures and fakes for unit tests

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use serde_json::Value;
use warp::Filter;

use crate::ChangeFeed;
use crate::ChildAdded;
use crate::EventStream;
use crate::Result;
use crate::StoreError;
use crate::StreamEvent;

pub(crate) const TEST_PRIVATE_KEY: &str = include_str!("fixtures/test_private_key.pem");
pub(crate) const TEST_PUBLIC_KEY: &str = include_str!("fixtures/test_public_key.pem");

/// Service-account bundle signed with the fixture key
pub(crate) fn service_account_json(token_uri: Option<&str>) -> String {
    let mut account = serde_json::json!({
        "type": "service_account",
        "project_id": "smart-fireguard",
        "private_key_id": "test-key-id",
        "private_key": TEST_PRIVATE_KEY,
        "client_email": "relay@smart-fireguard.iam.gserviceaccount.com",
    });
    if let Some(uri) = token_uri {
        account["token_uri"] = Value::String(uri.to_string());
    }
    account.to_string()
}

/// Serves `filter` on an ephemeral localhost port for the rest of the test
pub(crate) fn spawn_fake_server<F>(filter: F) -> SocketAddr
where
    F: Filter<Error = warp::Rejection> + Clone + Send + Sync + 'static,
    F::Extract: warp::Reply,
{
    let (addr, server) = warp::serve(filter).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

pub(crate) fn child_added(
    user_id: &str,
    logs: Value,
) -> ChildAdded {
    ChildAdded::new(user_id, logs)
}

/// Change feed replaying one scripted session per `subscribe` call. Each
/// session ends like a dropped connection; once the script is exhausted the
/// feed stays open without events.
pub(crate) struct ScriptedFeed {
    sessions: Mutex<VecDeque<Result<Vec<StreamEvent>>>>,
    subscribes: AtomicUsize,
}

impl ScriptedFeed {
    pub(crate) fn new(sessions: Vec<Result<Vec<StreamEvent>>>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            subscribes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeFeed for ScriptedFeed {
    async fn subscribe(&self) -> Result<EventStream> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(Ok(events)) => Ok(stream::iter(events.into_iter().map(Ok))
                .chain(stream::once(async { Err(StoreError::StreamEnded.into()) }))
                .boxed()),
            Some(Err(e)) => Err(e),
            None => Ok(stream::pending().boxed()),
        }
    }
}
