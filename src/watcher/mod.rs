//! Keeps a change subscription on the logs collection alive and hands every
//! child-added event to the relay.
//!
//! A lost connection is re-established with exponential backoff. The child
//! tracker is shared across connections, so users already seen before the
//! drop do not fire again when the reconnect snapshot arrives.

#[cfg(test)]
mod watcher_test;

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::metrics::FEED_RECONNECTS;
use crate::utils::async_task::sleep_or_shutdown;
use crate::utils::async_task::spawn_task;
use crate::ChangeFeed;
use crate::ChildTracker;
use crate::Error;
use crate::EventStream;
use crate::Relay;
use crate::Result;
use crate::StoreError;
use crate::StreamEvent;
use crate::WatcherConfig;

enum SessionEnd {
    Shutdown,
    Lost(Error),
}

pub struct ChangeWatcher {
    feed: Arc<dyn ChangeFeed>,
    relay: Arc<Relay>,
    config: WatcherConfig,
}

impl ChangeWatcher {
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        relay: Arc<Relay>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            feed,
            relay,
            config,
        }
    }

    /// Runs until `shutdown` fires, or fails once the reconnect policy is
    /// exhausted.
    pub async fn run(
        self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        let mut tracker = ChildTracker::new(self.config.notify_existing_on_start);
        let policy = self.config.reconnect;
        let mut attempts = 0usize;

        loop {
            let subscribed = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                subscribed = self.feed.subscribe() => subscribed,
            };

            let reason = match subscribed {
                Ok(stream) => {
                    info!("Listening for new logs");
                    match self
                        .drain(stream, &mut tracker, &mut attempts, &mut shutdown)
                        .await
                    {
                        SessionEnd::Shutdown => return Ok(()),
                        SessionEnd::Lost(e) => e,
                    }
                }
                Err(e) => e,
            };

            if policy.exhausted(attempts) {
                error!("Giving up on change stream after {} reconnects: {}", attempts, reason);
                return Err(Error::RetryTaskFailed(format!(
                    "change stream lost after {} reconnects: {}",
                    attempts, reason
                )));
            }

            attempts += 1;
            FEED_RECONNECTS.inc();
            let delay = policy.delay_for(attempts);
            warn!(
                "Change stream lost ({}), reconnect #{} in {:?}",
                reason, attempts, delay
            );
            if !sleep_or_shutdown(delay, &mut shutdown).await {
                return Ok(());
            }
        }
    }

    async fn drain(
        &self,
        mut stream: EventStream,
        tracker: &mut ChildTracker,
        attempts: &mut usize,
        shutdown: &mut watch::Receiver<()>,
    ) -> SessionEnd {
        loop {
            let next = tokio::select! {
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                next = stream.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => return SessionEnd::Lost(e),
                None => return SessionEnd::Lost(StoreError::StreamEnded.into()),
            };

            match event {
                StreamEvent::KeepAlive => trace!("keep-alive"),
                StreamEvent::Cancel(reason) | StreamEvent::AuthRevoked(reason) => {
                    return SessionEnd::Lost(StoreError::SubscriptionClosed(reason).into());
                }
                event => {
                    *attempts = 0;
                    for added in tracker.apply(event) {
                        debug!("child added: {}", added.user_id);
                        let relay = self.relay.clone();
                        spawn_task("relay", move || async move {
                            relay.handle(added).await;
                            Ok(())
                        });
                    }
                }
            }
        }
    }
}
