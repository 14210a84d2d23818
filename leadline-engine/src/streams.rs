//! Change-stream listener set with reconnect backoff.
//!
//! Five independent subscriptions (leads, contacts, comments, events,
//! assignments), each delivering notifications asynchronously and out of
//! order with respect to the others. Every listener forwards into one
//! channel; the store owner drains it and feeds the single merge entry
//! point. Delivery is at-least-once; the merge layer makes redelivery
//! harmless and the periodic refetch heals any gap.

use crate::config::ReconnectConfig;
use leadline_core::{ChangeNotification, LeadlineResult, StreamChannel};
use ::async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Transport boundary for change notifications. Implementations wrap the
/// hosted store's realtime facility; the engine never sees the wire format.
#[async_trait]
pub trait ChangeTransport: Send + Sync {
    /// Open a subscription on one channel. The stream ends on disconnect;
    /// the listener resubscribes with backoff.
    async fn subscribe(
        &self,
        channel: StreamChannel,
    ) -> LeadlineResult<BoxStream<'static, ChangeNotification>>;
}

/// Spawn one listener task per channel, forwarding every notification into
/// `sender`. Tasks run until the receiving side is dropped.
pub fn spawn_listeners(
    transport: Arc<dyn ChangeTransport>,
    reconnect: ReconnectConfig,
    sender: mpsc::Sender<ChangeNotification>,
) -> Vec<JoinHandle<()>> {
    StreamChannel::all()
        .into_iter()
        .map(|channel| spawn_listener(Arc::clone(&transport), reconnect.clone(), channel, sender.clone()))
        .collect()
}

fn spawn_listener(
    transport: Arc<dyn ChangeTransport>,
    reconnect: ReconnectConfig,
    channel: StreamChannel,
    sender: mpsc::Sender<ChangeNotification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = reconnect.initial_ms;
        loop {
            match transport.subscribe(channel).await {
                Ok(mut stream) => {
                    debug!(%channel, "subscribed");
                    backoff = reconnect.initial_ms;

                    while let Some(notification) = stream.next().await {
                        if sender.send(notification).await.is_err() {
                            // Receiver dropped: the store owner is gone.
                            return;
                        }
                    }

                    warn!(%channel, "subscription closed, reconnecting");
                }
                Err(err) => {
                    warn!(%channel, error = %err, "subscribe failed, retrying");
                }
            }

            if sender.is_closed() {
                return;
            }

            let delay = jittered_backoff(backoff, reconnect.jitter_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let next = (backoff as f64 * reconnect.multiplier) as u64;
            backoff = next.min(reconnect.max_ms);
        }
    })
}

/// Adapt the listener channel into a `Stream`, for embedders that consume
/// notifications reactively instead of draining the receiver in a loop.
pub fn notification_stream(
    receiver: mpsc::Receiver<ChangeNotification>,
) -> ReceiverStream<ChangeNotification> {
    ReceiverStream::new(receiver)
}

fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    let jitter = nanos % jitter_ms;
    base_ms.saturating_add(jitter)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use leadline_core::{new_entity_id, ChangeOp, Lead};
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn reconnect() -> ReconnectConfig {
        ReconnectConfig {
            initial_ms: 1,
            max_ms: 10,
            multiplier: 2.0,
            jitter_ms: 0,
        }
    }

    /// Transport that serves one notification per channel, then ends every
    /// later subscription immediately.
    struct OneShotTransport {
        served: Mutex<HashSet<StreamChannel>>,
    }

    impl OneShotTransport {
        fn new() -> Self {
            Self {
                served: Mutex::new(HashSet::new()),
            }
        }
    }

    #[async_trait]
    impl ChangeTransport for OneShotTransport {
        async fn subscribe(
            &self,
            channel: StreamChannel,
        ) -> LeadlineResult<BoxStream<'static, ChangeNotification>> {
            let first = self.served.lock().unwrap().insert(channel);
            if first && channel == StreamChannel::Leads {
                let lead = Lead::new("Streamed AB", new_entity_id());
                let item = ChangeNotification::LeadUpserted {
                    op: ChangeOp::Insert,
                    lead,
                };
                Ok(stream::iter(vec![item]).boxed())
            } else {
                Ok(stream::iter(Vec::new()).boxed())
            }
        }
    }

    #[tokio::test]
    async fn test_listeners_forward_notifications() {
        let transport = Arc::new(OneShotTransport::new());
        let (sender, mut receiver) = mpsc::channel(16);

        let handles = spawn_listeners(transport, reconnect(), sender);
        assert_eq!(handles.len(), 5);

        let notification = receiver.recv().await.expect("one notification forwarded");
        assert_eq!(notification.channel(), StreamChannel::Leads);

        // Dropping the receiver lets every listener exit.
        drop(receiver);
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_notification_stream_adapter() {
        let (sender, receiver) = mpsc::channel(4);
        let lead = Lead::new("Streamed AB", new_entity_id());
        sender
            .send(ChangeNotification::LeadUpserted {
                op: ChangeOp::Insert,
                lead,
            })
            .await
            .unwrap();
        drop(sender);

        let mut stream = notification_stream(receiver);
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_jittered_backoff_without_jitter() {
        assert_eq!(jittered_backoff(250, 0), 250);
    }

    #[test]
    fn test_jittered_backoff_bounded() {
        let delay = jittered_backoff(250, 100);
        assert!(delay >= 250 && delay < 350);
    }
}
