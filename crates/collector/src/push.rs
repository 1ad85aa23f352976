//! Push-side collection: one long-lived streaming connection per entity
//! feeding a shared latest-value cache.
//!
//! Listeners run entirely off the collection loop; the loop only ever takes a
//! non-blocking snapshot of whatever arrived last. Latest-value-wins is the
//! contract; there is no delivery guarantee for individual messages.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Subscription request sent once per established connection.
const SUBSCRIBE_REQUEST: &str = r#"{"cmd": "metrics_subscribe"}"#;

/// Pause between connection attempts. Fixed, no exponential backoff.
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Shared cache of the most recent decoded record per entity.
///
/// Writes come from the listener tasks, reads from the collection loop; both
/// are short, so a single mutex over the whole map is enough.
#[derive(Debug, Clone, Default)]
pub struct PushCache {
    inner: Arc<Mutex<FxHashMap<String, Value>>>,
}

impl PushCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the latest record for an entity, if any has arrived yet.
    /// Never blocks waiting for fresh data.
    pub fn get(&self, entity: &str) -> Option<Value> {
        self.inner.lock().get(entity).cloned()
    }

    fn store(&self, entity: &str, record: Value) {
        self.inner.lock().insert(entity.to_string(), record);
    }

    /// Spawn the listener task for one entity's stream endpoint.
    ///
    /// The task reconnects on failure with a fixed pause and stops when the
    /// token is cancelled.
    pub fn spawn_listener(
        &self,
        entity: String,
        url: String,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            listen(cache, entity, url, token).await;
        })
    }
}

async fn listen(cache: PushCache, entity: String, url: String, token: CancellationToken) {
    loop {
        if token.is_cancelled() {
            break;
        }

        match connect_async(&url).await {
            Ok((mut stream, _)) => {
                info!("connected to push stream for {entity}");

                if let Err(e) = stream.send(Message::text(SUBSCRIBE_REQUEST)).await {
                    warn!("failed to subscribe push stream for {entity}: {e}");
                } else {
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => {
                                let _ = stream.close(None).await;
                                debug!("push listener for {entity} stopped");
                                return;
                            }
                            msg = stream.next() => match msg {
                                Some(Ok(msg)) => {
                                    if let Some(record) = telemetry_payload(&msg) {
                                        cache.store(&entity, record);
                                    }
                                }
                                Some(Err(e)) => {
                                    warn!("push stream error for {entity}: {e}");
                                    break;
                                }
                                None => {
                                    warn!("push stream closed for {entity}");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!("push connection failed for {entity}: {e}");
            }
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(RECONNECT_PAUSE) => {}
        }
    }
    debug!("push listener for {entity} stopped");
}

/// Decode one inbound frame into a telemetry record.
///
/// Returns `None` for non-text frames, undecodable payloads, and
/// command-acknowledgment echoes (any top-level object carrying a `cmd`
/// field is an echo of the subscription request, not telemetry).
fn telemetry_payload(msg: &Message) -> Option<Value> {
    let text = msg.to_text().ok()?;
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug!("discarding undecodable push message: {e}");
            return None;
        }
    };

    if value.get("cmd").is_some() {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_starts_empty() {
        let cache = PushCache::new();
        assert_eq!(cache.get("nf0"), None);
    }

    #[test]
    fn test_latest_value_wins() {
        let cache = PushCache::new();
        cache.store("nf0", json!({"ue_count": 1}));
        cache.store("nf0", json!({"ue_count": 2}));
        assert_eq!(cache.get("nf0"), Some(json!({"ue_count": 2})));
    }

    #[test]
    fn test_entities_are_independent() {
        let cache = PushCache::new();
        cache.store("nf0", json!({"a": 1}));
        assert_eq!(cache.get("nf1"), None);
    }

    #[test]
    fn test_telemetry_payload_decodes_json_text() {
        let msg = Message::text(r#"{"dl_bitrate": 12.5}"#);
        assert_eq!(telemetry_payload(&msg), Some(json!({"dl_bitrate": 12.5})));
    }

    #[test]
    fn test_command_echo_is_discarded() {
        let msg = Message::text(r#"{"cmd": "metrics_subscribe", "ok": true}"#);
        assert_eq!(telemetry_payload(&msg), None);
    }

    #[test]
    fn test_malformed_message_is_discarded() {
        let msg = Message::text("{not json");
        assert_eq!(telemetry_payload(&msg), None);
    }

    #[test]
    fn test_non_text_frames_are_discarded() {
        let msg = Message::Ping(vec![1, 2, 3].into());
        assert_eq!(telemetry_payload(&msg), None);
    }

    #[tokio::test]
    async fn test_listener_finishes_on_cancel() {
        let cache = PushCache::new();
        let token = CancellationToken::new();
        let handle =
            cache.spawn_listener("nf0".into(), "ws://127.0.0.1:1".into(), token.clone());
        token.cancel();
        // The task must wind down on its own once cancelled; joining it must
        // not require an abort.
        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(joined.expect("listener kept running after cancel").is_ok());
    }
}
