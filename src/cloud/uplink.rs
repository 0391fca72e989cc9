//! Uplink loop: drains the Outbox in FIFO order and submits learned
//! prices to the remote aggregation service (§4.8).

use super::http_client;
use crate::database::{outbox_entry_is_due, Store, TypeId};
use crate::logger::{self, LogTag};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{interval, Duration};
use uuid::Uuid;

#[derive(Serialize)]
struct SubmitPriceRequest {
    device_uuid: Uuid,
    type_id: TypeId,
    value: f64,
    captured_ts: chrono::DateTime<Utc>,
}

/// One pass over the due outbox entries. Returns when the batch is
/// exhausted; the caller drives the repeat cadence.
pub async fn run_uplink_cycle(
    store: &Store,
    base_url: &str,
    anon_key: &str,
    device_uuid: Uuid,
    base_currency_type_id: Option<TypeId>,
    request_timeout_secs: u64,
) -> crate::errors::EngineResult<()> {
    let client = http_client(request_timeout_secs)?;
    let now = Utc::now();
    let batch = store.outbox_batch(100)?;

    for entry in batch {
        if Some(entry.type_id) == base_currency_type_id {
            // Base Currency must never reach the cloud; drop silently.
            store.remove_outbox_entry(entry.id)?;
            continue;
        }
        if !outbox_entry_is_due(&entry, now) {
            continue;
        }

        let body = SubmitPriceRequest {
            device_uuid,
            type_id: entry.type_id,
            value: entry.value,
            captured_ts: entry.captured_ts,
        };

        let result = client
            .post(format!("{base_url}/uplink"))
            .bearer_auth(anon_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                store.remove_outbox_entry(entry.id)?;
            }
            Ok(response) => {
                let status = response.status();
                let retryable = status.as_u16() == 429 || status.is_server_error();
                let message = format!("http {status}");
                if retryable {
                    store.record_outbox_failure(entry.id, now, &message)?;
                    logger::warning(
                        LogTag::Cloud,
                        &format!("uplink retry scheduled for type {}: {}", entry.type_id, message),
                    );
                } else {
                    store.remove_outbox_entry(entry.id)?;
                    logger::warning(
                        LogTag::Cloud,
                        &format!("uplink dropped type {} (non-retryable): {}", entry.type_id, message),
                    );
                }
            }
            Err(e) => {
                store.record_outbox_failure(entry.id, now, &e.to_string())?;
                logger::warning(
                    LogTag::Cloud,
                    &format!("uplink network error for type {}: {}", entry.type_id, e),
                );
            }
        }
    }

    Ok(())
}

/// Long-lived uplink task. Stops cooperatively on `shutdown`.
pub async fn run(
    store: Arc<Store>,
    shutdown: Arc<Notify>,
    period_secs: u64,
    base_url: String,
    anon_key: String,
    device_uuid: Uuid,
    base_currency_type_id: Option<TypeId>,
    request_timeout_secs: u64,
) {
    logger::info(LogTag::Cloud, "uplink worker started");
    let mut ticker = interval(Duration::from_secs(period_secs));

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                logger::info(LogTag::Cloud, "uplink worker stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_uplink_cycle(
                    &store,
                    &base_url,
                    &anon_key,
                    device_uuid,
                    base_currency_type_id,
                    request_timeout_secs,
                ).await {
                    logger::error(LogTag::Cloud, &format!("uplink cycle failed: {e}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Store;

    #[tokio::test]
    async fn base_currency_entries_are_dropped_without_a_request() {
        let store = Store::open_in_memory().unwrap();
        store.enqueue_outbox(1, 5.0, Utc::now()).unwrap();
        assert_eq!(store.outbox_len().unwrap(), 1);

        run_uplink_cycle(&store, "http://localhost:0", "key", Uuid::new_v4(), Some(1), 1)
            .await
            .unwrap();

        assert_eq!(store.outbox_len().unwrap(), 0);
    }
}
