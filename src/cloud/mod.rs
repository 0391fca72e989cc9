//! Cloud Sync Worker (J): two independent background loops reconciling
//! the local Outbox and cloud price cache with a remote aggregation
//! service (§4.8). Device identity and the shared HTTP client live here;
//! the loops themselves are in `uplink` and `downlink`.

pub mod downlink;
pub mod uplink;

use crate::errors::{EngineError, EngineResult};
use std::time::Duration;
use uuid::Uuid;

/// Row cap the remote is observed to silently apply per page; both
/// uplink responses and downlink fetches must explicitly page past it
/// (§9 Open Question (c)).
pub const REMOTE_PAGE_SIZE: u32 = 1000;

/// Hard ceiling on pagination loops so a misbehaving remote can never
/// spin the worker forever.
const MAX_PAGES: u32 = 50;

pub(crate) async fn paginate<T, F, Fut>(mut fetch_page: F) -> EngineResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = EngineResult<Vec<T>>>,
{
    let mut all = Vec::new();
    for page in 0..MAX_PAGES {
        let batch = fetch_page(page).await?;
        let got = batch.len() as u32;
        all.extend(batch);
        if got < REMOTE_PAGE_SIZE {
            break;
        }
    }
    Ok(all)
}

/// Load the persisted device UUID, generating and persisting one on
/// first run. No other identifying data is ever transmitted.
pub fn load_or_create_device_uuid() -> EngineResult<Uuid> {
    let path = crate::paths::get_device_uuid_path();
    if let Ok(contents) = std::fs::read_to_string(&path) {
        if let Ok(uuid) = Uuid::parse_str(contents.trim()) {
            return Ok(uuid);
        }
    }
    let uuid = Uuid::new_v4();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, uuid.to_string())?;
    Ok(uuid)
}

pub(crate) fn http_client(timeout_secs: u64) -> EngineResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EngineError::CloudFatal(format!("failed to build http client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_uuid_roundtrips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device_uuid");
        let uuid = Uuid::new_v4();
        std::fs::write(&path, uuid.to_string()).unwrap();
        let read_back = std::fs::read_to_string(&path).unwrap();
        assert_eq!(Uuid::parse_str(read_back.trim()).unwrap(), uuid);
    }
}
