//! Delivery of accepted versions to registered local applications.

use std::time::Duration;

use async_trait::async_trait;
use parcel_protocol::NotifyAppRequest;
use parcel_store::NodeStore;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Something that can hand a verified parcel to one application.
#[async_trait]
pub trait AppNotifier: Send + Sync {
    async fn notify(&self, address: &str, request: &NotifyAppRequest) -> SyncResult<()>;
}

/// Notifier that POSTs the request as JSON to each application's address.
#[derive(Clone, Debug)]
pub struct HttpAppNotifier {
    http: Client,
}

impl HttpAppNotifier {
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

/// Registered addresses are `host:port`; a full URL is used as is.
fn app_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

#[async_trait]
impl AppNotifier for HttpAppNotifier {
    async fn notify(&self, address: &str, request: &NotifyAppRequest) -> SyncResult<()> {
        let url = app_url(address);
        let resp = self.http.post(&url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Transport(format!("{url} answered {status}")));
        }
        Ok(())
    }
}

/// Result of one fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Notify every registered application, in registration order.
///
/// Per-application failures are logged and counted, never retried, and never
/// stop delivery to the rest. Only failing to list the registrations is an
/// error.
pub async fn fan_out(
    store: &dyn NodeStore,
    notifier: &dyn AppNotifier,
    request: &NotifyAppRequest,
) -> SyncResult<FanOutReport> {
    let addresses = store.list_registered_apps()?;
    let key = request.root_hash.key();
    let mut report = FanOutReport::default();

    for address in &addresses {
        match notifier.notify(address, request).await {
            Ok(()) => {
                debug!(%address, %key, "notified app");
                report.delivered += 1;
            }
            Err(e) => {
                warn!(%address, %key, error = %e, "failed to notify app");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
