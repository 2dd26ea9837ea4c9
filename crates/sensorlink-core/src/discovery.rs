//! Peer discovery for the central role

use futures::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::TransportError;
use crate::transport::Central;
use crate::types::{PeerDescriptor, ScanParams};

// ----------------------------------------------------------------------------
// Discovery Engine
// ----------------------------------------------------------------------------

/// Scans for one advertising peer matching a name and service filter
#[derive(Debug, Clone)]
pub struct DiscoveryEngine {
    params: ScanParams,
}

impl DiscoveryEngine {
    pub fn new(params: ScanParams) -> Self {
        Self { params }
    }

    /// Return the first advertiser whose name equals `name_filter` exactly and
    /// whose service list contains `service_filter`
    ///
    /// Gives up with `Ok(None)` once the scan duration elapses or the radio
    /// ends the scan. The scan is stopped before returning.
    pub async fn find_peer<C: Central>(
        &self,
        central: &C,
        name_filter: &str,
        service_filter: Uuid,
    ) -> Result<Option<PeerDescriptor>, TransportError> {
        let mut reports = central.start_scan(&self.params).await?;
        info!(
            "Scanning for '{}' for {:?} (interval {:?}, window {:?}, active: {})",
            name_filter,
            self.params.duration,
            self.params.interval,
            self.params.window,
            self.params.active
        );

        let search = async {
            while let Some(advertisement) = reports.next().await {
                if advertisement.matches(name_filter, &service_filter) {
                    return Some(advertisement);
                }
                debug!(
                    "Ignoring {} ({:?})",
                    advertisement.address, advertisement.local_name
                );
            }
            None
        };
        let found = timeout(self.params.duration, search).await.unwrap_or(None);
        drop(reports);

        if let Err(e) = central.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        match found {
            Some(advertisement) => {
                info!(
                    "Found peer '{}' at {}",
                    name_filter, advertisement.address
                );
                Ok(Some(PeerDescriptor::from(advertisement)))
            }
            None => Ok(None),
        }
    }
}
