//! Advertising loop for the peripheral role

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::errors::TransportError;
use crate::state::SessionState;
use crate::transport::{InboundConnection, Peripheral};
use crate::types::{AdvertisingParams, PeerAddress};

/// Advertises, accepts one central, waits for it to leave, and starts over
pub struct AdvertisingManager {
    params: AdvertisingParams,
    retry_delay: Duration,
    state: Arc<SessionState>,
}

impl AdvertisingManager {
    pub fn new(params: AdvertisingParams, retry_delay: Duration, state: Arc<SessionState>) -> Self {
        Self {
            params,
            retry_delay,
            state,
        }
    }

    /// Run forever; radio errors are logged and advertising is retried
    pub async fn run<P: Peripheral>(&self, peripheral: &P) {
        loop {
            if let Err(e) = self.serve_once(peripheral).await {
                error!("Advertising failed: {}", e);
                sleep(self.retry_delay).await;
            }
        }
    }

    /// One advertise / connect / disconnect cycle
    ///
    /// Clears `connected` on entry, raises it when a central connects, and
    /// returns once that central has disconnected. The stale handle is
    /// replaced on the next entry, before any suspension point.
    pub async fn serve_once<P: Peripheral>(
        &self,
        peripheral: &P,
    ) -> Result<PeerAddress, TransportError> {
        self.state.detach();
        info!(
            "Advertising as '{}' every {:?}",
            self.params.local_name, self.params.interval
        );

        let mut connection = peripheral.advertise(&self.params).await?;
        let peer = connection.peer();
        self.state.attach(connection.handle());
        info!("Central {} connected ({})", peer, connection.handle());

        connection.disconnected().await;
        info!("Central {} disconnected", peer);
        Ok(peer)
    }
}
