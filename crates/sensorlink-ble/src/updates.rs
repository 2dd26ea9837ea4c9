//! Fan-out of characteristic updates to notification sessions

use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::debug;
use uuid::Uuid;

/// Wait for the next value published for `characteristic`
///
/// Updates for other characteristics are skipped. A subscriber that fell
/// behind resumes with the newest values instead of ending. `None` once the
/// publisher is gone.
pub(crate) async fn next_update(
    updates: &mut Receiver<(Uuid, Vec<u8>)>,
    characteristic: Uuid,
) -> Option<Vec<u8>> {
    loop {
        match updates.recv().await {
            Ok((changed, value)) if changed == characteristic => return Some(value),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!("Skipped {} stale updates for {}", skipped, characteristic);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
