//! Idle session reaper.
//!
//! Every inbound frame refreshes a session's `last_seen`. Sessions that stay silent for
//! longer than the timeout are unregistered, which drops their sender and closes the socket.

use std::{sync::Arc, time::Duration};

use kizuna_shared::time::Clock;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::domain::{SessionId, SessionRegistry, Timestamp};

/// Remove every session whose last inbound frame is older than `timeout`.
pub async fn reap_once(
    registry: &dyn SessionRegistry,
    clock: &dyn Clock,
    timeout: Duration,
) -> Vec<SessionId> {
    let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
    let idle_before = Timestamp::new(clock.now_millis().saturating_sub(timeout_ms));
    let reaped = registry.reap_idle(idle_before).await;
    for session_id in &reaped {
        tracing::info!("Session {} timed out", session_id);
    }
    reaped
}

/// Spawn the background reaper. Abort the handle to stop it.
pub fn spawn_reaper(
    registry: Arc<dyn SessionRegistry>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            reap_once(registry.as_ref(), clock.as_ref(), timeout).await;
        }
    })
}
