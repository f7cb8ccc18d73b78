//! Optional async maintenance loop that ticks the registry's TTL sweep on
//! an interval, grounded on the teacher's `internal::broker::Broker::run`
//! `select!` pattern. The registry itself stays plain synchronous code
//! (§5: "no suspension points"); this loop is just an external ticker the
//! host may spawn, not something the registry owns.

use std::sync::Arc;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::Config;

/// Drives periodic maintenance (TTL sweep, tenant byte-count reset) by
/// invoking `on_tick` on the configured interval until `cancel_token` is
/// cancelled. `on_tick` is a plain synchronous closure — typically one
/// that locks the host's registry/metrics and calls `sweep_expired()`
/// and/or `reset_tenant_byte_counts()`.
pub async fn run_maintenance_loop(config: Arc<Config>, cancel_token: Arc<CancellationToken>, mut on_tick: impl FnMut()) {
    let mut interval = tokio::time::interval(config.sweep_interval);
    loop {
        select! {
            _ = cancel_token.cancelled() => break,
            _ = interval.tick() => {
                on_tick();
            }
        }
    }
}
