use tokio_util::sync::CancellationToken;

use crate::endpoint::Endpoint;

const SAMPLE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);
/// Cooldown applied once a round emits at least one warning, to avoid log
/// storms while a queue stays saturated.
const WARNING_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(5);

/// Samples every tracked queue endpoint's `(size, capacity)` every 2s;
/// warns when `capacity - size <= floor(capacity * 0.1)`. Skipped entirely
/// on macOS, where the underlying queue introspection isn't reliable. The
/// threshold is asymmetric: `floor(capacity * 0.1)` is `0` below capacity
/// 10, so a capacity-2 queue only warns once fully saturated.
pub(crate) async fn run_monitor(endpoints: Vec<Endpoint>, shutdown: CancellationToken) {
    if cfg!(target_os = "macos") {
        tracing::warn!(
            "backpressure monitor disabled: this platform does not expose a reliable queue size"
        );
        return;
    }

    loop {
        tokio::select! {
            () = tokio::time::sleep(SAMPLE_INTERVAL) => {}
            () = shutdown.cancelled() => return,
        }

        let mut any_warned = false;
        for endpoint in &endpoints {
            let Ok(size) = endpoint.handle.len().await else {
                continue;
            };
            let capacity = endpoint.capacity as usize;
            let threshold = (endpoint.capacity as f64 * 0.1).floor() as usize;
            if capacity.saturating_sub(size) <= threshold {
                tracing::warn!(
                    owner = %endpoint.owner,
                    queue = %endpoint.queue_name,
                    size,
                    capacity,
                    "{} queue {} of process {} has reached {} messages.",
                    endpoint.kind.label(),
                    endpoint.queue_name,
                    endpoint.owner,
                    size,
                );
                any_warned = true;
            }
        }

        if any_warned {
            tokio::select! {
                () = tokio::time::sleep(WARNING_COOLDOWN) => {}
                () = shutdown.cancelled() => return,
            }
        }
    }
}
