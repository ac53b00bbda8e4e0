// Block-level summary logging: after each block the indexer prints one
// `info!` line with the counts below and a `debug!` line per etching and
// burned rune.

use log::{debug, info};
use runes::BlockStats;
use runes_support::host::IndexedHeader;
use std::time::Duration;

/// Installs `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
/// Later calls are ignored.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

pub fn log_block_summary(stats: &BlockStats, header: &IndexedHeader, duration: Duration) {
    info!(
        "block {} {}: {} txs, {} runestones ({} cenotaphs), {} etchings, {} mints, {} edicts, {} outputs credited, {} runes burned, {} events in {:?}",
        header.height,
        header.hash,
        stats.transactions,
        stats.runestones,
        stats.cenotaphs,
        stats.etchings.len(),
        stats.mints,
        stats.edicts,
        stats.outputs_credited,
        stats.burned.len(),
        stats.events,
        duration
    );

    for (id, rune) in &stats.etchings {
        debug!("  etched {rune} as {id}");
    }
    for (id, amount) in &stats.burned {
        debug!("  burned {amount} of {id}");
    }
    debug!(
        "  event hash {} cumulative {}",
        hex::encode(header.event_hash),
        hex::encode(header.cumulative_event_hash)
    );
}
