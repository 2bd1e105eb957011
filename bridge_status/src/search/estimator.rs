use crate::dydx::ChainHead;

/// Projects the unix time at which `release_block_height` is produced,
/// assuming blocks keep arriving every `avg_block_time_sec` after the head.
///
/// A height at or below the head gives a time at or before the head time,
/// meaning the transfer is already releasable.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn estimate_release_time(
    chain_head: &ChainHead,
    release_block_height: u64,
    avg_block_time_sec: f64,
) -> i64 {
    let block_delta = i128::from(release_block_height).saturating_sub(i128::from(chain_head.height));
    // Float to int casts saturate.
    let offset_sec = (block_delta as f64 * avg_block_time_sec).floor() as i64;
    chain_head.time.saturating_add(offset_sec)
}
