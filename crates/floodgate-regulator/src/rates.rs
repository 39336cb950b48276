//! Size-to-rate mapping.

use floodgate_config::RegulatorConfig;

/// Computes the target crawl rate for a source from its catalog size.
///
/// The rate scales linearly with image count between the configured floor
/// and ceiling: a source half the size of `max_crawl_size` is crawled at
/// half the ceiling rate. Small sources get the floor so every source makes
/// progress; huge sources are capped at the ceiling so no single domain is
/// hammered.
pub fn compute_crawl_rate(image_count: u64, config: &RegulatorConfig) -> u32 {
    let scaled = (image_count as u128 * config.max_crawl_rps as u128)
        / config.max_crawl_size as u128;
    let linear = scaled.min(u32::MAX as u128) as u32;
    linear.clamp(config.min_crawl_rps, config.max_crawl_rps)
}
