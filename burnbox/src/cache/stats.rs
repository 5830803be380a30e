//! Cache tool statistics.

use burnbox_shared::errors::BurnboxResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hit/miss counters reported by the cache tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub compile_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_size: Option<u64>,
    pub max_cache_size: Option<u64>,
}

#[derive(Deserialize)]
struct StatsReport {
    stats: RawStats,
    cache_size: Option<u64>,
    max_cache_size: Option<u64>,
}

#[derive(Deserialize)]
struct RawStats {
    #[serde(default)]
    compile_requests: u64,
    #[serde(default)]
    cache_hits: PerLanguage,
    #[serde(default)]
    cache_misses: PerLanguage,
}

#[derive(Deserialize, Default)]
struct PerLanguage {
    #[serde(default)]
    counts: BTreeMap<String, u64>,
}

impl PerLanguage {
    fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl CacheStats {
    /// Parse `sccache --show-stats --stats-format=json` output.
    pub fn parse(json: &str) -> BurnboxResult<Self> {
        let report: StatsReport = serde_json::from_str(json)?;
        Ok(Self {
            compile_requests: report.stats.compile_requests,
            cache_hits: report.stats.cache_hits.total(),
            cache_misses: report.stats.cache_misses.total(),
            cache_size: report.cache_size,
            max_cache_size: report.max_cache_size,
        })
    }

    /// Counter increase from `earlier` to `self`.
    pub fn since(&self, earlier: &CacheStats) -> CacheStats {
        CacheStats {
            compile_requests: self.compile_requests.saturating_sub(earlier.compile_requests),
            cache_hits: self.cache_hits.saturating_sub(earlier.cache_hits),
            cache_misses: self.cache_misses.saturating_sub(earlier.cache_misses),
            cache_size: self.cache_size,
            max_cache_size: self.max_cache_size,
        }
    }

    /// Fraction of cacheable requests served from the cache.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.cache_hits + self.cache_misses;
        (total > 0).then(|| self.cache_hits as f64 / total as f64)
    }
}
