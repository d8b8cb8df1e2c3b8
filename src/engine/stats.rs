// Download pipeline counters: revalidation hits, full downloads, failures, throughput.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

struct StatsSample {
    at: Instant,
    download_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub download_bps: u64,
    pub downloaded_bytes: u64,
    pub revalidated_hits: u64,
    pub full_downloads: u64,
    pub failures: u64,
    pub in_flight: u32,
    pub cache_hit_rate: f64,
}

pub struct PipelineStats {
    download_bytes_total: AtomicU64,
    revalidated_hits: AtomicU64,
    full_downloads: AtomicU64,
    failures: AtomicU64,
    in_flight: AtomicU32,
    last_sample: Mutex<StatsSample>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            download_bytes_total: AtomicU64::new(0),
            revalidated_hits: AtomicU64::new(0),
            full_downloads: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            in_flight: AtomicU32::new(0),
            last_sample: Mutex::new(StatsSample {
                at: Instant::now(),
                download_bytes: 0,
            }),
        }
    }

    /// A 304 answered from cache.
    pub fn record_revalidated(&self) {
        self.revalidated_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_downloaded(&self, bytes: u64) {
        self.full_downloads.fetch_add(1, Ordering::Relaxed);
        self.download_bytes_total.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn begin_fetch(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn end_fetch(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let now = Instant::now();
        let current_download = self.download_bytes_total.load(Ordering::Relaxed);

        let download_bps = {
            let mut sample = self.last_sample.lock();
            let elapsed = now.duration_since(sample.at).as_secs_f64();
            let bps = if elapsed > 0.1 {
                ((current_download - sample.download_bytes) as f64 / elapsed) as u64
            } else {
                0
            };
            sample.at = now;
            sample.download_bytes = current_download;
            bps
        };

        let hits = self.revalidated_hits.load(Ordering::Relaxed);
        let downloads = self.full_downloads.load(Ordering::Relaxed);
        let cache_hit_rate = if hits + downloads > 0 {
            hits as f64 / (hits + downloads) as f64
        } else {
            0.0
        };

        StatsSnapshot {
            download_bps,
            downloaded_bytes: current_download,
            revalidated_hits: hits,
            full_downloads: downloads,
            failures: self.failures.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            cache_hit_rate,
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}
