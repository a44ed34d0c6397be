use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const RING_CAPACITY: usize = 1000;

/// One entry in the activity feed: an order placed, cancelled, or a trade
/// executed. `data` carries the type-specific payload as loose JSON so the
/// ring and the JSONL file share one shape without a union type per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(flatten)]
    pub data: Value,
}

/// In-memory ring of the last 1000 activity records plus a best-effort
/// append-only JSONL mirror on disk. Reads are served from the file when one
/// is configured and readable, so two processes sharing a log path see the
/// same history; the ring is the fallback when no path is configured or the
/// file can't be read. Writes always land in the ring first so an
/// unreadable file never loses the current process's own records from
/// `len()`/`is_empty()`.
pub struct ActivityLog {
    ring: Mutex<VecDeque<ActivityRecord>>,
    log_path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
            log_path,
        }
    }

    pub fn record(&self, entry: ActivityRecord) {
        {
            let mut ring = self.ring.lock().expect("activity ring lock poisoned");
            if ring.len() == RING_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(entry.clone());
        }
        self.append_to_file(&entry);
    }

    fn append_to_file(&self, entry: &ActivityRecord) {
        let Some(path) = &self.log_path else {
            return;
        };
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize activity record");
                return;
            }
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(err) = result {
            tracing::warn!(error = %err, path = %path.display(), "failed to append activity log entry");
        }
    }

    /// Returns up to `limit` most recent records, optionally filtered to one
    /// symbol, newest last (matching the order they were recorded in). Reads
    /// from the JSONL file when one is configured and parses cleanly; falls
    /// back to the in-memory ring otherwise.
    pub fn recent(&self, limit: usize, symbol: Option<&str>) -> Vec<ActivityRecord> {
        let records = self
            .log_path
            .as_deref()
            .and_then(Self::read_from_file)
            .unwrap_or_else(|| self.ring.lock().expect("activity ring lock poisoned").iter().cloned().collect());
        Self::filter_and_trim(records, limit, symbol)
    }

    fn read_from_file(path: &std::path::Path) -> Option<Vec<ActivityRecord>> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| tracing::warn!(error = %err, path = %path.display(), "failed to read activity log, falling back to ring"))
            .ok()?;
        Some(content.lines().filter_map(|line| serde_json::from_str(line).ok()).collect())
    }

    fn filter_and_trim(records: Vec<ActivityRecord>, limit: usize, symbol: Option<&str>) -> Vec<ActivityRecord> {
        let filtered: Vec<ActivityRecord> = match symbol {
            Some(symbol) => records.into_iter().filter(|r| r.symbol.as_deref() == Some(symbol)).collect(),
            None => records,
        };
        let start = filtered.len().saturating_sub(limit);
        filtered[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().expect("activity ring lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str, symbol: &str, ts: u64) -> ActivityRecord {
        ActivityRecord {
            kind: kind.to_string(),
            timestamp: ts,
            symbol: Some(symbol.to_string()),
            data: serde_json::json!({}),
        }
    }

    #[test]
    fn ring_evicts_oldest_past_capacity() {
        let log = ActivityLog::new(None);
        for i in 0..(RING_CAPACITY + 10) {
            log.record(entry("order_placed", "BTC_USDT", i as u64));
        }
        assert_eq!(log.len(), RING_CAPACITY);
        let recent = log.recent(1, None);
        assert_eq!(recent[0].timestamp, (RING_CAPACITY + 9) as u64);
    }

    #[test]
    fn recent_filters_by_symbol() {
        let log = ActivityLog::new(None);
        log.record(entry("order_placed", "BTC_USDT", 1));
        log.record(entry("order_placed", "ETH_USDT", 2));
        log.record(entry("trade_executed", "BTC_USDT", 3));

        let btc = log.recent(10, Some("BTC_USDT"));
        assert_eq!(btc.len(), 2);
        assert!(btc.iter().all(|r| r.symbol.as_deref() == Some("BTC_USDT")));
    }

    #[test]
    fn recent_reads_from_file_when_configured() {
        let path = std::env::temp_dir().join(format!("activity-log-test-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let log = ActivityLog::new(Some(path.clone()));
        log.record(entry("order_placed", "BTC_USDT", 1));
        log.record(entry("order_placed", "BTC_USDT", 2));

        // Append a record directly to the file, bypassing `record()`, to
        // prove reads come from disk rather than the ring.
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, r#"{{"type":"order_placed","symbol":"BTC_USDT","timestamp":3}}"#).unwrap();
        }

        let records = log.recent(10, Some("BTC_USDT"));
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].timestamp, 3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn recent_falls_back_to_ring_when_file_unreadable() {
        let path = std::env::temp_dir().join("activity-log-test-nonexistent-dir/activity.jsonl");
        let log = ActivityLog::new(Some(path));
        log.record(entry("order_placed", "BTC_USDT", 1));

        let records = log.recent(10, None);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn recent_trims_to_limit() {
        let log = ActivityLog::new(None);
        for i in 0..5 {
            log.record(entry("order_placed", "BTC_USDT", i));
        }
        let last_two = log.recent(2, None);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].timestamp, 3);
        assert_eq!(last_two[1].timestamp, 4);
    }
}
