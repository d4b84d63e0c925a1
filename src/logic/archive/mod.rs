//! Mission Archive
//!
//! SQLite-backed store for labeled frames plus a bounded in-memory ring
//! of the most recent writes. Each `store` call is one transaction: the
//! telemetry row and its anomaly rows land together or not at all.
//!
//! The full frame travels as a JSON document inside the row; the
//! indexed columns exist only so range and severity queries stay cheap.

pub mod types;

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::constants::DEFAULT_CACHE_SIZE;
use crate::logic::anomaly::LabeledFrame;
use crate::logic::errors::ArchiveError;

pub use types::{AnomalyRecord, ArchiveStats};

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS telemetry (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    mission_id    TEXT    NOT NULL,
    timestamp     REAL    NOT NULL,
    frame_id      INTEGER NOT NULL,
    frame         TEXT    NOT NULL,
    quality       TEXT    NOT NULL,
    has_anomalies INTEGER NOT NULL,
    created_at    TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_telemetry_mission_ts
    ON telemetry (mission_id, timestamp);

CREATE TABLE IF NOT EXISTS anomalies (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    telemetry_id INTEGER NOT NULL REFERENCES telemetry (id),
    timestamp    REAL    NOT NULL,
    field        TEXT    NOT NULL,
    anomaly_type TEXT    NOT NULL,
    severity     TEXT    NOT NULL,
    description  TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_anomalies_telemetry
    ON anomalies (telemetry_id);
";

// ============================================================================
// MISSION ARCHIVE
// ============================================================================

pub struct MissionArchive {
    conn: Connection,
    cache: Mutex<VecDeque<(String, LabeledFrame)>>,
    cache_size: usize,
    stats: Mutex<ArchiveStats>,
}

impl MissionArchive {
    /// Open (or create) the mission database at `path` and switch it to
    /// WAL journaling.
    pub fn new(path: impl AsRef<Path>, cache_size: usize) -> Result<Self, ArchiveError> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA_SQL)?;

        log::info!(
            "mission archive opened at {} (cache {})",
            path.as_ref().display(),
            cache_size
        );

        Ok(Self {
            conn,
            cache: Mutex::new(VecDeque::with_capacity(cache_size)),
            cache_size: cache_size.max(1),
            stats: Mutex::new(ArchiveStats::default()),
        })
    }

    pub fn with_defaults(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        Self::new(path, DEFAULT_CACHE_SIZE)
    }

    /// Persist one labeled frame and all of its anomalies in a single
    /// transaction. Returns the new telemetry row id.
    pub fn store(
        &mut self,
        labeled: &LabeledFrame,
        mission_id: &str,
    ) -> Result<i64, ArchiveError> {
        let frame_json = serde_json::to_string(labeled)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO telemetry
                 (mission_id, timestamp, frame_id, frame, quality, has_anomalies, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                mission_id,
                labeled.frame.timestamp,
                labeled.frame.frame_id as i64,
                frame_json,
                labeled.frame.metadata.quality.as_str(),
                !labeled.anomalies.is_empty() as i64,
                created_at,
            ],
        )?;
        let telemetry_id = tx.last_insert_rowid();

        for anomaly in &labeled.anomalies {
            tx.execute(
                "INSERT INTO anomalies
                     (telemetry_id, timestamp, field, anomaly_type, severity, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    telemetry_id,
                    anomaly.timestamp,
                    anomaly.field,
                    anomaly.kind.as_str(),
                    anomaly.severity.as_str(),
                    anomaly.description,
                ],
            )?;
        }
        tx.commit()?;

        {
            let mut cache = self.cache.lock();
            if cache.len() == self.cache_size {
                cache.pop_front();
            }
            cache.push_back((mission_id.to_string(), labeled.clone()));
        }
        {
            let mut stats = self.stats.lock();
            stats.frames_stored += 1;
            stats.anomalies_stored += labeled.anomalies.len() as u64;
        }

        Ok(telemetry_id)
    }

    /// Most recent `n` frames for a mission, newest first. Served from
    /// the write cache when it still holds `n` frames for that mission;
    /// otherwise falls back to the database. An unknown mission returns
    /// an empty list.
    pub fn latest(&self, n: usize, mission_id: &str) -> Result<Vec<LabeledFrame>, ArchiveError> {
        {
            let cache = self.cache.lock();
            let hits: Vec<&LabeledFrame> = cache
                .iter()
                .rev()
                .filter(|(m, _)| m == mission_id)
                .take(n)
                .map(|(_, f)| f)
                .collect();
            if hits.len() >= n {
                let mut stats = self.stats.lock();
                stats.frames_queried += n as u64;
                stats.cache_hits += 1;
                return Ok(hits.into_iter().cloned().collect());
            }
        }
        self.stats.lock().cache_misses += 1;

        let mut stmt = self.conn.prepare(
            "SELECT frame FROM telemetry
             WHERE mission_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![mission_id, n as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut frames = Vec::new();
        for row in rows {
            frames.push(serde_json::from_str(&row?)?);
        }
        self.stats.lock().frames_queried += frames.len() as u64;
        Ok(frames)
    }

    /// All frames for a mission whose timestamp lies in `[start, end]`,
    /// in ascending timestamp order.
    pub fn query_range(
        &self,
        mission_id: &str,
        start: f64,
        end: f64,
    ) -> Result<Vec<LabeledFrame>, ArchiveError> {
        let mut stmt = self.conn.prepare(
            "SELECT frame FROM telemetry
             WHERE mission_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
             ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![mission_id, start, end], |row| {
            row.get::<_, String>(0)
        })?;

        let mut frames = Vec::new();
        for row in rows {
            frames.push(serde_json::from_str(&row?)?);
        }
        self.stats.lock().frames_queried += frames.len() as u64;
        Ok(frames)
    }

    /// Anomaly rows for a mission, newest first, optionally restricted
    /// to one severity.
    pub fn anomalies(
        &self,
        mission_id: &str,
        severity: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AnomalyRecord>, ArchiveError> {
        let sql = match severity {
            Some(_) => {
                "SELECT a.telemetry_id, a.timestamp, a.field, a.anomaly_type,
                        a.severity, a.description
                 FROM anomalies a
                 JOIN telemetry t ON t.id = a.telemetry_id
                 WHERE t.mission_id = ?1 AND a.severity = ?2
                 ORDER BY a.timestamp DESC, a.id DESC
                 LIMIT ?3"
            }
            None => {
                "SELECT a.telemetry_id, a.timestamp, a.field, a.anomaly_type,
                        a.severity, a.description
                 FROM anomalies a
                 JOIN telemetry t ON t.id = a.telemetry_id
                 WHERE t.mission_id = ?1
                 ORDER BY a.timestamp DESC, a.id DESC
                 LIMIT ?2"
            }
        };

        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(AnomalyRecord {
                telemetry_id: row.get(0)?,
                timestamp: row.get(1)?,
                field: row.get(2)?,
                kind: row.get(3)?,
                severity: row.get(4)?,
                description: row.get(5)?,
            })
        };

        let mut stmt = self.conn.prepare(sql)?;
        let mut records = Vec::new();
        match severity {
            Some(sev) => {
                let rows = stmt.query_map(params![mission_id, sev, limit as i64], map_row)?;
                for row in rows {
                    records.push(row?);
                }
            }
            None => {
                let rows = stmt.query_map(params![mission_id, limit as i64], map_row)?;
                for row in rows {
                    records.push(row?);
                }
            }
        }
        Ok(records)
    }

    /// Dump a mission to JSON Lines, one frame per line in ascending
    /// timestamp order. Returns the number of frames written.
    pub fn export_jsonl(
        &self,
        mission_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<u64, ArchiveError> {
        let frames = self.query_range(mission_id, f64::NEG_INFINITY, f64::INFINITY)?;

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        for frame in &frames {
            serde_json::to_writer(&mut writer, frame)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        log::info!(
            "exported {} frames of mission {} to {}",
            frames.len(),
            mission_id,
            path.as_ref().display()
        );
        Ok(frames.len() as u64)
    }

    pub fn stats(&self) -> ArchiveStats {
        self.stats.lock().clone()
    }

    pub fn reset_statistics(&self) {
        *self.stats.lock() = ArchiveStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::anomaly::{Anomaly, DetectionKind, Severity};
    use crate::logic::cleaner::{CleanFrame, CleanMetadata, Quality};

    fn labeled(timestamp: f64, frame_id: u64, soc: f64, anomalies: Vec<Anomaly>) -> LabeledFrame {
        LabeledFrame {
            frame: CleanFrame {
                timestamp,
                frame_id,
                fields: [("battery_soc".to_string(), soc)].into_iter().collect(),
                metadata: CleanMetadata {
                    quality: Quality::High,
                    checksum_valid: true,
                    repairs: Vec::new(),
                    warnings: Vec::new(),
                },
            },
            anomalies,
        }
    }

    fn soc_anomaly(timestamp: f64, severity: Severity) -> Anomaly {
        Anomaly {
            field: "battery_soc".to_string(),
            value: 10.0,
            kind: DetectionKind::Threshold,
            severity,
            description: "battery_soc below bound".to_string(),
            timestamp,
        }
    }

    fn open_archive(dir: &tempfile::TempDir) -> MissionArchive {
        MissionArchive::new(dir.path().join("mission.db"), 4).unwrap()
    }

    #[test]
    fn test_store_and_latest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = open_archive(&dir);

        for i in 0..3 {
            archive
                .store(&labeled(i as f64, i, 75.0 + i as f64, Vec::new()), "m1")
                .unwrap();
        }

        let latest = archive.latest(2, "m1").unwrap();
        assert_eq!(latest.len(), 2);
        // Newest first
        assert_eq!(latest[0].frame.frame_id, 2);
        assert_eq!(latest[1].frame.frame_id, 1);
        assert_eq!(latest[0].frame.fields["battery_soc"], 77.0);
    }

    #[test]
    fn test_latest_falls_back_to_database_past_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = open_archive(&dir);

        // Cache holds 4; store 6 so the oldest two are only on disk
        for i in 0..6 {
            archive.store(&labeled(i as f64, i, 75.0, Vec::new()), "m1").unwrap();
        }

        let latest = archive.latest(6, "m1").unwrap();
        assert_eq!(latest.len(), 6);
        assert_eq!(latest[0].frame.frame_id, 5);
        assert_eq!(latest[5].frame.frame_id, 0);
        assert!(archive.stats().cache_misses >= 1);
    }

    #[test]
    fn test_unknown_mission_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = open_archive(&dir);
        archive.store(&labeled(0.0, 0, 75.0, Vec::new()), "m1").unwrap();

        assert!(archive.latest(5, "ghost").unwrap().is_empty());
        assert!(archive.query_range("ghost", 0.0, 100.0).unwrap().is_empty());
        assert!(archive.anomalies("ghost", None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_query_range_is_ascending_and_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = open_archive(&dir);
        for i in 0..5 {
            archive.store(&labeled(i as f64, i, 75.0, Vec::new()), "m1").unwrap();
        }

        let frames = archive.query_range("m1", 1.0, 3.0).unwrap();
        let ids: Vec<u64> = frames.iter().map(|f| f.frame.frame_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_anomalies_filter_by_severity() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = open_archive(&dir);

        archive
            .store(
                &labeled(0.0, 0, 10.0, vec![soc_anomaly(0.0, Severity::Critical)]),
                "m1",
            )
            .unwrap();
        archive
            .store(
                &labeled(1.0, 1, 25.0, vec![soc_anomaly(1.0, Severity::Warning)]),
                "m1",
            )
            .unwrap();

        let all = archive.anomalies("m1", None, 10).unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].severity, "warning");

        let critical = archive.anomalies("m1", Some("critical"), 10).unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].field, "battery_soc");
    }

    #[test]
    fn test_missions_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = open_archive(&dir);
        archive.store(&labeled(0.0, 0, 75.0, Vec::new()), "m1").unwrap();
        archive.store(&labeled(0.0, 0, 50.0, Vec::new()), "m2").unwrap();

        let m2 = archive.latest(1, "m2").unwrap();
        assert_eq!(m2.len(), 1);
        assert_eq!(m2[0].frame.fields["battery_soc"], 50.0);
    }

    #[test]
    fn test_export_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = open_archive(&dir);
        for i in 0..3 {
            archive.store(&labeled(i as f64, i, 75.0, Vec::new()), "m1").unwrap();
        }

        let out = dir.path().join("m1.jsonl");
        let written = archive.export_jsonl("m1", &out).unwrap();
        assert_eq!(written, 3);

        let body = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: LabeledFrame = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.frame.frame_id, 0);
    }
}
