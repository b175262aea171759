use anyhow::Result;
use rocu_session::Journal;
use serde::Deserialize;
use std::fmt::{Display, Write};

pub const CSV_HEADER: &str = "ts,lat,lon,vx,vy,wz,idx";

// Loose view of a log line: absent fields render as empty cells.
#[derive(Debug, Default, Deserialize)]
struct Row {
    ts: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
    vx: Option<f64>,
    vy: Option<f64>,
    wz: Option<f64>,
    idx: Option<u64>,
}

fn cell<T: Display>(out: &mut String, v: Option<T>) {
    if let Some(v) = v {
        let _ = write!(out, "{}", v);
    }
}

/// Render the mission log as CSV. A missing log yields just the header.
pub async fn mission_log_csv(log: &Journal) -> Result<String> {
    let rows: Vec<Row> = log.read_all().await?;
    let mut out = String::with_capacity(32 * (rows.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");
    for r in rows {
        cell(&mut out, r.ts);
        for v in [r.lat, r.lon, r.vx, r.vy, r.wz] {
            out.push(',');
            cell(&mut out, v);
        }
        out.push(',');
        cell(&mut out, r.idx);
        out.push_str("\r\n");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autopilot::MissionLogRecord;

    #[tokio::test]
    async fn missing_log_is_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let csv = mission_log_csv(&Journal::new(dir.path().join("none.jsonl"))).await.unwrap();
        assert_eq!(csv, "ts,lat,lon,vx,vy,wz,idx\r\n");
    }

    #[tokio::test]
    async fn renders_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = Journal::new(dir.path().join("m.jsonl"));
        for (i, lat) in [32.0853, 32.0854].into_iter().enumerate() {
            log.append(&MissionLogRecord {
                ts: 100.5 + i as f64,
                lat,
                lon: 34.7818,
                vx: 0.5,
                vy: 0.0,
                wz: 0.0,
                idx: i,
                rtl: false,
            })
            .await
            .unwrap();
        }

        let csv = mission_log_csv(&log).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "100.5,32.0853,34.7818,0.5,0,0,0");
        assert_eq!(lines[2], "101.5,32.0854,34.7818,0.5,0,0,1");
    }

    #[tokio::test]
    async fn missing_fields_become_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("m.jsonl");
        std::fs::write(&p, "{\"ts\":1.0,\"lat\":2.0}\n").unwrap();
        let csv = mission_log_csv(&Journal::new(p)).await.unwrap();
        assert_eq!(csv.lines().nth(1), Some("1,2,,,,,"));
    }
}
