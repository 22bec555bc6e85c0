//! Persisted pipeline reports.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::{CalendarError, Result};
use crate::pipeline::PipelineReport;

pub const REPORT_FILE: &str = "pipeline.json";
pub const DIGEST_FILE: &str = "pipeline.digest";

/// SHA-256 of `bytes`, lowercase hex.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/<run_id>/pipeline.json` and `<dir>/<run_id>/pipeline.digest`.
pub fn write_pipeline_report(report: &PipelineReport, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(&report.run_id);
    std::fs::create_dir_all(&run_dir)?;

    let path = run_dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(report)?;
    std::fs::write(&path, &json)?;
    std::fs::write(run_dir.join(DIGEST_FILE), digest_hex(&json).as_bytes())?;

    Ok(path)
}

/// Read `<dir>/<run_id>/pipeline.json`, verifying it against its digest.
pub fn read_pipeline_report(run_id: &str, dir: &Path) -> Result<PipelineReport> {
    let run_dir = dir.join(run_id);
    let json = std::fs::read(run_dir.join(REPORT_FILE))?;
    let expected = std::fs::read_to_string(run_dir.join(DIGEST_FILE))?;

    let actual = digest_hex(&json);
    if expected.trim() != actual {
        return Err(CalendarError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }
    Ok(serde_json::from_slice(&json)?)
}
