use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use gramstat_core::{GramstatConfig, UsagePacket};
use gramstat_ingest::{UploadReport, Uploader};
use gramstat_store::{DnsCache, UsageStore};
use tracing::{info, warn};

/// Totals for a whole input.
#[derive(Debug, Default)]
pub struct UploadSummary {
    pub report: UploadReport,
    /// Lines that were not valid packets.
    pub rejected: usize,
    pub batches: usize,
}

impl UploadSummary {
    pub fn is_clean(&self) -> bool {
        self.rejected == 0 && self.report.is_clean()
    }
}

fn open_input(input: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if input == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

pub fn run(config: &GramstatConfig, input: &Path) -> anyhow::Result<UploadSummary> {
    let mut store = UsageStore::open(&config.database.path)?;
    let reader = open_input(input)?;
    let summary = upload_lines(&mut store, reader, config.ingest.batch_size)?;

    for err in &summary.report.failed {
        eprintln!("✗ {err}");
    }
    println!(
        "✓ {} packets stored, {} failed, {} rejected lines",
        summary.report.inserted,
        summary.report.failed.len(),
        summary.rejected
    );
    Ok(summary)
}

/// Read packets line by line and upload them in transactions of
/// `batch_size` packets. One uploader serves the whole input.
pub fn upload_lines(
    store: &mut UsageStore,
    reader: impl BufRead,
    batch_size: usize,
) -> anyhow::Result<UploadSummary> {
    let batch_size = batch_size.max(1);
    let mut uploader = Uploader::new(DnsCache::new())?;
    let mut summary = UploadSummary::default();
    let mut batch = Vec::with_capacity(batch_size);

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match UsagePacket::from_json_line(&line) {
            Ok(packet) => batch.push(packet),
            Err(err) => {
                warn!(line = number + 1, error = %err, "skipping malformed packet line");
                summary.rejected += 1;
            }
        }
        if batch.len() == batch_size {
            flush(store, &mut uploader, &mut batch, &mut summary)?;
        }
    }
    if !batch.is_empty() {
        flush(store, &mut uploader, &mut batch, &mut summary)?;
    }

    info!(
        batches = summary.batches,
        inserted = summary.report.inserted,
        failed = summary.report.failed.len(),
        rejected = summary.rejected,
        "upload finished"
    );
    Ok(summary)
}

fn flush(
    store: &mut UsageStore,
    uploader: &mut Uploader<DnsCache>,
    batch: &mut Vec<UsagePacket>,
    summary: &mut UploadSummary,
) -> anyhow::Result<()> {
    let report = uploader.upload_batch(store.connection_mut(), batch.as_slice())?;
    summary.batches += 1;
    summary.report.absorb(report);
    batch.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: &str = r#"
{"kind":"job_manager_status","sender":"192.0.2.1","send_time":1222135000.0,"fields":{"A":"1222131400","B":"jm-1","E":"pbs"}}
{"kind":"job_status","sender":"192.0.2.1","send_time":1222135001.0,"fields":{"B":"jm-1","6":"/bin/true"}}
not json
{"kind":"job_status","sender":"192.0.2.1","send_time":1222135002.0,"fields":{"B":"jm-1","k":"NaN-ish"}}
{"kind":"job_status","sender":"192.0.2.1","send_time":1222135003.0,"fields":{"B":"jm-1","6":"/bin/true"}}
"#;

    #[test]
    fn uploads_in_batches_and_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = UsageStore::open(&dir.path().join("usage.db")).unwrap();

        let summary = upload_lines(&mut store, LINES.as_bytes(), 2).unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.report.inserted, 3);
        assert_eq!(summary.report.failed.len(), 1);
        assert!(!summary.is_clean());
        assert_eq!(store.row_count("gram5_jobs").unwrap(), 2);
        assert_eq!(store.row_count("gram5_executable").unwrap(), 1);
        assert_eq!(store.row_count("gram5_job_manager_instances").unwrap(), 1);
    }
}
