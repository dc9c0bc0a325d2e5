use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, warn};

use super::record::AuditRecord;

pub const AUDIT_TARGET: &str = "audit";
pub const AUDIT_FILE: &str = "audit.log";

/// Destination for completed audit records.
///
/// `emit` is called on the request path and must not block.
pub trait AuditSink: Send + Sync {
    fn emit(&self, record: AuditRecord);
}

fn render(record: &AuditRecord) -> Option<String> {
    match record.to_line() {
        Ok(line) => Some(line),
        Err(e) => {
            warn!("Dropping audit record {}: {}", record.correlation_id, e);
            None
        }
    }
}

/// Appends one JSON line per record to `<dir>/audit.log` from a background
/// writer task fed by a bounded channel.
pub struct FileAuditSink {
    tx: mpsc::Sender<String>,
    path: PathBuf,
}

impl FileAuditSink {
    /// Opens the file up front so a bad path fails at startup. Must be called
    /// inside a tokio runtime.
    pub fn spawn(dir: impl AsRef<Path>, capacity: usize) -> std::io::Result<Self> {
        let path = dir.as_ref().join(AUDIT_FILE);
        let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
        let mut file = tokio::fs::File::from_std(file);

        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
        let writer_path = path.clone();
        tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    error!("Failed to write audit record to {}: {}", writer_path.display(), e);
                    continue;
                }
                if let Err(e) = file.flush().await {
                    error!("Failed to flush {}: {}", writer_path.display(), e);
                }
            }
        });

        Ok(Self { tx, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn emit(&self, record: AuditRecord) {
        let Some(line) = render(&record) else {
            return;
        };
        match self.tx.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Audit buffer full, dropped record {}", record.correlation_id);
            }
            Err(TrySendError::Closed(_)) => {
                error!("Audit writer stopped, dropped record {}", record.correlation_id);
            }
        }
    }
}

/// Emits records on the `audit` tracing target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, record: AuditRecord) {
        if let Some(line) = render(&record) {
            tracing::info!(target: AUDIT_TARGET, "{}", line);
        }
    }
}

/// Auditing switched off.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn emit(&self, _record: AuditRecord) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, record: AuditRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
