pub mod claims;
pub mod record;
pub mod sink;

pub use claims::{decode_unverified_claims, username_claim};
pub use record::{AuditPhase, AuditRecord, AuditRequest, AuditResponse};
pub use sink::{AuditSink, FileAuditSink, MemoryAuditSink, NullAuditSink, TracingAuditSink};

use std::sync::Arc;

use crate::config::{AuditConfig, AuditSinkKind};

/// Build the sink selected by configuration.
pub fn sink_from_config(config: &AuditConfig) -> std::io::Result<Arc<dyn AuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(NullAuditSink));
    }
    Ok(match config.sink {
        AuditSinkKind::File => Arc::new(FileAuditSink::spawn(&config.log_path, config.buffer_capacity)?),
        AuditSinkKind::Log => Arc::new(TracingAuditSink),
    })
}
