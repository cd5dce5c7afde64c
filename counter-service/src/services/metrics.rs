//! Counter-specific metrics, recorded through the `metrics` facade.
//!
//! Export is handled by service-core's Prometheus recorder.

use metrics::counter;

pub const OPERATIONS_TOTAL: &str = "counter_operations_total";
pub const DOCUMENTS_CREATED_TOTAL: &str = "counter_documents_created_total";

/// Count a completed counter operation (`get` or `increment`).
pub fn record_operation(operation: &'static str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    counter!(OPERATIONS_TOTAL, "operation" => operation, "status" => status).increment(1);
}

pub fn record_document_created() {
    counter!(DOCUMENTS_CREATED_TOTAL).increment(1);
}
