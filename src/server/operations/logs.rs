//! `LOGS` (§4.14).
//!
//! Exempt from the "every operation produces exactly one audit record"
//! invariant — auditing this call would recurse into the log it is about
//! to read.

use super::OperationContext;

const AUDIT_TAIL_BYTES: u64 = 10 * 1024;

/// Returns the full multi-line reply body (including the leading
/// `SUCCESS\n`) to write verbatim to the socket.
pub async fn handle(ctx: &OperationContext) -> String {
    let Some(audit_tail) = ctx.state.audit.read_audit_tail(AUDIT_TAIL_BYTES).await else {
        return "SUCCESS No logs available\n".to_string();
    };

    let security_full = ctx.state.audit.read_security_full().await.unwrap_or_default();

    format!("SUCCESS\n=== AUDIT LOGS ===\n{audit_tail}\n=== SECURITY LOGS ===\n{security_full}")
}
