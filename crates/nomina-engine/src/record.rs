//! The per-payslip document record the engine tracks.

use chrono::{DateTime, NaiveDateTime, Utc};
use nomina_core::{FiscalUuid, PayslipId};
use serde::{Deserialize, Serialize};

use crate::status::{PacStatus, SatStatus};

/// One operator-visible log line attached to a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub body: String,
}

/// Lifecycle record for one payslip's fiscal document.
///
/// Invariant: `fiscal_uuid` only ever comes from a successful stamp and
/// is held until the provider confirms revocation. A stamped document
/// that later degrades (re-signature attempt, configuration failure)
/// keeps its folio while sitting in `ToSign` or `Retry`, and
/// cancellation routes on folio presence: with a folio the provider is
/// always asked to revoke; without one the document cancels locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollDocument {
    pub payslip_id: PayslipId,
    /// Attachment file name derived from the payslip number.
    pub cfdi_name: String,
    pub status: PacStatus,
    /// Provider name the document is routed to for sign and cancel.
    pub provider: String,
    pub fiscal_uuid: Option<FiscalUuid>,
    pub supplier_rfc: String,
    pub customer_rfc: String,
    /// Document total as rendered, two decimals.
    pub total_amount: String,
    pub certificate_serial: String,
    /// Cached original string the seal was computed over.
    pub cadena: Option<String>,
    /// Issue instant fixed at first generation so a re-signature of
    /// identical inputs reproduces the same cadena.
    pub issued_at: Option<NaiveDateTime>,
    pub sat_status: SatStatus,
    pub messages: Vec<LogEntry>,
}

impl PayrollDocument {
    /// Fresh record for a payslip that has not been generated yet.
    pub fn new(payslip_id: PayslipId, number: &str, provider: &str) -> Self {
        Self {
            payslip_id,
            cfdi_name: cfdi_file_name(number),
            status: PacStatus::NeedsGeneration,
            provider: provider.to_owned(),
            fiscal_uuid: None,
            supplier_rfc: String::new(),
            customer_rfc: String::new(),
            total_amount: String::new(),
            certificate_serial: String::new(),
            cadena: None,
            issued_at: None,
            sat_status: SatStatus::Undefined,
            messages: Vec::new(),
        }
    }

    /// Append an operator-visible message.
    pub fn log(&mut self, body: impl Into<String>) {
        self.messages.push(LogEntry {
            at: Utc::now(),
            body: body.into(),
        });
    }

    /// The most recent logged message, if any.
    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(|m| m.body.as_str())
    }

    /// Move the document to `to`, asserting the edge is legal in debug
    /// builds. All status writes go through here so an illegal move is
    /// caught next to the code that attempted it.
    pub fn transition(&mut self, to: PacStatus) {
        debug_assert!(
            self.status.can_transition(to),
            "illegal status transition {:?} -> {:?} for {}",
            self.status,
            to,
            self.payslip_id
        );
        self.status = to;
    }
}

/// Attachment file name for a payslip number: slashes stripped, fixed
/// schema-version suffix.
pub fn cfdi_file_name(number: &str) -> String {
    format!("{}-MX-Payroll-3-3.xml", number.replace('/', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_strips_slashes() {
        assert_eq!(cfdi_file_name("SLIP/00042"), "SLIP00042-MX-Payroll-3-3.xml");
    }

    #[test]
    fn new_record_needs_generation_and_has_no_folio() {
        let record = PayrollDocument::new(PayslipId::new(), "SLIP/7", "finkok");
        assert_eq!(record.status, PacStatus::NeedsGeneration);
        assert!(record.fiscal_uuid.is_none());
        assert_eq!(record.sat_status, SatStatus::Undefined);
    }

    #[test]
    fn transition_follows_legal_edges() {
        let mut record = PayrollDocument::new(PayslipId::new(), "S/1", "mock");
        record.transition(PacStatus::ToSign);
        record.transition(PacStatus::Signed);
        assert_eq!(record.status, PacStatus::Signed);
    }

    #[test]
    #[should_panic(expected = "illegal status transition")]
    fn transition_rejects_leaving_cancelled() {
        let mut record = PayrollDocument::new(PayslipId::new(), "S/2", "mock");
        record.status = PacStatus::Cancelled;
        record.transition(PacStatus::ToSign);
    }

    #[test]
    fn log_keeps_order() {
        let mut record = PayrollDocument::new(PayslipId::new(), "S/1", "mock");
        record.log("first");
        record.log("second");
        assert_eq!(record.last_message(), Some("second"));
        assert_eq!(record.messages.len(), 2);
    }
}
