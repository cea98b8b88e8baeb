//! Lifecycle error taxonomy.

use nomina_core::PayslipId;
use thiserror::Error;

/// Errors raised by the lifecycle engine itself.
///
/// Most failures in this system do not surface here at all: aggregation,
/// rendering, sealing and gateway failures degrade the document to a
/// status plus a logged message so a batch keeps moving. `EngineError`
/// is reserved for caller mistakes (asking for a transition the state
/// machine forbids, racing a document already in flight) and for the
/// few construction paths that have no document to degrade.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested transition is not in the lifecycle table.
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Another operation currently holds the document's single-flight
    /// guard.
    #[error("payslip {payslip_id} already has an operation in flight")]
    Busy { payslip_id: PayslipId },

    /// No document record exists for the payslip.
    #[error("no payroll document for payslip {payslip_id}")]
    UnknownDocument { payslip_id: PayslipId },

    /// Aggregation or validation failure.
    #[error(transparent)]
    Cfdi(#[from] nomina_cfdi::CfdiError),

    /// Certificate or sealing failure.
    #[error(transparent)]
    Crypto(#[from] nomina_crypto::CryptoError),

    /// Provider transport failure.
    #[error(transparent)]
    Pac(#[from] nomina_pac::PacError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_both_states() {
        let err = EngineError::InvalidTransition {
            from: "cancelled".into(),
            to: "to_sign".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid lifecycle transition from cancelled to to_sign"
        );
    }

    #[test]
    fn busy_error_names_the_payslip() {
        let id = PayslipId::new();
        let err = EngineError::Busy { payslip_id: id };
        assert!(err.to_string().contains(&id.to_string()));
    }
}
