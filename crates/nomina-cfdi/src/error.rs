//! Error taxonomy for document construction.

use thiserror::Error;

/// Errors raised while aggregating payroll values or rendering a document.
///
/// Aggregation errors carry enough context to point the payroll officer at
/// the offending record; they are surfaced verbatim on the document's
/// retry message when signing is driven from the lifecycle engine.
#[derive(Debug, Error)]
pub enum CfdiError {
    /// The payslip has no contract attached. Every fiscal payroll value
    /// (daily wage, seniority, integrated wage) derives from the contract,
    /// so aggregation cannot proceed without one.
    #[error("Employee has not a contract and is required")]
    MissingContract,

    /// Both a retirement lump-sum code (039) and a partial-retirement code
    /// (044) appear on the same payslip. The statutory schema admits at
    /// most one retirement modality per document.
    #[error("perception codes 039 and 044 are mutually exclusive on one payslip")]
    ConflictingRetirementCodes,

    /// A field failed domain validation while building the document.
    #[error(transparent)]
    Validation(#[from] nomina_core::ValidationError),

    /// Structural validation of the rendered document failed. All
    /// violations are collected before reporting.
    #[error("document failed structural validation: {}", issues.join("; "))]
    InvalidDocument { issues: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_contract_message_matches_operator_expectation() {
        let err = CfdiError::MissingContract;
        assert_eq!(err.to_string(), "Employee has not a contract and is required");
    }

    #[test]
    fn invalid_document_joins_issues() {
        let err = CfdiError::InvalidDocument {
            issues: vec!["missing Emisor".into(), "missing Receptor".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing Emisor; missing Receptor"));
    }

    #[test]
    fn validation_error_passes_through() {
        let inner = nomina_core::ValidationError::Missing { field: "rfc" };
        let err: CfdiError = inner.into();
        assert!(err.to_string().contains("rfc"));
    }
}
