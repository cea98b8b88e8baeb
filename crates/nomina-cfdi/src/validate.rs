//! Structural validation of a document before it is offered for signing.
//!
//! Catches the failures a certification provider would reject anyway,
//! locally and with every violation listed at once, so an operator fixes
//! a payslip in one pass instead of one rejection at a time.

use std::path::PathBuf;

use rust_decimal::Decimal;
use tracing::warn;

use crate::document::CfdiDocument;
use crate::error::CfdiError;

/// Validates a document tree against the structural rules of the payroll
/// schema. All violations are collected; the result error lists every
/// message.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    /// Optional path to the published schema bundle. When configured but
    /// absent on disk, the schema pass is skipped with a warning and only
    /// the built-in structural checks run.
    schema_resource: Option<PathBuf>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_resource(path: impl Into<PathBuf>) -> Self {
        Self {
            schema_resource: Some(path.into()),
        }
    }

    /// Validate a sealed document. Returns `CfdiError::InvalidDocument`
    /// listing every violation found.
    pub fn validate(&self, document: &CfdiDocument) -> Result<(), CfdiError> {
        if let Some(resource) = &self.schema_resource {
            if !resource.exists() {
                warn!(resource = %resource.display(), "schema resource missing; skipping schema pass");
            }
        }

        let mut issues = Vec::new();

        if document.sello.as_deref().map_or(true, str::is_empty) {
            issues.push("document is not sealed (Sello missing)".to_owned());
        }
        if document.certificate_serial.is_empty() {
            issues.push("certificate serial (NoCertificado) is empty".to_owned());
        }
        if document.certificate_b64.is_empty() {
            issues.push("certificate body (Certificado) is empty".to_owned());
        }
        if document.issuer.rfc.is_empty() {
            issues.push("issuer RFC is empty".to_owned());
        }
        if document.receiver.rfc.is_empty() {
            issues.push("receiver RFC is empty".to_owned());
        }
        if document.payroll.employee.curp.is_empty() {
            issues.push("employee CURP is empty".to_owned());
        }
        if document.place_of_issue.is_empty() {
            issues.push("place of issue (LugarExpedicion) is empty".to_owned());
        }

        match (
            parse_amount(&document.subtotal),
            parse_amount(&document.discount),
            parse_amount(&document.total),
        ) {
            (Some(subtotal), Some(discount), Some(total)) => {
                if subtotal - discount != total {
                    issues.push(format!(
                        "totals do not balance: {} - {} != {}",
                        document.subtotal, document.discount, document.total
                    ));
                }
            }
            _ => issues.push("document amounts are not valid decimals".to_owned()),
        }

        // ISO dates compare lexically.
        if document.payroll.date_from > document.payroll.date_to {
            issues.push(format!(
                "pay period is inverted: {} > {}",
                document.payroll.date_from, document.payroll.date_to
            ));
        }
        if document.payroll.days_paid == "0" {
            issues.push("zero days paid".to_owned());
        }

        if let Some(perceptions) = &document.payroll.perceptions {
            let entry_sum: Option<Decimal> = perceptions
                .entries
                .iter()
                .map(|e| Some(parse_amount(&e.taxed)? + parse_amount(&e.exempt)?))
                .sum();
            let declared = parse_amount(&perceptions.total_taxed)
                .zip(parse_amount(&perceptions.total_exempt))
                .map(|(g, e)| g + e);
            match (entry_sum, declared) {
                (Some(sum), Some(declared)) if sum != declared => {
                    issues.push(format!(
                        "perception entries sum to {sum} but totals declare {declared}"
                    ));
                }
                (None, _) | (_, None) => {
                    issues.push("perception amounts are not valid decimals".to_owned());
                }
                _ => {}
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(CfdiError::InvalidDocument { issues })
        }
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    raw.parse().ok()
}
