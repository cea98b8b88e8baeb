//! Statutory code metadata injected into payload aggregation.
//!
//! The authority publishes the perception/deduction/other-payment code
//! tables and the inability categories; this module holds the subset the
//! aggregator needs to branch on. The catalog is injected rather than
//! hard-coded inside the aggregator so deployments can extend it when the
//! published tables change without touching aggregation logic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which side of the payslip a statutory line lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineCategory {
    /// Perception amount subject to tax (ImporteGravado).
    PerceptionTaxed,
    /// Perception amount exempt from tax (ImporteExento).
    PerceptionExempt,
    /// Deduction (Deduccion).
    Deduction,
    /// Other payment (OtroPago), e.g. employment subsidy.
    OtherPayment,
}

/// The four statutory inability categories.
///
/// Each maps to a two-digit inability type on the document and to the
/// internal leave code the HR system tags absence lines with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InabilityKind {
    /// Work-risk inability (type `01`).
    WorkRisk,
    /// General disease (type `02`).
    Disease,
    /// Maternity (type `03`).
    Maternity,
    /// Medical-care license for children with cancer (type `04`).
    ChildCareLicense,
}

impl InabilityKind {
    /// Two-digit inability type code carried on the document.
    pub fn type_code(self) -> &'static str {
        match self {
            InabilityKind::WorkRisk => "01",
            InabilityKind::Disease => "02",
            InabilityKind::Maternity => "03",
            InabilityKind::ChildCareLicense => "04",
        }
    }

    /// Resolve a kind from the HR system's internal leave code.
    pub fn from_leave_code(code: &str) -> Option<Self> {
        match code {
            "LEAVE112" => Some(InabilityKind::WorkRisk),
            "LEAVE110" => Some(InabilityKind::Disease),
            "LEAVE111" => Some(InabilityKind::Maternity),
            "LEAVE113" => Some(InabilityKind::ChildCareLicense),
            _ => None,
        }
    }
}

/// Metadata for one statutory code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntry {
    /// Three-digit statutory code, e.g. `"002"`.
    pub code: String,
    /// Human-readable label from the published table.
    pub label: String,
}

/// Injected lookup over the published statutory code tables.
///
/// The aggregator only ever asks two questions of the catalog: "is this
/// code known?" and "what is its label?". Branching on *specific* codes
/// (separation, retirement, ISR) stays in the aggregator because those
/// semantics are statutory, not configurable.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    perceptions: HashMap<String, CodeEntry>,
    deductions: HashMap<String, CodeEntry>,
    other_payments: HashMap<String, CodeEntry>,
}

impl RuleCatalog {
    /// Empty catalog. Lookups all miss; useful for tests that exercise
    /// unknown-code handling.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog preloaded with the statutory codes the aggregator branches
    /// on. Deployments extend this with the full published tables.
    pub fn statutory() -> Self {
        let mut catalog = Self::default();
        for (code, label) in [
            ("001", "Sueldos, Salarios Rayas y Jornales"),
            ("002", "Gratificación Anual (Aguinaldo)"),
            ("022", "Prima por antigüedad"),
            ("023", "Pagos por separación"),
            ("025", "Indemnizaciones"),
            ("039", "Jubilaciones, pensiones o haberes de retiro"),
            ("044", "Jubilaciones, pensiones o haberes de retiro en parcialidades"),
            ("014", "Subsidio por incapacidad"),
        ] {
            catalog.add_perception(code, label);
        }
        for (code, label) in [
            ("001", "Seguridad social"),
            ("002", "ISR"),
            ("006", "Descuento por incapacidad"),
        ] {
            catalog.add_deduction(code, label);
        }
        catalog.add_other_payment("002", "Subsidio para el empleo");
        catalog
    }

    pub fn add_perception(&mut self, code: &str, label: &str) {
        self.perceptions.insert(
            code.to_owned(),
            CodeEntry {
                code: code.to_owned(),
                label: label.to_owned(),
            },
        );
    }

    pub fn add_deduction(&mut self, code: &str, label: &str) {
        self.deductions.insert(
            code.to_owned(),
            CodeEntry {
                code: code.to_owned(),
                label: label.to_owned(),
            },
        );
    }

    pub fn add_other_payment(&mut self, code: &str, label: &str) {
        self.other_payments.insert(
            code.to_owned(),
            CodeEntry {
                code: code.to_owned(),
                label: label.to_owned(),
            },
        );
    }

    pub fn perception(&self, code: &str) -> Option<&CodeEntry> {
        self.perceptions.get(code)
    }

    pub fn deduction(&self, code: &str) -> Option<&CodeEntry> {
        self.deductions.get(code)
    }

    pub fn other_payment(&self, code: &str) -> Option<&CodeEntry> {
        self.other_payments.get(code)
    }
}
