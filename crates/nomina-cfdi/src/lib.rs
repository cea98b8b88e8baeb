//! # nomina-cfdi — CFDI payroll document construction
//!
//! Everything between "a computed payslip" and "bytes ready to send to a
//! PAC" lives here:
//!
//! - [`input`] — the read-only payslip view consumed from the HR system
//!   (lines, contract, employee, worked days).
//! - [`catalog`] — injected statutory code/rule metadata, including the
//!   four inability categories.
//! - [`payload`] — the payroll value aggregator: perception/deduction/
//!   other-payment totals, extra nodes, seniority rounding.
//! - [`document`] — the typed document tree and its deterministic
//!   serializer. Two renders of the same tree are byte-identical.
//! - [`cadena`] — derivation of the original string that gets sealed.
//! - [`validate`] — structural validation before any signing attempt.
//!
//! ## Pipeline
//!
//! ```text
//! PayslipInput ──compute_payload──▶ PayrollPayload
//!              ──build_document───▶ CfdiDocument (unsealed)
//!              ──cadena───────────▶ original string ──seal──▶ Sello
//!              ──to_xml───────────▶ rendered bytes
//! ```
//!
//! The cadena is a pure function of document content: any byte difference
//! between two renders invalidates the seal, so every formatting decision
//! in this crate is deterministic by construction.

pub mod cadena;
pub mod catalog;
pub mod document;
pub mod error;
pub mod input;
pub mod payload;
pub mod validate;

pub use cadena::{CadenaTransform, PipeDelimited};
pub use catalog::{InabilityKind, LineCategory, RuleCatalog};
pub use document::{build_document, CfdiDocument};
pub use error::CfdiError;
pub use input::{Company, Contract, Employee, PayslipInput, PayslipLine, WorkedDays};
pub use payload::{compute_payload, ExtraNode, PayrollPayload};
pub use validate::SchemaValidator;
