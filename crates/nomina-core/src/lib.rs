//! # nomina-core
//!
//! Foundational types shared across the Nomina engine crates.
//!
//! - [`identity`] — fiscal identifier newtypes (RFC, CURP, fiscal UUID,
//!   payslip id, certificate serial). Each identifier is a distinct type
//!   validated at construction.
//! - [`money`] — decimal peso amounts with the fixed two-decimal rendering
//!   required by fiscal documents.
//! - [`error`] — the shared [`ValidationError`] hierarchy.

pub mod error;
pub mod identity;
pub mod money;

pub use error::ValidationError;
pub use identity::{CertificateSerial, Curp, FiscalUuid, PayslipId, Rfc};
pub use money::Money;
