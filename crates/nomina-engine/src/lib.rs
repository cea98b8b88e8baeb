//! Payroll document lifecycle engine.
//!
//! Ties the lower crates together: aggregates a payslip into its
//! payroll payload ([`nomina_cfdi`]), seals the rendered document with
//! the company certificate ([`nomina_crypto`]), routes it through the
//! configured stamping provider ([`nomina_pac`]) and tracks the
//! document through an explicit state machine from generation to
//! cancellation, with read-only reconciliation against the tax
//! authority's published status.

pub mod engine;
pub mod error;
pub mod record;
pub mod status;
pub mod store;
pub mod telemetry;

pub use engine::{PayrollEngine, SignJob};
pub use error::EngineError;
pub use record::{cfdi_file_name, LogEntry, PayrollDocument};
pub use status::{PacStatus, SatStatus};
pub use store::{AttachmentStore, AttachmentVersion};
