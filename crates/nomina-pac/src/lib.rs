//! # nomina-pac — certification provider gateways
//!
//! Every payroll document must be stamped by an authorized certification
//! provider (PAC) before it is fiscally valid, and cancelled through one
//! when it is voided. This crate abstracts over providers:
//!
//! - [`gateway`] — the [`PacGateway`] trait with normalized sign/cancel
//!   outcomes, plus a programmable mock for tests.
//! - [`config`] — per-provider credentials and endpoint resolution with
//!   test/production environments.
//! - [`registry`] — maps a configured provider name to its gateway;
//!   unknown names resolve to `None` and callers skip the operation.
//! - [`solucion_factible`], [`finkok`] — HTTP adapters for the two
//!   supported providers.
//! - [`sat`] — read-only status lookup against the tax authority's
//!   ConsultaCFDI service.
//! - [`retry`] — exponential backoff for transient transport failures.
//!
//! Gateways expose a sync, object-safe surface; HTTP implementations
//! bridge onto the ambient tokio runtime internally.

pub mod config;
pub mod error;
pub mod finkok;
pub mod gateway;
pub mod registry;
pub mod retry;
pub mod sat;
pub mod solucion_factible;

pub use config::{PacConfig, PacEnvironment, PacService};
pub use error::PacError;
pub use finkok::FinkokGateway;
pub use gateway::{
    CancelOutcome, CancellationRequest, MockPacGateway, PacGateway, SignOutcome, SignRequest,
};
pub use registry::PacRegistry;
pub use sat::{SatClient, SatQuery, SatStatusReport};
pub use solucion_factible::SolucionFactibleGateway;
