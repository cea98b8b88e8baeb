//! # Certificate provider abstraction
//!
//! Abstracts CSD storage behind a trait so the lifecycle engine can run
//! against an in-memory certificate in tests and an injected one in
//! production:
//!
//! - [`LocalCertificateProvider`]: wraps a [`Csd`] directly.
//! - [`EnvCertificateProvider`]: loads the Ed25519 seed from an environment
//!   variable (64 hex chars). Suitable for container deployments where
//!   secrets are injected via environment.
//!
//! Implementations must be `Send + Sync` so a provider can be shared
//! behind an `Arc` across batch workers.

use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;

use nomina_core::{CertificateSerial, Rfc};

use crate::csd::Csd;
use crate::error::CryptoError;

/// Trait for CSD storage and sealing backends.
pub trait CertificateProvider: Send + Sync {
    /// Seal a cadena, returning the base64 signature.
    fn seal(&self, cadena: &str) -> Result<String, CryptoError>;

    /// Serial number of the active certificate.
    fn serial(&self) -> &CertificateSerial;

    /// Whether the active certificate is valid at the given instant.
    fn is_valid_at(&self, at: DateTime<Utc>) -> bool;

    /// Base64 certificate body for the document's `Certificado` attribute.
    fn certificate_b64(&self) -> String;

    /// PEM certificate body, for cancellation requests.
    fn certificate_pem(&self) -> String;

    /// PEM private key, for cancellation requests.
    fn key_pem(&self) -> String;

    /// Human-readable name of this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

// ─── LocalCertificateProvider ────────────────────────────────────────────

/// In-memory certificate provider for development and testing.
#[derive(Debug)]
pub struct LocalCertificateProvider {
    csd: Csd,
}

impl LocalCertificateProvider {
    /// Wrap an existing CSD.
    pub fn new(csd: Csd) -> Self {
        Self { csd }
    }

    /// Generate a throwaway provider for tests.
    pub fn generate(serial: CertificateSerial, holder: Rfc) -> Self {
        Self {
            csd: Csd::generate(serial, holder),
        }
    }

    /// Access the wrapped CSD.
    pub fn csd(&self) -> &Csd {
        &self.csd
    }
}

impl CertificateProvider for LocalCertificateProvider {
    fn seal(&self, cadena: &str) -> Result<String, CryptoError> {
        self.csd.seal(cadena)
    }

    fn serial(&self) -> &CertificateSerial {
        self.csd.serial()
    }

    fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.csd.is_valid_at(at)
    }

    fn certificate_b64(&self) -> String {
        self.csd.certificate_b64()
    }

    fn certificate_pem(&self) -> String {
        self.csd.certificate_pem()
    }

    fn key_pem(&self) -> String {
        self.csd.key_pem()
    }

    fn provider_name(&self) -> &str {
        "LocalCertificateProvider"
    }
}

// ─── EnvCertificateProvider ──────────────────────────────────────────────

/// Loads the signing seed from an environment variable.
///
/// The variable must contain a 64-character hex string encoding the
/// 32-byte Ed25519 seed. Serial, holder and validity window are passed
/// explicitly because they come from company configuration, not from the
/// secret store.
#[derive(Debug)]
pub struct EnvCertificateProvider {
    csd: Csd,
    var_name: String,
}

impl EnvCertificateProvider {
    /// Load the seed from the named environment variable.
    pub fn from_env(
        var_name: &str,
        serial: CertificateSerial,
        holder: Rfc,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
    ) -> Result<Self, CryptoError> {
        let hex = std::env::var(var_name).map_err(|_| {
            CryptoError::InvalidKeyMaterial(format!("environment variable {var_name} not set"))
        })?;
        let bytes = hex_to_bytes(&hex)?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyMaterial(format!(
                "expected 32 bytes (64 hex chars) in {var_name}, got {} hex chars",
                hex.len()
            ))
        })?;
        let key = SigningKey::from_bytes(&seed);
        Ok(Self {
            csd: Csd::new(key, serial, holder, valid_from, valid_to),
            var_name: var_name.to_string(),
        })
    }

    /// The environment variable name this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl CertificateProvider for EnvCertificateProvider {
    fn seal(&self, cadena: &str) -> Result<String, CryptoError> {
        self.csd.seal(cadena)
    }

    fn serial(&self) -> &CertificateSerial {
        self.csd.serial()
    }

    fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.csd.is_valid_at(at)
    }

    fn certificate_b64(&self) -> String {
        self.csd.certificate_b64()
    }

    fn certificate_pem(&self) -> String {
        self.csd.certificate_pem()
    }

    fn key_pem(&self) -> String {
        self.csd.key_pem()
    }

    fn provider_name(&self) -> &str {
        "EnvCertificateProvider"
    }
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, CryptoError> {
    if hex.len() % 2 != 0 {
        return Err(CryptoError::InvalidKeyMaterial(
            "hex string has odd length".into(),
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))
        })
        .collect()
}
