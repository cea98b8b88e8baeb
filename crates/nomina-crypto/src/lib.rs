//! # nomina-crypto — certificate provider for the Nomina engine
//!
//! The engine never touches key material directly: it asks a
//! [`CertificateProvider`] to seal a cadena and to report whether the
//! underlying CSD (Certificado de Sello Digital) is currently valid.
//!
//! - [`Csd`] — an in-memory key/certificate pair with a validity window.
//! - [`CertificateProvider`] — the trait the lifecycle engine consumes.
//! - [`LocalCertificateProvider`] / [`EnvCertificateProvider`] — backends
//!   for development and container deployments.
//!
//! The signing primitive is Ed25519; the seal is the base64 signature over
//! the UTF-8 cadena bytes. Anything that changes a single byte of the
//! cadena changes the seal.

pub mod csd;
pub mod error;
pub mod provider;

pub use csd::Csd;
pub use error::CryptoError;
pub use provider::{CertificateProvider, EnvCertificateProvider, LocalCertificateProvider};

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of a byte slice.
///
/// Used for attachment content fingerprints and drift detection between
/// regenerations of the same document.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_64_lowercase_hex_chars() {
        let hex = sha256_hex(b"cadena");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn sha256_hex_is_deterministic() {
        assert_eq!(sha256_hex(b"x"), sha256_hex(b"x"));
        assert_ne!(sha256_hex(b"x"), sha256_hex(b"y"));
    }
}
