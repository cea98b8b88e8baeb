//! Structured errors for certificate and sealing operations.

use thiserror::Error;

/// Errors from certificate operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The certificate is outside its validity window.
    #[error("certificate {serial} is not valid at {at}: valid {from} to {to}")]
    CertificateExpired {
        /// Serial of the offending certificate.
        serial: String,
        /// The instant validity was checked for.
        at: String,
        /// Start of the validity window.
        from: String,
        /// End of the validity window.
        to: String,
    },

    /// No certificate is configured at all.
    #[error("no valid certificate found")]
    NoCertificate,

    /// Key material could not be loaded or decoded.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Sealing failed.
    #[error("seal operation failed: {0}")]
    SealFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_display_names_serial_and_window() {
        let err = CryptoError::CertificateExpired {
            serial: "30001000000400002434".into(),
            at: "2026-08-01".into(),
            from: "2022-01-01".into(),
            to: "2026-01-01".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("30001000000400002434"));
        assert!(msg.contains("2026-01-01"));
    }

    #[test]
    fn no_certificate_display() {
        assert_eq!(
            CryptoError::NoCertificate.to_string(),
            "no valid certificate found"
        );
    }
}
