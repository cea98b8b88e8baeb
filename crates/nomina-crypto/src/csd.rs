//! # CSD key/certificate pair
//!
//! A [`Csd`] bundles a signing key, the certificate serial the SAT printed
//! for it, the holder RFC, and the validity window. It is the only type in
//! the workspace that can produce a seal.
//!
//! Key material is zeroized on drop via `ed25519_dalek`'s `zeroize`
//! integration.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use nomina_core::{CertificateSerial, Rfc};

use crate::error::CryptoError;

/// An in-memory CSD: signing key, serial, holder and validity window.
pub struct Csd {
    key: SigningKey,
    serial: CertificateSerial,
    holder: Rfc,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
}

impl Csd {
    /// Assemble a CSD from its parts.
    pub fn new(
        key: SigningKey,
        serial: CertificateSerial,
        holder: Rfc,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            serial,
            holder,
            valid_from,
            valid_to,
        }
    }

    /// Generate a throwaway CSD for tests and development, valid for one
    /// year around `now`.
    pub fn generate(serial: CertificateSerial, holder: Rfc) -> Self {
        let now = Utc::now();
        Self {
            key: SigningKey::generate(&mut rand_core::OsRng),
            serial,
            holder,
            valid_from: now - chrono::Duration::days(30),
            valid_to: now + chrono::Duration::days(365),
        }
    }

    /// The SAT-printed serial of this certificate.
    pub fn serial(&self) -> &CertificateSerial {
        &self.serial
    }

    /// RFC of the certificate holder (the employer).
    pub fn holder(&self) -> &Rfc {
        &self.holder
    }

    /// Whether the certificate is inside its validity window at `at`.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at <= self.valid_to
    }

    /// Seal a cadena: sign its UTF-8 bytes and return the base64 signature.
    ///
    /// Refuses to seal with an expired certificate — an invalid seal would
    /// be rejected by the PAC anyway, but failing locally gives a clearer
    /// message.
    pub fn seal(&self, cadena: &str) -> Result<String, CryptoError> {
        let now = Utc::now();
        if !self.is_valid_at(now) {
            return Err(CryptoError::CertificateExpired {
                serial: self.serial.to_string(),
                at: now.to_rfc3339(),
                from: self.valid_from.to_rfc3339(),
                to: self.valid_to.to_rfc3339(),
            });
        }
        let signature = self.key.sign(cadena.as_bytes());
        Ok(BASE64.encode(signature.to_bytes()))
    }

    /// Base64 of the public certificate body, as embedded in the document's
    /// `Certificado` attribute.
    pub fn certificate_b64(&self) -> String {
        BASE64.encode(self.key.verifying_key().as_bytes())
    }

    /// PEM-wrapped certificate body, as required by cancellation requests.
    pub fn certificate_pem(&self) -> String {
        pem_wrap("CERTIFICATE", self.key.verifying_key().as_bytes())
    }

    /// PEM-wrapped private key, as required by cancellation requests.
    pub fn key_pem(&self) -> String {
        pem_wrap("PRIVATE KEY", &self.key.to_bytes())
    }

    /// Verifying key, for seal checks in tests.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl std::fmt::Debug for Csd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("Csd")
            .field("serial", &self.serial)
            .field("holder", &self.holder)
            .field("valid_from", &self.valid_from)
            .field("valid_to", &self.valid_to)
            .finish_non_exhaustive()
    }
}

fn pem_wrap(label: &str, der: &[u8]) -> String {
    let body = BASE64.encode(der);
    let wrapped: Vec<&str> = body
        .as_bytes()
        .chunks(64)
        .map(|c| std::str::from_utf8(c).expect("base64 is ascii"))
        .collect();
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
        wrapped.join("\n")
    )
}
