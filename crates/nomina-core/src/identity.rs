//! # Fiscal identity newtypes
//!
//! Domain-primitive newtypes for the identifiers flowing through the engine.
//! Each identifier is a distinct type — you cannot pass a [`Curp`] where an
//! [`Rfc`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`Rfc`], [`Curp`], [`CertificateSerial`])
//! validate format at construction time. UUID-based identifiers
//! ([`PayslipId`], [`FiscalUuid`]) are always valid by construction.
//!
//! ## Reference
//!
//! - RFC: SAT federal taxpayer registry key, 12 characters for companies,
//!   13 for individuals.
//! - CURP: 18-character unique population registry code.
//! - Certificate serial: decimal digit string printed on the CSD
//!   (Certificado de Sello Digital).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-based identifiers
// ---------------------------------------------------------------------------

/// Identifier of the payslip that owns a payroll document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayslipId(Uuid);

impl PayslipId {
    /// Create a new random payslip identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a payslip identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PayslipId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PayslipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PayslipId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// Fiscal folio (UUID) assigned by the PAC when a document is stamped.
///
/// Never minted locally — it only ever comes back from a successful sign
/// response, which is why there is no `new()` constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalUuid(Uuid);

impl FiscalUuid {
    /// Wrap a UUID returned by the stamping provider.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse from the canonical hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ValidationError::invalid("fiscal uuid", e.to_string()))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for FiscalUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SAT folios are conventionally uppercase.
        write!(f, "{}", self.0.hyphenated().to_string().to_uppercase())
    }
}

// ---------------------------------------------------------------------------
// RFC
// ---------------------------------------------------------------------------

/// SAT federal taxpayer registry key (RFC).
///
/// 12 characters for companies (3 letters + 6 digits + 3 homoclave),
/// 13 for individuals (4 letters + 6 digits + 3 homoclave). `Ñ` and `&`
/// are legal in the letter prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Rfc(String);

impl Rfc {
    /// Validate and construct an RFC. Lowercase input is uppercased.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let value: String = raw.into().trim().to_uppercase();
        let chars: Vec<char> = value.chars().collect();
        let len = chars.len();
        if len != 12 && len != 13 {
            return Err(ValidationError::invalid(
                "rfc",
                format!("expected 12 or 13 characters, got {len}"),
            ));
        }
        let prefix_len = len - 9;
        if !chars[..prefix_len]
            .iter()
            .all(|c| c.is_ascii_uppercase() || *c == 'Ñ' || *c == '&')
        {
            return Err(ValidationError::invalid(
                "rfc",
                "prefix must be uppercase letters, Ñ or &",
            ));
        }
        if !chars[prefix_len..prefix_len + 6].iter().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid(
                "rfc",
                "date portion must be 6 digits",
            ));
        }
        if !chars[prefix_len + 6..]
            .iter()
            .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ValidationError::invalid(
                "rfc",
                "homoclave must be alphanumeric",
            ));
        }
        Ok(Self(value))
    }

    /// The validated RFC string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this RFC belongs to a company (12 characters).
    pub fn is_company(&self) -> bool {
        self.0.chars().count() == 12
    }
}

impl_validating_deserialize!(Rfc);

impl std::fmt::Display for Rfc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CURP
// ---------------------------------------------------------------------------

/// 18-character unique population registry code (CURP).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Curp(String);

impl Curp {
    /// Validate and construct a CURP. Lowercase input is uppercased.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let value: String = raw.into().trim().to_uppercase();
        let chars: Vec<char> = value.chars().collect();
        if chars.len() != 18 {
            return Err(ValidationError::invalid(
                "curp",
                format!("expected 18 characters, got {}", chars.len()),
            ));
        }
        if !chars[..4].iter().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::invalid(
                "curp",
                "first 4 characters must be letters",
            ));
        }
        if !chars[4..10].iter().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid(
                "curp",
                "birth date portion must be 6 digits",
            ));
        }
        if !chars[10..].iter().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::invalid(
                "curp",
                "suffix must be alphanumeric",
            ));
        }
        Ok(Self(value))
    }

    /// The validated CURP string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(Curp);

impl std::fmt::Display for Curp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Certificate serial
// ---------------------------------------------------------------------------

/// Serial number of a CSD signing certificate, as printed by the SAT
/// (a string of decimal digits, 20 in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CertificateSerial(String);

impl CertificateSerial {
    /// Validate and construct a certificate serial.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let value: String = raw.into().trim().to_string();
        if value.is_empty() || value.len() > 40 {
            return Err(ValidationError::invalid(
                "certificate serial",
                format!("expected 1-40 digits, got {}", value.len()),
            ));
        }
        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid(
                "certificate serial",
                "must contain only digits",
            ));
        }
        Ok(Self(value))
    }

    /// The validated serial string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(CertificateSerial);

impl std::fmt::Display for CertificateSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
