//! Tax authority status lookup (ConsultaCFDI).
//!
//! Read-only: given the (issuer RFC, receiver RFC, total, folio) tuple
//! printed on the document, the authority reports whether it currently
//! considers the document valid, cancelled, or unknown. The raw status
//! string is returned untouched; the lifecycle engine owns the mapping
//! onto its status enum.

use std::time::Duration;

use nomina_core::FiscalUuid;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PacError;
use crate::retry::retry_send;

const DEFAULT_BASE_URL: &str = "https://consultaqr.facturaelectronica.sat.gob.mx";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Lookup key for one document.
#[derive(Debug, Clone, Serialize)]
pub struct SatQuery {
    /// Issuer RFC (`re` parameter).
    pub issuer_rfc: String,
    /// Receiver RFC (`rr` parameter).
    pub receiver_rfc: String,
    /// Document total, two-decimal string (`tt` parameter).
    pub total: String,
    /// Fiscal folio (`id` parameter).
    pub fiscal_uuid: FiscalUuid,
}

/// Authority answer for one document.
#[derive(Debug, Clone, Deserialize)]
pub struct SatStatusReport {
    /// Status string as published: "Vigente", "Cancelado", "No Encontrado".
    #[serde(rename = "Estado")]
    pub status: String,
    /// Whether the document is currently cancellable, when reported.
    #[serde(rename = "EsCancelable", default)]
    pub cancellable: Option<String>,
    /// Cancellation process status, when one is underway.
    #[serde(rename = "EstatusCancelacion", default)]
    pub cancellation_status: Option<String>,
}

/// HTTP client for the authority's consultation service.
#[derive(Debug)]
pub struct SatClient {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl SatClient {
    /// Client against the published production service.
    pub fn new() -> Result<Self, PacError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against an alternate endpoint (stubs in tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, PacError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PacError::ServiceUnavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Query the authority for one document's status.
    pub fn status(&self, query: &SatQuery) -> Result<SatStatusReport, PacError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| {
            PacError::ServiceUnavailable {
                reason: "no async runtime available for HTTP request".into(),
            }
        })?;

        let url = format!("{}/ConsultaCFDIService.svc", self.base_url);
        let folio = query.fiscal_uuid.to_string();
        let params = [
            ("re", query.issuer_rfc.as_str()),
            ("rr", query.receiver_rfc.as_str()),
            ("tt", query.total.as_str()),
            ("id", folio.as_str()),
        ];

        rt.block_on(async {
            let resp = retry_send(|| self.client.get(&url).query(&params).send())
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        PacError::Timeout {
                            elapsed_ms: self.timeout_secs * 1000,
                        }
                    } else {
                        PacError::ServiceUnavailable {
                            reason: format!("consulta: {e}"),
                        }
                    }
                })?;

            if resp.status().is_server_error() {
                let status = resp.status();
                return Err(PacError::ServiceUnavailable {
                    reason: format!("consulta: HTTP {status}"),
                });
            }

            let report: SatStatusReport =
                resp.json().await.map_err(|e| PacError::MalformedResponse {
                    reason: format!("consulta: {e}"),
                })?;
            debug!(folio = %query.fiscal_uuid, status = %report.status, "authority status");
            Ok(report)
        })
    }
}
