//! Solución Factible stamping gateway.
//!
//! Wraps the provider's Timbrado service. The provider reports a global
//! status plus a per-document result list; a stamp is good only when the
//! document result carries status 200 with the stamped bytes, and a
//! cancellation only when the folio status is 201 (cancelled) or 202
//! (already cancelled).

use std::time::Duration;

use nomina_core::FiscalUuid;
use serde::Deserialize;
use tracing::info;

use crate::config::{PacConfig, PacService};
use crate::error::PacError;
use crate::gateway::{CancelOutcome, CancellationRequest, PacGateway, SignOutcome, SignRequest};
use crate::retry::retry_send;

/// Folio status codes the provider reports for a successful cancel.
const CANCEL_OK_CODES: [&str; 2] = ["201", "202"];

/// HTTP gateway for the Solución Factible Timbrado service.
#[derive(Debug)]
pub struct SolucionFactibleGateway {
    client: reqwest::Client,
    config: PacConfig,
}

#[derive(Debug, Deserialize)]
struct SfResponse {
    status: u32,
    #[serde(default)]
    mensaje: Option<String>,
    #[serde(default)]
    resultados: Vec<SfResult>,
}

#[derive(Debug, Deserialize)]
struct SfResult {
    status: u32,
    #[serde(default)]
    mensaje: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(rename = "cfdiTimbrado", default)]
    cfdi_timbrado: Option<String>,
    #[serde(rename = "statusUUID", default)]
    status_uuid: Option<String>,
}

impl SolucionFactibleGateway {
    pub fn new(config: PacConfig) -> Result<Self, PacError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PacError::ServiceUnavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, service: PacService) -> Result<String, PacError> {
        self.config
            .endpoint(service)
            .ok_or_else(|| PacError::NotConfigured {
                reason: format!(
                    "no endpoint for provider {:?} in {:?}",
                    self.config.provider, self.config.environment
                ),
            })
    }

    fn credentials(&self) -> Result<(String, String), PacError> {
        self.config.credentials().ok_or_else(|| PacError::NotConfigured {
            reason: "missing Solución Factible credentials".into(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        operation: &str,
    ) -> Result<SfResponse, PacError> {
        let resp = retry_send(|| self.client.post(url).json(body).send())
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PacError::Timeout {
                        elapsed_ms: self.config.timeout_secs * 1000,
                    }
                } else {
                    PacError::ServiceUnavailable {
                        reason: format!("{operation}: {e}"),
                    }
                }
            })?;

        if resp.status().is_server_error() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PacError::ServiceUnavailable {
                reason: format!("{operation}: HTTP {status}: {body}"),
            });
        }

        resp.json().await.map_err(|e| PacError::MalformedResponse {
            reason: format!("{operation}: {e}"),
        })
    }
}

impl PacGateway for SolucionFactibleGateway {
    fn sign(&self, request: &SignRequest) -> Result<SignOutcome, PacError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| {
            PacError::ServiceUnavailable {
                reason: "no async runtime available for HTTP request".into(),
            }
        })?;

        let url = self.endpoint(PacService::Sign)?;
        let (username, password) = self.credentials()?;
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "cfdi": request.document_xml,
            "zip": false,
        });

        let response = rt.block_on(self.post_json(&url, &body, "timbrado"))?;

        let Some(result) = response.resultados.into_iter().next() else {
            return Ok(SignOutcome::Rejected {
                code: Some(response.status.to_string()),
                message: response
                    .mensaje
                    .unwrap_or_else(|| "empty result list from provider".to_owned()),
            });
        };

        if result.status == 200 {
            let uuid = result.uuid.as_deref().unwrap_or_default();
            let fiscal_uuid =
                FiscalUuid::parse(uuid).map_err(|e| PacError::MalformedResponse {
                    reason: format!("provider returned invalid folio {uuid:?}: {e}"),
                })?;
            let signed_xml = result.cfdi_timbrado.ok_or_else(|| {
                PacError::MalformedResponse {
                    reason: "status 200 without stamped document".into(),
                }
            })?;
            info!(issuer = %request.issuer_rfc, folio = %fiscal_uuid, "document stamped");
            Ok(SignOutcome::Signed {
                signed_xml,
                fiscal_uuid,
            })
        } else {
            Ok(SignOutcome::Rejected {
                code: Some(result.status.to_string()),
                message: result.mensaje.unwrap_or_default(),
            })
        }
    }

    fn cancel(&self, request: &CancellationRequest) -> Result<CancelOutcome, PacError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| {
            PacError::ServiceUnavailable {
                reason: "no async runtime available for HTTP request".into(),
            }
        })?;

        let url = self.endpoint(PacService::Cancel)?;
        let (username, password) = self.credentials()?;
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "uuids": [request.fiscal_uuid.to_string()],
            "cer": request.certificate_pem,
            "key": request.key_pem,
            "password_key": request.key_password,
        });

        let response = rt.block_on(self.post_json(&url, &body, "cancelacion"))?;

        let Some(result) = response.resultados.into_iter().next() else {
            return Ok(CancelOutcome::refused(
                Some(response.status.to_string()),
                response.mensaje.unwrap_or_default(),
            ));
        };

        let code = result
            .status_uuid
            .unwrap_or_else(|| result.status.to_string());
        if CANCEL_OK_CODES.contains(&code.as_str()) {
            info!(folio = %request.fiscal_uuid, code, "cancellation confirmed");
            Ok(CancelOutcome::confirmed(code))
        } else {
            Ok(CancelOutcome::refused(
                Some(code),
                result.mensaje.unwrap_or_default(),
            ))
        }
    }

    fn supports_multi(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &str {
        "solucionfactible"
    }
}
