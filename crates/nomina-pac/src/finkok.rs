//! Finkok stamping gateway.
//!
//! Stamp responses carry the stamped bytes directly plus an incident list
//! when something went wrong. Cancel responses report per-folio statuses
//! under `Folios`; 201 is cancelled, 202 is already-cancelled. A folio
//! absent from the response means the provider has not finished ingesting
//! the stamp yet and asks callers to wait out its grace period.

use std::time::Duration;

use nomina_core::FiscalUuid;
use serde::Deserialize;
use tracing::info;

use crate::config::{PacConfig, PacService};
use crate::error::PacError;
use crate::gateway::{CancelOutcome, CancellationRequest, PacGateway, SignOutcome, SignRequest};
use crate::retry::retry_send;

const CANCEL_OK_CODES: [&str; 2] = ["201", "202"];

/// Message attached when the provider has not yet ingested the stamp and
/// the folio is missing from the cancel response.
const GRACE_PERIOD_MESSAGE: &str =
    "A delay of 2 hours has to be respected before to cancel";

/// HTTP gateway for the Finkok stamp and cancel services.
#[derive(Debug)]
pub struct FinkokGateway {
    client: reqwest::Client,
    config: PacConfig,
}

#[derive(Debug, Deserialize)]
struct StampResponse {
    #[serde(default)]
    xml: Option<String>,
    #[serde(rename = "UUID", default)]
    uuid: Option<String>,
    #[serde(rename = "CodEstatus", default)]
    cod_estatus: Option<String>,
    #[serde(rename = "Incidencias", default)]
    incidencias: Vec<Incidencia>,
}

#[derive(Debug, Deserialize)]
struct Incidencia {
    #[serde(rename = "CodigoError", default)]
    codigo_error: Option<String>,
    #[serde(rename = "MensajeIncidencia", default)]
    mensaje_incidencia: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CancelResponse {
    #[serde(rename = "Folios", default)]
    folios: Vec<FolioStatus>,
}

#[derive(Debug, Deserialize)]
struct FolioStatus {
    #[serde(rename = "UUID")]
    uuid: String,
    #[serde(rename = "EstatusUUID")]
    estatus_uuid: String,
}

impl FinkokGateway {
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
            reason: "missing Finkok credentials".into(),
        })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
        operation: &str,
    ) -> Result<T, PacError> {
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

impl PacGateway for FinkokGateway {
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
            "xml": request.document_xml,
        });

        let response: StampResponse = rt.block_on(self.post_json(&url, &body, "stamp"))?;

        match (response.xml, response.uuid) {
            (Some(signed_xml), Some(uuid)) => {
                let fiscal_uuid =
                    FiscalUuid::parse(&uuid).map_err(|e| PacError::MalformedResponse {
                        reason: format!("provider returned invalid folio {uuid:?}: {e}"),
                    })?;
                info!(issuer = %request.issuer_rfc, folio = %fiscal_uuid, "document stamped");
                Ok(SignOutcome::Signed {
                    signed_xml,
                    fiscal_uuid,
                })
            }
            _ => {
                let incident = response.incidencias.into_iter().next();
                let (code, message) = match incident {
                    Some(i) => (
                        i.codigo_error,
                        i.mensaje_incidencia.unwrap_or_default(),
                    ),
                    None => (
                        None,
                        response
                            .cod_estatus
                            .unwrap_or_else(|| "stamp refused without incident".to_owned()),
                    ),
                };
                Ok(SignOutcome::Rejected { code, message })
            }
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
        let folio = request.fiscal_uuid.to_string();
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "taxpayer_id": request.issuer_rfc,
            "uuids": [folio],
            "cer": request.certificate_pem,
            "key": request.key_pem,
        });

        let response: CancelResponse = rt.block_on(self.post_json(&url, &body, "cancel"))?;

        let status = response
            .folios
            .into_iter()
            .find(|f| f.uuid.eq_ignore_ascii_case(&folio));
        match status {
            Some(f) if CANCEL_OK_CODES.contains(&f.estatus_uuid.as_str()) => {
                info!(folio = %request.fiscal_uuid, code = %f.estatus_uuid, "cancellation confirmed");
                Ok(CancelOutcome::confirmed(f.estatus_uuid))
            }
            Some(f) => Ok(CancelOutcome::refused(
                Some(f.estatus_uuid),
                "cancellation refused by provider",
            )),
            // Folio not in the response: the stamp is still inside the
            // provider's ingestion window.
            None => Ok(CancelOutcome::refused(None, GRACE_PERIOD_MESSAGE)),
        }
    }

    fn supports_multi(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "finkok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacEnvironment;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: &str) -> FinkokGateway {
        let config = PacConfig::new("finkok", PacEnvironment::Test).with_base_url(base_url);
        FinkokGateway::new(config).unwrap()
    }

    fn cancel_request(folio: FiscalUuid) -> CancellationRequest {
        CancellationRequest {
            fiscal_uuid: folio,
            issuer_rfc: "EKU9003173C9".into(),
            certificate_pem: "CERT".into(),
            key_pem: "KEY".into(),
            key_password: None,
        }
    }

    #[tokio::test]
    async fn successful_stamp_parses_folio() {
        let server = MockServer::start().await;
        let folio = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/sign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "xml": "<cfdi:Comprobante Sello=\"x\"/>",
                "UUID": folio.to_string(),
                "CodEstatus": "Comprobante timbrado satisfactoriamente",
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server.uri());
        let outcome = tokio::task::spawn_blocking({
            let request = SignRequest {
                document_xml: "<cfdi:Comprobante/>".into(),
                issuer_rfc: "EKU9003173C9".into(),
            };
            move || gateway.sign(&request)
        })
        .await
        .unwrap()
        .unwrap();
        let SignOutcome::Signed { fiscal_uuid, .. } = outcome else {
            panic!("expected stamped outcome");
        };
        assert_eq!(fiscal_uuid, FiscalUuid::from_uuid(folio));
    }

    #[tokio::test]
    async fn incident_becomes_rejected_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Incidencias": [{
                    "CodigoError": "301",
                    "MensajeIncidencia": "XML estructura invalida",
                }],
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server.uri());
        let outcome = tokio::task::spawn_blocking({
            let request = SignRequest {
                document_xml: "<broken/>".into(),
                issuer_rfc: "EKU9003173C9".into(),
            };
            move || gateway.sign(&request)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(
            outcome,
            SignOutcome::Rejected {
                code: Some("301".into()),
                message: "XML estructura invalida".into(),
            }
        );
    }

    #[tokio::test]
    async fn cancel_confirms_on_folio_status_201() {
        let server = MockServer::start().await;
        let folio = FiscalUuid::from_uuid(Uuid::new_v4());
        Mock::given(method("POST"))
            .and(path("/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Folios": [{
                    "UUID": folio.to_string(),
                    "EstatusUUID": "201",
                }],
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server.uri());
        let outcome = tokio::task::spawn_blocking({
            let request = cancel_request(folio);
            move || gateway.cancel(&request)
        })
        .await
        .unwrap()
        .unwrap();
        assert!(outcome.cancelled);
    }

    #[tokio::test]
    async fn missing_folio_reports_grace_period() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cancel"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Folios": [] })),
            )
            .mount(&server)
            .await;

        let gateway = gateway(&server.uri());
        let outcome = tokio::task::spawn_blocking({
            let request = cancel_request(FiscalUuid::from_uuid(Uuid::new_v4()));
            move || gateway.cancel(&request)
        })
        .await
        .unwrap()
        .unwrap();
        assert!(!outcome.cancelled);
        assert_eq!(
            outcome.message.as_deref(),
            Some("A delay of 2 hours has to be respected before to cancel")
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sign"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let gateway = gateway(&server.uri());
        let err = tokio::task::spawn_blocking({
            let request = SignRequest {
                document_xml: "<doc/>".into(),
                issuer_rfc: "EKU9003173C9".into(),
            };
            move || gateway.sign(&request)
        })
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, PacError::MalformedResponse { .. }));
    }

    #[test]
    fn finkok_supports_multi_document_batches() {
        let config = PacConfig::new("finkok", PacEnvironment::Test);
        let gateway = FinkokGateway::new(config).unwrap();
        assert!(gateway.supports_multi());
    }
}
