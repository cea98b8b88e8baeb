//! Lifecycle driver: generation, sealing, stamping, cancellation and
//! authority reconciliation over a shared document ledger.
//!
//! Every failure inside an operation degrades the document to a status
//! plus an operator-visible message; batch drivers never abort on a
//! single record. The only hard errors are caller mistakes: racing a
//! document already in flight, cancelling a record that does not exist,
//! or asking for a transition the lifecycle table forbids.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use nomina_cfdi::{
    build_document, compute_payload, CadenaTransform, PayslipInput, PipeDelimited, RuleCatalog,
    SchemaValidator,
};
use nomina_core::{FiscalUuid, PayslipId};
use nomina_crypto::CertificateProvider;
use nomina_pac::{
    CancellationRequest, PacError, PacRegistry, SatClient, SatQuery, SignOutcome, SignRequest,
};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::record::{cfdi_file_name, PayrollDocument};
use crate::status::{PacStatus, SatStatus};
use crate::store::AttachmentStore;

/// One unit of work for the batch sign driver.
#[derive(Debug, Clone)]
pub struct SignJob {
    pub input: PayslipInput,
    /// Provider name the issuing company is configured with.
    pub provider: String,
}

/// The payroll document lifecycle engine.
///
/// Shared-nothing towards callers: every method takes `&self`, state
/// lives in concurrent maps, and a per-document single-flight guard
/// rejects a second operation on a document that already has one
/// running.
pub struct PayrollEngine {
    documents: DashMap<PayslipId, PayrollDocument>,
    attachments: AttachmentStore,
    registry: PacRegistry,
    certificates: Arc<dyn CertificateProvider>,
    catalog: RuleCatalog,
    validator: SchemaValidator,
    transform: Box<dyn CadenaTransform>,
    in_flight: DashMap<PayslipId, ()>,
}

/// Single-flight marker; removes the in-flight entry when the
/// operation finishes, panicking included.
struct FlightGuard<'a> {
    engine: &'a PayrollEngine,
    id: PayslipId,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.engine.in_flight.remove(&self.id);
    }
}

impl PayrollEngine {
    /// Engine with the statutory rule catalog, the default structural
    /// validator and the pipe-delimited cadena transform.
    pub fn new(registry: PacRegistry, certificates: Arc<dyn CertificateProvider>) -> Self {
        Self {
            documents: DashMap::new(),
            attachments: AttachmentStore::new(),
            registry,
            certificates,
            catalog: RuleCatalog::statutory(),
            validator: SchemaValidator::new(),
            transform: Box::new(PipeDelimited),
            in_flight: DashMap::new(),
        }
    }

    /// Replace the rule catalog.
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the cadena transform.
    pub fn with_transform(mut self, transform: Box<dyn CadenaTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Replace the schema validator.
    pub fn with_validator(mut self, validator: SchemaValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Snapshot of a document record.
    pub fn document(&self, id: &PayslipId) -> Option<PayrollDocument> {
        self.documents.get(id).map(|doc| doc.clone())
    }

    /// The versioned attachment store.
    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    /// Generate, seal, validate and submit one payslip's document.
    ///
    /// Running this on a `Signed` document is a re-signature: the
    /// document is rebuilt from the same inputs and re-submitted, and
    /// the previous attachment versions are retained. Running it on a
    /// `Retry` document re-attempts full generation. Documents awaiting
    /// cancellation or already cancelled are rejected.
    pub fn generate_and_sign(
        &self,
        input: &PayslipInput,
        provider: &str,
    ) -> Result<PacStatus, EngineError> {
        let _flight = self.acquire_flight(input.id)?;

        {
            let mut doc = self
                .documents
                .entry(input.id)
                .or_insert_with(|| PayrollDocument::new(input.id, &input.number, provider));
            if matches!(doc.status, PacStatus::Cancelled | PacStatus::ToCancel) {
                return Err(EngineError::InvalidTransition {
                    from: doc.status.name().into(),
                    to: PacStatus::ToSign.name().into(),
                });
            }
            doc.provider = provider.to_owned();
            doc.cfdi_name = cfdi_file_name(&input.number);
        }

        // Configuration problems are aggregated into one message and
        // reported before anything is rendered or any provider is
        // contacted.
        let now = Utc::now();
        let mut config_issues = Vec::new();
        if !self.certificates.is_valid_at(now) {
            config_issues.push(format!(
                "certificate {} is not valid at {}",
                self.certificates.serial(),
                now.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        if provider.trim().is_empty() {
            config_issues.push("no stamping provider configured".to_owned());
        }
        if !config_issues.is_empty() {
            return Ok(self.degrade(input.id, config_issues.join("; ")));
        }

        let mut payload = match compute_payload(input, &self.catalog) {
            Ok(payload) => payload,
            Err(e) => return Ok(self.degrade(input.id, format!("aggregation failed: {e}"))),
        };
        payload.clear_stale_extra_nodes(input);

        // The issue instant is fixed on first generation so that a
        // re-signature of identical inputs reproduces the same cadena.
        let issued_at = self
            .update(&input.id, |doc| doc.issued_at)
            .flatten()
            .unwrap_or_else(|| now.naive_utc());

        let serial = self.certificates.serial().to_string();
        let certificate_b64 = self.certificates.certificate_b64();
        let mut document = build_document(input, &payload, issued_at, &serial, &certificate_b64);
        let cadena = self.transform.cadena(&document);
        let sello = match self.certificates.seal(&cadena) {
            Ok(sello) => sello,
            Err(e) => return Ok(self.degrade(input.id, format!("sealing failed: {e}"))),
        };
        document.set_sello(sello);
        if let Err(e) = self.validator.validate(&document) {
            return Ok(self.degrade(input.id, format!("validation failed: {e}")));
        }
        let xml = document.to_xml();

        let supplier_rfc = input.company.rfc.to_string();
        let customer_rfc = input.employee.rfc.to_string();
        let name = cfdi_file_name(&input.number);
        self.update(&input.id, |doc| {
            doc.transition(PacStatus::ToSign);
            doc.supplier_rfc = supplier_rfc.clone();
            doc.customer_rfc = customer_rfc.clone();
            doc.total_amount = document.total.clone();
            doc.certificate_serial = serial.clone();
            doc.cadena = Some(cadena.clone());
            doc.issued_at = Some(issued_at);
        });
        self.attachments.push(input.id, &name, &xml);

        let Some(gateway) = self.registry.resolve(provider) else {
            debug!(payslip = %input.id, provider, "no gateway; document left awaiting signature");
            return Ok(PacStatus::ToSign);
        };

        let request = SignRequest {
            document_xml: xml,
            issuer_rfc: supplier_rfc,
        };
        match gateway.sign(&request) {
            Ok(SignOutcome::Signed {
                signed_xml,
                fiscal_uuid,
            }) => {
                self.attachments.push(input.id, &name, &signed_xml);
                self.update(&input.id, |doc| {
                    doc.transition(PacStatus::Signed);
                    doc.fiscal_uuid = Some(fiscal_uuid);
                    doc.log(format!("stamped by {provider}, folio {fiscal_uuid}"));
                });
                info!(payslip = %input.id, folio = %fiscal_uuid, provider, "document stamped");
                Ok(PacStatus::Signed)
            }
            Ok(SignOutcome::Rejected { code, message }) => {
                let code = code.unwrap_or_else(|| "-".into());
                self.update(&input.id, |doc| {
                    doc.log(format!("provider rejected document (code {code}): {message}"));
                });
                warn!(payslip = %input.id, provider, code, "stamp rejected");
                Ok(PacStatus::ToSign)
            }
            Err(e) => {
                let message = match &e {
                    PacError::NotConfigured { .. } => {
                        format!("provider configuration error: {e}")
                    }
                    _ => format!("stamping transport failure: {e}"),
                };
                Ok(self.degrade(input.id, message))
            }
        }
    }

    /// Cancel one payslip's document.
    ///
    /// Routing is by folio presence, not status alone: any document
    /// holding a folio has a live stamp at the provider, even if a
    /// later re-signature attempt degraded it back to `ToSign` or
    /// `Retry`, so it moves to `ToCancel` and the provider is asked to
    /// revoke. A refusal or transport failure leaves it at `ToCancel`
    /// for the next pass. Documents that never got a folio cancel
    /// locally with zero gateway calls. Cancelling a `Cancelled`
    /// document is a no-op.
    pub fn cancel(&self, id: &PayslipId) -> Result<PacStatus, EngineError> {
        let _flight = self.acquire_flight(*id)?;

        let (status, provider, fiscal_uuid, supplier_rfc) = self
            .documents
            .get(id)
            .map(|doc| {
                (
                    doc.status,
                    doc.provider.clone(),
                    doc.fiscal_uuid,
                    doc.supplier_rfc.clone(),
                )
            })
            .ok_or(EngineError::UnknownDocument { payslip_id: *id })?;

        match (status, fiscal_uuid) {
            (PacStatus::Cancelled, _) => Ok(PacStatus::Cancelled),
            (PacStatus::NeedsGeneration, _) => Err(EngineError::InvalidTransition {
                from: status.name().into(),
                to: PacStatus::Cancelled.name().into(),
            }),
            (PacStatus::ToSign | PacStatus::Retry, None) => {
                self.update(id, |doc| {
                    doc.transition(PacStatus::Cancelled);
                    doc.log("cancelled locally; never submitted to the provider");
                });
                info!(payslip = %id, "document cancelled without provider round trip");
                Ok(PacStatus::Cancelled)
            }
            (PacStatus::Signed | PacStatus::ToCancel, None) => {
                // A stamped document without a folio breaks the
                // lifecycle invariant; refuse rather than guess.
                Err(EngineError::InvalidTransition {
                    from: status.name().into(),
                    to: PacStatus::Cancelled.name().into(),
                })
            }
            (status, Some(fiscal_uuid)) => {
                if status != PacStatus::ToCancel {
                    self.update(id, |doc| {
                        doc.transition(PacStatus::ToCancel);
                        doc.log("cancellation requested");
                    });
                }
                let Some(gateway) = self.registry.resolve(&provider) else {
                    return Ok(PacStatus::ToCancel);
                };
                let request = self.cancellation_request(fiscal_uuid, supplier_rfc);
                match gateway.cancel(&request) {
                    Ok(outcome) if outcome.cancelled => {
                        let code = outcome.code.unwrap_or_else(|| "-".into());
                        self.update(id, |doc| {
                            doc.transition(PacStatus::Cancelled);
                            doc.log(format!("provider confirmed cancellation (code {code})"));
                        });
                        info!(payslip = %id, folio = %fiscal_uuid, "cancellation confirmed");
                        Ok(PacStatus::Cancelled)
                    }
                    Ok(outcome) => {
                        let message = outcome.message.unwrap_or_default();
                        self.update(id, |doc| {
                            doc.log(format!("cancellation refused: {message}"));
                        });
                        warn!(payslip = %id, %message, "provider refused cancellation");
                        Ok(PacStatus::ToCancel)
                    }
                    Err(e) => {
                        self.update(id, |doc| {
                            doc.log(format!("cancellation transport failure: {e}"));
                        });
                        warn!(payslip = %id, error = %e, "cancellation transport failure");
                        Ok(PacStatus::ToCancel)
                    }
                }
            }
        }
    }

    /// Sign a batch of payslips, grouped by issuing company and
    /// provider. Failures are isolated per record: one bad payslip
    /// degrades to `Retry` with a message while the rest of the batch
    /// proceeds. Returns one `(payslip, status)` pair per job, in job
    /// order.
    pub fn sign_batch(&self, jobs: &[SignJob]) -> Vec<(PayslipId, PacStatus)> {
        let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for (idx, job) in jobs.iter().enumerate() {
            let key = (job.input.company.rfc.to_string(), job.provider.clone());
            groups.entry(key).or_default().push(idx);
        }

        let mut results: Vec<Option<PacStatus>> = vec![None; jobs.len()];
        for ((company, provider), indices) in &groups {
            debug!(company, provider, count = indices.len(), "processing sign group");
            for &idx in indices {
                let job = &jobs[idx];
                let status = match self.generate_and_sign(&job.input, &job.provider) {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(payslip = %job.input.id, error = %e, "record failed; batch continues");
                        self.update(&job.input.id, |doc| doc.log(e.to_string()));
                        self.document(&job.input.id)
                            .map(|doc| doc.status)
                            .unwrap_or(PacStatus::Retry)
                    }
                };
                results[idx] = Some(status);
            }
        }

        jobs.iter()
            .zip(results)
            .map(|(job, status)| (job.input.id, status.unwrap_or(PacStatus::Retry)))
            .collect()
    }

    /// Cancel a batch of documents.
    ///
    /// Routing per record matches [`PayrollEngine::cancel`]: documents
    /// holding a folio are grouped by provider and revoked in one round
    /// trip when the gateway supports it, the rest cancel locally.
    /// Records already in flight elsewhere are skipped with their
    /// current status. Returns one `(payslip, status)` pair per id, in
    /// input order.
    pub fn cancel_batch(&self, ids: &[PayslipId]) -> Vec<(PayslipId, PacStatus)> {
        let mut pending: BTreeMap<String, Vec<(PayslipId, CancellationRequest)>> = BTreeMap::new();
        let mut statuses: HashMap<PayslipId, PacStatus> = HashMap::new();
        // Guards are held until the provider round trips below finish.
        let mut guards = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(doc) = self.document(id) else {
                warn!(payslip = %id, "cancel requested for unknown document");
                continue;
            };
            match self.acquire_flight(*id) {
                Ok(guard) => guards.push(guard),
                Err(e) => {
                    warn!(payslip = %id, error = %e, "record in flight; batch skips it");
                    statuses.insert(*id, doc.status);
                    continue;
                }
            }
            match (doc.status, doc.fiscal_uuid) {
                (PacStatus::Cancelled, _) => {
                    statuses.insert(*id, PacStatus::Cancelled);
                }
                (PacStatus::NeedsGeneration, _) => {
                    statuses.insert(*id, PacStatus::NeedsGeneration);
                }
                (PacStatus::ToSign | PacStatus::Retry, None) => {
                    self.update(id, |d| {
                        d.transition(PacStatus::Cancelled);
                        d.log("cancelled locally; never submitted to the provider");
                    });
                    statuses.insert(*id, PacStatus::Cancelled);
                }
                (PacStatus::Signed | PacStatus::ToCancel, None) => {
                    warn!(payslip = %id, status = %doc.status, "stamped document has no folio; skipping");
                    statuses.insert(*id, doc.status);
                }
                (status, Some(folio)) => {
                    if status != PacStatus::ToCancel {
                        self.update(id, |d| {
                            d.transition(PacStatus::ToCancel);
                            d.log("cancellation requested");
                        });
                    }
                    statuses.insert(*id, PacStatus::ToCancel);
                    pending
                        .entry(doc.provider.clone())
                        .or_default()
                        .push((*id, self.cancellation_request(folio, doc.supplier_rfc)));
                }
            }
        }

        for (provider, group) in &pending {
            let Some(gateway) = self.registry.resolve(provider) else {
                continue;
            };
            let requests: Vec<CancellationRequest> =
                group.iter().map(|(_, request)| request.clone()).collect();
            let outcomes = if gateway.supports_multi() {
                gateway.cancel_many(&requests)
            } else {
                requests.iter().map(|request| gateway.cancel(request)).collect()
            };
            for ((id, _), outcome) in group.iter().zip(outcomes) {
                match outcome {
                    Ok(outcome) if outcome.cancelled => {
                        self.update(id, |d| {
                            d.transition(PacStatus::Cancelled);
                            d.log("provider confirmed cancellation");
                        });
                        statuses.insert(*id, PacStatus::Cancelled);
                    }
                    Ok(outcome) => {
                        let message = outcome.message.unwrap_or_default();
                        self.update(id, |d| d.log(format!("cancellation refused: {message}")));
                    }
                    Err(e) => {
                        self.update(id, |d| {
                            d.log(format!("cancellation transport failure: {e}"));
                        });
                    }
                }
            }
        }

        ids.iter()
            .map(|id| {
                (
                    *id,
                    statuses.get(id).copied().unwrap_or(PacStatus::NeedsGeneration),
                )
            })
            .collect()
    }

    /// Reconcile stamped documents against the tax authority.
    ///
    /// Only settled documents (`Signed`, `Cancelled`) are queried; a
    /// document mid-cancellation or degraded with a folio still held
    /// would report a state the next lifecycle pass is about to change.
    /// Read-only over the lifecycle: only `sat_status` is written.
    /// Query failures are logged and skipped. Returns the number of
    /// documents whose authority status was refreshed.
    pub fn reconcile(&self, sat: &SatClient) -> usize {
        let candidates: Vec<(PayslipId, SatQuery)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                if !matches!(doc.status, PacStatus::Signed | PacStatus::Cancelled) {
                    return None;
                }
                let folio = doc.fiscal_uuid?;
                Some((
                    doc.payslip_id,
                    SatQuery {
                        issuer_rfc: doc.supplier_rfc.clone(),
                        receiver_rfc: doc.customer_rfc.clone(),
                        total: doc.total_amount.clone(),
                        fiscal_uuid: folio,
                    },
                ))
            })
            .collect();

        let mut updated = 0;
        for (id, query) in candidates {
            match sat.status(&query) {
                Ok(report) => {
                    let mapped = SatStatus::from_authority(&report.status);
                    self.update(&id, |doc| {
                        if doc.sat_status != mapped {
                            doc.log(format!("authority status: {}", report.status));
                        }
                        doc.sat_status = mapped;
                    });
                    updated += 1;
                }
                Err(e) => {
                    warn!(payslip = %id, error = %e, "authority query failed; skipping");
                }
            }
        }
        updated
    }

    fn cancellation_request(
        &self,
        fiscal_uuid: FiscalUuid,
        issuer_rfc: String,
    ) -> CancellationRequest {
        CancellationRequest {
            fiscal_uuid,
            issuer_rfc,
            certificate_pem: self.certificates.certificate_pem(),
            key_pem: self.certificates.key_pem(),
            key_password: None,
        }
    }

    /// Move a document to `Retry` with an operator-visible message.
    fn degrade(&self, id: PayslipId, message: String) -> PacStatus {
        warn!(payslip = %id, %message, "document degraded to retry");
        self.update(&id, |doc| {
            doc.transition(PacStatus::Retry);
            doc.log(message);
        });
        PacStatus::Retry
    }

    fn update<R>(&self, id: &PayslipId, f: impl FnOnce(&mut PayrollDocument) -> R) -> Option<R> {
        self.documents.get_mut(id).map(|mut doc| f(&mut doc))
    }

    fn acquire_flight(&self, id: PayslipId) -> Result<FlightGuard<'_>, EngineError> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry(id) {
            Entry::Occupied(_) => Err(EngineError::Busy { payslip_id: id }),
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(FlightGuard { engine: self, id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nomina_cfdi::{Company, Contract, Employee, LineCategory, PayslipLine, WorkedDays};
    use nomina_core::{CertificateSerial, Curp, Money, Rfc};
    use nomina_crypto::LocalCertificateProvider;
    use nomina_pac::MockPacGateway;
    use rust_decimal_macros::dec;

    fn certificates() -> Arc<LocalCertificateProvider> {
        Arc::new(LocalCertificateProvider::generate(
            CertificateSerial::new("30001000000400002434").unwrap(),
            Rfc::new("TDX150912QW3").unwrap(),
        ))
    }

    fn engine_with(gateway: Arc<MockPacGateway>) -> PayrollEngine {
        let mut registry = PacRegistry::new();
        registry.register(gateway);
        PayrollEngine::new(registry, certificates())
    }

    fn base_input() -> PayslipInput {
        PayslipInput {
            id: PayslipId::new(),
            number: "SLIP/00042".into(),
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            payment_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            employee: Employee {
                name: "Lucía Hernández".into(),
                rfc: Rfc::new("HEGL850214AB1").unwrap(),
                curp: Curp::new("HEGL850214MJCRNC08").unwrap(),
                ssnid: Some("12345678901".into()),
                job_risk: "1".into(),
                contract_type: "01".into(),
                regime_type: "02".into(),
                number: "E-0042".into(),
                department: Some("Operaciones".into()),
                state_code: "JAL".into(),
            },
            contract: Some(Contract {
                wage: Money::new(dec!(15000)),
                integrated_wage: Money::new(dec!(522.50)),
                date_start: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            }),
            company: Company {
                name: "Trámites Digitales SA de CV".into(),
                rfc: Rfc::new("TDX150912QW3").unwrap(),
                fiscal_regime: "601".into(),
                zip: "44100".into(),
                employer_registration: Some("B5510768108".into()),
            },
            lines: vec![
                PayslipLine::new(
                    "001",
                    LineCategory::PerceptionTaxed,
                    "Sueldo",
                    Money::new(dec!(7500)),
                ),
                PayslipLine::new(
                    "002",
                    LineCategory::Deduction,
                    "ISR",
                    Money::new(dec!(-1032.50)),
                ),
            ],
            worked_days: vec![WorkedDays {
                code: "WORK100".into(),
                days: 15,
            }],
            credit_note: false,
        }
    }

    #[test]
    fn generate_and_sign_reaches_signed() {
        let gateway = Arc::new(MockPacGateway::accepting());
        let engine = engine_with(gateway.clone());
        let input = base_input();

        let status = engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(status, PacStatus::Signed);

        let doc = engine.document(&input.id).unwrap();
        assert!(doc.fiscal_uuid.is_some());
        assert!(doc.cadena.as_deref().unwrap().starts_with("||"));
        assert_eq!(doc.supplier_rfc, "TDX150912QW3");
        assert_eq!(doc.customer_rfc, "HEGL850214AB1");
        assert_eq!(doc.cfdi_name, "SLIP00042-MX-Payroll-3-3.xml");
        // The sealed rendition plus the stamped replacement.
        assert_eq!(engine.attachments().version_count(&input.id), 2);
        assert_eq!(gateway.sign_calls(), 1);
    }

    #[test]
    fn cadena_is_stable_across_resignature() {
        let engine = engine_with(Arc::new(MockPacGateway::accepting()));
        let input = base_input();

        engine.generate_and_sign(&input, "mock").unwrap();
        let first = engine.document(&input.id).unwrap().cadena.unwrap();

        let status = engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(status, PacStatus::Signed);
        let second = engine.document(&input.id).unwrap().cadena.unwrap();

        assert_eq!(first, second);
        // Old versions are retained for audit after a re-signature, and
        // the sealed renditions from both passes are byte-identical.
        let history = engine.attachments().history(&input.id);
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].digest, history[2].digest);
    }

    #[test]
    fn provider_rejection_leaves_document_awaiting_signature() {
        let engine = engine_with(Arc::new(MockPacGateway::rejecting(
            Some("301"),
            "XML mal formado",
        )));
        let input = base_input();

        let status = engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(status, PacStatus::ToSign);

        let doc = engine.document(&input.id).unwrap();
        assert!(doc.fiscal_uuid.is_none());
        assert!(doc.last_message().unwrap().contains("301"));
    }

    #[test]
    fn transport_failure_degrades_to_retry_then_recovers() {
        let engine = engine_with(Arc::new(MockPacGateway::failing_first(1)));
        let input = base_input();

        let status = engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(status, PacStatus::Retry);
        assert!(engine
            .document(&input.id)
            .unwrap()
            .last_message()
            .unwrap()
            .contains("transport failure"));

        // Retry is re-entrant: the next pass regenerates from scratch.
        let status = engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(status, PacStatus::Signed);
    }

    #[test]
    fn empty_provider_name_is_a_configuration_error() {
        let gateway = Arc::new(MockPacGateway::accepting());
        let engine = engine_with(gateway.clone());
        let input = base_input();

        let status = engine.generate_and_sign(&input, "").unwrap();
        assert_eq!(status, PacStatus::Retry);
        assert!(engine
            .document(&input.id)
            .unwrap()
            .last_message()
            .unwrap()
            .contains("no stamping provider configured"));
        assert_eq!(gateway.sign_calls(), 0);
    }

    #[test]
    fn missing_contract_degrades_to_retry() {
        let engine = engine_with(Arc::new(MockPacGateway::accepting()));
        let mut input = base_input();
        input.contract = None;

        let status = engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(status, PacStatus::Retry);
        assert!(engine
            .document(&input.id)
            .unwrap()
            .last_message()
            .unwrap()
            .contains("contract"));
    }

    #[test]
    fn direct_cancel_skips_the_gateway() {
        let gateway = Arc::new(MockPacGateway::rejecting(None, "no"));
        let engine = engine_with(gateway.clone());
        let input = base_input();

        engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(engine.document(&input.id).unwrap().status, PacStatus::ToSign);

        let status = engine.cancel(&input.id).unwrap();
        assert_eq!(status, PacStatus::Cancelled);
        assert_eq!(gateway.cancel_calls(), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let gateway = Arc::new(MockPacGateway::accepting());
        let engine = engine_with(gateway.clone());
        let input = base_input();

        engine.generate_and_sign(&input, "mock").unwrap();
        assert_eq!(engine.cancel(&input.id).unwrap(), PacStatus::Cancelled);
        assert_eq!(engine.cancel(&input.id).unwrap(), PacStatus::Cancelled);
        assert_eq!(gateway.cancel_calls(), 1);
    }

    #[test]
    fn signed_document_cancels_through_gateway() {
        let gateway = Arc::new(MockPacGateway::accepting());
        let engine = engine_with(gateway.clone());
        let input = base_input();

        engine.generate_and_sign(&input, "mock").unwrap();
        let folio = engine.document(&input.id).unwrap().fiscal_uuid.unwrap();

        let status = engine.cancel(&input.id).unwrap();
        assert_eq!(status, PacStatus::Cancelled);
        assert_eq!(gateway.cancelled_uuids(), vec![folio]);
    }

    #[test]
    fn degraded_resignature_keeps_folio_and_cancel_revokes_it() {
        let gateway = Arc::new(MockPacGateway::accepting());
        let engine = engine_with(gateway.clone());
        let input = base_input();

        engine.generate_and_sign(&input, "mock").unwrap();
        let folio = engine.document(&input.id).unwrap().fiscal_uuid.unwrap();

        // The re-signature attempt fails during aggregation; the
        // document degrades but the stamp at the provider is still live.
        let mut broken = input.clone();
        broken.contract = None;
        let status = engine.generate_and_sign(&broken, "mock").unwrap();
        assert_eq!(status, PacStatus::Retry);
        assert_eq!(engine.document(&input.id).unwrap().fiscal_uuid, Some(folio));

        // Cancellation must still revoke the folio at the provider, not
        // shortcut to a local cancel.
        let status = engine.cancel(&input.id).unwrap();
        assert_eq!(status, PacStatus::Cancelled);
        assert_eq!(gateway.cancelled_uuids(), vec![folio]);
    }

    #[test]
    fn cancel_unknown_document_errors() {
        let engine = engine_with(Arc::new(MockPacGateway::accepting()));
        let err = engine.cancel(&PayslipId::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownDocument { .. }));
    }

    #[test]
    fn cancelled_document_rejects_regeneration() {
        let engine = engine_with(Arc::new(MockPacGateway::accepting()));
        let input = base_input();

        engine.generate_and_sign(&input, "mock").unwrap();
        engine.cancel(&input.id).unwrap();

        let err = engine.generate_and_sign(&input, "mock").unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn in_flight_guard_rejects_concurrent_operation() {
        let engine = engine_with(Arc::new(MockPacGateway::accepting()));
        let input = base_input();
        engine.generate_and_sign(&input, "mock").unwrap();

        engine.in_flight.insert(input.id, ());
        let err = engine.cancel(&input.id).unwrap_err();
        assert!(matches!(err, EngineError::Busy { .. }));

        engine.in_flight.remove(&input.id);
        assert!(engine.cancel(&input.id).is_ok());
    }

    #[test]
    fn batch_isolates_a_failing_record() {
        let engine = engine_with(Arc::new(MockPacGateway::accepting()));
        let mut broken = base_input();
        broken.contract = None;
        let jobs = vec![
            SignJob {
                input: base_input(),
                provider: "mock".into(),
            },
            SignJob {
                input: broken,
                provider: "mock".into(),
            },
            SignJob {
                input: base_input(),
                provider: "mock".into(),
            },
        ];

        let results = engine.sign_batch(&jobs);
        assert_eq!(results[0].1, PacStatus::Signed);
        assert_eq!(results[1].1, PacStatus::Retry);
        assert_eq!(results[2].1, PacStatus::Signed);
        assert!(engine
            .document(&results[1].0)
            .unwrap()
            .last_message()
            .unwrap()
            .contains("contract"));
    }

    #[test]
    fn one_transport_failure_in_batch_leaves_two_signed() {
        let engine = engine_with(Arc::new(MockPacGateway::failing_first(1)));
        let jobs: Vec<SignJob> = (0..3)
            .map(|_| SignJob {
                input: base_input(),
                provider: "mock".into(),
            })
            .collect();

        let results = engine.sign_batch(&jobs);
        let signed = results
            .iter()
            .filter(|(_, s)| *s == PacStatus::Signed)
            .count();
        let retry = results
            .iter()
            .filter(|(_, s)| *s == PacStatus::Retry)
            .count();
        assert_eq!(signed, 2);
        assert_eq!(retry, 1);
    }

    #[test]
    fn batch_cancel_groups_by_provider() {
        let gateway = Arc::new(MockPacGateway::accepting().with_multi());
        let engine = engine_with(gateway.clone());
        let first = base_input();
        let second = base_input();
        engine.generate_and_sign(&first, "mock").unwrap();
        engine.generate_and_sign(&second, "mock").unwrap();

        let results = engine.cancel_batch(&[first.id, second.id]);
        assert!(results.iter().all(|(_, s)| *s == PacStatus::Cancelled));
        assert_eq!(gateway.cancelled_uuids().len(), 2);
    }

    #[test]
    fn batch_cancel_skips_records_already_in_flight() {
        let gateway = Arc::new(MockPacGateway::accepting());
        let engine = engine_with(gateway.clone());
        let input = base_input();
        engine.generate_and_sign(&input, "mock").unwrap();

        engine.in_flight.insert(input.id, ());
        let results = engine.cancel_batch(&[input.id]);
        assert_eq!(results, vec![(input.id, PacStatus::Signed)]);
        assert_eq!(engine.document(&input.id).unwrap().status, PacStatus::Signed);
        assert_eq!(gateway.cancel_calls(), 0);

        // Once the slot frees up the batch cancels normally, proving the
        // batch also released its own guards.
        engine.in_flight.remove(&input.id);
        let results = engine.cancel_batch(&[input.id]);
        assert_eq!(results, vec![(input.id, PacStatus::Cancelled)]);
        assert!(engine.cancel(&input.id).is_ok());
    }

    #[test]
    fn unconfigured_provider_degrades_with_configuration_message() {
        struct HalfConfiguredGateway;
        impl nomina_pac::PacGateway for HalfConfiguredGateway {
            fn sign(&self, _request: &SignRequest) -> Result<SignOutcome, PacError> {
                Err(PacError::NotConfigured {
                    reason: "missing stamping credentials".into(),
                })
            }
            fn cancel(
                &self,
                _request: &CancellationRequest,
            ) -> Result<nomina_pac::CancelOutcome, PacError> {
                Err(PacError::NotConfigured {
                    reason: "missing stamping credentials".into(),
                })
            }
            fn supports_multi(&self) -> bool {
                false
            }
            fn provider_name(&self) -> &str {
                "halfset"
            }
        }

        let mut registry = PacRegistry::new();
        registry.register(Arc::new(HalfConfiguredGateway));
        let engine = PayrollEngine::new(registry, certificates());
        let input = base_input();

        let status = engine.generate_and_sign(&input, "halfset").unwrap();
        assert_eq!(status, PacStatus::Retry);
        let message = engine.document(&input.id).unwrap().last_message().unwrap().to_owned();
        assert!(message.contains("provider configuration error"));
        assert!(!message.contains("transport"));
    }

    mod reconcile {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn reconcile_maps_a_cancelled_folio() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/ConsultaCFDIService.svc"))
                .and(query_param("re", "TDX150912QW3"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({
                        "Estado": "Cancelado",
                        "EsCancelable": "No cancelable",
                        "EstatusCancelacion": "Cancelado sin aceptación"
                    })),
                )
                .mount(&server)
                .await;

            let engine = engine_with(Arc::new(MockPacGateway::accepting()));
            let input = base_input();
            tokio::task::block_in_place(|| {
                engine.generate_and_sign(&input, "mock").unwrap();
            });

            let sat = SatClient::with_base_url(server.uri()).unwrap();
            let updated = tokio::task::block_in_place(|| engine.reconcile(&sat));

            assert_eq!(updated, 1);
            let doc = engine.document(&input.id).unwrap();
            assert_eq!(doc.sat_status, SatStatus::Cancelled);
            assert!(doc.last_message().unwrap().contains("Cancelado"));
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn reconcile_ignores_documents_awaiting_cancellation() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/ConsultaCFDIService.svc"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "Estado": "Vigente",
                    "EsCancelable": "Cancelable sin aceptación",
                    "EstatusCancelacion": ""
                })))
                .mount(&server)
                .await;

            let engine = engine_with(Arc::new(MockPacGateway::accepting()));
            let settled = base_input();
            let mid_cancel = base_input();
            tokio::task::block_in_place(|| {
                engine.generate_and_sign(&settled, "mock").unwrap();
                engine.generate_and_sign(&mid_cancel, "mock").unwrap();
            });
            engine.update(&mid_cancel.id, |doc| {
                doc.transition(PacStatus::ToCancel);
            });

            let sat = SatClient::with_base_url(server.uri()).unwrap();
            let updated = tokio::task::block_in_place(|| engine.reconcile(&sat));

            // Only the settled document is queried; the one awaiting
            // cancellation keeps its unqueried authority status.
            assert_eq!(updated, 1);
            let settled_doc = engine.document(&settled.id).unwrap();
            assert_eq!(settled_doc.sat_status, SatStatus::Valid);
            let pending_doc = engine.document(&mid_cancel.id).unwrap();
            assert_eq!(pending_doc.sat_status, SatStatus::Undefined);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn reconcile_skips_documents_the_authority_cannot_answer() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/ConsultaCFDIService.svc"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let engine = engine_with(Arc::new(MockPacGateway::accepting()));
            let input = base_input();
            tokio::task::block_in_place(|| {
                engine.generate_and_sign(&input, "mock").unwrap();
            });

            let sat = SatClient::with_base_url(server.uri()).unwrap();
            let updated = tokio::task::block_in_place(|| engine.reconcile(&sat));

            assert_eq!(updated, 0);
            let doc = engine.document(&input.id).unwrap();
            assert_eq!(doc.sat_status, SatStatus::Undefined);
            assert_eq!(doc.status, PacStatus::Signed);
        }
    }
}
