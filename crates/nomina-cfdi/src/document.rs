//! Typed document tree and deterministic serializer.
//!
//! The tree holds pre-formatted strings: every amount is fixed at two
//! decimals and every date at ISO form when the tree is built, so the
//! serializer has no formatting decisions left to make. Attribute order
//! is fixed in code. Two calls to [`CfdiDocument::to_xml`] on the same
//! tree produce byte-identical output, which is what makes the seal over
//! the cadena stable across re-renders.

use chrono::NaiveDateTime;

use crate::input::PayslipInput;
use crate::payload::{ExtraNode, PayrollPayload};

const CFDI_VERSION: &str = "3.3";
const PAYROLL_VERSION: &str = "1.2";
/// SAT product key for payroll payments.
const PAYROLL_PROD_SERV: &str = "84111505";

/// Emisor identity attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuerNode {
    pub rfc: String,
    pub name: String,
    pub fiscal_regime: String,
}

/// Receptor identity attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverNode {
    pub rfc: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionEntry {
    pub code: String,
    pub name: String,
    pub taxed: String,
    pub exempt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeparationDetail {
    pub amount_total: String,
    pub service_years: String,
    pub last_salary: String,
    pub accumulable_income: String,
    pub non_accumulable_income: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetirementDetail {
    /// Lump-sum amount (039); exclusive with `amount_partial`.
    pub amount_lump: Option<String>,
    /// Installment amount plus daily rate (044).
    pub amount_partial: Option<String>,
    pub amount_daily: Option<String>,
    pub accumulable_income: String,
    pub non_accumulable_income: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionsNode {
    pub total_salaries: String,
    pub total_separation: Option<String>,
    pub total_retirement: Option<String>,
    pub total_taxed: String,
    pub total_exempt: String,
    pub entries: Vec<PerceptionEntry>,
    pub separation: Option<SeparationDetail>,
    pub retirement: Option<RetirementDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeductionEntry {
    pub code: String,
    pub name: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeductionsNode {
    pub total_other: String,
    pub withheld_tax: Option<String>,
    pub entries: Vec<DeductionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceDetail {
    pub amount: String,
    pub year: String,
    pub remaining: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherPaymentEntry {
    pub code: String,
    pub name: String,
    pub amount: String,
    pub balance: Option<BalanceDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InabilityEntry {
    pub days: String,
    pub type_code: String,
    pub discount: String,
}

/// Employee attributes under the payroll complement.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollReceiverNode {
    pub curp: String,
    pub ssnid: Option<String>,
    pub labor_relation_start: String,
    pub seniority: String,
    pub contract_type: String,
    pub regime_type: String,
    pub employee_number: String,
    pub department: Option<String>,
    pub job_risk: String,
    pub payment_periodicity: String,
    pub integrated_wage: String,
    pub state_code: String,
}

/// The payroll complement.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollNode {
    pub type_code: String,
    pub payment_date: String,
    pub date_from: String,
    pub date_to: String,
    pub days_paid: String,
    pub total_perceptions: Option<String>,
    pub total_deductions: Option<String>,
    pub total_other_payments: Option<String>,
    pub employer_registration: Option<String>,
    pub employee: PayrollReceiverNode,
    pub perceptions: Option<PerceptionsNode>,
    pub deductions: Option<DeductionsNode>,
    pub other_payments: Vec<OtherPaymentEntry>,
    pub inabilities: Vec<InabilityEntry>,
}

/// A fully computed payroll document, sealed or not.
#[derive(Debug, Clone, PartialEq)]
pub struct CfdiDocument {
    pub serie: Option<String>,
    pub folio: Option<String>,
    pub issued_at: String,
    /// `N` for payroll income, `E` for the refund (egreso) case.
    pub doc_type: String,
    pub subtotal: String,
    pub discount: String,
    pub total: String,
    pub place_of_issue: String,
    pub certificate_serial: String,
    pub certificate_b64: String,
    pub sello: Option<String>,
    pub issuer: IssuerNode,
    pub receiver: ReceiverNode,
    pub payroll: PayrollNode,
}

impl CfdiDocument {
    /// Attach the seal produced over this document's cadena.
    pub fn set_sello(&mut self, sello: String) {
        self.sello = Some(sello);
    }

    /// Document fields in schema order, for cadena derivation. The seal
    /// and the certificate blob are excluded: the cadena is the input to
    /// the seal, not its output.
    pub fn cadena_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = vec![CFDI_VERSION];
        if let Some(serie) = &self.serie {
            fields.push(serie);
        }
        if let Some(folio) = &self.folio {
            fields.push(folio);
        }
        fields.extend([
            self.issued_at.as_str(),
            self.certificate_serial.as_str(),
            self.subtotal.as_str(),
            self.discount.as_str(),
            "MXN",
            self.total.as_str(),
            self.doc_type.as_str(),
            self.place_of_issue.as_str(),
            self.issuer.rfc.as_str(),
            self.issuer.name.as_str(),
            self.issuer.fiscal_regime.as_str(),
            self.receiver.rfc.as_str(),
            self.receiver.name.as_str(),
        ]);
        let p = &self.payroll;
        fields.extend([
            PAYROLL_VERSION,
            p.type_code.as_str(),
            p.payment_date.as_str(),
            p.date_from.as_str(),
            p.date_to.as_str(),
            p.days_paid.as_str(),
        ]);
        for opt in [
            &p.total_perceptions,
            &p.total_deductions,
            &p.total_other_payments,
            &p.employer_registration,
        ] {
            if let Some(v) = opt {
                fields.push(v);
            }
        }
        let e = &p.employee;
        fields.push(e.curp.as_str());
        if let Some(ssnid) = &e.ssnid {
            fields.push(ssnid);
        }
        fields.extend([
            e.labor_relation_start.as_str(),
            e.seniority.as_str(),
            e.contract_type.as_str(),
            e.regime_type.as_str(),
            e.employee_number.as_str(),
        ]);
        if let Some(dept) = &e.department {
            fields.push(dept);
        }
        fields.extend([
            e.job_risk.as_str(),
            e.payment_periodicity.as_str(),
            e.integrated_wage.as_str(),
            e.state_code.as_str(),
        ]);
        if let Some(perceptions) = &p.perceptions {
            fields.push(perceptions.total_salaries.as_str());
            if let Some(v) = &perceptions.total_separation {
                fields.push(v);
            }
            if let Some(v) = &perceptions.total_retirement {
                fields.push(v);
            }
            fields.push(perceptions.total_taxed.as_str());
            fields.push(perceptions.total_exempt.as_str());
            for entry in &perceptions.entries {
                fields.extend([
                    entry.code.as_str(),
                    entry.name.as_str(),
                    entry.taxed.as_str(),
                    entry.exempt.as_str(),
                ]);
            }
            if let Some(r) = &perceptions.retirement {
                for opt in [&r.amount_lump, &r.amount_partial, &r.amount_daily] {
                    if let Some(v) = opt {
                        fields.push(v);
                    }
                }
                fields.push(r.accumulable_income.as_str());
                fields.push(r.non_accumulable_income.as_str());
            }
            if let Some(s) = &perceptions.separation {
                fields.extend([
                    s.amount_total.as_str(),
                    s.service_years.as_str(),
                    s.last_salary.as_str(),
                    s.accumulable_income.as_str(),
                    s.non_accumulable_income.as_str(),
                ]);
            }
        }
        if let Some(deductions) = &p.deductions {
            fields.push(deductions.total_other.as_str());
            if let Some(v) = &deductions.withheld_tax {
                fields.push(v);
            }
            for entry in &deductions.entries {
                fields.extend([entry.code.as_str(), entry.name.as_str(), entry.amount.as_str()]);
            }
        }
        for other in &p.other_payments {
            fields.extend([other.code.as_str(), other.name.as_str(), other.amount.as_str()]);
            if let Some(b) = &other.balance {
                fields.extend([b.amount.as_str(), b.year.as_str(), b.remaining.as_str()]);
            }
        }
        for inability in &p.inabilities {
            fields.extend([
                inability.days.as_str(),
                inability.type_code.as_str(),
                inability.discount.as_str(),
            ]);
        }
        fields
    }

    /// Serialize to the wire form. Deterministic: fixed attribute order,
    /// fixed escaping, no whitespace variation.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        out.push_str("<cfdi:Comprobante xmlns:cfdi=\"http://www.sat.gob.mx/cfd/3\" xmlns:nomina12=\"http://www.sat.gob.mx/nomina12\"");
        attr(&mut out, "Version", CFDI_VERSION);
        opt_attr(&mut out, "Serie", &self.serie);
        opt_attr(&mut out, "Folio", &self.folio);
        attr(&mut out, "Fecha", &self.issued_at);
        opt_attr(&mut out, "Sello", &self.sello);
        attr(&mut out, "FormaPago", "99");
        attr(&mut out, "NoCertificado", &self.certificate_serial);
        attr(&mut out, "Certificado", &self.certificate_b64);
        attr(&mut out, "SubTotal", &self.subtotal);
        attr(&mut out, "Descuento", &self.discount);
        attr(&mut out, "Moneda", "MXN");
        attr(&mut out, "Total", &self.total);
        attr(&mut out, "TipoDeComprobante", &self.doc_type);
        attr(&mut out, "MetodoPago", "PUE");
        attr(&mut out, "LugarExpedicion", &self.place_of_issue);
        out.push('>');

        out.push_str("<cfdi:Emisor");
        attr(&mut out, "Rfc", &self.issuer.rfc);
        attr(&mut out, "Nombre", &self.issuer.name);
        attr(&mut out, "RegimenFiscal", &self.issuer.fiscal_regime);
        out.push_str("/>");

        out.push_str("<cfdi:Receptor");
        attr(&mut out, "Rfc", &self.receiver.rfc);
        attr(&mut out, "Nombre", &self.receiver.name);
        attr(&mut out, "UsoCFDI", "P01");
        out.push_str("/>");

        out.push_str("<cfdi:Conceptos><cfdi:Concepto");
        attr(&mut out, "ClaveProdServ", PAYROLL_PROD_SERV);
        attr(&mut out, "Cantidad", "1");
        attr(&mut out, "ClaveUnidad", "ACT");
        attr(&mut out, "Descripcion", "Pago de nómina");
        attr(&mut out, "ValorUnitario", &self.subtotal);
        attr(&mut out, "Importe", &self.subtotal);
        attr(&mut out, "Descuento", &self.discount);
        out.push_str("/></cfdi:Conceptos>");

        out.push_str("<cfdi:Complemento><nomina12:Nomina");
        let p = &self.payroll;
        attr(&mut out, "Version", PAYROLL_VERSION);
        attr(&mut out, "TipoNomina", &p.type_code);
        attr(&mut out, "FechaPago", &p.payment_date);
        attr(&mut out, "FechaInicialPago", &p.date_from);
        attr(&mut out, "FechaFinalPago", &p.date_to);
        attr(&mut out, "NumDiasPagados", &p.days_paid);
        opt_attr(&mut out, "TotalPercepciones", &p.total_perceptions);
        opt_attr(&mut out, "TotalDeducciones", &p.total_deductions);
        opt_attr(&mut out, "TotalOtrosPagos", &p.total_other_payments);
        out.push('>');

        out.push_str("<nomina12:Emisor");
        opt_attr(&mut out, "RegistroPatronal", &p.employer_registration);
        out.push_str("/>");

        let e = &p.employee;
        out.push_str("<nomina12:Receptor");
        attr(&mut out, "Curp", &e.curp);
        opt_attr(&mut out, "NumSeguridadSocial", &e.ssnid);
        attr(&mut out, "FechaInicioRelLaboral", &e.labor_relation_start);
        attr(&mut out, "Antigüedad", &e.seniority);
        attr(&mut out, "TipoContrato", &e.contract_type);
        attr(&mut out, "TipoRegimen", &e.regime_type);
        attr(&mut out, "NumEmpleado", &e.employee_number);
        opt_attr(&mut out, "Departamento", &e.department);
        attr(&mut out, "RiesgoPuesto", &e.job_risk);
        attr(&mut out, "PeriodicidadPago", &e.payment_periodicity);
        attr(&mut out, "SalarioDiarioIntegrado", &e.integrated_wage);
        attr(&mut out, "ClaveEntFed", &e.state_code);
        out.push_str("/>");

        if let Some(perceptions) = &p.perceptions {
            out.push_str("<nomina12:Percepciones");
            attr(&mut out, "TotalSueldos", &perceptions.total_salaries);
            opt_attr(
                &mut out,
                "TotalSeparacionIndemnizacion",
                &perceptions.total_separation,
            );
            opt_attr(
                &mut out,
                "TotalJubilacionPensionRetiro",
                &perceptions.total_retirement,
            );
            attr(&mut out, "TotalGravado", &perceptions.total_taxed);
            attr(&mut out, "TotalExento", &perceptions.total_exempt);
            out.push('>');
            for entry in &perceptions.entries {
                out.push_str("<nomina12:Percepcion");
                attr(&mut out, "TipoPercepcion", &entry.code);
                attr(&mut out, "Clave", &entry.code);
                attr(&mut out, "Concepto", &entry.name);
                attr(&mut out, "ImporteGravado", &entry.taxed);
                attr(&mut out, "ImporteExento", &entry.exempt);
                out.push_str("/>");
            }
            if let Some(r) = &perceptions.retirement {
                out.push_str("<nomina12:JubilacionPensionRetiro");
                opt_attr(&mut out, "TotalUnaExhibicion", &r.amount_lump);
                opt_attr(&mut out, "TotalParcialidad", &r.amount_partial);
                opt_attr(&mut out, "MontoDiario", &r.amount_daily);
                attr(&mut out, "IngresoAcumulable", &r.accumulable_income);
                attr(&mut out, "IngresoNoAcumulable", &r.non_accumulable_income);
                out.push_str("/>");
            }
            if let Some(s) = &perceptions.separation {
                out.push_str("<nomina12:SeparacionIndemnizacion");
                attr(&mut out, "TotalPagado", &s.amount_total);
                attr(&mut out, "NumAñosServicio", &s.service_years);
                attr(&mut out, "UltimoSueldoMensOrd", &s.last_salary);
                attr(&mut out, "IngresoAcumulable", &s.accumulable_income);
                attr(&mut out, "IngresoNoAcumulable", &s.non_accumulable_income);
                out.push_str("/>");
            }
            out.push_str("</nomina12:Percepciones>");
        }

        if let Some(deductions) = &p.deductions {
            out.push_str("<nomina12:Deducciones");
            attr(&mut out, "TotalOtrasDeducciones", &deductions.total_other);
            opt_attr(&mut out, "TotalImpuestosRetenidos", &deductions.withheld_tax);
            out.push('>');
            for entry in &deductions.entries {
                out.push_str("<nomina12:Deduccion");
                attr(&mut out, "TipoDeduccion", &entry.code);
                attr(&mut out, "Clave", &entry.code);
                attr(&mut out, "Concepto", &entry.name);
                attr(&mut out, "Importe", &entry.amount);
                out.push_str("/>");
            }
            out.push_str("</nomina12:Deducciones>");
        }

        if !p.other_payments.is_empty() {
            out.push_str("<nomina12:OtrosPagos>");
            for other in &p.other_payments {
                out.push_str("<nomina12:OtroPago");
                attr(&mut out, "TipoOtroPago", &other.code);
                attr(&mut out, "Clave", &other.code);
                attr(&mut out, "Concepto", &other.name);
                attr(&mut out, "Importe", &other.amount);
                out.push('>');
                if let Some(b) = &other.balance {
                    out.push_str("<nomina12:CompensacionSaldosAFavor");
                    attr(&mut out, "SaldoAFavor", &b.amount);
                    attr(&mut out, "Año", &b.year);
                    attr(&mut out, "RemanenteSalFav", &b.remaining);
                    out.push_str("/>");
                }
                out.push_str("</nomina12:OtroPago>");
            }
            out.push_str("</nomina12:OtrosPagos>");
        }

        if !p.inabilities.is_empty() {
            out.push_str("<nomina12:Incapacidades>");
            for inability in &p.inabilities {
                out.push_str("<nomina12:Incapacidad");
                attr(&mut out, "DiasIncapacidad", &inability.days);
                attr(&mut out, "TipoIncapacidad", &inability.type_code);
                attr(&mut out, "ImporteMonetario", &inability.discount);
                out.push_str("/>");
            }
            out.push_str("</nomina12:Incapacidades>");
        }

        out.push_str("</nomina12:Nomina></cfdi:Complemento></cfdi:Comprobante>");
        out
    }
}

fn attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_xml(value));
    out.push('"');
}

fn opt_attr(out: &mut String, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        attr(out, name, value);
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Pay periodicity code derived from the period length.
fn payment_periodicity(period_days: i64) -> &'static str {
    match period_days {
        1 => "01",
        7 => "02",
        14 => "03",
        15 => "04",
        28..=31 => "05",
        _ => "99",
    }
}

/// Assemble the document tree from the payslip, its payload and the
/// sealing certificate identity. Pure: the same inputs always produce
/// the same tree, and therefore the same cadena and rendered bytes.
pub fn build_document(
    input: &PayslipInput,
    payload: &PayrollPayload,
    issued_at: NaiveDateTime,
    certificate_serial: &str,
    certificate_b64: &str,
) -> CfdiDocument {
    let total_perceptions = payload.total_perceptions();
    let total_deductions = payload.total_deductions();
    let subtotal = total_perceptions + payload.total_other_payments;
    let total = subtotal - total_deductions;

    let perceptions = (!payload.perceptions.is_empty()).then(|| {
        let mut separation = None;
        let mut retirement = None;
        for node in &payload.extra_nodes {
            match node {
                ExtraNode::Separation {
                    amount_total,
                    last_salary,
                    service_years,
                    accumulable_income,
                    non_accumulable_income,
                } => {
                    separation = Some(SeparationDetail {
                        amount_total: amount_total.to_cfdi_string(),
                        service_years: service_years.to_string(),
                        last_salary: last_salary.to_cfdi_string(),
                        accumulable_income: accumulable_income.to_cfdi_string(),
                        non_accumulable_income: non_accumulable_income.to_cfdi_string(),
                    });
                }
                ExtraNode::Retirement {
                    amount_total,
                    amount_daily,
                    accumulable_income,
                    non_accumulable_income,
                } => {
                    let partial = amount_daily.is_some();
                    retirement = Some(RetirementDetail {
                        amount_lump: (!partial).then(|| amount_total.to_cfdi_string()),
                        amount_partial: partial.then(|| amount_total.to_cfdi_string()),
                        amount_daily: amount_daily.map(|d| d.to_cfdi_string()),
                        accumulable_income: accumulable_income.to_cfdi_string(),
                        non_accumulable_income: non_accumulable_income.to_cfdi_string(),
                    });
                }
            }
        }
        PerceptionsNode {
            total_salaries: payload.total_salaries.to_cfdi_string(),
            total_separation: (!payload.total_separation.is_zero())
                .then(|| payload.total_separation.to_cfdi_string()),
            total_retirement: (!payload.total_retirement.is_zero())
                .then(|| payload.total_retirement.to_cfdi_string()),
            total_taxed: payload.total_taxed.to_cfdi_string(),
            total_exempt: payload.total_exempt.to_cfdi_string(),
            entries: payload
                .perceptions
                .iter()
                .map(|p| PerceptionEntry {
                    code: p.code.clone(),
                    name: p.name.clone(),
                    taxed: p.taxed.to_cfdi_string(),
                    exempt: p.exempt.to_cfdi_string(),
                })
                .collect(),
            separation,
            retirement,
        }
    });

    let deductions = (!payload.deductions.is_empty()).then(|| DeductionsNode {
        total_other: payload.total_other_deductions.to_cfdi_string(),
        withheld_tax: payload.withheld_tax.clone(),
        entries: payload
            .deductions
            .iter()
            .map(|d| DeductionEntry {
                code: d.code.clone(),
                name: d.name.clone(),
                amount: d.amount.to_cfdi_string(),
            })
            .collect(),
    });

    let other_payments = payload
        .other_payments
        .iter()
        .map(|o| OtherPaymentEntry {
            code: o.code.clone(),
            name: o.name.clone(),
            amount: o.amount.to_cfdi_string(),
            balance: o.balance.as_ref().map(|b| BalanceDetail {
                amount: b.amount.to_cfdi_string(),
                year: b.year.to_string(),
                remaining: b.remaining.to_cfdi_string(),
            }),
        })
        .collect();

    let inabilities = payload
        .inabilities
        .iter()
        .map(|i| InabilityEntry {
            days: i.days.to_string(),
            type_code: i.kind.type_code().to_owned(),
            discount: i.discount.to_cfdi_string(),
        })
        .collect();

    let contract_start = payload.labor_relation_start.format("%Y-%m-%d").to_string();
    let employee = &input.employee;

    CfdiDocument {
        serie: payload.serie.clone(),
        folio: payload.folio.clone(),
        issued_at: issued_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        doc_type: if input.credit_note { "E" } else { "N" }.to_owned(),
        subtotal: subtotal.to_cfdi_string(),
        discount: total_deductions.to_cfdi_string(),
        total: total.to_cfdi_string(),
        place_of_issue: input.company.zip.clone(),
        certificate_serial: certificate_serial.to_owned(),
        certificate_b64: certificate_b64.to_owned(),
        sello: None,
        issuer: IssuerNode {
            rfc: input.company.rfc.to_string(),
            name: input.company.name.clone(),
            fiscal_regime: input.company.fiscal_regime.clone(),
        },
        receiver: ReceiverNode {
            rfc: employee.rfc.to_string(),
            name: employee.name.clone(),
        },
        payroll: PayrollNode {
            type_code: payload.payslip_type.code().to_owned(),
            payment_date: input.payment_date.format("%Y-%m-%d").to_string(),
            date_from: input.date_from.format("%Y-%m-%d").to_string(),
            date_to: input.date_to.format("%Y-%m-%d").to_string(),
            days_paid: payload.days_paid.to_string(),
            total_perceptions: (!total_perceptions.is_zero())
                .then(|| total_perceptions.to_cfdi_string()),
            total_deductions: (!total_deductions.is_zero())
                .then(|| total_deductions.to_cfdi_string()),
            total_other_payments: (!payload.total_other_payments.is_zero())
                .then(|| payload.total_other_payments.to_cfdi_string()),
            employer_registration: input.company.employer_registration.clone(),
            employee: PayrollReceiverNode {
                curp: employee.curp.to_string(),
                ssnid: employee.ssnid.clone(),
                labor_relation_start: contract_start,
                seniority: payload.seniority_weeks.clone(),
                contract_type: employee.contract_type.clone(),
                regime_type: employee.regime_type.clone(),
                employee_number: employee.number.clone(),
                department: employee.department.clone(),
                job_risk: employee.job_risk.clone(),
                payment_periodicity: payment_periodicity(input.period_days()).to_owned(),
                integrated_wage: input
                    .contract
                    .as_ref()
                    .map(|c| c.integrated_wage.to_cfdi_string())
                    .unwrap_or_else(|| "0.00".to_owned()),
                state_code: employee.state_code.clone(),
            },
            perceptions,
            deductions,
            other_payments,
            inabilities,
        },
    }
}
