//! Read-only payslip view consumed from the HR system.
//!
//! Aggregation never mutates these records; the payroll run that produced
//! them is the source of truth and everything fiscal is derived per
//! attempt. Monetary fields are [`Money`] (two-decimal fixed rendering),
//! dates are naive calendar dates in the issuer's timezone.

use chrono::NaiveDate;
use nomina_core::{Curp, Money, PayslipId, Rfc};
use serde::{Deserialize, Serialize};

use crate::catalog::LineCategory;

/// One computed payslip line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayslipLine {
    /// Statutory code from the published tables, e.g. `"002"`.
    pub code: String,
    /// Which document section the line belongs to.
    pub category: LineCategory,
    /// Line label as shown to the employee.
    pub name: String,
    /// Signed amount. Deductions commonly arrive negative and are
    /// normalized to absolute values during aggregation.
    pub total: Money,
}

impl PayslipLine {
    pub fn new(code: &str, category: LineCategory, name: &str, total: Money) -> Self {
        Self {
            code: code.to_owned(),
            category,
            name: name.to_owned(),
            total,
        }
    }
}

/// One worked-days entry: days attributed to an attendance or leave code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkedDays {
    /// Internal attendance/leave code, e.g. `"WORK100"` or `"LEAVE110"`.
    pub code: String,
    /// Number of calendar days attributed to this code.
    pub days: u32,
}

/// Employment contract. Required for aggregation: the daily wage,
/// integrated wage and seniority all derive from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Monthly wage.
    pub wage: Money,
    /// Daily integrated wage (SDI) used for the document's
    /// `SalarioDiarioIntegrado` attribute.
    pub integrated_wage: Money,
    /// Contract start date, the seniority anchor.
    pub date_start: NaiveDate,
}

impl Contract {
    /// Daily wage, thirty-day month convention.
    pub fn daily_wage(&self) -> Money {
        self.wage.div_int(30)
    }
}

/// Employee identity as the document's receptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub rfc: Rfc,
    pub curp: Curp,
    /// Social security number, when enrolled.
    pub ssnid: Option<String>,
    /// Published job-risk premium class, `"1"`..`"5"` or `"99"`.
    pub job_risk: String,
    /// Statutory contract-type code, e.g. `"01"` permanent.
    pub contract_type: String,
    /// Statutory regime-type code, e.g. `"02"` wages.
    pub regime_type: String,
    /// Employee number in the HR system.
    pub number: String,
    /// Department or cost-center label, optional.
    pub department: Option<String>,
    /// State code where services are rendered, e.g. `"JAL"`.
    pub state_code: String,
}

/// Issuing company identity as the document's emisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub rfc: Rfc,
    /// Fiscal regime code, e.g. `"601"`.
    pub fiscal_regime: String,
    /// Postal code of the place of issue.
    pub zip: String,
    /// Employer registry number with the social security institute.
    pub employer_registration: Option<String>,
}

/// The full payslip snapshot handed to aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayslipInput {
    pub id: PayslipId,
    /// Payslip number from the HR sequence, e.g. `"SLIP/00042"`. The
    /// trailing digit run becomes the document folio.
    pub number: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub payment_date: NaiveDate,
    pub employee: Employee,
    /// Absent when the employee has no running contract; aggregation
    /// rejects such payslips.
    pub contract: Option<Contract>,
    pub company: Company,
    pub lines: Vec<PayslipLine>,
    pub worked_days: Vec<WorkedDays>,
    /// True when this run refunds a previously issued payslip; the
    /// document is issued as an egreso.
    pub credit_note: bool,
}

impl PayslipInput {
    /// Days covered by the pay period, inclusive.
    pub fn period_days(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }

    /// Lines in a given document section.
    pub fn lines_in(&self, category: LineCategory) -> impl Iterator<Item = &PayslipLine> {
        self.lines.iter().filter(move |l| l.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_contract() -> Contract {
        Contract {
            wage: Money::new(dec!(15000)),
            integrated_wage: Money::new(dec!(522.50)),
            date_start: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
        }
    }

    #[test]
    fn daily_wage_uses_thirty_day_month() {
        let contract = sample_contract();
        assert_eq!(contract.daily_wage().to_cfdi_string(), "500.00");
    }

    #[test]
    fn period_days_is_inclusive() {
        let input = PayslipInput {
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
            contract: Some(sample_contract()),
            company: Company {
                name: "Trámites Digitales SA de CV".into(),
                rfc: Rfc::new("TDX150912QW3").unwrap(),
                fiscal_regime: "601".into(),
                zip: "44100".into(),
                employer_registration: Some("B5510768108".into()),
            },
            lines: vec![],
            worked_days: vec![],
            credit_note: false,
        };
        assert_eq!(input.period_days(), 15);
    }
}
