//! Payroll value aggregation.
//!
//! Turns a [`PayslipInput`] into the ephemeral [`PayrollPayload`] the
//! renderer consumes. The payload is rebuilt from scratch on every
//! generation attempt; nothing here is persisted.
//!
//! Statutory branching lives here and only here: separation and
//! retirement extra nodes, withheld-tax split, extraordinary payslip
//! reclassification, inability day attribution, seniority rounding.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::warn;

use nomina_core::Money;

use crate::catalog::{InabilityKind, LineCategory, RuleCatalog};
use crate::error::CfdiError;
use crate::input::PayslipInput;

/// Perception codes that feed the separation (severance) extra node.
pub const SEPARATION_CODES: [&str; 3] = ["022", "023", "025"];
/// Retirement paid in one lump sum.
pub const RETIREMENT_LUMP_CODE: &str = "039";
/// Retirement paid in partial installments.
pub const RETIREMENT_PARTIAL_CODE: &str = "044";
/// Ordinary salary perception.
pub const SALARY_CODE: &str = "001";
/// ISR withheld, on the deduction side.
pub const WITHHELD_TAX_CODE: &str = "002";
/// Inability discount, on the deduction side.
pub const INABILITY_DISCOUNT_CODE: &str = "006";
/// Applied balance in favor, on the other-payment side.
pub const BALANCE_IN_FAVOR_CODE: &str = "004";

/// Document-level payroll type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayslipType {
    /// Regular periodic payroll (`O`).
    Ordinary,
    /// Extraordinary payroll such as bonuses or severance (`E`).
    Extraordinary,
}

impl PayslipType {
    pub fn code(self) -> &'static str {
        match self {
            PayslipType::Ordinary => "O",
            PayslipType::Extraordinary => "E",
        }
    }
}

/// One aggregated perception entry, taxed/exempt merged by code.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadPerception {
    pub code: String,
    pub name: String,
    pub taxed: Money,
    pub exempt: Money,
}

impl PayloadPerception {
    pub fn total(&self) -> Money {
        self.taxed + self.exempt
    }
}

/// One aggregated deduction entry, always positive.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadDeduction {
    pub code: String,
    pub name: String,
    pub amount: Money,
}

/// One aggregated other-payment entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadOtherPayment {
    pub code: String,
    pub name: String,
    pub amount: Money,
    /// Present on code 004: the balance-in-favor being applied.
    pub balance: Option<BalanceInFavor>,
}

/// Balance-in-favor detail carried under other payment code 004.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceInFavor {
    pub amount: Money,
    /// Fiscal year the balance originated in.
    pub year: i32,
    pub remaining: Money,
}

/// Inability entry: days attributed to one of the statutory categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Inability {
    pub kind: InabilityKind,
    pub days: u32,
    /// Share of the inability discount attributed to this entry.
    pub discount: Money,
}

/// Separation or retirement detail node.
///
/// At most one retirement variant may exist per payslip; separation and
/// retirement may coexist.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraNode {
    Separation {
        amount_total: Money,
        last_salary: Money,
        /// Completed years of service, rounded per the statutory rule.
        service_years: u32,
        accumulable_income: Money,
        non_accumulable_income: Money,
    },
    Retirement {
        amount_total: Money,
        /// Daily amount, present only for the partial modality (044).
        amount_daily: Option<Money>,
        accumulable_income: Money,
        non_accumulable_income: Money,
    },
}

impl ExtraNode {
    fn is_separation(&self) -> bool {
        matches!(self, ExtraNode::Separation { .. })
    }
}

/// Ephemeral aggregation result, rebuilt per generation attempt.
#[derive(Debug, Clone)]
pub struct PayrollPayload {
    pub payslip_type: PayslipType,
    pub serie: Option<String>,
    pub folio: Option<String>,
    /// Days paid in the period, from worked-days entries.
    pub days_paid: u32,
    /// ISO-8601 week duration for the document's seniority attribute,
    /// e.g. `"P123W"`.
    pub seniority_weeks: String,
    /// Contract start date, the labor-relation anchor on the document.
    pub labor_relation_start: NaiveDate,
    pub perceptions: Vec<PayloadPerception>,
    pub total_salaries: Money,
    pub total_separation: Money,
    pub total_retirement: Money,
    pub total_taxed: Money,
    pub total_exempt: Money,
    pub deductions: Vec<PayloadDeduction>,
    /// Deductions other than withheld tax, as absolute amounts.
    pub total_other_deductions: Money,
    /// ISR withheld as a fixed two-decimal string; `None` when zero.
    pub withheld_tax: Option<String>,
    pub other_payments: Vec<PayloadOtherPayment>,
    pub total_other_payments: Money,
    pub extra_nodes: Vec<ExtraNode>,
    pub inabilities: Vec<Inability>,
}

impl PayrollPayload {
    /// Total of all perceptions (taxed + exempt).
    pub fn total_perceptions(&self) -> Money {
        self.total_taxed + self.total_exempt
    }

    /// Total of all deductions, withheld tax included.
    pub fn total_deductions(&self) -> Money {
        let withheld = self
            .withheld_tax
            .as_deref()
            .and_then(|s| Money::parse(s).ok())
            .unwrap_or(Money::ZERO);
        self.total_other_deductions + withheld
    }

    /// Drop extra nodes whose originating codes no longer appear on the
    /// payslip. Run after re-aggregation when a payslip was recomputed
    /// with severance or retirement lines removed; stale nodes must not
    /// survive into the next render.
    pub fn clear_stale_extra_nodes(&mut self, input: &PayslipInput) {
        let has_separation = input
            .lines
            .iter()
            .any(|l| is_perception(l.category) && SEPARATION_CODES.contains(&l.code.as_str()));
        let has_retirement = input.lines.iter().any(|l| {
            is_perception(l.category)
                && (l.code == RETIREMENT_LUMP_CODE || l.code == RETIREMENT_PARTIAL_CODE)
        });
        self.extra_nodes.retain(|node| {
            if node.is_separation() {
                has_separation
            } else {
                has_retirement
            }
        });
    }
}

fn is_perception(category: LineCategory) -> bool {
    matches!(
        category,
        LineCategory::PerceptionTaxed | LineCategory::PerceptionExempt
    )
}

/// Remove characters the authority rejects in free-text attributes:
/// strip `|` (the cadena delimiter), trim, cut at 100 characters.
pub fn sanitize_text(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| *c != '|').collect();
    cleaned.trim().chars().take(100).collect()
}

/// Split an HR sequence number into document serie and folio.
///
/// The last digit run in the number becomes the folio with leading zeros
/// stripped; whatever precedes that run is the serie. `"SLIP/00042"`
/// splits into `("SLIP/", "42")` and `"SLIP/0042A"` into the same folio.
/// A number without digits has no folio, and an all-zero run folds to no
/// folio as well.
pub fn split_serie_folio(number: &str) -> (Option<String>, Option<String>) {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return (None, None);
    }
    let mut last_run: Option<(usize, usize)> = None;
    let mut run_start: Option<usize> = None;
    for (i, c) in trimmed.char_indices() {
        if c.is_ascii_digit() {
            let start = *run_start.get_or_insert(i);
            last_run = Some((start, i + c.len_utf8()));
        } else {
            run_start = None;
        }
    }
    let Some((start, end)) = last_run else {
        return (Some(sanitize_text(trimmed)), None);
    };
    let serie_raw = &trimmed[..start];
    let serie = if serie_raw.is_empty() {
        None
    } else {
        Some(sanitize_text(serie_raw))
    };
    let stripped = trimmed[start..end].trim_start_matches('0');
    let folio = if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_owned())
    };
    (serie, folio)
}

/// Calendar distance between two dates as (years, months, days).
///
/// Years and months count whole calendar units; the day remainder is
/// measured from the anchor date obtained by adding those units to the
/// start, clamping the day-of-month when the target month is shorter.
fn seniority_between(start: NaiveDate, end: NaiveDate) -> (i32, i32, i64) {
    let mut years = end.year() - start.year();
    let mut months = end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    if months < 0 {
        years -= 1;
        months += 12;
    }
    let total_months = start.month() as i32 - 1 + months;
    let anchor_year = start.year() + years + total_months / 12;
    let anchor_month = (total_months % 12 + 1) as u32;
    let anchor_day = start.day().min(days_in_month(anchor_year, anchor_month) as u32);
    let anchor = NaiveDate::from_ymd_opt(anchor_year, anchor_month, anchor_day).unwrap_or(end);
    (years, months, (end - anchor).num_days())
}

fn days_in_month(year: i32, month: u32) -> i64 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    match (first, next) {
        (Some(a), Some(b)) => (b - a).num_days(),
        _ => 30,
    }
}

/// Completed years of service for the separation node: round up when the
/// remainder exceeds half a year (months > 6, or exactly 6 months and
/// more than one day).
fn service_years(start: NaiveDate, end: NaiveDate) -> u32 {
    let (years, months, days) = seniority_between(start, end);
    let years = years.max(0) as u32;
    if months > 6 || (months == 6 && days > 1) {
        years + 1
    } else {
        years
    }
}

/// Full weeks between the contract start and the period end, in the
/// ISO-8601 duration form the seniority attribute wants.
fn seniority_weeks(start: NaiveDate, end: NaiveDate) -> String {
    let weeks = ((end - start).num_days() / 7).max(0);
    format!("P{weeks}W")
}

/// Aggregate a payslip into its payroll payload.
///
/// Fails when the payslip has no contract or when both retirement
/// modalities (039 and 044) appear at once.
pub fn compute_payload(
    input: &PayslipInput,
    catalog: &RuleCatalog,
) -> Result<PayrollPayload, CfdiError> {
    let contract = input.contract.as_ref().ok_or(CfdiError::MissingContract)?;

    // Perceptions: merge taxed/exempt by code, order by code.
    let mut perceptions: Vec<PayloadPerception> = Vec::new();
    for line in &input.lines {
        let taxed = match line.category {
            LineCategory::PerceptionTaxed => true,
            LineCategory::PerceptionExempt => false,
            _ => continue,
        };
        if catalog.perception(&line.code).is_none() {
            warn!(code = %line.code, line = %line.name, "perception code not in catalog");
        }
        let entry = match perceptions.iter_mut().find(|p| p.code == line.code) {
            Some(p) => p,
            None => {
                perceptions.push(PayloadPerception {
                    code: line.code.clone(),
                    name: sanitize_text(&line.name),
                    taxed: Money::ZERO,
                    exempt: Money::ZERO,
                });
                perceptions.last_mut().expect("just pushed")
            }
        };
        if taxed {
            entry.taxed += line.total;
        } else {
            entry.exempt += line.total;
        }
    }
    perceptions.sort_by(|a, b| a.code.cmp(&b.code));

    let mut total_salaries = Money::ZERO;
    let mut total_separation = Money::ZERO;
    let mut total_retirement = Money::ZERO;
    let mut total_taxed = Money::ZERO;
    let mut total_exempt = Money::ZERO;
    for p in &perceptions {
        total_taxed += p.taxed;
        total_exempt += p.exempt;
        if SEPARATION_CODES.contains(&p.code.as_str()) {
            total_separation += p.total();
        } else if p.code == RETIREMENT_LUMP_CODE || p.code == RETIREMENT_PARTIAL_CODE {
            total_retirement += p.total();
        } else {
            total_salaries += p.total();
        }
    }

    let has_lump = perceptions.iter().any(|p| p.code == RETIREMENT_LUMP_CODE);
    let has_partial = perceptions
        .iter()
        .any(|p| p.code == RETIREMENT_PARTIAL_CODE);
    if has_lump && has_partial {
        return Err(CfdiError::ConflictingRetirementCodes);
    }

    // Extra nodes. Accumulable income is capped at one monthly wage; the
    // excess is non-accumulable.
    let mut extra_nodes = Vec::new();
    if !total_separation.is_zero() {
        let (accumulable, non_accumulable) = split_accumulable(total_separation, contract.wage);
        extra_nodes.push(ExtraNode::Separation {
            amount_total: total_separation,
            last_salary: contract.wage,
            service_years: service_years(contract.date_start, input.date_to),
            accumulable_income: accumulable,
            non_accumulable_income: non_accumulable,
        });
    }
    if has_lump || has_partial {
        let (accumulable, non_accumulable) = split_accumulable(total_retirement, contract.wage);
        extra_nodes.push(ExtraNode::Retirement {
            amount_total: total_retirement,
            amount_daily: has_partial.then(|| contract.daily_wage()),
            accumulable_income: accumulable,
            non_accumulable_income: non_accumulable,
        });
    }

    // Deductions: absolute amounts, withheld tax split out.
    let mut deductions: Vec<PayloadDeduction> = Vec::new();
    let mut withheld = Money::ZERO;
    let mut total_other_deductions = Money::ZERO;
    for line in input.lines_in(LineCategory::Deduction) {
        let amount = line.total.abs();
        if line.code == WITHHELD_TAX_CODE {
            withheld += amount;
        } else {
            total_other_deductions += amount;
        }
        match deductions.iter_mut().find(|d| d.code == line.code) {
            Some(d) => d.amount += amount,
            None => deductions.push(PayloadDeduction {
                code: line.code.clone(),
                name: sanitize_text(&line.name),
                amount,
            }),
        }
    }
    deductions.sort_by(|a, b| a.code.cmp(&b.code));
    let withheld_tax = if withheld.is_zero() {
        None
    } else {
        Some(withheld.to_cfdi_string())
    };

    // Other payments.
    let mut other_payments: Vec<PayloadOtherPayment> = Vec::new();
    let mut total_other_payments = Money::ZERO;
    for line in input.lines_in(LineCategory::OtherPayment) {
        total_other_payments += line.total;
        let balance = (line.code == BALANCE_IN_FAVOR_CODE).then(|| BalanceInFavor {
            amount: line.total,
            year: input.date_to.year() - 1,
            remaining: Money::ZERO,
        });
        other_payments.push(PayloadOtherPayment {
            code: line.code.clone(),
            name: sanitize_text(&line.name),
            amount: line.total,
            balance,
        });
    }
    other_payments.sort_by(|a, b| a.code.cmp(&b.code));

    // Inabilities: worked-days entries carrying a statutory leave code.
    // The inability discount (deduction 006) is apportioned by days.
    let discount_total: Money = deductions
        .iter()
        .filter(|d| d.code == INABILITY_DISCOUNT_CODE)
        .map(|d| d.amount)
        .sum();
    let inability_days: i64 = input
        .worked_days
        .iter()
        .filter(|w| InabilityKind::from_leave_code(&w.code).is_some())
        .map(|w| i64::from(w.days))
        .sum();
    let mut inabilities = Vec::new();
    for entry in &input.worked_days {
        let Some(kind) = InabilityKind::from_leave_code(&entry.code) else {
            continue;
        };
        let discount = if inability_days > 0 {
            Money::new(
                discount_total.amount() * Decimal::from(entry.days)
                    / Decimal::from(inability_days),
            )
            .rounded()
        } else {
            Money::ZERO
        };
        inabilities.push(Inability {
            kind,
            days: entry.days,
            discount,
        });
    }

    // A payslip with only severance/bonus codes and no ordinary salary is
    // an extraordinary payroll.
    let has_salary = perceptions.iter().any(|p| p.code == SALARY_CODE);
    let has_extraordinary = perceptions
        .iter()
        .any(|p| p.code == "002" || p.code == "023");
    let payslip_type = if !has_salary && has_extraordinary {
        PayslipType::Extraordinary
    } else {
        PayslipType::Ordinary
    };

    let days_paid: u32 = {
        let worked: u32 = input.worked_days.iter().map(|w| w.days).sum();
        if worked > 0 {
            worked
        } else {
            input.period_days().max(0) as u32
        }
    };

    let (serie, folio) = split_serie_folio(&input.number);

    Ok(PayrollPayload {
        payslip_type,
        serie,
        folio,
        days_paid,
        seniority_weeks: seniority_weeks(contract.date_start, input.date_to),
        labor_relation_start: contract.date_start,
        perceptions,
        total_salaries,
        total_separation,
        total_retirement,
        total_taxed,
        total_exempt,
        deductions,
        total_other_deductions,
        withheld_tax,
        other_payments,
        total_other_payments,
        extra_nodes,
        inabilities,
    })
}

fn split_accumulable(total: Money, wage: Money) -> (Money, Money) {
    let accumulable = if total < wage { total } else { wage };
    let excess = total - wage;
    let non_accumulable = if excess.amount().is_sign_negative() {
        Money::ZERO
    } else {
        excess
    };
    (accumulable, non_accumulable)
}
