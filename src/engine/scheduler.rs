//! Credit scheduler
//!
//! Pure amortization math: given principal, annual rate and term, produce the
//! fixed monthly payment and the dated schedule. No I/O here; the ledger
//! persists the result atomically with the credit row.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;

/// One computed line of an amortization schedule, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleLine {
    pub due_date: DateTime<Utc>,
    pub amount: Decimal,
}

/// Fixed monthly payment for an annuity credit, rounded to cents.
///
/// Standard annuity formula with `monthly_rate = annual_rate / 12 / 100`:
/// `principal * r * (1+r)^n / ((1+r)^n - 1)`. A zero annual rate would divide
/// by zero, so it degenerates to an even split of the principal.
///
/// `term_months` must be at least 1; callers validate before reaching here.
pub fn monthly_payment(principal: Decimal, annual_rate_percent: Decimal, term_months: u32) -> Decimal {
    if annual_rate_percent.is_zero() {
        return (principal / Decimal::from(term_months)).round_dp(2);
    }

    let monthly_rate = annual_rate_percent / Decimal::from(12) / Decimal::from(100);
    let growth = compound(Decimal::ONE + monthly_rate, term_months);
    (principal * monthly_rate * growth / (growth - Decimal::ONE)).round_dp(2)
}

/// Build the full schedule for a credit issued at `issued_at`: exactly
/// `term_months` lines, equal amounts, due dates one calendar month apart
/// starting one month after issuance.
pub fn build_schedule(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
    issued_at: DateTime<Utc>,
) -> Vec<ScheduleLine> {
    let amount = monthly_payment(principal, annual_rate_percent, term_months);

    (0..term_months)
        .map(|offset| {
            let due_date = issued_at
                .checked_add_months(Months::new(offset + 1))
                .expect("due date within calendar range");
            ScheduleLine { due_date, amount }
        })
        .collect()
}

/// `base^n` by repeated multiplication, exact in Decimal for schedule-sized
/// exponents.
fn compound(base: Decimal, n: u32) -> Decimal {
    let mut acc = Decimal::ONE;
    for _ in 0..n {
        acc *= base;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn issued_at() -> DateTime<Utc> {
        "2026-01-15T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_monthly_payment_annuity() {
        // 1000 at 12% over 12 months: r = 0.01, payment ≈ 88.85
        let payment = monthly_payment(dec!(1000), dec!(12), 12);
        assert_eq!(payment, dec!(88.85));
    }

    #[test]
    fn test_monthly_payment_zero_rate() {
        let payment = monthly_payment(dec!(1200), dec!(0), 12);
        assert_eq!(payment, dec!(100.00));
    }

    #[test]
    fn test_schedule_amortizes_principal() {
        // Walking the balance with the computed payment must retire the
        // principal within rounding tolerance.
        let principal = dec!(1000);
        let payment = monthly_payment(principal, dec!(12), 12);
        let monthly_rate = dec!(12) / dec!(12) / dec!(100);

        let mut balance = principal;
        for _ in 0..12 {
            let interest = balance * monthly_rate;
            balance = balance + interest - payment;
        }

        assert!(balance.abs() < dec!(0.10), "residual balance {}", balance);
    }

    #[test]
    fn test_build_schedule_zero_rate() {
        let schedule = build_schedule(dec!(1200), dec!(0), 12, issued_at());

        assert_eq!(schedule.len(), 12);
        for line in &schedule {
            assert_eq!(line.amount, dec!(100.00));
        }
    }

    #[test]
    fn test_build_schedule_due_dates_increase_monthly() {
        let schedule = build_schedule(dec!(1000), dec!(12), 12, issued_at());

        assert_eq!(schedule.len(), 12);
        assert_eq!(
            schedule[0].due_date,
            "2026-02-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        for pair in schedule.windows(2) {
            assert!(pair[0].due_date < pair[1].due_date);
            assert_eq!(
                pair[0].due_date.checked_add_months(Months::new(1)).unwrap(),
                pair[1].due_date
            );
        }
    }

    #[test]
    fn test_build_schedule_single_month() {
        let schedule = build_schedule(dec!(500), dec!(10), 1, issued_at());

        assert_eq!(schedule.len(), 1);
        // One period: the whole principal plus one month of interest.
        assert_eq!(schedule[0].amount, dec!(504.17));
    }

    #[test]
    fn test_compound() {
        assert_eq!(compound(dec!(2), 10), dec!(1024));
        assert_eq!(compound(dec!(1.5), 0), Decimal::ONE);
    }
}
