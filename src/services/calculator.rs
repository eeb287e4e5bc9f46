//! Loan arithmetic: EMI, total interest and loan-to-value ratio
//!
//! All amounts are `f64` in the same currency unit as the principal and are
//! rounded to two decimal places on output. Inputs are validated, and an
//! installment that still comes out non-finite is reported as an error, so
//! the functions never return a negative, NaN or infinite installment.

use thiserror::Error;

/// Months per year, used to derive the monthly rate from an annual one
const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalculationError {
    #[error("Principal must be a positive amount, got {0}")]
    InvalidPrincipal(f64),

    #[error("Annual interest rate must be zero or positive, got {0}")]
    InvalidRate(f64),

    #[error("Tenure must be at least one month")]
    InvalidTenure,

    #[error("Installment is not representable for these loan terms")]
    Unrepresentable,
}

/// Round to two decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Equal monthly installment that amortizes `principal` over `tenure_months`
/// at `annual_rate_percent` nominal annual interest.
///
/// A zero rate degrades to straight division of the principal. The
/// annuity factor is evaluated as `-expm1(-n * ln1p(r))` so it stays accurate
/// for rates near zero and does not overflow for very long tenures.
pub fn calculate_emi(
    principal: f64,
    annual_rate_percent: f64,
    tenure_months: u32,
) -> Result<f64, CalculationError> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(CalculationError::InvalidPrincipal(principal));
    }
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(CalculationError::InvalidRate(annual_rate_percent));
    }
    if tenure_months == 0 {
        return Err(CalculationError::InvalidTenure);
    }

    let monthly_rate = annual_rate_percent / MONTHS_PER_YEAR / 100.0;
    let n = tenure_months as f64;

    if monthly_rate == 0.0 {
        return Ok(round2(principal / n));
    }

    // 1 - (1 + r)^-n, in (0, 1] for any r > 0
    let discount = -(-n * monthly_rate.ln_1p()).exp_m1();
    let emi = principal * monthly_rate / discount;
    if !emi.is_finite() || emi <= 0.0 {
        return Err(CalculationError::Unrepresentable);
    }

    Ok(round2(emi))
}

/// Interest paid over the whole tenure: `emi * n - principal`
pub fn calculate_total_interest(
    principal: f64,
    annual_rate_percent: f64,
    tenure_months: u32,
) -> Result<f64, CalculationError> {
    let emi = calculate_emi(principal, annual_rate_percent, tenure_months)?;
    let total = round2(emi * tenure_months as f64 - principal);
    // Rounding the installment down can leave a few paise below zero
    Ok(total.max(0.0))
}

/// Loan amount as a percentage of pledged collateral value.
///
/// Zero collateral yields a ratio of zero.
pub fn calculate_ltv(loan_amount: f64, collateral_value: f64) -> f64 {
    if collateral_value == 0.0 {
        return 0.0;
    }
    round2(loan_amount / collateral_value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emi_golden_value() {
        // r = 0.01 per month
        assert_eq!(calculate_emi(500_000.0, 12.0, 24).unwrap(), 23_536.74);
        assert_eq!(calculate_emi(100_000.0, 10.5, 12).unwrap(), 8_814.86);
        assert_eq!(calculate_emi(1_000_000.0, 12.0, 36).unwrap(), 33_214.31);
    }

    #[test]
    fn test_emi_zero_rate_is_straight_division() {
        assert_eq!(calculate_emi(100_000.0, 0.0, 10).unwrap(), 10_000.0);
        assert_eq!(calculate_emi(1_000.0, 0.0, 3).unwrap(), round2(1_000.0 / 3.0));
    }

    #[test]
    fn test_emi_is_positive() {
        for principal in [100.0, 999.99, 50_000.0, 10_000_000.0] {
            for rate in [0.0, 0.5, 10.5, 36.0] {
                for tenure in [1, 6, 24, 360] {
                    let emi = calculate_emi(principal, rate, tenure).unwrap();
                    assert!(emi > 0.0, "emi({principal}, {rate}, {tenure}) = {emi}");
                }
            }
        }
    }

    #[test]
    fn test_emi_decreases_with_longer_tenure() {
        let mut previous = f64::MAX;
        for tenure in [3, 6, 12, 24, 36, 60] {
            let emi = calculate_emi(500_000.0, 12.0, tenure).unwrap();
            assert!(emi < previous);
            previous = emi;
        }
    }

    #[test]
    fn test_emi_increases_with_rate() {
        let mut previous = 0.0;
        for rate in [0.0, 6.0, 10.5, 12.0, 15.0, 24.0] {
            let emi = calculate_emi(500_000.0, rate, 24).unwrap();
            assert!(emi > previous);
            previous = emi;
        }
    }

    #[test]
    fn test_single_month_repays_principal_plus_one_month_interest() {
        assert_eq!(calculate_emi(100_000.0, 12.0, 1).unwrap(), 101_000.0);
    }

    #[test]
    fn test_emi_near_zero_rate_approaches_straight_division() {
        let emi = calculate_emi(100_000.0, 1e-14, 12).unwrap();
        assert!(emi.is_finite());
        assert_eq!(emi, 8_333.33);

        assert_eq!(calculate_emi(100_000.0, 1e-9, 12).unwrap(), 8_333.33);
    }

    #[test]
    fn test_emi_very_long_tenure_tends_to_interest_only() {
        // r = 0.01 per month, so the installment approaches P * r
        assert_eq!(calculate_emi(100_000.0, 12.0, 200_000).unwrap(), 1_000.0);
        assert_eq!(calculate_emi(100_000.0, 12.0, u32::MAX).unwrap(), 1_000.0);
    }

    #[test]
    fn test_emi_overflow_is_an_error() {
        assert_eq!(
            calculate_emi(f64::MAX, 1e300, 12),
            Err(CalculationError::Unrepresentable)
        );
    }

    #[test]
    fn test_total_interest() {
        assert_eq!(calculate_total_interest(500_000.0, 12.0, 24).unwrap(), 64_881.76);
        assert_eq!(calculate_total_interest(100_000.0, 0.0, 10).unwrap(), 0.0);
        assert!(calculate_total_interest(75_000.0, 9.0, 18).unwrap() >= 0.0);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        assert_eq!(
            calculate_emi(0.0, 12.0, 12),
            Err(CalculationError::InvalidPrincipal(0.0))
        );
        assert!(calculate_emi(-10.0, 12.0, 12).is_err());
        assert!(calculate_emi(f64::INFINITY, 12.0, 12).is_err());
        assert!(calculate_emi(1_000.0, -1.0, 12).is_err());
        assert!(calculate_emi(1_000.0, f64::NAN, 12).is_err());
        assert_eq!(
            calculate_emi(1_000.0, 12.0, 0),
            Err(CalculationError::InvalidTenure)
        );
    }

    #[test]
    fn test_ltv() {
        assert_eq!(calculate_ltv(60_000.0, 100_000.0), 60.0);
        assert_eq!(calculate_ltv(60_000.0, 0.0), 0.0);
        assert_eq!(calculate_ltv(1.0, 3.0), 33.33);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005 * 1000.0), 1005.0);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(2.346), 2.35);
    }
}
