use log::debug;

use super::AggregateTotals;
use crate::errors::Result;
use crate::money::{percentage_of, Currency, Money};
use crate::positions::Position;

/// Computes portfolio totals from its positions.
///
/// Cancelled positions are skipped. Sums are exact; rounding to minor units
/// happens only when totals are stored (see
/// [`AggregateTotals::rounded_for_persistence`]). Fails only with
/// `CurrencyMismatch` when a position is not denominated in `currency`.
pub fn recalculate(currency: Currency, positions: &[Position]) -> Result<AggregateTotals> {
    let mut total_value = Money::zero(currency);
    let mut total_invested = Money::zero(currency);
    let mut counted = 0usize;

    for position in positions.iter().filter(|p| p.is_counted()) {
        total_value = total_value.checked_add(&position.total_value())?;
        total_invested = total_invested.checked_add(&position.cost_basis())?;
        counted += 1;
    }

    let total_gain = total_value.checked_sub(&total_invested)?;
    debug!(
        "Recalculated {} of {} positions: value {}, invested {}",
        counted,
        positions.len(),
        total_value,
        total_invested
    );

    Ok(AggregateTotals {
        total_value,
        total_invested,
        total_gain,
        gain_percentage: percentage_of(total_gain.amount(), total_invested.amount()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::orders::OrderStatus;
    use crate::positions::{InvestmentType, NewPosition};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn usd() -> Currency {
        Currency::parse("USD").unwrap()
    }

    fn position(id: &str, quantity: Decimal, purchase: Decimal, current: Decimal) -> Position {
        NewPosition {
            id: Some(id.to_string()),
            portfolio_id: "pf-1".to_string(),
            order_id: None,
            investment_type: InvestmentType::Stock,
            name: id.to_string(),
            symbol: None,
            quantity,
            purchase_price: Money::new(purchase, usd()),
            current_price: Some(Money::new(current, usd())),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            maturity_date: None,
            interest_rate: None,
            status: None,
        }
        .into_position(String::new(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap())
        .unwrap()
    }

    #[test]
    fn test_empty_set_is_all_zero() {
        let totals = recalculate(usd(), &[]).unwrap();
        assert_eq!(totals, AggregateTotals::zero(usd()));
    }

    #[test]
    fn test_sums_non_cancelled_positions() {
        let mut cancelled = position("c", dec!(100), dec!(1), dec!(1));
        cancelled.status = OrderStatus::Cancelled;
        let positions = vec![
            position("a", dec!(10), dec!(400), dec!(450)),
            position("b", dec!(5), dec!(20), dec!(18)),
            cancelled,
        ];

        let totals = recalculate(usd(), &positions).unwrap();
        assert_eq!(totals.total_value.amount(), dec!(4590));
        assert_eq!(totals.total_invested.amount(), dec!(4100));
        assert_eq!(totals.total_gain.amount(), dec!(490));
        assert_eq!(
            totals.gain_percentage,
            dec!(490) / dec!(4100) * dec!(100)
        );
    }

    #[test]
    fn test_pending_and_closed_positions_still_count() {
        let mut pending = position("p", dec!(1), dec!(10), dec!(10));
        pending.status = OrderStatus::Pending;
        let mut matured = position("m", dec!(1), dec!(100), dec!(105));
        matured.status = OrderStatus::Matured;

        let totals = recalculate(usd(), &[pending, matured]).unwrap();
        assert_eq!(totals.total_value.amount(), dec!(115));
    }

    #[test]
    fn test_zero_invested_yields_zero_percentage() {
        let totals = recalculate(usd(), &[position("z", dec!(0), dec!(10), dec!(12))]).unwrap();
        assert_eq!(totals.gain_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_foreign_currency_position() {
        let mut foreign = position("f", dec!(1), dec!(10), dec!(10));
        foreign.purchase_price = Money::parse(dec!(10), "EUR").unwrap();
        foreign.current_price = Money::parse(dec!(10), "EUR").unwrap();
        assert!(matches!(
            recalculate(usd(), &[foreign]),
            Err(Error::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_rounding_happens_once_at_persistence() {
        // three thirds of a cent: summing rounded parts would drift
        let positions = vec![
            position("a", dec!(1), dec!(0.003333), dec!(0.005)),
            position("b", dec!(1), dec!(0.003333), dec!(0.005)),
            position("c", dec!(1), dec!(0.003334), dec!(0.005)),
        ];
        let totals = recalculate(usd(), &positions).unwrap();
        assert_eq!(totals.total_invested.amount(), dec!(0.01));
        assert_eq!(totals.total_value.amount(), dec!(0.015));

        let stored = totals.rounded_for_persistence();
        assert_eq!(stored.total_invested.amount(), dec!(0.01));
        // 0.015 rounds half-to-even
        assert_eq!(stored.total_value.amount(), dec!(0.02));
        assert_eq!(
            stored.total_gain.amount(),
            stored.total_value.amount() - stored.total_invested.amount()
        );
        // the unrounded ratio was 50%; the stored one follows the stored amounts
        assert_eq!(totals.gain_percentage, dec!(50));
        assert_eq!(stored.gain_percentage, dec!(100));
    }
}
