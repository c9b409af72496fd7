//! Tests for the portfolio aggregate.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::Error;
use crate::money::{Currency, Money};
use crate::portfolios::{AdjustmentKind, ManualTotals, NewPortfolio, Portfolio, ValuationMode};
use crate::positions::{InvestmentType, NewPosition, Position, PositionDelta};

fn usd() -> Currency {
    Currency::parse("USD").unwrap()
}

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn portfolio() -> Portfolio {
    NewPortfolio {
        id: Some("pf-1".to_string()),
        user_id: "user-1".to_string(),
        name: "  Retirement ".to_string(),
        description: None,
        currency: usd(),
    }
    .into_portfolio(String::new(), at(8))
    .unwrap()
}

fn position(id: &str, quantity: Decimal, purchase: Decimal, current: Decimal) -> Position {
    NewPosition {
        id: Some(id.to_string()),
        portfolio_id: "pf-1".to_string(),
        order_id: None,
        investment_type: InvestmentType::Bond,
        name: format!("Bond {}", id),
        symbol: None,
        quantity,
        purchase_price: Money::new(purchase, usd()),
        current_price: Some(Money::new(current, usd())),
        purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        maturity_date: None,
        interest_rate: Some(dec!(4.5)),
        status: None,
    }
    .into_position(String::new(), at(8))
    .unwrap()
}

#[test]
fn test_new_portfolio_starts_empty_in_auto_mode() {
    let portfolio = portfolio();
    assert_eq!(portfolio.name, "Retirement");
    assert_eq!(portfolio.valuation_mode, ValuationMode::Auto);
    assert!(portfolio.totals.total_value.is_zero());
    assert!(portfolio.is_active);

    let mut unnamed = NewPortfolio {
        id: None,
        user_id: "user-1".to_string(),
        name: String::new(),
        description: None,
        currency: usd(),
    };
    assert!(unnamed.validate().is_err());
    unnamed.name = "x".to_string();
    unnamed.user_id = " ".to_string();
    assert!(unnamed.validate().is_err());
}

#[test]
fn test_auto_mode_replaces_totals_on_change() {
    let mut portfolio = portfolio();
    let positions = vec![
        position("a", dec!(10), dec!(400), dec!(450)),
        position("b", dec!(3), dec!(10.005), dec!(10.005)),
    ];

    let adjustment = portfolio
        .apply_position_change(&PositionDelta::added(&positions[1]), &positions, at(9))
        .unwrap();

    assert!(adjustment.is_none());
    // 4500 + 30.015 rounds half-to-even to 4530.02
    assert_eq!(portfolio.totals.total_value.amount(), dec!(4530.02));
    assert_eq!(portfolio.totals.total_invested.amount(), dec!(4030.02));
    assert_eq!(portfolio.totals.total_gain.amount(), dec!(500.00));
    assert_eq!(portfolio.updated_at, at(9));
}

#[test]
fn test_auto_recalculation_rejects_foreign_positions() {
    let mut portfolio = portfolio();
    let mut stray = position("x", dec!(1), dec!(1), dec!(1));
    stray.portfolio_id = "pf-2".to_string();
    assert!(portfolio
        .apply_position_change(&PositionDelta::added(&stray), &[stray.clone()], at(9))
        .is_err());
}

#[test]
fn test_manual_mode_defers_position_changes() {
    let mut portfolio = portfolio();
    portfolio
        .set_manual_totals(&ManualTotals::new(dec!(1000), dec!(800), dec!(200)), at(9))
        .unwrap();

    let added = position("a", dec!(10), dec!(400), dec!(450));
    let adjustment = portfolio
        .apply_position_change(&PositionDelta::added(&added), &[added.clone()], at(10))
        .unwrap()
        .expect("manual portfolios record deferred changes");

    assert_eq!(adjustment.kind, AdjustmentKind::DeferredPositionChange);
    assert_eq!(adjustment.delta.unwrap().value_delta, dec!(4500));
    assert_eq!(portfolio.totals.total_value.amount(), dec!(1000));
    assert_eq!(portfolio.valuation_mode, ValuationMode::Manual);
    assert_eq!(portfolio.updated_at, at(10));
}

#[test]
fn test_manual_totals_are_stored_verbatim() {
    let mut portfolio = portfolio();
    let adjustment = portfolio
        .set_manual_totals(
            &ManualTotals::new(dec!(1234.5678), dec!(1000), dec!(7)),
            at(9),
        )
        .unwrap();

    assert_eq!(adjustment.kind, AdjustmentKind::ManualTotals);
    assert_eq!(portfolio.valuation_mode, ValuationMode::Manual);
    assert_eq!(portfolio.totals.total_value.amount(), dec!(1234.5678));
    // gain is not re-derived from value - invested
    assert_eq!(portfolio.totals.total_gain.amount(), dec!(7));
    assert_eq!(portfolio.totals.gain_percentage, dec!(0.7));
}

#[test]
fn test_manual_totals_with_zero_invested_has_zero_percentage() {
    let mut portfolio = portfolio();
    portfolio
        .set_manual_totals(&ManualTotals::new(dec!(500), dec!(0), dec!(500)), at(9))
        .unwrap();
    assert_eq!(portfolio.totals.gain_percentage, Decimal::ZERO);
}

#[test]
fn test_invalid_manual_totals_are_rejected() {
    let mut portfolio = portfolio();
    let before = portfolio.clone();

    assert!(matches!(
        portfolio.set_manual_totals(&ManualTotals::new(dec!(-1), dec!(0), dec!(0)), at(9)),
        Err(Error::InvalidAdjustment(_))
    ));
    assert!(matches!(
        portfolio.set_manual_totals(&ManualTotals::new(dec!(1), dec!(-5), dec!(0)), at(9)),
        Err(Error::InvalidAdjustment(_))
    ));
    assert!(matches!(
        ManualTotals::from_f64(f64::NAN, 0.0, 0.0),
        Err(Error::InvalidAdjustment(_))
    ));
    assert!(matches!(
        ManualTotals::from_f64(1.0, f64::INFINITY, 0.0),
        Err(Error::InvalidAdjustment(_))
    ));
    assert_eq!(portfolio, before);

    let totals = ManualTotals::from_f64(1500.25, 1000.0, 500.25).unwrap();
    assert_eq!(totals.total_value, dec!(1500.25));
}

#[test]
fn test_switch_to_auto_recalculates_and_is_idempotent() {
    let mut portfolio = portfolio();
    let positions = vec![position("a", dec!(10), dec!(400), dec!(450))];
    portfolio
        .set_manual_totals(&ManualTotals::new(dec!(1), dec!(1), dec!(0)), at(9))
        .unwrap();

    let adjustment = portfolio.switch_to_auto(&positions, at(10)).unwrap();
    assert_eq!(adjustment.map(|a| a.kind), Some(AdjustmentKind::SwitchToAuto));
    assert_eq!(portfolio.valuation_mode, ValuationMode::Auto);
    assert_eq!(portfolio.totals.total_value.amount(), dec!(4500));
    let first = portfolio.totals;

    let again = portfolio.switch_to_auto(&positions, at(11)).unwrap();
    assert!(again.is_none());
    assert_eq!(portfolio.totals, first);
    assert_eq!(portfolio.valuation_mode, ValuationMode::Auto);
}

#[test]
fn test_valuation_mode_strings() {
    assert_eq!("MANUAL".parse::<ValuationMode>().unwrap(), ValuationMode::Manual);
    assert_eq!(ValuationMode::Auto.to_string(), "AUTO");
    assert!("auto".parse::<ValuationMode>().is_err());
    assert_eq!(
        serde_json::to_string(&ValuationMode::Manual).unwrap(),
        "\"MANUAL\""
    );
}

#[test]
fn test_portfolio_json_round_trip() {
    let original = portfolio();
    let json = serde_json::to_string(&original).unwrap();
    let restored: Portfolio = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, original);

    let new_portfolio: NewPortfolio = serde_json::from_str(
        r#"{"userId": "user-2", "name": "Savings", "description": null, "currency": "EUR"}"#,
    )
    .unwrap();
    assert_eq!(new_portfolio.currency.code(), "EUR");
    assert!(new_portfolio.id.is_none());
}
