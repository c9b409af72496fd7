//! Valuation module - the pure recalculator behind AUTO portfolio totals.

mod valuation_calculator;
mod valuation_model;

pub use valuation_calculator::recalculate;
pub use valuation_model::AggregateTotals;
