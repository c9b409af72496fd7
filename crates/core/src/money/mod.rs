//! Money module - fixed-point amounts tagged with an ISO-4217 currency.

mod currency;
mod money_model;


pub use currency::{is_supported_currency, Currency};
pub use money_model::{percentage_of, Money};
