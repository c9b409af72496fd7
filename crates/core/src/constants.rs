/// Decimal places kept for stored gain percentages
pub const PERCENT_PRECISION: u32 = 6;

/// Fee rate applied to trades when no `fee_rate` setting exists
pub const DEFAULT_FEE_RATE: &str = "0.01";

/// Currency used for provisioned portfolios when no `base_currency` setting exists
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Name given to a user's first portfolio
pub const DEFAULT_PORTFOLIO_NAME: &str = "Main Portfolio";

/// Settings keys
pub const FEE_RATE_SETTING_KEY: &str = "fee_rate";
pub const BASE_CURRENCY_SETTING_KEY: &str = "base_currency";
