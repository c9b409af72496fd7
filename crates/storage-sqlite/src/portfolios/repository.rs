use diesel::prelude::*;
use std::sync::Arc;

use super::model::{PortfolioAdjustmentDB, PortfolioDB};
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::{portfolio_adjustments, portfolios};
use crate::utils::parse_currency;
use brokerage_core::errors::Result;
use brokerage_core::portfolios::{Portfolio, PortfolioAdjustment, PortfolioRepositoryTrait};

/// Read access to portfolios and their adjustment trail.
pub struct PortfolioRepository {
    pool: Arc<DbPool>,
}

impl PortfolioRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl PortfolioRepositoryTrait for PortfolioRepository {
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio> {
        let mut conn = get_connection(&self.pool)?;
        portfolios::table
            .find(portfolio_id)
            .select(PortfolioDB::as_select())
            .first::<PortfolioDB>(&mut conn)
            .into_core()?
            .try_into()
    }

    fn list(&self, user_id: Option<&str>) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = portfolios::table
            .select(PortfolioDB::as_select())
            .order((portfolios::created_at.asc(), portfolios::id.asc()))
            .into_boxed();
        if let Some(user_id) = user_id {
            query = query.filter(portfolios::user_id.eq(user_id.to_string()));
        }
        query
            .load::<PortfolioDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Portfolio::try_from)
            .collect()
    }

    fn list_adjustments(&self, portfolio_id: &str) -> Result<Vec<PortfolioAdjustment>> {
        let mut conn = get_connection(&self.pool)?;
        let currency = match portfolios::table
            .find(portfolio_id)
            .select(portfolios::currency)
            .first::<String>(&mut conn)
            .optional()
            .into_core()?
        {
            Some(code) => parse_currency(&code)?,
            None => return Ok(Vec::new()),
        };

        portfolio_adjustments::table
            .filter(portfolio_adjustments::portfolio_id.eq(portfolio_id))
            .select(PortfolioAdjustmentDB::as_select())
            .order((
                portfolio_adjustments::created_at.asc(),
                portfolio_adjustments::id.asc(),
            ))
            .load::<PortfolioAdjustmentDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| row.into_domain(currency))
            .collect()
    }
}
