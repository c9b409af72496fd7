use diesel::prelude::*;
use std::sync::Arc;

use super::model::PositionDB;
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::positions;
use brokerage_core::errors::Result;
use brokerage_core::positions::{Position, PositionRepositoryTrait};

pub struct PositionRepository {
    pool: Arc<DbPool>,
}

impl PositionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl PositionRepositoryTrait for PositionRepository {
    fn get_by_id(&self, position_id: &str) -> Result<Position> {
        let mut conn = get_connection(&self.pool)?;
        positions::table
            .find(position_id)
            .select(PositionDB::as_select())
            .first::<PositionDB>(&mut conn)
            .into_core()?
            .try_into()
    }

    fn load_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;
        positions::table
            .filter(positions::portfolio_id.eq(portfolio_id))
            .select(PositionDB::as_select())
            .order((positions::created_at.asc(), positions::id.asc()))
            .load::<PositionDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Position::try_from)
            .collect()
    }
}
