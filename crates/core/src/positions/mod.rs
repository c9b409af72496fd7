//! Positions module - investment holdings and their derived valuation.

mod positions_model;
mod positions_traits;


pub use positions_model::{
    InvestmentType, NewPosition, Position, PositionChangeKind, PositionDelta, PositionUpdate,
    PositionValuation,
};
pub use positions_traits::PositionRepositoryTrait;
