//! Per-member running balances.
//!
//! Positive means the member owes money, negative means the member is owed.
//! For every group the balances sum to zero after each committed operation,
//! except for the rounding drift a currency rescale can introduce.

use serde::{Deserialize, Serialize};
use sea_orm::entity::prelude::*;

use crate::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub username: String,
    pub amount: Money,
}

impl Balance {
    /// Human readable status of the balance.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.amount.is_positive() {
            "to be paid"
        } else if self.amount.is_negative() {
            "to be received"
        } else {
            "settled"
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub balance: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Balance {
    fn from(model: Model) -> Self {
        Self {
            username: model.username,
            amount: Money::new(model.balance),
        }
    }
}
