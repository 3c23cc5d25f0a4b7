//! Per-beneficiary shares of an expense.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub beneficiary: String,
    pub amount: Money,
}

impl Share {
    pub fn new(beneficiary: impl Into<String>, amount: Money) -> Self {
        Self {
            beneficiary: beneficiary.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_shares")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub expense_id: i64,
    pub group_id: i64,
    pub username: String,
    pub split_amount: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn new(group_id: i64, expense_id: i64, share: &Share) -> Self {
        Self {
            id: ActiveValue::NotSet,
            expense_id: ActiveValue::Set(expense_id),
            group_id: ActiveValue::Set(group_id),
            username: ActiveValue::Set(share.beneficiary.clone()),
            split_amount: ActiveValue::Set(share.amount.cents()),
        }
    }
}

impl From<Model> for Share {
    fn from(model: Model) -> Self {
        Self {
            beneficiary: model.username,
            amount: Money::new(model.split_amount),
        }
    }
}
