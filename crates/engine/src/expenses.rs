//! Expense primitives.
//!
//! An [`Expense`] is immutable once recorded, apart from its category. It is
//! created together with its [`Share`]s and removed as a whole by `undo`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, EngineError, Money, ResultEngine, expense_shares::Share};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub group_id: i64,
    pub purpose: String,
    pub payer: String,
    pub amount: Money,
    /// Base currency of the group when the expense was recorded.
    pub currency: CurrencyCode,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub shares: Vec<Share>,
}

/// Input collected by the add-expense dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExpense {
    pub purpose: String,
    pub payer: String,
    pub amount: Money,
    pub shares: Vec<Share>,
}

impl NewExpense {
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if !self.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        if self.shares.is_empty() {
            return Err(EngineError::InvalidAmount(
                "an expense needs at least one beneficiary".to_string(),
            ));
        }
        if let Some(share) = self.shares.iter().find(|s| s.amount.is_negative()) {
            return Err(EngineError::InvalidAmount(format!(
                "split for {} must not be negative",
                share.beneficiary
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub group_id: i64,
    pub purpose: String,
    pub payer: String,
    pub amount: i64,
    pub currency: String,
    pub category: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_shares::Entity")]
    Shares,
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::expense_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn new(
        group_id: i64,
        expense: &NewExpense,
        currency: &CurrencyCode,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveValue::NotSet,
            group_id: ActiveValue::Set(group_id),
            purpose: ActiveValue::Set(expense.purpose.clone()),
            payer: ActiveValue::Set(expense.payer.clone()),
            amount: ActiveValue::Set(expense.amount.cents()),
            currency: ActiveValue::Set(currency.code().to_string()),
            category: ActiveValue::Set(None),
            created_at: ActiveValue::Set(created_at),
        }
    }
}

impl TryFrom<(Model, Vec<Share>)> for Expense {
    type Error = EngineError;

    fn try_from((model, shares): (Model, Vec<Share>)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            group_id: model.group_id,
            purpose: model.purpose,
            payer: model.payer,
            amount: Money::new(model.amount),
            currency: model.currency.parse()?,
            category: model.category,
            created_at: model.created_at,
            shares,
        })
    }
}
