//! Read-only projections over expenses and shares.

use std::collections::BTreeMap;

use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use serde::Serialize;

use crate::{EngineError, Money, ResultEngine, expense_shares, expenses};

use super::Engine;

/// Label used for expenses without a category.
pub const UNCATEGORIZED: &str = "Others";

/// Either every row or a single named one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpendingScope {
    All,
    One(String),
}

/// Spending aggregates. Spending is the sum of a member's shares, whoever
/// paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SpendingReport {
    /// Every member's total spending, highest first.
    ByMember(Vec<(String, Money)>),
    /// One member's spending per category plus the overall total.
    ByCategory {
        member: String,
        categories: Vec<(String, Money)>,
        total: Money,
    },
    /// One member's spending in one category; `None` if there is none.
    Single {
        member: String,
        category: String,
        total: Option<Money>,
    },
}

/// One exported row: an expense share joined with its expense.
///
/// Serializes amounts as decimal text (`12.50`), the CSV export format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub expense_id: i64,
    pub purpose: String,
    #[serde(serialize_with = "decimal_text")]
    pub amount: Money,
    pub currency: String,
    pub payer: String,
    pub beneficiary: String,
    #[serde(serialize_with = "decimal_text")]
    pub split_amount: Money,
}

fn decimal_text<S: serde::Serializer>(amount: &Money, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

impl Engine {
    /// Aggregates spending for a category scope and a member scope.
    ///
    /// A single category with every member is not supported and fails with
    /// [`EngineError::InvalidName`].
    pub async fn spending(
        &self,
        group_id: i64,
        category: SpendingScope,
        member: SpendingScope,
    ) -> ResultEngine<SpendingReport> {
        let rows = self.share_rows(group_id).await?;
        match (category, member) {
            (SpendingScope::All, SpendingScope::All) => {
                let mut totals: BTreeMap<String, Money> = BTreeMap::new();
                for (_, share) in &rows {
                    *totals.entry(share.username.clone()).or_default() +=
                        Money::new(share.split_amount);
                }
                let mut totals: Vec<(String, Money)> = totals.into_iter().collect();
                totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                Ok(SpendingReport::ByMember(totals))
            }
            (SpendingScope::All, SpendingScope::One(member)) => {
                let mut categories: BTreeMap<String, Money> = BTreeMap::new();
                for (expense, share) in rows.iter().filter(|(_, s)| s.username == member) {
                    let label = expense
                        .category
                        .clone()
                        .unwrap_or_else(|| UNCATEGORIZED.to_string());
                    *categories.entry(label).or_default() += Money::new(share.split_amount);
                }
                let total = categories.values().sum();
                Ok(SpendingReport::ByCategory {
                    member,
                    categories: categories.into_iter().collect(),
                    total,
                })
            }
            (SpendingScope::One(category), SpendingScope::One(member)) => {
                let amounts: Vec<Money> = rows
                    .iter()
                    .filter(|(expense, share)| {
                        share.username == member
                            && expense
                                .category
                                .as_deref()
                                .is_some_and(|c| c.eq_ignore_ascii_case(&category))
                    })
                    .map(|(_, share)| Money::new(share.split_amount))
                    .collect();
                let total = (!amounts.is_empty()).then(|| amounts.iter().sum());
                Ok(SpendingReport::Single {
                    member,
                    category,
                    total,
                })
            }
            (SpendingScope::One(category), SpendingScope::All) => Err(EngineError::InvalidName(
                format!("category {category} needs a single member"),
            )),
        }
    }

    /// One row per expense share, oldest expense first.
    pub async fn export_rows(&self, group_id: i64) -> ResultEngine<Vec<ExportRow>> {
        let rows = self.share_rows(group_id).await?;
        Ok(rows
            .into_iter()
            .map(|(expense, share)| ExportRow {
                expense_id: expense.id,
                purpose: expense.purpose,
                amount: Money::new(expense.amount),
                currency: expense.currency,
                payer: expense.payer,
                beneficiary: share.username,
                split_amount: Money::new(share.split_amount),
            })
            .collect())
    }

    async fn share_rows(
        &self,
        group_id: i64,
    ) -> ResultEngine<Vec<(expenses::Model, expense_shares::Model)>> {
        let rows = expense_shares::Entity::find()
            .filter(expense_shares::Column::GroupId.eq(group_id))
            .order_by_asc(expense_shares::Column::ExpenseId)
            .order_by_asc(expense_shares::Column::Id)
            .find_also_related(expenses::Entity)
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(share, expense)| expense.map(|e| (e, share)))
            .collect())
    }
}
