use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};

use crate::{Balance, EngineError, Money, ResultEngine, Share, balances};

use super::{Engine, with_group_tx, with_tx};

/// Direction of a balance movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Direction {
    Apply,
    Reverse,
}

impl Engine {
    /// Balance of one member, `None` if the member has no balance row.
    pub async fn get_balance(&self, group_id: i64, username: &str) -> ResultEngine<Option<Balance>> {
        Ok(balances::Entity::find_by_id((group_id, username.trim().to_string()))
            .one(&self.database)
            .await?
            .map(Balance::from))
    }

    /// Every balance of the group in alphabetical order.
    pub async fn list_balances(&self, group_id: i64) -> ResultEngine<Vec<Balance>> {
        let models = balances::Entity::find()
            .filter(balances::Column::GroupId.eq(group_id))
            .order_by_asc(balances::Column::Username)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Balance::from).collect())
    }

    /// Overwrites the balance of an existing member.
    pub async fn set_balance(&self, group_id: i64, username: &str, amount: Money) -> ResultEngine<()> {
        let username = username.trim().to_string();
        with_group_tx!(self, group_id, |db_tx| {
            require_balance_row(&db_tx, group_id, &username).await?;
            write_balance(&db_tx, group_id, username, amount).await?;
            Ok(())
        })
    }

    /// Adds `delta` to the balance of an existing member and returns the new
    /// balance.
    pub async fn adjust_balance(
        &self,
        group_id: i64,
        username: &str,
        delta: Money,
    ) -> ResultEngine<Money> {
        let username = username.trim().to_string();
        with_group_tx!(self, group_id, |db_tx| {
            let current = require_balance_row(&db_tx, group_id, &username).await?;
            let updated = current
                .checked_add(delta)
                .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
            write_balance(&db_tx, group_id, username, updated).await?;
            Ok(updated)
        })
    }

    /// Moves every share from the payer to its beneficiary: the payer's
    /// balance decreases by the share and the beneficiary's increases by it.
    ///
    /// All rows are updated in one transaction. A beneficiary without a
    /// balance row fails the whole operation with
    /// [`EngineError::BeneficiaryNotFound`].
    pub async fn apply_expense(
        &self,
        group_id: i64,
        payer: &str,
        shares: &[Share],
    ) -> ResultEngine<()> {
        with_group_tx!(self, group_id, |db_tx| {
            move_shares(&db_tx, group_id, payer, shares, Direction::Apply).await
        })
    }

    /// Exact inverse of [`Engine::apply_expense`].
    pub async fn reverse_expense(
        &self,
        group_id: i64,
        payer: &str,
        shares: &[Share],
    ) -> ResultEngine<()> {
        with_group_tx!(self, group_id, |db_tx| {
            move_shares(&db_tx, group_id, payer, shares, Direction::Reverse).await
        })
    }

    /// Converts every balance from `old_rate` to `new_rate`, rounding half-up
    /// to two decimals. Returns the rescaled balances.
    pub async fn rescale_balances(
        &self,
        group_id: i64,
        old_rate: Decimal,
        new_rate: Decimal,
    ) -> ResultEngine<Vec<Balance>> {
        with_group_tx!(self, group_id, |db_tx| {
            rescale_all(&db_tx, group_id, old_rate, new_rate).await
        })
    }

    /// Sets every balance of the group to zero. Expense history is kept.
    ///
    /// Authorization: admin only.
    pub async fn settle_all(&self, group_id: i64, requester: &str) -> ResultEngine<u64> {
        with_group_tx!(self, group_id, |db_tx| {
            self.require_admin(&db_tx, group_id, requester).await?;
            let models = balances::Entity::find()
                .filter(balances::Column::GroupId.eq(group_id))
                .all(&db_tx)
                .await?;
            let mut settled = 0;
            for model in models.into_iter().filter(|m| m.balance != 0) {
                write_balance(&db_tx, group_id, model.username, Money::ZERO).await?;
                settled += 1;
            }
            tracing::info!(group_id, requester, settled, "balances settled");
            Ok(settled)
        })
    }
}

/// Applies or reverses the balance effect of an expense inside `db`.
///
/// Balances are computed in memory first and only persisted once every
/// participant has been resolved, so a missing row writes nothing.
pub(super) async fn move_shares(
    db: &DatabaseTransaction,
    group_id: i64,
    payer: &str,
    shares: &[Share],
    direction: Direction,
) -> ResultEngine<()> {
    let mut current: HashMap<String, Money> = balances::Entity::find()
        .filter(balances::Column::GroupId.eq(group_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.username, Money::new(m.balance)))
        .collect();

    if !current.contains_key(payer) {
        return Err(EngineError::KeyNotFound(payer.to_string()));
    }

    let overflow = || EngineError::InvalidAmount("balance overflow".to_string());
    let mut touched: Vec<String> = vec![payer.to_string()];
    for share in shares {
        let delta = match direction {
            Direction::Apply => share.amount,
            Direction::Reverse => -share.amount,
        };
        let beneficiary = current
            .get_mut(&share.beneficiary)
            .ok_or_else(|| EngineError::BeneficiaryNotFound(share.beneficiary.clone()))?;
        *beneficiary = beneficiary.checked_add(delta).ok_or_else(overflow)?;
        if let Some(payer_balance) = current.get_mut(payer) {
            *payer_balance = payer_balance.checked_sub(delta).ok_or_else(overflow)?;
        }
        if !touched.contains(&share.beneficiary) {
            touched.push(share.beneficiary.clone());
        }
    }

    for username in touched {
        let amount = current.get(&username).copied().unwrap_or(Money::ZERO);
        write_balance(db, group_id, username, amount).await?;
    }
    Ok(())
}

pub(super) async fn rescale_all(
    db: &DatabaseTransaction,
    group_id: i64,
    old_rate: Decimal,
    new_rate: Decimal,
) -> ResultEngine<Vec<Balance>> {
    let models = balances::Entity::find()
        .filter(balances::Column::GroupId.eq(group_id))
        .order_by_asc(balances::Column::Username)
        .all(db)
        .await?;

    let mut rescaled = Vec::with_capacity(models.len());
    for model in models {
        let amount = Money::new(model.balance).rescale(old_rate, new_rate)?;
        write_balance(db, group_id, model.username.clone(), amount).await?;
        rescaled.push(Balance {
            username: model.username,
            amount,
        });
    }
    Ok(rescaled)
}

async fn require_balance_row<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    username: &str,
) -> ResultEngine<Money> {
    balances::Entity::find_by_id((group_id, username.to_string()))
        .one(db)
        .await?
        .map(|m| Money::new(m.balance))
        .ok_or_else(|| EngineError::KeyNotFound(username.to_string()))
}

async fn write_balance<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    username: String,
    amount: Money,
) -> ResultEngine<()> {
    balances::ActiveModel {
        group_id: ActiveValue::Set(group_id),
        username: ActiveValue::Set(username),
        balance: ActiveValue::Set(amount.cents()),
    }
    .update(db)
    .await?;
    Ok(())
}
