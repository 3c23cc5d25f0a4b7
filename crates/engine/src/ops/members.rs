use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, Money, ResultEngine, balances, members};

use super::{Engine, normalize_required_name, with_group_tx, with_tx};

impl Engine {
    /// `true` if `username` is a tracked member of the group.
    pub async fn is_member(&self, group_id: i64, username: &str) -> ResultEngine<bool> {
        is_member(&self.database, group_id, username).await
    }

    /// Member names of the group in alphabetical order.
    pub async fn list_members(&self, group_id: i64) -> ResultEngine<Vec<String>> {
        let models = members::Entity::find()
            .filter(members::Column::GroupId.eq(group_id))
            .order_by_asc(members::Column::Username)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(|m| m.username).collect())
    }

    /// Adds a member together with a zero balance row.
    ///
    /// Returns `false` without writing anything if the member already exists.
    pub async fn upsert_member(&self, group_id: i64, username: &str) -> ResultEngine<bool> {
        let username = normalize_required_name(username, "member")?;
        with_group_tx!(self, group_id, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            if is_member(&db_tx, group_id, &username).await? {
                return Ok(false);
            }
            members::ActiveModel {
                group_id: ActiveValue::Set(group_id),
                username: ActiveValue::Set(username.clone()),
            }
            .insert(&db_tx)
            .await?;

            balances::ActiveModel {
                group_id: ActiveValue::Set(group_id),
                username: ActiveValue::Set(username.clone()),
                balance: ActiveValue::Set(Money::ZERO.cents()),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(group_id, member = %username, "member added");
            Ok(true)
        })
    }

    /// Removes a member and its balance row.
    ///
    /// Refused with [`EngineError::NotSettled`] while the balance is not
    /// zero. Expense history is kept.
    ///
    /// Authorization: admin only.
    pub async fn delete_member(
        &self,
        group_id: i64,
        username: &str,
        requester: &str,
    ) -> ResultEngine<()> {
        let username = normalize_required_name(username, "member")?;
        with_group_tx!(self, group_id, |db_tx| {
            self.require_admin(&db_tx, group_id, requester).await?;
            if !is_member(&db_tx, group_id, &username).await? {
                return Err(EngineError::KeyNotFound(username));
            }
            let balance = balances::Entity::find_by_id((group_id, username.clone()))
                .one(&db_tx)
                .await?
                .map_or(Money::ZERO, |m| Money::new(m.balance));
            if !balance.is_zero() {
                return Err(EngineError::NotSettled(format!("{username}: {balance}")));
            }

            members::Entity::delete_by_id((group_id, username.clone()))
                .exec(&db_tx)
                .await?;
            balances::Entity::delete_by_id((group_id, username.clone()))
                .exec(&db_tx)
                .await?;
            tracing::info!(group_id, member = %username, requester, "member removed");
            Ok(())
        })
    }

    /// Deletes every member of the group and their balance rows.
    ///
    /// Authorization: admin only.
    pub async fn remove_all_members(&self, group_id: i64, requester: &str) -> ResultEngine<u64> {
        with_group_tx!(self, group_id, |db_tx| {
            self.require_admin(&db_tx, group_id, requester).await?;
            let removed = members::Entity::delete_many()
                .filter(members::Column::GroupId.eq(group_id))
                .exec(&db_tx)
                .await?
                .rows_affected;
            balances::Entity::delete_many()
                .filter(balances::Column::GroupId.eq(group_id))
                .exec(&db_tx)
                .await?;
            tracing::warn!(group_id, requester, removed, "all members removed");
            Ok(removed)
        })
    }
}

pub(super) async fn is_member<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    username: &str,
) -> ResultEngine<bool> {
    Ok(members::Entity::find_by_id((group_id, username.to_string()))
        .one(db)
        .await?
        .is_some())
}
