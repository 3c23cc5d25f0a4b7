use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    CurrencySetting, EngineError, ResultEngine, admins, balances, categories, currency_settings,
    expense_shares, expenses, groups, members,
};

use super::{Engine, with_group_tx, with_tx};

impl Engine {
    /// Initializes a group's ledger.
    ///
    /// Registers the group, seeds `owner` as the protected admin and sets the
    /// base currency to `SGD` at rate `1`. Calling it again on an initialized
    /// group changes nothing and returns `false`.
    pub async fn start_group(
        &self,
        group_id: i64,
        created_by: &str,
        owner: &str,
    ) -> ResultEngine<bool> {
        let owner = super::normalize_required_name(owner, "owner")?;
        with_group_tx!(self, group_id, |db_tx| {
            if groups::Entity::find_by_id(group_id)
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Ok(false);
            }

            groups::ActiveModel {
                id: ActiveValue::Set(group_id),
                created_by: ActiveValue::Set(created_by.to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            admins::ActiveModel {
                group_id: ActiveValue::Set(group_id),
                username: ActiveValue::Set(owner.clone()),
                is_owner: ActiveValue::Set(true),
            }
            .insert(&db_tx)
            .await?;

            let setting = CurrencySetting::default();
            currency_settings::ActiveModel {
                group_id: ActiveValue::Set(group_id),
                base_currency: ActiveValue::Set(setting.base.code().to_string()),
                rate: ActiveValue::Set(setting.rate.to_string()),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(group_id, owner = %owner, "group started");
            Ok(true)
        })
    }

    /// `true` if [`Engine::start_group`] ran for this group.
    pub async fn group_exists(&self, group_id: i64) -> ResultEngine<bool> {
        Ok(groups::Entity::find_by_id(group_id)
            .one(&self.database)
            .await?
            .is_some())
    }

    /// Wipes every record of the group across all tables, the group row
    /// included. The group must be started again afterwards.
    ///
    /// Authorization: admin only.
    pub async fn delete_group_data(&self, group_id: i64, requester: &str) -> ResultEngine<()> {
        with_group_tx!(self, group_id, |db_tx| {
            self.require_admin(&db_tx, group_id, requester).await?;
            wipe_group(&db_tx, group_id).await?;
            tracing::warn!(group_id, requester, "group data deleted");
            Ok(())
        })
    }

    pub(super) async fn require_group<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: i64,
    ) -> ResultEngine<()> {
        if groups::Entity::find_by_id(group_id).one(db).await?.is_none() {
            return Err(EngineError::KeyNotFound(format!("group {group_id}")));
        }
        Ok(())
    }
}

async fn wipe_group<C: ConnectionTrait>(db: &C, group_id: i64) -> ResultEngine<()> {
    expense_shares::Entity::delete_many()
        .filter(expense_shares::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;
    expenses::Entity::delete_many()
        .filter(expenses::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;
    balances::Entity::delete_many()
        .filter(balances::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;
    members::Entity::delete_many()
        .filter(members::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;
    categories::Entity::delete_many()
        .filter(categories::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;
    admins::Entity::delete_many()
        .filter(admins::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;
    currency_settings::Entity::delete_many()
        .filter(currency_settings::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;
    groups::Entity::delete_by_id(group_id).exec(db).await?;
    Ok(())
}
