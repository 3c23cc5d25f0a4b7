use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{Admin, EngineError, ResultEngine, admins};

use super::{Engine, normalize_required_name, with_group_tx, with_tx};

/// Outcome of a remove-admin request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminRemoval {
    /// The target lost its admin rights.
    Removed,
    /// The target is the group owner: the requester lost its own admin rights
    /// instead.
    RequesterDemoted,
    /// The owner tried to remove itself. Nothing changed.
    OwnerProtected,
}

impl Engine {
    /// `true` if `username` is an admin of the group.
    pub async fn is_admin(&self, group_id: i64, username: &str) -> ResultEngine<bool> {
        find_admin(&self.database, group_id, username)
            .await
            .map(|admin| admin.is_some())
    }

    /// Admins of the group, owner first.
    pub async fn list_admins(&self, group_id: i64) -> ResultEngine<Vec<Admin>> {
        let models = admins::Entity::find()
            .filter(admins::Column::GroupId.eq(group_id))
            .order_by_desc(admins::Column::IsOwner)
            .order_by_asc(admins::Column::Username)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Admin::from).collect())
    }

    /// Grants admin rights to `username`.
    ///
    /// Authorization: admin only.
    pub async fn add_admin(
        &self,
        group_id: i64,
        username: &str,
        requester: &str,
    ) -> ResultEngine<()> {
        let username = normalize_required_name(username, "admin")?;
        with_group_tx!(self, group_id, |db_tx| {
            self.require_admin(&db_tx, group_id, requester).await?;
            if find_admin(&db_tx, group_id, &username).await?.is_some() {
                return Err(EngineError::ExistingKey(username));
            }
            admins::ActiveModel {
                group_id: ActiveValue::Set(group_id),
                username: ActiveValue::Set(username.clone()),
                is_owner: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(group_id, admin = %username, requester, "admin added");
            Ok(())
        })
    }

    /// Revokes admin rights from `username`.
    ///
    /// The owner row is never deleted here: targeting it demotes the
    /// requester, unless the requester is the owner.
    ///
    /// Authorization: admin only.
    pub async fn remove_admin(
        &self,
        group_id: i64,
        username: &str,
        requester: &str,
    ) -> ResultEngine<AdminRemoval> {
        let username = normalize_required_name(username, "admin")?;
        with_group_tx!(self, group_id, |db_tx| {
            let requester_row = self.require_admin(&db_tx, group_id, requester).await?;
            let target = find_admin(&db_tx, group_id, &username)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(username.clone()))?;

            let outcome = if !target.is_owner {
                admins::Entity::delete_by_id((group_id, target.username))
                    .exec(&db_tx)
                    .await?;
                AdminRemoval::Removed
            } else if requester_row.is_owner {
                AdminRemoval::OwnerProtected
            } else {
                admins::Entity::delete_by_id((group_id, requester_row.username))
                    .exec(&db_tx)
                    .await?;
                AdminRemoval::RequesterDemoted
            };
            tracing::info!(group_id, admin = %username, requester, ?outcome, "remove admin");
            Ok(outcome)
        })
    }

    /// Returns the requester's admin row or [`EngineError::Unauthorized`].
    pub(super) async fn require_admin<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: i64,
        requester: &str,
    ) -> ResultEngine<admins::Model> {
        find_admin(db, group_id, requester).await?.ok_or_else(|| {
            tracing::warn!(group_id, requester, "admin operation refused");
            EngineError::Unauthorized(requester.to_string())
        })
    }
}

async fn find_admin<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    username: &str,
) -> ResultEngine<Option<admins::Model>> {
    Ok(admins::Entity::find_by_id((group_id, username.to_string()))
        .one(db)
        .await?)
}
