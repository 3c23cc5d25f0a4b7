use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, categories, expenses};

use super::{Engine, normalize_required_name, with_group_tx, with_tx};

impl Engine {
    /// Registers a category. Names are unique per group ignoring case.
    pub async fn create_category(&self, group_id: i64, name: &str) -> ResultEngine<String> {
        let name = normalize_required_name(name, "category")?;
        with_group_tx!(self, group_id, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            if let Some(existing) = find_canonical(&db_tx, group_id, &name).await? {
                return Err(EngineError::ExistingKey(existing));
            }
            categories::ActiveModel {
                group_id: ActiveValue::Set(group_id),
                name_norm: ActiveValue::Set(name.to_lowercase()),
                name: ActiveValue::Set(name.clone()),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(group_id, category = %name, "category created");
            Ok(name)
        })
    }

    /// Canonical spelling of a category, looked up ignoring case.
    pub async fn find_category(&self, group_id: i64, name: &str) -> ResultEngine<Option<String>> {
        find_canonical(&self.database, group_id, name).await
    }

    /// Category names of the group in alphabetical order.
    pub async fn list_categories(&self, group_id: i64) -> ResultEngine<Vec<String>> {
        let models = categories::Entity::find()
            .filter(categories::Column::GroupId.eq(group_id))
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(|m| m.name).collect())
    }

    /// Removes a category and clears it from the expenses carrying it.
    pub async fn delete_category(&self, group_id: i64, name: &str) -> ResultEngine<()> {
        with_group_tx!(self, group_id, |db_tx| {
            let canonical = find_canonical(&db_tx, group_id, name)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(name.trim().to_string()))?;
            let tagged = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id))
                .filter(expenses::Column::Category.eq(canonical.as_str()))
                .all(&db_tx)
                .await?;
            for model in tagged {
                expenses::ActiveModel {
                    id: ActiveValue::Unchanged(model.id),
                    category: ActiveValue::Set(None),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
            }
            categories::Entity::delete_by_id((group_id, canonical.to_lowercase()))
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}

pub(super) async fn find_canonical<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    name: &str,
) -> ResultEngine<Option<String>> {
    let key = name.trim().to_lowercase();
    if key.is_empty() {
        return Ok(None);
    }
    Ok(categories::Entity::find_by_id((group_id, key))
        .one(db)
        .await?
        .map(|m| m.name))
}
