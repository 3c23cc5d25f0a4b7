use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Expense, NewExpense, ResultEngine, Share, expense_shares, expenses,
};

use super::{
    Engine,
    balances::{Direction, move_shares},
    currency::load_setting,
    members::is_member,
    normalize_required_name, with_group_tx, with_tx,
};

impl Engine {
    /// Records an expense with its shares and applies it to the balances, all
    /// in one transaction.
    ///
    /// The expense's currency is the group's base currency at this moment.
    pub async fn create_expense(&self, group_id: i64, expense: NewExpense) -> ResultEngine<Expense> {
        expense.validate()?;
        let created_at = Utc::now();
        with_group_tx!(self, group_id, |db_tx| {
            if !is_member(&db_tx, group_id, &expense.payer).await? {
                return Err(EngineError::KeyNotFound(expense.payer.clone()));
            }
            let setting = load_setting(&db_tx, group_id).await?;

            let model = expenses::ActiveModel::new(group_id, &expense, &setting.base, created_at)
                .insert(&db_tx)
                .await?;
            for share in &expense.shares {
                expense_shares::ActiveModel::new(group_id, model.id, share)
                    .insert(&db_tx)
                    .await?;
            }
            move_shares(
                &db_tx,
                group_id,
                &expense.payer,
                &expense.shares,
                Direction::Apply,
            )
            .await?;

            tracing::info!(
                group_id,
                expense_id = model.id,
                payer = %expense.payer,
                amount = %expense.amount,
                beneficiaries = expense.shares.len(),
                "expense recorded"
            );
            Expense::try_from((model, expense.shares))
        })
    }

    /// The most recently created expense of the group.
    pub async fn last_expense(&self, group_id: i64) -> ResultEngine<Option<Expense>> {
        let Some(model) = find_last(&self.database, group_id).await? else {
            return Ok(None);
        };
        let shares = load_shares(&self.database, model.id).await?;
        Ok(Some(Expense::try_from((model, shares))?))
    }

    /// Reverses and deletes the most recent expense. `None` if the group has
    /// no expenses.
    pub async fn undo_last_expense(&self, group_id: i64) -> ResultEngine<Option<Expense>> {
        with_group_tx!(self, group_id, |db_tx| {
            match find_last(&db_tx, group_id).await? {
                Some(model) => {
                    let expense = remove_expense(&db_tx, model).await?;
                    tracing::info!(group_id, expense_id = expense.id, "expense undone");
                    Ok(Some(expense))
                }
                None => Ok(None),
            }
        })
    }

    /// Reverses and deletes one expense.
    pub async fn delete_expense(&self, group_id: i64, expense_id: i64) -> ResultEngine<Expense> {
        with_group_tx!(self, group_id, |db_tx| {
            let model = expenses::Entity::find_by_id(expense_id)
                .filter(expenses::Column::GroupId.eq(group_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("expense {expense_id}")))?;
            remove_expense(&db_tx, model).await
        })
    }

    /// Expenses of the group with their shares, newest first.
    pub async fn list_expenses(&self, group_id: i64) -> ResultEngine<Vec<Expense>> {
        let rows = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id))
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_desc(expenses::Column::Id)
            .find_with_related(expense_shares::Entity)
            .all(&self.database)
            .await?;
        rows.into_iter()
            .map(|(model, shares)| {
                let shares = shares.into_iter().map(Share::from).collect();
                Expense::try_from((model, shares))
            })
            .collect()
    }

    /// Shares of one expense.
    pub async fn list_expense_shares(&self, expense_id: i64) -> ResultEngine<Vec<Share>> {
        load_shares(&self.database, expense_id).await
    }

    /// `true` if some expense of the group has exactly this purpose.
    pub async fn expense_purpose_exists(&self, group_id: i64, purpose: &str) -> ResultEngine<bool> {
        Ok(expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id))
            .filter(expenses::Column::Purpose.eq(purpose.trim()))
            .one(&self.database)
            .await?
            .is_some())
    }

    /// Assigns `category` to every expense whose purpose equals `purpose`.
    ///
    /// The category must exist; its canonical spelling is stored. Returns the
    /// number of updated expenses.
    pub async fn categorize_expenses(
        &self,
        group_id: i64,
        category: &str,
        purpose: &str,
    ) -> ResultEngine<u64> {
        let purpose = normalize_required_name(purpose, "purpose")?;
        with_group_tx!(self, group_id, |db_tx| {
            let category = super::categories::find_canonical(&db_tx, group_id, category)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(category.trim().to_string()))?;
            let models = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id))
                .filter(expenses::Column::Purpose.eq(purpose.as_str()))
                .all(&db_tx)
                .await?;
            if models.is_empty() {
                return Err(EngineError::KeyNotFound(purpose));
            }
            let mut updated = 0;
            for model in models {
                expenses::ActiveModel {
                    id: ActiveValue::Unchanged(model.id),
                    category: ActiveValue::Set(Some(category.clone())),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
                updated += 1;
            }
            tracing::info!(group_id, category = %category, purpose = %purpose, updated, "expenses categorized");
            Ok(updated)
        })
    }
}

async fn find_last<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
) -> ResultEngine<Option<expenses::Model>> {
    Ok(expenses::Entity::find()
        .filter(expenses::Column::GroupId.eq(group_id))
        .order_by_desc(expenses::Column::CreatedAt)
        .order_by_desc(expenses::Column::Id)
        .one(db)
        .await?)
}

async fn load_shares<C: ConnectionTrait>(db: &C, expense_id: i64) -> ResultEngine<Vec<Share>> {
    let models = expense_shares::Entity::find()
        .filter(expense_shares::Column::ExpenseId.eq(expense_id))
        .order_by_asc(expense_shares::Column::Id)
        .all(db)
        .await?;
    Ok(models.into_iter().map(Share::from).collect())
}

async fn remove_expense(
    db: &sea_orm::DatabaseTransaction,
    model: expenses::Model,
) -> ResultEngine<Expense> {
    let shares = load_shares(db, model.id).await?;
    move_shares(db, model.group_id, &model.payer, &shares, Direction::Reverse).await?;
    expense_shares::Entity::delete_many()
        .filter(expense_shares::Column::ExpenseId.eq(model.id))
        .exec(db)
        .await?;
    expenses::Entity::delete_by_id(model.id).exec(db).await?;
    Expense::try_from((model, shares))
}
