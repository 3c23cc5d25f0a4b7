//! Commands answered without a dialog.

use engine::{AdminRemoval, EngineError, ExportRow};

use crate::{event::Reply, ui};

use super::ConversationEngine;

impl ConversationEngine {
    pub(super) async fn add_member_now(&self, group_id: i64, name: &str) -> Reply {
        match self.add_member_text(group_id, name).await {
            Ok(text) => Reply::text(group_id, text),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn add_member_text(
        &self,
        group_id: i64,
        name: &str,
    ) -> Result<String, EngineError> {
        let name = name.trim();
        if self.engine.upsert_member(group_id, name).await? {
            Ok(format!("{name} was added."))
        } else {
            Ok(format!("{name} is already a member."))
        }
    }

    pub(super) async fn remove_member(&self, group_id: i64, user: &str, args: &str) -> Reply {
        let name = args.trim();
        if name.is_empty() {
            return Reply::text(group_id, "Usage: /remove_member <name>");
        }
        match self.engine.delete_member(group_id, name, user).await {
            Ok(()) => Reply::text(group_id, format!("{name} was removed.")),
            Err(EngineError::KeyNotFound(_)) => {
                Reply::text(group_id, format!("{name} is not a member."))
            }
            Err(EngineError::NotSettled(_)) => Reply::text(
                group_id,
                format!("{name} still has an open balance. Settle it first."),
            ),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn show_members(&self, group_id: i64) -> Reply {
        match self.engine.list_members(group_id).await {
            Ok(members) if members.is_empty() => Reply::text(group_id, "No members yet."),
            Ok(members) => Reply::text(group_id, ui::bullet_list("Members:", &members)),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn add_admin(&self, group_id: i64, user: &str, args: &str) -> Reply {
        let name = args.trim().trim_start_matches('@');
        if name.is_empty() {
            return Reply::text(group_id, "Usage: /add_admin <username>");
        }
        match self.engine.add_admin(group_id, name, user).await {
            Ok(()) => Reply::text(group_id, format!("{name} is now an admin.")),
            Err(EngineError::ExistingKey(_)) => {
                Reply::text(group_id, format!("{name} already is an admin."))
            }
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn remove_admin(&self, group_id: i64, user: &str, args: &str) -> Reply {
        let name = args.trim().trim_start_matches('@');
        if name.is_empty() {
            return Reply::text(group_id, "Usage: /remove_admin <username>");
        }
        match self.engine.remove_admin(group_id, name, user).await {
            Ok(AdminRemoval::Removed) => {
                Reply::text(group_id, format!("{name} is no longer an admin."))
            }
            Ok(AdminRemoval::RequesterDemoted) => Reply::text(
                group_id,
                format!("Haha nice try. {user} is no longer an admin."),
            ),
            Ok(AdminRemoval::OwnerProtected) => {
                Reply::text(group_id, "The owner cannot be removed.")
            }
            Err(EngineError::KeyNotFound(_)) => {
                Reply::text(group_id, format!("{name} is not an admin."))
            }
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn show_admins(&self, group_id: i64) -> Reply {
        match self.engine.list_admins(group_id).await {
            Ok(admins) => Reply::text(group_id, ui::admins(&admins)),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn undo(&self, group_id: i64) -> Reply {
        match self.engine.undo_last_expense(group_id).await {
            Ok(Some(expense)) => Reply::text(
                group_id,
                format!(
                    "Undid \"{}\" ({} paid {} {}).",
                    expense.purpose, expense.payer, expense.amount, expense.currency
                ),
            ),
            Ok(None) => Reply::text(group_id, "No expenses to undo."),
            Err(EngineError::KeyNotFound(name) | EngineError::BeneficiaryNotFound(name)) => {
                Reply::text(
                    group_id,
                    format!("The last expense involves {name}, who is no longer a member. Add them back to undo it."),
                )
            }
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn show_balance(&self, group_id: i64, args: &str) -> Reply {
        let currency = match self.engine.currency_setting(group_id).await {
            Ok(setting) => setting.base,
            Err(err) => return self.failure(group_id, &err),
        };
        let name = args.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("all") {
            return match self.engine.list_balances(group_id).await {
                Ok(balances) if balances.is_empty() => Reply::text(group_id, "No members yet."),
                Ok(balances) => Reply::text(group_id, ui::balances(&balances, &currency)),
                Err(err) => self.failure(group_id, &err),
            };
        }
        match self.engine.get_balance(group_id, name).await {
            Ok(Some(balance)) => Reply::text(group_id, ui::balance_line(&balance, &currency)),
            Ok(None) => Reply::text(group_id, format!("{name} is not a member.")),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn show_expenses(&self, group_id: i64) -> Reply {
        match self.engine.list_expenses(group_id).await {
            Ok(expenses) if expenses.is_empty() => Reply::text(group_id, "No expenses yet."),
            Ok(expenses) => Reply::text(group_id, ui::expense_log(&expenses)),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn show_currency(&self, group_id: i64) -> Reply {
        match self.engine.currency_setting(group_id).await {
            Ok(setting) => Reply::text(group_id, ui::currency(&setting)),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn valid_currencies(&self, group_id: i64) -> Reply {
        match self.rates.get_rates(&self.reference).await {
            Ok(rates) => {
                let mut codes: Vec<String> = rates.into_keys().collect();
                codes.sort();
                Reply::text(
                    group_id,
                    format!("Supported currency codes:\n{}", codes.join(", ")),
                )
            }
            Err(err) => {
                tracing::error!(group_id, "rate lookup failed: {err}");
                Reply::text(
                    group_id,
                    "Could not fetch the supported currencies right now. \
                     Any ISO 4217 code such as USD, EUR or JPY is usually supported.",
                )
            }
        }
    }

    pub(super) async fn show_categories(&self, group_id: i64) -> Reply {
        match self.engine.list_categories(group_id).await {
            Ok(categories) if categories.is_empty() => Reply::text(
                group_id,
                format!(
                    "No categories yet. Expenses without one count as {}.",
                    engine::UNCATEGORIZED
                ),
            ),
            Ok(categories) => Reply::text(group_id, ui::bullet_list("Categories:", &categories)),
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn export(&self, group_id: i64) -> Reply {
        let rows = match self.engine.export_rows(group_id).await {
            Ok(rows) => rows,
            Err(err) => return self.failure(group_id, &err),
        };
        if rows.is_empty() {
            return Reply::text(group_id, "No expenses to export.");
        }
        let count = rows.len();
        match write_csv(rows) {
            Ok(bytes) => Reply::text(group_id, format!("Exported {count} rows."))
                .with_attachment("expenses.csv", bytes),
            Err(err) => {
                tracing::error!(group_id, "csv export failed: {err}");
                Reply::text(group_id, ui::FAILED)
            }
        }
    }
}

fn write_csv(rows: Vec<ExportRow>) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
