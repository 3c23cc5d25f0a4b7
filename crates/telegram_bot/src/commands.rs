//! Command menu published to Telegram and shown by `/help`.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Commands to split group expenses:")]
pub enum Command {
    #[command(description = "set up the bot for this group.")]
    Start,
    #[command(description = "show this message.")]
    Help,
    #[command(description = "record a shared expense.")]
    AddExpense,
    #[command(description = "undo the last expense.")]
    Undo,
    #[command(description = "show the expense log.")]
    ShowExpenses,
    #[command(description = "show balances, or one member's balance.")]
    ShowBalance(String),
    #[command(description = "add a member.")]
    AddMember(String),
    #[command(description = "remove a member with a settled balance (admin).")]
    RemoveMember(String),
    #[command(description = "list members.")]
    ShowMembers,
    #[command(description = "remove every member (admin).")]
    RemoveAllMembers,
    #[command(description = "add an admin (admin).")]
    AddAdmin(String),
    #[command(description = "remove an admin (admin).")]
    RemoveAdmin(String),
    #[command(description = "list admins.")]
    ShowAdmins,
    #[command(description = "set every balance to zero (admin).")]
    SettleAll,
    #[command(description = "change the base currency and convert balances.")]
    SetCurrency,
    #[command(description = "show the base currency.")]
    ShowCurrency,
    #[command(description = "list supported currency codes.")]
    ValidCurrencies,
    #[command(description = "create an expense category.")]
    CreateCategory,
    #[command(description = "attach a category to expenses.")]
    UpdateCategory,
    #[command(description = "list categories.")]
    ShowCategories,
    #[command(description = "show spending per member or category.")]
    ShowSpending,
    #[command(description = "download the ledger as CSV.")]
    Export,
    #[command(description = "delete every record of this group (admin).")]
    DeleteAll,
    #[command(description = "cancel the current dialog.")]
    Cancel,
}

/// Text shown by `/help`.
pub(crate) fn help_text() -> String {
    Command::descriptions().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_dialog_commands() {
        let help = help_text();
        for name in ["/add_expense", "/settle_all", "/show_spending", "/cancel"] {
            assert!(help.contains(name), "{name} missing from help");
        }
    }
}
