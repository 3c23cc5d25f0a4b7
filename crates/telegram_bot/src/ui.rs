//! Reply texts and inline keyboards.

use engine::{
    Admin, Balance, CurrencyChange, CurrencyCode, CurrencySetting, Expense, SpendingReport,
};

use crate::event::Button;

/// Tag prefix of buttons that answer the focused dialog.
pub(crate) const INPUT_TAG: &str = "input:";

pub(crate) const START_FIRST: &str = "Use /start first to set up this group.";
pub(crate) const FAILED: &str = "Something went wrong, please try again.";
pub(crate) const NOT_ADMIN: &str = "Sorry, only admins can do that.";

pub(crate) fn welcome() -> String {
    "Hi! I keep track of shared expenses for this group.\n\
     Add the people who share costs, then record expenses with /add_expense.\n\
     Use /help to see every command."
        .to_string()
}

pub(crate) fn welcome_buttons() -> Vec<Vec<Button>> {
    vec![vec![
        Button::new("Add Member", "add_member"),
        Button::new("Add Expense", "add_expense"),
    ]]
}

/// One button per option, answering the focused dialog when pressed.
pub(crate) fn choice_buttons<'a>(options: impl IntoIterator<Item = &'a str>) -> Vec<Vec<Button>> {
    options
        .into_iter()
        .map(|option| vec![Button::new(option, format!("{INPUT_TAG}{option}"))])
        .collect()
}

pub(crate) fn confirm_buttons() -> Vec<Vec<Button>> {
    vec![vec![
        Button::new("Yes", format!("{INPUT_TAG}yes")),
        Button::new("No", format!("{INPUT_TAG}no")),
    ]]
}

pub(crate) fn bullet_list(title: &str, items: &[String]) -> String {
    let mut text = title.to_string();
    for item in items {
        text.push_str("\n- ");
        text.push_str(item);
    }
    text
}

pub(crate) fn balance_line(balance: &Balance, currency: &CurrencyCode) -> String {
    format!(
        "{}: {} {} ({})",
        balance.username,
        balance.amount,
        currency,
        balance.status()
    )
}

pub(crate) fn balances(balances: &[Balance], currency: &CurrencyCode) -> String {
    let lines: Vec<String> = balances
        .iter()
        .map(|b| balance_line(b, currency))
        .collect();
    bullet_list("Balances:", &lines)
}

pub(crate) fn admins(admins: &[Admin]) -> String {
    let lines: Vec<String> = admins
        .iter()
        .map(|a| {
            if a.is_owner {
                format!("{} (owner)", a.username)
            } else {
                a.username.clone()
            }
        })
        .collect();
    bullet_list("Admins:", &lines)
}

pub(crate) fn expense_summary(expense: &Expense) -> String {
    let mut text = format!(
        "Recorded \"{}\": {} paid {} {}.",
        expense.purpose, expense.payer, expense.amount, expense.currency
    );
    for share in &expense.shares {
        text.push_str(&format!(
            "\n- {}: {} {}",
            share.beneficiary, share.amount, expense.currency
        ));
    }
    text
}

pub(crate) fn expense_log(expenses: &[Expense]) -> String {
    let mut text = String::from("Expenses (newest first):");
    for expense in expenses {
        text.push_str(&format!(
            "\n\n#{} {} | {} paid {} {}",
            expense.id, expense.purpose, expense.payer, expense.amount, expense.currency
        ));
        if let Some(category) = &expense.category {
            text.push_str(&format!(" [{category}]"));
        }
        let shares: Vec<String> = expense
            .shares
            .iter()
            .map(|s| format!("{} {}", s.beneficiary, s.amount))
            .collect();
        text.push_str(&format!("\n  split: {}", shares.join(", ")));
    }
    text
}

pub(crate) fn currency(setting: &CurrencySetting) -> String {
    format!(
        "Base currency: {} (rate {} against the reference currency).",
        setting.base,
        setting.rate.normalize()
    )
}

pub(crate) fn currency_changed(change: &CurrencyChange) -> String {
    let mut text = format!(
        "Base currency changed from {} to {}. Balances were converted:",
        change.old.base, change.new.base
    );
    for balance in &change.rescaled {
        text.push_str(&format!(
            "\n- {}: {} {}",
            balance.username, balance.amount, change.new.base
        ));
    }
    text
}

pub(crate) fn spending(report: &SpendingReport, currency: &CurrencyCode) -> String {
    match report {
        SpendingReport::ByMember(totals) if totals.is_empty() => {
            "No spending recorded yet.".to_string()
        }
        SpendingReport::ByMember(totals) => {
            let lines: Vec<String> = totals
                .iter()
                .map(|(member, total)| format!("{member}: {total} {currency}"))
                .collect();
            bullet_list("Total spending per member:", &lines)
        }
        SpendingReport::ByCategory {
            member,
            categories,
            total,
        } => {
            let lines: Vec<String> = categories
                .iter()
                .map(|(category, amount)| format!("{category}: {amount} {currency}"))
                .collect();
            let mut text = bullet_list(&format!("Spending of {member} by category:"), &lines);
            text.push_str(&format!("\nTotal: {total} {currency}"));
            text
        }
        SpendingReport::Single {
            member,
            category,
            total: Some(total),
        } => format!("{member} spent {total} {currency} on {category}."),
        SpendingReport::Single {
            member, category, ..
        } => format!("{member} has no spending on {category}."),
    }
}
