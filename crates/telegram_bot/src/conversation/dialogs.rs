use engine::{EngineError, Money, NewExpense, Share, SpendingScope};

use crate::{
    event::Reply,
    parsing::{self, Confirmation},
    state::{AddExpenseStep, Dialog, DialogKind, ShowSpendingStep, UpdateCategoryStep},
    ui,
};

use super::{ConversationEngine, Step};

impl ConversationEngine {
    pub(super) async fn open_add_expense(&self, group_id: i64, user: &str) -> Reply {
        match self.engine.list_members(group_id).await {
            Ok(members) if members.is_empty() => Reply::text(
                group_id,
                "There are no members yet. Add them with /add_member first.",
            ),
            Ok(_) => {
                self.dialogs
                    .start(group_id, user, Dialog::AddExpense(AddExpenseStep::AwaitPurpose))
                    .await;
                Reply::text(group_id, "What was this expense for?")
            }
            Err(err) => self.failure(group_id, &err),
        }
    }

    pub(super) async fn open_add_member(&self, group_id: i64, user: &str) -> Reply {
        self.dialogs.start(group_id, user, Dialog::AddMember).await;
        Reply::text(group_id, "What is the name of the new member?")
    }

    pub(super) async fn open_set_currency(&self, group_id: i64, user: &str) -> Reply {
        let current = match self.engine.currency_setting(group_id).await {
            Ok(setting) => setting,
            Err(err) => return self.failure(group_id, &err),
        };
        self.dialogs.start(group_id, user, Dialog::SetCurrency).await;
        Reply::text(
            group_id,
            format!(
                "The base currency is {}. Which currency code should balances use from now on? (e.g. EUR)",
                current.base
            ),
        )
    }

    pub(super) async fn open_confirmation(&self, group_id: i64, user: &str, command: &str) -> Reply {
        let (kind, question) = match command {
            "settle_all" => (
                DialogKind::SettleAll,
                "Set every balance to zero? Expense history is kept.",
            ),
            "remove_all_members" => (
                DialogKind::RemoveAllMembers,
                "Remove every member and their balances?",
            ),
            _ => (
                DialogKind::DeleteAll,
                "Delete every record of this group, including expenses and admins?",
            ),
        };
        match self.engine.is_admin(group_id, user).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(group_id, user, dialog = kind.label(), "admin dialog refused");
                return Reply::text(group_id, ui::NOT_ADMIN);
            }
            Err(err) => return self.failure(group_id, &err),
        }
        self.dialogs.start(group_id, user, Dialog::Confirm(kind)).await;
        Reply::text(group_id, format!("{question} Reply yes to confirm."))
            .with_buttons(ui::confirm_buttons())
    }

    pub(super) async fn open_create_category(&self, group_id: i64, user: &str) -> Reply {
        self.dialogs.start(group_id, user, Dialog::CreateCategory).await;
        Reply::text(group_id, "What is the name of the new category?")
    }

    pub(super) async fn open_update_category(&self, group_id: i64, user: &str) -> Reply {
        let categories = match self.engine.list_categories(group_id).await {
            Ok(categories) => categories,
            Err(err) => return self.failure(group_id, &err),
        };
        if categories.is_empty() {
            return Reply::text(
                group_id,
                "There are no categories yet. Create one with /create_category.",
            );
        }
        self.dialogs
            .start(
                group_id,
                user,
                Dialog::UpdateCategory(UpdateCategoryStep::AwaitCategory),
            )
            .await;
        Reply::text(group_id, "Which category?")
            .with_buttons(ui::choice_buttons(categories.iter().map(String::as_str)))
    }

    pub(super) async fn open_show_spending(&self, group_id: i64, user: &str) -> Reply {
        let categories = match self.engine.list_categories(group_id).await {
            Ok(categories) => categories,
            Err(err) => return self.failure(group_id, &err),
        };
        self.dialogs
            .start(
                group_id,
                user,
                Dialog::ShowSpending(ShowSpendingStep::AwaitCategory),
            )
            .await;
        let options = std::iter::once("all").chain(categories.iter().map(String::as_str));
        Reply::text(group_id, "Which category? Send a category name or all.")
            .with_buttons(ui::choice_buttons(options))
    }

    pub(super) async fn step(&self, group_id: i64, user: &str, dialog: Dialog, input: &str) -> Step {
        match dialog {
            Dialog::AddExpense(step) => self.add_expense_step(group_id, step, input).await,
            Dialog::AddMember => self.add_member_step(group_id, input).await,
            Dialog::SetCurrency => self.set_currency_step(group_id, input).await,
            Dialog::Confirm(kind) => self.confirm_step(group_id, user, kind, input).await,
            Dialog::CreateCategory => self.create_category_step(group_id, input).await,
            Dialog::UpdateCategory(step) => self.update_category_step(group_id, step, input).await,
            Dialog::ShowSpending(step) => self.show_spending_step(group_id, step, input).await,
        }
    }

    async fn add_expense_step(&self, group_id: i64, step: AddExpenseStep, input: &str) -> Step {
        match step {
            AddExpenseStep::AwaitPurpose => {
                let buttons = match self.member_buttons(group_id).await {
                    Ok(buttons) => buttons,
                    Err(err) => return Step::Stay(self.failure(group_id, &err)),
                };
                Step::Next(
                    Dialog::AddExpense(AddExpenseStep::AwaitPayer {
                        purpose: input.to_string(),
                    }),
                    Reply::text(group_id, "Who paid?").with_buttons(buttons),
                )
            }
            AddExpenseStep::AwaitPayer { purpose } => {
                match self.engine.is_member(group_id, input).await {
                    Ok(true) => {}
                    Ok(false) => {
                        let buttons = self.member_buttons(group_id).await.unwrap_or_default();
                        return Step::Stay(
                            Reply::text(
                                group_id,
                                format!("{input} is not a member. Who paid?"),
                            )
                            .with_buttons(buttons),
                        );
                    }
                    Err(err) => return Step::Stay(self.failure(group_id, &err)),
                }
                let currency = match self.engine.currency_setting(group_id).await {
                    Ok(setting) => setting.base,
                    Err(err) => return Step::Stay(self.failure(group_id, &err)),
                };
                Step::Next(
                    Dialog::AddExpense(AddExpenseStep::AwaitAmount {
                        purpose,
                        payer: input.to_string(),
                    }),
                    Reply::text(group_id, format!("How much was it, in {currency}?")),
                )
            }
            AddExpenseStep::AwaitAmount { purpose, payer } => match parsing::parse_amount(input) {
                Ok(amount) => Step::Next(
                    Dialog::AddExpense(AddExpenseStep::AwaitBeneficiaries {
                        purpose,
                        payer,
                        amount,
                    }),
                    Reply::text(
                        group_id,
                        "Who shared it? Send names separated by commas, or all.",
                    )
                    .with_buttons(ui::choice_buttons(["all"])),
                ),
                Err(err) => Step::Stay(Reply::text(group_id, err.to_string())),
            },
            AddExpenseStep::AwaitBeneficiaries {
                purpose,
                payer,
                amount,
            } => {
                let beneficiaries = match self.resolve_beneficiaries(group_id, input).await {
                    Ok(beneficiaries) => beneficiaries,
                    Err(reply) => return Step::Stay(reply),
                };
                if let [only] = beneficiaries.as_slice() {
                    let shares = vec![Share::new(only.clone(), amount)];
                    return self
                        .commit_expense(group_id, purpose, payer, amount, shares)
                        .await;
                }
                let prompt = format!(
                    "How should {amount} be split? Send {} amounts separated by commas, in this order: {}. Or send equal.",
                    beneficiaries.len(),
                    beneficiaries.join(", ")
                );
                Step::Next(
                    Dialog::AddExpense(AddExpenseStep::AwaitSplit {
                        purpose,
                        payer,
                        amount,
                        beneficiaries,
                    }),
                    Reply::text(group_id, prompt).with_buttons(ui::choice_buttons(["equal"])),
                )
            }
            AddExpenseStep::AwaitSplit {
                purpose,
                payer,
                amount,
                beneficiaries,
            } => {
                let amounts = if parsing::is_equal(input) {
                    match amount.split_equal(beneficiaries.len()) {
                        Ok(share) => vec![share; beneficiaries.len()],
                        Err(err) => return Step::Stay(self.failure(group_id, &err)),
                    }
                } else {
                    match parsing::parse_split(input, beneficiaries.len(), amount) {
                        Ok(amounts) => amounts,
                        Err(err) => return Step::Stay(Reply::text(group_id, err.to_string())),
                    }
                };
                let shares = beneficiaries
                    .into_iter()
                    .zip(amounts)
                    .map(|(name, amount)| Share::new(name, amount))
                    .collect();
                self.commit_expense(group_id, purpose, payer, amount, shares)
                    .await
            }
        }
    }

    /// Resolves the beneficiary input to member names, or a re-prompt.
    async fn resolve_beneficiaries(&self, group_id: i64, input: &str) -> Result<Vec<String>, Reply> {
        let members = self
            .engine
            .list_members(group_id)
            .await
            .map_err(|err| self.failure(group_id, &err))?;
        if parsing::is_all(input) {
            if members.is_empty() {
                return Err(Reply::text(group_id, "There are no members left."));
            }
            return Ok(members);
        }
        let names = parsing::parse_names(input).map_err(|err| Reply::text(group_id, err.to_string()))?;
        let unknown: Vec<&str> = names
            .iter()
            .filter(|name| !members.contains(name))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(Reply::text(
                group_id,
                format!(
                    "Not members: {}. Send the names again, or all.",
                    unknown.join(", ")
                ),
            ));
        }
        Ok(names)
    }

    async fn commit_expense(
        &self,
        group_id: i64,
        purpose: String,
        payer: String,
        amount: Money,
        shares: Vec<Share>,
    ) -> Step {
        let expense = NewExpense {
            purpose: purpose.clone(),
            payer: payer.clone(),
            amount,
            shares,
        };
        match self.engine.create_expense(group_id, expense).await {
            Ok(recorded) => Step::Done(Reply::text(group_id, ui::expense_summary(&recorded))),
            Err(EngineError::KeyNotFound(name)) if name == payer => {
                let buttons = self.member_buttons(group_id).await.unwrap_or_default();
                Step::Next(
                    Dialog::AddExpense(AddExpenseStep::AwaitPayer { purpose }),
                    Reply::text(
                        group_id,
                        format!("{payer} is no longer a member. Who paid?"),
                    )
                    .with_buttons(buttons),
                )
            }
            Err(EngineError::BeneficiaryNotFound(name)) => {
                Step::Next(
                    Dialog::AddExpense(AddExpenseStep::AwaitBeneficiaries {
                        purpose,
                        payer,
                        amount,
                    }),
                    Reply::text(
                        group_id,
                        format!("{name} is no longer a member. Who shared the expense?"),
                    ),
                )
            }
            Err(err) => Step::Stay(self.failure(group_id, &err)),
        }
    }

    async fn add_member_step(&self, group_id: i64, input: &str) -> Step {
        if input.is_empty() {
            return Step::Stay(Reply::text(group_id, "Please send a name."));
        }
        match self.add_member_text(group_id, input).await {
            Ok(text) => Step::Done(Reply::text(group_id, text)),
            Err(err) => Step::Stay(self.failure(group_id, &err)),
        }
    }

    async fn set_currency_step(&self, group_id: i64, input: &str) -> Step {
        let code = match parsing::parse_currency(input) {
            Ok(code) => code,
            Err(err) => {
                return Step::Done(Reply::text(
                    group_id,
                    format!("{err} The currency was not changed."),
                ));
            }
        };
        let current = match self.engine.currency_setting(group_id).await {
            Ok(setting) => setting,
            Err(err) => return Step::Stay(self.failure(group_id, &err)),
        };
        if current.base == code {
            return Step::Done(Reply::text(
                group_id,
                format!("The base currency already is {code}."),
            ));
        }

        // No lock is held during the lookup.
        let rate = match self.rates.get_rate(&self.reference, &code).await {
            Ok(Some(rate)) => rate,
            Ok(None) => {
                return Step::Done(Reply::text(
                    group_id,
                    format!("{code} is not supported. See /valid_currencies."),
                ));
            }
            Err(err) => {
                tracing::error!(group_id, %code, "rate lookup failed: {err}");
                return Step::Done(Reply::text(
                    group_id,
                    "Could not fetch exchange rates right now. The currency was not changed.",
                ));
            }
        };

        match self.engine.change_base_currency(group_id, code, rate).await {
            Ok(change) => Step::Done(Reply::text(group_id, ui::currency_changed(&change))),
            Err(err) if err.is_storage() => Step::Stay(self.failure(group_id, &err)),
            Err(err) => {
                tracing::warn!(group_id, "currency change rejected: {err}");
                Step::Done(Reply::text(
                    group_id,
                    "The rate provider returned an unusable rate. The currency was not changed.",
                ))
            }
        }
    }

    async fn confirm_step(&self, group_id: i64, user: &str, kind: DialogKind, input: &str) -> Step {
        if parsing::parse_confirmation(input) == Confirmation::No {
            return Step::Done(Reply::text(group_id, "Cancelled. Nothing was changed."));
        }
        let result = match kind {
            DialogKind::SettleAll => self
                .engine
                .settle_all(group_id, user)
                .await
                .map(|_| "All balances are settled.".to_string()),
            DialogKind::RemoveAllMembers => self
                .engine
                .remove_all_members(group_id, user)
                .await
                .map(|removed| format!("Removed {removed} members.")),
            _ => match self.engine.delete_group_data(group_id, user).await {
                Ok(()) => {
                    self.dialogs.clear_group(group_id).await;
                    Ok("All data of this group was deleted. Use /start to begin again.".to_string())
                }
                Err(err) => Err(err),
            },
        };
        match result {
            Ok(text) => Step::Done(Reply::text(group_id, text)),
            Err(err) if err.is_storage() => Step::Stay(self.failure(group_id, &err)),
            Err(err) => Step::Done(self.failure(group_id, &err)),
        }
    }

    async fn create_category_step(&self, group_id: i64, input: &str) -> Step {
        match self.engine.create_category(group_id, input).await {
            Ok(name) => Step::Done(Reply::text(group_id, format!("Category {name} created."))),
            Err(EngineError::ExistingKey(name)) => Step::Done(Reply::text(
                group_id,
                format!("Category {name} already exists."),
            )),
            Err(EngineError::InvalidName(_)) => {
                Step::Stay(Reply::text(group_id, "Please send a category name."))
            }
            Err(err) => Step::Stay(self.failure(group_id, &err)),
        }
    }

    async fn update_category_step(
        &self,
        group_id: i64,
        step: UpdateCategoryStep,
        input: &str,
    ) -> Step {
        match step {
            UpdateCategoryStep::AwaitCategory => {
                let category = match self.engine.find_category(group_id, input).await {
                    Ok(Some(category)) => category,
                    Ok(None) => {
                        return Step::Stay(Reply::text(
                            group_id,
                            format!("{input} is not a category. Which category?"),
                        ));
                    }
                    Err(err) => return Step::Stay(self.failure(group_id, &err)),
                };
                let purposes = self.recent_purposes(group_id).await;
                Step::Next(
                    Dialog::UpdateCategory(UpdateCategoryStep::AwaitPurpose {
                        category: category.clone(),
                    }),
                    Reply::text(
                        group_id,
                        format!("Which expense belongs to {category}? Send its purpose."),
                    )
                    .with_buttons(ui::choice_buttons(purposes.iter().map(String::as_str))),
                )
            }
            UpdateCategoryStep::AwaitPurpose { category } => {
                match self.engine.expense_purpose_exists(group_id, input).await {
                    Ok(true) => {}
                    Ok(false) => {
                        return Step::Stay(Reply::text(
                            group_id,
                            format!("No expense is called {input}. Send the purpose as recorded."),
                        ));
                    }
                    Err(err) => return Step::Stay(self.failure(group_id, &err)),
                }
                match self
                    .engine
                    .categorize_expenses(group_id, &category, input)
                    .await
                {
                    Ok(updated) => Step::Done(Reply::text(
                        group_id,
                        format!("Filed {updated} expense(s) called {input} under {category}."),
                    )),
                    Err(err) if err.is_storage() => Step::Stay(self.failure(group_id, &err)),
                    Err(err) => Step::Done(self.failure(group_id, &err)),
                }
            }
        }
    }

    async fn show_spending_step(&self, group_id: i64, step: ShowSpendingStep, input: &str) -> Step {
        match step {
            ShowSpendingStep::AwaitCategory => {
                let category = if parsing::is_all(input) {
                    None
                } else {
                    match self.engine.find_category(group_id, input).await {
                        Ok(Some(category)) => Some(category),
                        Ok(None) => {
                            return Step::Stay(Reply::text(
                                group_id,
                                format!("{input} is not a category. Send a category name or all."),
                            ));
                        }
                        Err(err) => return Step::Stay(self.failure(group_id, &err)),
                    }
                };
                let mut buttons = if category.is_none() {
                    ui::choice_buttons(["all"])
                } else {
                    Vec::new()
                };
                buttons.extend(self.member_buttons(group_id).await.unwrap_or_default());
                Step::Next(
                    Dialog::ShowSpending(ShowSpendingStep::AwaitMember { category }),
                    Reply::text(group_id, "Whose spending? Send a member name or all.")
                        .with_buttons(buttons),
                )
            }
            ShowSpendingStep::AwaitMember { category } => {
                let member = if parsing::is_all(input) {
                    if category.is_some() {
                        return Step::Stay(Reply::text(
                            group_id,
                            "A single category needs a single member. Whose spending?",
                        ));
                    }
                    SpendingScope::All
                } else {
                    match self.engine.is_member(group_id, input).await {
                        Ok(true) => SpendingScope::One(input.to_string()),
                        Ok(false) => {
                            return Step::Stay(Reply::text(
                                group_id,
                                format!("{input} is not a member. Whose spending?"),
                            ));
                        }
                        Err(err) => return Step::Stay(self.failure(group_id, &err)),
                    }
                };
                let scope = category.map_or(SpendingScope::All, SpendingScope::One);
                let currency = match self.engine.currency_setting(group_id).await {
                    Ok(setting) => setting.base,
                    Err(err) => return Step::Stay(self.failure(group_id, &err)),
                };
                match self.engine.spending(group_id, scope, member).await {
                    Ok(report) => Step::Done(Reply::text(group_id, ui::spending(&report, &currency))),
                    Err(err) => Step::Stay(self.failure(group_id, &err)),
                }
            }
        }
    }

    async fn member_buttons(
        &self,
        group_id: i64,
    ) -> Result<Vec<Vec<crate::event::Button>>, EngineError> {
        let members = self.engine.list_members(group_id).await?;
        Ok(ui::choice_buttons(members.iter().map(String::as_str)))
    }

    /// Distinct purposes of the latest expenses, newest first.
    async fn recent_purposes(&self, group_id: i64) -> Vec<String> {
        let expenses = self.engine.list_expenses(group_id).await.unwrap_or_default();
        let mut purposes: Vec<String> = Vec::new();
        for expense in expenses {
            if purposes.len() == 8 {
                break;
            }
            if !purposes.contains(&expense.purpose) {
                purposes.push(expense.purpose);
            }
        }
        purposes
    }
}
