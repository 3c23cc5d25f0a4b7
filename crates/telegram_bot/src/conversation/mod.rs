//! The conversation engine: turns [`Event`]s into ledger operations and
//! [`Reply`]s.
//!
//! Commands either answer right away or open a dialog. Text and `input:`
//! button presses feed the user's focused dialog, which validates the input
//! and either re-prompts, moves to its next step or finishes.

use std::sync::Arc;

use engine::{CurrencyCode, Engine, EngineError};

use crate::{
    commands::help_text,
    event::{Event, EventKind, Reply},
    rates::RateLookup,
    state::{Dialog, DialogStore},
    ui,
};

mod dialogs;
mod oneshot;

/// Callback tags that open a dialog like the command of the same name.
const DIALOG_CALLBACKS: [&str; 3] = ["add_expense", "add_member", "set_currency"];

/// Outcome of one dialog step.
#[derive(Debug)]
enum Step {
    /// Move to the next step.
    Next(Dialog, Reply),
    /// Keep the current step, usually after a validation error.
    Stay(Reply),
    /// Close the dialog.
    Done(Reply),
}

pub struct ConversationEngine {
    engine: Arc<Engine>,
    rates: Arc<dyn RateLookup>,
    dialogs: DialogStore,
    owner: Option<String>,
    reference: CurrencyCode,
}

impl ConversationEngine {
    pub fn new(engine: Arc<Engine>, rates: Arc<dyn RateLookup>) -> Self {
        Self {
            engine,
            rates,
            dialogs: DialogStore::default(),
            owner: None,
            reference: CurrencyCode::default(),
        }
    }

    /// Username seeded as protected owner of every new group. Without it the
    /// user running `/start` becomes the owner.
    #[must_use]
    pub fn owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner
            .map(|o| o.trim().trim_start_matches('@').to_string())
            .filter(|o| !o.is_empty());
        self
    }

    /// Currency the rate provider quotes against.
    #[must_use]
    pub fn reference_currency(mut self, reference: CurrencyCode) -> Self {
        self.reference = reference;
        self
    }

    /// Processes one event. `None` means the event needs no answer.
    pub async fn handle(&self, event: Event) -> Option<Reply> {
        let Event {
            group_id,
            user,
            kind,
        } = event;
        match kind {
            EventKind::Command { name, args } => {
                self.on_command(group_id, &user, &name.to_ascii_lowercase(), &args)
                    .await
            }
            EventKind::Text(body) => self.on_text(group_id, &user, &body).await,
            EventKind::Callback(tag) => {
                if let Some(input) = tag.strip_prefix(ui::INPUT_TAG) {
                    self.on_text(group_id, &user, input).await
                } else if DIALOG_CALLBACKS.contains(&tag.as_str()) {
                    self.on_command(group_id, &user, &tag, "").await
                } else {
                    tracing::debug!(group_id, %user, %tag, "unknown callback");
                    None
                }
            }
        }
    }

    async fn on_command(&self, group_id: i64, user: &str, name: &str, args: &str) -> Option<Reply> {
        tracing::debug!(group_id, user, command = name, "command");
        match name {
            "start" => return Some(self.start(group_id, user).await),
            "help" => return Some(Reply::text(group_id, help_text())),
            "cancel" => return Some(self.cancel(group_id, user).await),
            _ => {}
        }

        match self.engine.group_exists(group_id).await {
            Ok(true) => {}
            Ok(false) => return Some(Reply::text(group_id, ui::START_FIRST)),
            Err(err) => return Some(self.failure(group_id, &err)),
        }

        let reply = match name {
            "add_expense" => self.open_add_expense(group_id, user).await,
            "add_member" if !args.is_empty() => self.add_member_now(group_id, args).await,
            "add_member" => self.open_add_member(group_id, user).await,
            "remove_member" => self.remove_member(group_id, user, args).await,
            "show_members" => self.show_members(group_id).await,
            "remove_all_members" | "settle_all" | "delete_all" => {
                self.open_confirmation(group_id, user, name).await
            }
            "add_admin" => self.add_admin(group_id, user, args).await,
            "remove_admin" => self.remove_admin(group_id, user, args).await,
            "show_admins" => self.show_admins(group_id).await,
            "undo" => self.undo(group_id).await,
            "show_balance" => self.show_balance(group_id, args).await,
            "show_expenses" => self.show_expenses(group_id).await,
            "set_currency" => self.open_set_currency(group_id, user).await,
            "show_currency" => self.show_currency(group_id).await,
            "valid_currencies" => self.valid_currencies(group_id).await,
            "create_category" => self.open_create_category(group_id, user).await,
            "update_category" => self.open_update_category(group_id, user).await,
            "show_categories" => self.show_categories(group_id).await,
            "show_spending" => self.open_show_spending(group_id, user).await,
            "export" => self.export(group_id).await,
            _ => return None,
        };
        Some(reply)
    }

    async fn on_text(&self, group_id: i64, user: &str, body: &str) -> Option<Reply> {
        let dialog = self.dialogs.focused(group_id, user).await?;
        let kind = dialog.kind();

        match self.engine.group_exists(group_id).await {
            Ok(true) => {}
            Ok(false) => {
                self.dialogs.finish(group_id, user, kind).await;
                return Some(Reply::text(group_id, ui::START_FIRST));
            }
            Err(err) => return Some(self.failure(group_id, &err)),
        }

        let step = self.step(group_id, user, dialog, body.trim()).await;
        tracing::debug!(group_id, user, dialog = kind.label(), ?step, "dialog step");
        match step {
            Step::Next(next, reply) => {
                self.dialogs.advance(group_id, user, next).await;
                Some(reply)
            }
            Step::Stay(reply) => Some(reply),
            Step::Done(reply) => {
                self.dialogs.finish(group_id, user, kind).await;
                Some(reply)
            }
        }
    }

    async fn start(&self, group_id: i64, user: &str) -> Reply {
        let owner = self.owner.as_deref().unwrap_or(user);
        match self.engine.start_group(group_id, user, owner).await {
            Ok(created) => {
                if created {
                    tracing::info!(group_id, owner, "new group");
                }
                Reply::text(group_id, ui::welcome()).with_buttons(ui::welcome_buttons())
            }
            Err(err) => self.failure(group_id, &err),
        }
    }

    async fn cancel(&self, group_id: i64, user: &str) -> Reply {
        let Some(dialog) = self.dialogs.focused(group_id, user).await else {
            return Reply::text(group_id, "There is nothing to cancel.");
        };
        let kind = dialog.kind();
        self.dialogs.finish(group_id, user, kind).await;
        tracing::debug!(group_id, user, dialog = kind.label(), "dialog cancelled");
        Reply::text(
            group_id,
            format!("Cancelled {}. Nothing was changed.", kind.label()),
        )
    }

    /// Reply for an engine error that no caller handled more precisely.
    ///
    /// Storage failures are logged and reported without details.
    fn failure(&self, group_id: i64, err: &EngineError) -> Reply {
        let text = match err {
            EngineError::Unauthorized(_) => ui::NOT_ADMIN.to_string(),
            EngineError::Database(db_err) => {
                tracing::error!(group_id, "storage failure: {db_err}");
                ui::FAILED.to_string()
            }
            other => {
                tracing::warn!(group_id, "request rejected: {other}");
                ui::FAILED.to_string()
            }
        };
        Reply::text(group_id, text)
    }
}
