//! Telegram front end of the expense splitter.
//!
//! Every update is turned into an [`Event`] and handed to the
//! [`ConversationEngine`], which owns all dialog logic and talks to the
//! ledger [`engine::Engine`]. The Telegram layer only renders the [`Reply`].

use std::sync::Arc;

use teloxide::{prelude::*, utils::command::BotCommands};

mod commands;
mod conversation;
mod event;
mod handlers;
mod parsing;
mod rates;
mod state;
mod ui;

pub use commands::Command;
pub use conversation::ConversationEngine;
pub use event::{Attachment, Button, Event, EventKind, Reply};
pub use parsing::split_command;
pub use rates::{HttpRateLookup, RateError, RateLookup};

pub struct Bot {
    token: String,
    conversation: Arc<ConversationEngine>,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    pub async fn run(&self) {
        tracing::info!("Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);
        if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
            tracing::warn!("could not publish the command menu: {err}");
        }

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handlers::handle_message))
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![self.conversation.clone()])
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    conversation: Option<Arc<ConversationEngine>>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    pub fn conversation(mut self, conversation: ConversationEngine) -> BotBuilder {
        self.conversation = Some(Arc::new(conversation));
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing telegram bot...");
        if self.token.trim().is_empty() {
            return Err("telegram token is empty".to_string());
        }
        let conversation = self
            .conversation
            .ok_or_else(|| "conversation engine not set".to_string())?;
        Ok(Bot {
            token: self.token,
            conversation,
        })
    }
}
