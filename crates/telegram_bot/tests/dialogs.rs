use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::Database;

use engine::{CurrencyCode, Engine, Money};
use migration::MigratorTrait;
use telegram_bot::{ConversationEngine, Event, RateError, RateLookup, Reply};

const GROUP: i64 = -42;

/// Fixed rates quoted against SGD, or a provider outage.
struct StubRates {
    rates: HashMap<String, Decimal>,
    down: bool,
}

#[async_trait]
impl RateLookup for StubRates {
    async fn get_rates(
        &self,
        _reference: &CurrencyCode,
    ) -> Result<HashMap<String, Decimal>, RateError> {
        if self.down {
            return Err(RateError::Provider("503 Service Unavailable".to_string()));
        }
        Ok(self.rates.clone())
    }
}

async fn setup(rates_down: bool) -> (ConversationEngine, Arc<Engine>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(Engine::builder().database(db).build().await.unwrap());
    let rates = StubRates {
        rates: HashMap::from([
            ("SGD".to_string(), dec!(1)),
            ("EUR".to_string(), dec!(0.75)),
        ]),
        down: rates_down,
    };
    let conversation = ConversationEngine::new(engine.clone(), Arc::new(rates));
    (conversation, engine)
}

async fn command(conversation: &ConversationEngine, user: &str, name: &str, args: &str) -> Reply {
    conversation
        .handle(Event::command(GROUP, user, name, args))
        .await
        .unwrap()
}

async fn say(conversation: &ConversationEngine, user: &str, text: &str) -> Reply {
    conversation
        .handle(Event::text(GROUP, user, text))
        .await
        .unwrap()
}

/// Started group owned by `alice` with alice, bob and carol as members.
async fn started_group(rates_down: bool) -> (ConversationEngine, Arc<Engine>) {
    let (conversation, engine) = setup(rates_down).await;
    command(&conversation, "alice", "start", "").await;
    for name in ["alice", "bob", "carol"] {
        command(&conversation, "alice", "add_member", name).await;
    }
    (conversation, engine)
}

async fn balance_of(engine: &Engine, name: &str) -> Money {
    engine
        .get_balance(GROUP, name)
        .await
        .unwrap()
        .map(|b| b.amount)
        .unwrap_or_default()
}

#[tokio::test]
async fn commands_need_start_first() {
    let (conversation, _engine) = setup(false).await;
    let reply = command(&conversation, "alice", "show_members", "").await;
    assert_eq!(reply.text, "Use /start first to set up this group.");

    let reply = command(&conversation, "alice", "start", "").await;
    assert!(reply.buttons.is_some());
    let reply = command(&conversation, "alice", "show_admins", "").await;
    assert!(reply.text.contains("alice (owner)"));
}

#[tokio::test]
async fn add_expense_with_equal_split() {
    let (conversation, engine) = started_group(false).await;

    let reply = command(&conversation, "alice", "add_expense", "").await;
    assert_eq!(reply.text, "What was this expense for?");
    let reply = say(&conversation, "alice", "dinner").await;
    assert_eq!(reply.buttons.as_ref().map(Vec::len), Some(3));

    let reply = say(&conversation, "alice", "dave").await;
    assert!(reply.text.starts_with("dave is not a member"));

    say(&conversation, "alice", "alice").await;
    let reply = say(&conversation, "alice", "-3").await;
    assert_eq!(reply.text, "The amount must be greater than zero.");
    say(&conversation, "alice", "30").await;
    say(&conversation, "alice", "all").await;
    let reply = say(&conversation, "alice", "equal").await;
    assert!(reply.text.starts_with("Recorded \"dinner\""), "{}", reply.text);

    assert_eq!(balance_of(&engine, "alice").await, Money::new(-20_00));
    assert_eq!(balance_of(&engine, "bob").await, Money::new(10_00));
    assert_eq!(balance_of(&engine, "carol").await, Money::new(10_00));

    // The dialog is closed: plain text is ignored again.
    assert!(
        conversation
            .handle(Event::text(GROUP, "alice", "hello"))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn single_beneficiary_skips_the_split() {
    let (conversation, engine) = started_group(false).await;
    command(&conversation, "bob", "add_expense", "").await;
    say(&conversation, "bob", "taxi").await;
    say(&conversation, "bob", "bob").await;
    say(&conversation, "bob", "12.40").await;
    let reply = say(&conversation, "bob", "carol").await;
    assert!(reply.text.starts_with("Recorded \"taxi\""));

    assert_eq!(balance_of(&engine, "bob").await, Money::new(-12_40));
    assert_eq!(balance_of(&engine, "carol").await, Money::new(12_40));
}

#[tokio::test]
async fn mismatched_split_is_asked_again() {
    let (conversation, engine) = started_group(false).await;
    command(&conversation, "alice", "add_expense", "").await;
    say(&conversation, "alice", "groceries").await;
    say(&conversation, "alice", "alice").await;
    say(&conversation, "alice", "20").await;
    say(&conversation, "alice", "alice, bob, carol").await;

    let reply = say(&conversation, "alice", "5, 5, 5").await;
    assert_eq!(
        reply.text,
        "The amounts add up to 15.00, but the expense is 20.00."
    );
    assert!(engine.list_expenses(GROUP).await.unwrap().is_empty());

    let reply = say(&conversation, "alice", "10, 5, 5").await;
    assert!(reply.text.starts_with("Recorded"));
    assert_eq!(balance_of(&engine, "alice").await, Money::new(-10_00));
}

#[tokio::test]
async fn beneficiary_button_answers_the_dialog() {
    let (conversation, engine) = started_group(false).await;
    command(&conversation, "alice", "add_expense", "").await;
    say(&conversation, "alice", "snacks").await;
    conversation
        .handle(Event::callback(GROUP, "alice", "input:alice"))
        .await
        .unwrap();
    say(&conversation, "alice", "6").await;
    conversation
        .handle(Event::callback(GROUP, "alice", "input:all"))
        .await
        .unwrap();
    say(&conversation, "alice", "equal").await;

    assert_eq!(balance_of(&engine, "bob").await, Money::new(2_00));
}

#[tokio::test]
async fn duplicate_member_is_reported() {
    let (conversation, _engine) = started_group(false).await;
    let reply = command(&conversation, "alice", "add_member", "bob").await;
    assert_eq!(reply.text, "bob is already a member.");

    command(&conversation, "alice", "add_member", "").await;
    let reply = say(&conversation, "alice", "dave").await;
    assert_eq!(reply.text, "dave was added.");
}

#[tokio::test]
async fn settle_all_is_for_admins() {
    let (conversation, engine) = started_group(false).await;
    engine
        .create_expense(
            GROUP,
            engine::NewExpense {
                purpose: "lunch".to_string(),
                payer: "alice".to_string(),
                amount: Money::new(9_00),
                shares: vec![engine::Share::new("bob", Money::new(9_00))],
            },
        )
        .await
        .unwrap();

    let reply = command(&conversation, "bob", "settle_all", "").await;
    assert_eq!(reply.text, "Sorry, only admins can do that.");
    assert!(
        conversation
            .handle(Event::text(GROUP, "bob", "yes"))
            .await
            .is_none()
    );
    assert_eq!(balance_of(&engine, "bob").await, Money::new(9_00));

    command(&conversation, "alice", "settle_all", "").await;
    let reply = say(&conversation, "alice", "yes").await;
    assert_eq!(reply.text, "All balances are settled.");
    assert_eq!(balance_of(&engine, "bob").await, Money::ZERO);
}

#[tokio::test]
async fn settling_needs_an_explicit_yes() {
    let (conversation, engine) = started_group(false).await;
    engine
        .create_expense(
            GROUP,
            engine::NewExpense {
                purpose: "tickets".to_string(),
                payer: "alice".to_string(),
                amount: Money::new(10_00),
                shares: vec![engine::Share::new("bob", Money::new(10_00))],
            },
        )
        .await
        .unwrap();

    for answer in ["y", "no", "sure"] {
        command(&conversation, "alice", "settle_all", "").await;
        let reply = say(&conversation, "alice", answer).await;
        assert_eq!(reply.text, "Cancelled. Nothing was changed.", "{answer}");
        assert_eq!(balance_of(&engine, "bob").await, Money::new(10_00));
    }

    command(&conversation, "alice", "settle_all", "").await;
    let reply = say(&conversation, "alice", "yes").await;
    assert_eq!(reply.text, "All balances are settled.");
    assert_eq!(balance_of(&engine, "bob").await, Money::ZERO);
}

#[tokio::test]
async fn removed_payer_is_asked_again() {
    let (conversation, engine) = started_group(false).await;
    command(&conversation, "alice", "add_expense", "").await;
    say(&conversation, "alice", "museum").await;
    say(&conversation, "alice", "bob").await;
    say(&conversation, "alice", "10").await;

    let reply = command(&conversation, "alice", "remove_member", "bob").await;
    assert_eq!(reply.text, "bob was removed.");

    let reply = say(&conversation, "alice", "carol").await;
    assert_eq!(reply.text, "bob is no longer a member. Who paid?");
    assert!(engine.list_expenses(GROUP).await.unwrap().is_empty());

    let reply = say(&conversation, "alice", "carol").await;
    assert_eq!(reply.text, "How much was it, in SGD?");
    say(&conversation, "alice", "10").await;
    let reply = say(&conversation, "alice", "alice").await;
    assert!(reply.text.starts_with("Recorded \"museum\""), "{}", reply.text);

    assert_eq!(balance_of(&engine, "carol").await, Money::new(-10_00));
    assert_eq!(balance_of(&engine, "alice").await, Money::new(10_00));
}

#[tokio::test]
async fn set_currency_rescales_balances() {
    let (conversation, engine) = started_group(false).await;
    engine
        .create_expense(
            GROUP,
            engine::NewExpense {
                purpose: "hotel".to_string(),
                payer: "alice".to_string(),
                amount: Money::new(10_00),
                shares: vec![engine::Share::new("bob", Money::new(10_00))],
            },
        )
        .await
        .unwrap();

    command(&conversation, "alice", "set_currency", "").await;
    let reply = say(&conversation, "alice", "eur").await;
    assert!(reply.text.starts_with("Base currency changed from SGD to EUR"));

    assert_eq!(balance_of(&engine, "alice").await, Money::new(-7_50));
    assert_eq!(balance_of(&engine, "bob").await, Money::new(7_50));
    let setting = engine.currency_setting(GROUP).await.unwrap();
    assert_eq!(setting.base.code(), "EUR");
    assert_eq!(setting.rate, dec!(0.75));
}

#[tokio::test]
async fn unsupported_or_unreachable_rates_keep_the_currency() {
    let (conversation, engine) = started_group(false).await;
    command(&conversation, "alice", "set_currency", "").await;
    let reply = say(&conversation, "alice", "JPY").await;
    assert_eq!(reply.text, "JPY is not supported. See /valid_currencies.");

    let (conversation, engine_down) = started_group(true).await;
    command(&conversation, "alice", "set_currency", "").await;
    let reply = say(&conversation, "alice", "EUR").await;
    assert!(reply.text.starts_with("Could not fetch exchange rates"));

    for engine in [engine, engine_down] {
        let setting = engine.currency_setting(GROUP).await.unwrap();
        assert_eq!(setting.base.code(), "SGD");
    }
}

#[tokio::test]
async fn cancel_closes_the_focused_dialog() {
    let (conversation, engine) = started_group(false).await;
    command(&conversation, "alice", "add_expense", "").await;
    say(&conversation, "alice", "coffee").await;
    command(&conversation, "alice", "create_category", "").await;

    let reply = command(&conversation, "alice", "cancel", "").await;
    assert!(reply.text.starts_with("Cancelled"));
    assert!(engine.list_categories(GROUP).await.unwrap().is_empty());

    // The expense dialog is focused again and continues where it stopped.
    let reply = say(&conversation, "alice", "alice").await;
    assert!(reply.text.starts_with("How much was it"));

    command(&conversation, "alice", "cancel", "").await;
    let reply = command(&conversation, "alice", "cancel", "").await;
    assert_eq!(reply.text, "There is nothing to cancel.");
}

#[tokio::test]
async fn spending_by_category_dialog() {
    let (conversation, engine) = started_group(false).await;
    command(&conversation, "alice", "create_category", "").await;
    let reply = say(&conversation, "alice", "Food").await;
    assert_eq!(reply.text, "Category Food created.");

    engine
        .create_expense(
            GROUP,
            engine::NewExpense {
                purpose: "pizza".to_string(),
                payer: "alice".to_string(),
                amount: Money::new(8_00),
                shares: vec![
                    engine::Share::new("alice", Money::new(4_00)),
                    engine::Share::new("bob", Money::new(4_00)),
                ],
            },
        )
        .await
        .unwrap();

    command(&conversation, "alice", "update_category", "").await;
    say(&conversation, "alice", "food").await;
    let reply = say(&conversation, "alice", "pizza").await;
    assert_eq!(reply.text, "Filed 1 expense(s) called pizza under Food.");

    command(&conversation, "bob", "show_spending", "").await;
    say(&conversation, "bob", "Food").await;
    let reply = say(&conversation, "bob", "all").await;
    assert!(reply.text.starts_with("A single category needs a single member"));
    let reply = say(&conversation, "bob", "bob").await;
    assert_eq!(reply.text, "bob spent 4.00 SGD on Food.");
}

#[tokio::test]
async fn export_attaches_csv() {
    let (conversation, engine) = started_group(false).await;
    let reply = command(&conversation, "alice", "export", "").await;
    assert_eq!(reply.text, "No expenses to export.");

    engine
        .create_expense(
            GROUP,
            engine::NewExpense {
                purpose: "museum".to_string(),
                payer: "carol".to_string(),
                amount: Money::new(30_00),
                shares: vec![
                    engine::Share::new("alice", Money::new(15_00)),
                    engine::Share::new("bob", Money::new(15_00)),
                ],
            },
        )
        .await
        .unwrap();

    let reply = command(&conversation, "alice", "export", "").await;
    let attachment = reply.attachment.unwrap();
    assert_eq!(attachment.file_name, "expenses.csv");
    let csv = String::from_utf8(attachment.bytes).unwrap();
    assert_eq!(csv.lines().count(), 3);
}
