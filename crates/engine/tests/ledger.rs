use rust_decimal_macros::dec;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    AdminRemoval, CurrencyCode, CurrencySetting, Engine, EngineError, Money, NewExpense, Share,
    SpendingReport, SpendingScope,
};
use migration::MigratorTrait;

const GROUP: i64 = -1001;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Started group with `owner` as owner and the given members.
async fn group_with_members(members: &[&str]) -> Engine {
    let (engine, _db) = engine_with_db().await;
    assert!(engine.start_group(GROUP, "owner", "owner").await.unwrap());
    for member in members {
        assert!(engine.upsert_member(GROUP, member).await.unwrap());
    }
    engine
}

fn expense(purpose: &str, payer: &str, amount: i64, shares: &[(&str, i64)]) -> NewExpense {
    NewExpense {
        purpose: purpose.to_string(),
        payer: payer.to_string(),
        amount: Money::new(amount),
        shares: shares
            .iter()
            .map(|(name, cents)| Share::new(*name, Money::new(*cents)))
            .collect(),
    }
}

async fn balance_of(engine: &Engine, name: &str) -> Money {
    engine
        .get_balance(GROUP, name)
        .await
        .unwrap()
        .map(|b| b.amount)
        .unwrap_or_default()
}

async fn balance_sum(engine: &Engine) -> Money {
    engine
        .list_balances(GROUP)
        .await
        .unwrap()
        .iter()
        .map(|b| b.amount)
        .sum()
}

#[tokio::test]
async fn start_group_is_idempotent_and_seeds_owner_and_currency() {
    let (engine, _db) = engine_with_db().await;
    assert!(!engine.group_exists(GROUP).await.unwrap());
    assert!(engine.start_group(GROUP, "alice", "alice").await.unwrap());
    assert!(!engine.start_group(GROUP, "bob", "bob").await.unwrap());

    let admins = engine.list_admins(GROUP).await.unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].username, "alice");
    assert!(admins[0].is_owner);

    let setting = engine.currency_setting(GROUP).await.unwrap();
    assert_eq!(setting.base.code(), "SGD");
    assert_eq!(setting.rate, dec!(1));
}

#[tokio::test]
async fn duplicate_member_is_not_inserted() {
    let engine = group_with_members(&["alice"]).await;
    assert!(!engine.upsert_member(GROUP, "alice").await.unwrap());
    assert_eq!(engine.list_members(GROUP).await.unwrap(), vec!["alice"]);
    assert_eq!(engine.list_balances(GROUP).await.unwrap().len(), 1);
}

#[tokio::test]
async fn member_of_unknown_group_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine.upsert_member(42, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn expenses_keep_balances_summing_to_zero() {
    let engine = group_with_members(&["alice", "bob", "carol"]).await;

    engine
        .create_expense(
            GROUP,
            expense("dinner", "alice", 30_00, &[("alice", 10_00), ("bob", 10_00), ("carol", 10_00)]),
        )
        .await
        .unwrap();
    engine
        .create_expense(GROUP, expense("taxi", "bob", 12_50, &[("carol", 12_50)]))
        .await
        .unwrap();

    assert_eq!(balance_of(&engine, "alice").await, Money::new(-20_00));
    assert_eq!(balance_of(&engine, "bob").await, Money::new(-2_50));
    assert_eq!(balance_of(&engine, "carol").await, Money::new(22_50));
    assert_eq!(balance_sum(&engine).await, Money::ZERO);

    let recorded = engine.list_expenses(GROUP).await.unwrap();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].purpose, "taxi");
    assert_eq!(recorded[0].currency.code(), "SGD");
    assert_eq!(recorded[1].shares.len(), 3);
}

#[tokio::test]
async fn unknown_beneficiary_writes_nothing() {
    let engine = group_with_members(&["alice", "bob"]).await;

    let err = engine
        .create_expense(
            GROUP,
            expense("lunch", "alice", 20_00, &[("bob", 10_00), ("mallory", 10_00)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::BeneficiaryNotFound("mallory".to_string()));

    assert!(engine.list_expenses(GROUP).await.unwrap().is_empty());
    assert_eq!(balance_of(&engine, "alice").await, Money::ZERO);
    assert_eq!(balance_of(&engine, "bob").await, Money::ZERO);
}

#[tokio::test]
async fn apply_then_reverse_restores_balances() {
    let engine = group_with_members(&["alice", "bob"]).await;
    let shares = vec![Share::new("alice", Money::new(5_00)), Share::new("bob", Money::new(7_25))];

    engine.apply_expense(GROUP, "alice", &shares).await.unwrap();
    assert_eq!(balance_of(&engine, "alice").await, Money::new(-7_25));
    assert_eq!(balance_of(&engine, "bob").await, Money::new(7_25));

    engine.reverse_expense(GROUP, "alice", &shares).await.unwrap();
    assert_eq!(balance_of(&engine, "alice").await, Money::ZERO);
    assert_eq!(balance_of(&engine, "bob").await, Money::ZERO);
}

#[tokio::test]
async fn undo_reverses_only_the_latest_expense() {
    let engine = group_with_members(&["alice", "bob"]).await;
    engine
        .create_expense(GROUP, expense("coffee", "alice", 4_00, &[("bob", 4_00)]))
        .await
        .unwrap();
    let before_bob = balance_of(&engine, "bob").await;

    let latest = engine
        .create_expense(GROUP, expense("cake", "bob", 9_00, &[("alice", 9_00)]))
        .await
        .unwrap();

    let undone = engine.undo_last_expense(GROUP).await.unwrap().unwrap();
    assert_eq!(undone.id, latest.id);
    assert_eq!(undone.shares, latest.shares);
    assert_eq!(balance_of(&engine, "bob").await, before_bob);
    assert_eq!(engine.list_expenses(GROUP).await.unwrap().len(), 1);
    assert!(engine.list_expense_shares(latest.id).await.unwrap().is_empty());

    engine.undo_last_expense(GROUP).await.unwrap().unwrap();
    assert!(engine.undo_last_expense(GROUP).await.unwrap().is_none());
    assert_eq!(balance_sum(&engine).await, Money::ZERO);
}

#[tokio::test]
async fn rescale_converts_balances_to_the_new_rate() {
    let engine = group_with_members(&["alice", "bob"]).await;
    engine
        .create_expense(GROUP, expense("hotel", "bob", 10_00, &[("alice", 10_00)]))
        .await
        .unwrap();

    let change = engine
        .change_base_currency(GROUP, CurrencyCode::default(), dec!(1.00))
        .await
        .unwrap();
    assert_eq!(change.old.rate, dec!(1));

    let eur: CurrencyCode = "eur".parse().unwrap();
    let change = engine
        .change_base_currency(GROUP, eur.clone(), dec!(0.75))
        .await
        .unwrap();
    assert_eq!(change.new.base, eur);
    assert_eq!(balance_of(&engine, "alice").await, Money::new(7_50));
    assert_eq!(balance_of(&engine, "bob").await, Money::new(-7_50));
    assert_eq!(balance_sum(&engine).await, Money::ZERO);

    let setting = engine.currency_setting(GROUP).await.unwrap();
    assert_eq!(setting.base.code(), "EUR");
    assert_eq!(setting.rate, dec!(0.75));
}

#[tokio::test]
async fn rescale_rejects_non_positive_rate() {
    let engine = group_with_members(&["alice"]).await;
    let err = engine
        .change_base_currency(GROUP, "USD".parse().unwrap(), dec!(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRate(_)));
    assert_eq!(engine.currency_setting(GROUP).await.unwrap().base.code(), "SGD");
}

#[tokio::test]
async fn settle_all_requires_admin() {
    let engine = group_with_members(&["alice", "bob"]).await;
    engine
        .create_expense(GROUP, expense("tickets", "alice", 40_00, &[("bob", 40_00)]))
        .await
        .unwrap();

    let err = engine.settle_all(GROUP, "bob").await.unwrap_err();
    assert_eq!(err, EngineError::Unauthorized("bob".to_string()));
    assert_eq!(balance_of(&engine, "bob").await, Money::new(40_00));

    assert_eq!(engine.settle_all(GROUP, "owner").await.unwrap(), 2);
    assert_eq!(balance_of(&engine, "alice").await, Money::ZERO);
    assert_eq!(balance_of(&engine, "bob").await, Money::ZERO);
    assert_eq!(engine.list_expenses(GROUP).await.unwrap().len(), 1);
}

#[tokio::test]
async fn member_removal_needs_settled_balance() {
    let engine = group_with_members(&["alice", "bob"]).await;
    engine
        .create_expense(GROUP, expense("snacks", "alice", 3_00, &[("bob", 3_00)]))
        .await
        .unwrap();

    let err = engine.delete_member(GROUP, "bob", "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    let err = engine.delete_member(GROUP, "bob", "owner").await.unwrap_err();
    assert!(matches!(err, EngineError::NotSettled(_)));

    engine.settle_all(GROUP, "owner").await.unwrap();
    engine.delete_member(GROUP, "bob", "owner").await.unwrap();
    assert!(!engine.is_member(GROUP, "bob").await.unwrap());
    assert!(engine.get_balance(GROUP, "bob").await.unwrap().is_none());

    let err = engine.delete_member(GROUP, "bob", "owner").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("bob".to_string()));
}

#[tokio::test]
async fn readded_member_starts_from_zero() {
    let engine = group_with_members(&["alice", "bob"]).await;
    engine
        .create_expense(GROUP, expense("fuel", "alice", 8_00, &[("bob", 8_00)]))
        .await
        .unwrap();
    engine.settle_all(GROUP, "owner").await.unwrap();
    engine.delete_member(GROUP, "bob", "owner").await.unwrap();

    assert!(engine.upsert_member(GROUP, "bob").await.unwrap());
    let balance = engine.get_balance(GROUP, "bob").await.unwrap().unwrap();
    assert_eq!(balance.amount, Money::ZERO);
    assert_eq!(balance_sum(&engine).await, Money::ZERO);
}

#[tokio::test]
async fn remove_all_members_clears_members_and_balances() {
    let engine = group_with_members(&["alice", "bob", "carol"]).await;
    assert_eq!(engine.remove_all_members(GROUP, "owner").await.unwrap(), 3);
    assert!(engine.list_members(GROUP).await.unwrap().is_empty());
    assert!(engine.list_balances(GROUP).await.unwrap().is_empty());
}

#[tokio::test]
async fn owner_cannot_be_removed_by_other_admins() {
    let engine = group_with_members(&[]).await;
    engine.add_admin(GROUP, "alice", "owner").await.unwrap();
    engine.add_admin(GROUP, "bob", "alice").await.unwrap();

    let err = engine.add_admin(GROUP, "bob", "owner").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("bob".to_string()));

    let outcome = engine.remove_admin(GROUP, "owner", "alice").await.unwrap();
    assert_eq!(outcome, AdminRemoval::RequesterDemoted);
    assert!(!engine.is_admin(GROUP, "alice").await.unwrap());
    assert!(engine.is_admin(GROUP, "owner").await.unwrap());

    let outcome = engine.remove_admin(GROUP, "owner", "owner").await.unwrap();
    assert_eq!(outcome, AdminRemoval::OwnerProtected);

    let outcome = engine.remove_admin(GROUP, "bob", "owner").await.unwrap();
    assert_eq!(outcome, AdminRemoval::Removed);
    assert_eq!(engine.list_admins(GROUP).await.unwrap().len(), 1);

    let err = engine.remove_admin(GROUP, "carol", "owner").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn categories_are_unique_ignoring_case() {
    let engine = group_with_members(&["alice"]).await;
    assert_eq!(engine.create_category(GROUP, "Food").await.unwrap(), "Food");
    let err = engine.create_category(GROUP, "food").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("Food".to_string()));
    assert_eq!(
        engine.find_category(GROUP, "FOOD").await.unwrap().as_deref(),
        Some("Food")
    );
    assert!(matches!(
        engine.create_category(GROUP, "  ").await.unwrap_err(),
        EngineError::InvalidName(_)
    ));
}

#[tokio::test]
async fn spending_reports_follow_categories() {
    let engine = group_with_members(&["alice", "bob"]).await;
    engine.create_category(GROUP, "Food").await.unwrap();
    engine
        .create_expense(GROUP, expense("pizza", "alice", 20_00, &[("alice", 5_00), ("bob", 15_00)]))
        .await
        .unwrap();
    engine
        .create_expense(GROUP, expense("museum", "bob", 8_00, &[("bob", 8_00)]))
        .await
        .unwrap();
    assert_eq!(
        engine.categorize_expenses(GROUP, "food", "pizza").await.unwrap(),
        1
    );

    let report = engine
        .spending(GROUP, SpendingScope::All, SpendingScope::All)
        .await
        .unwrap();
    assert_eq!(
        report,
        SpendingReport::ByMember(vec![
            ("bob".to_string(), Money::new(23_00)),
            ("alice".to_string(), Money::new(5_00)),
        ])
    );

    let report = engine
        .spending(GROUP, SpendingScope::All, SpendingScope::One("bob".to_string()))
        .await
        .unwrap();
    assert_eq!(
        report,
        SpendingReport::ByCategory {
            member: "bob".to_string(),
            categories: vec![
                ("Food".to_string(), Money::new(15_00)),
                ("Others".to_string(), Money::new(8_00)),
            ],
            total: Money::new(23_00),
        }
    );

    let report = engine
        .spending(
            GROUP,
            SpendingScope::One("FOOD".to_string()),
            SpendingScope::One("alice".to_string()),
        )
        .await
        .unwrap();
    assert!(matches!(
        report,
        SpendingReport::Single { total: Some(total), .. } if total == Money::new(5_00)
    ));

    assert!(
        engine
            .spending(GROUP, SpendingScope::One("Food".to_string()), SpendingScope::All)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn export_rows_join_expenses_and_shares() {
    let engine = group_with_members(&["alice", "bob"]).await;
    let recorded = engine
        .create_expense(GROUP, expense("fuel", "alice", 60_00, &[("alice", 30_00), ("bob", 30_00)]))
        .await
        .unwrap();

    let rows = engine.export_rows(GROUP).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.expense_id == recorded.id && r.payer == "alice"));
    assert_eq!(rows[1].beneficiary, "bob");
    assert_eq!(rows[1].split_amount, Money::new(30_00));
    assert_eq!(rows[0].currency, "SGD");
}

#[tokio::test]
async fn delete_all_wipes_the_group() {
    let engine = group_with_members(&["alice", "bob"]).await;
    engine
        .create_expense(GROUP, expense("rent", "alice", 100_00, &[("bob", 100_00)]))
        .await
        .unwrap();

    assert!(matches!(
        engine.delete_group_data(GROUP, "alice").await.unwrap_err(),
        EngineError::Unauthorized(_)
    ));

    engine.delete_group_data(GROUP, "owner").await.unwrap();
    assert!(!engine.group_exists(GROUP).await.unwrap());
    assert!(engine.list_members(GROUP).await.unwrap().is_empty());
    assert!(engine.list_expenses(GROUP).await.unwrap().is_empty());
    assert!(engine.list_admins(GROUP).await.unwrap().is_empty());
}

#[tokio::test]
async fn groups_are_isolated() {
    let engine = group_with_members(&["alice"]).await;
    engine.start_group(7, "zed", "zed").await.unwrap();
    engine.upsert_member(7, "alice").await.unwrap();

    engine
        .create_expense(7, expense("x", "alice", 1_00, &[("alice", 1_00)]))
        .await
        .unwrap();
    assert!(engine.list_expenses(GROUP).await.unwrap().is_empty());
    assert!(!engine.is_admin(GROUP, "zed").await.unwrap());
}

#[tokio::test]
async fn single_row_balance_operations() {
    let engine = group_with_members(&["alice", "bob"]).await;

    engine.set_balance(GROUP, "alice", Money::new(3_00)).await.unwrap();
    let updated = engine
        .adjust_balance(GROUP, "alice", Money::new(-1_25))
        .await
        .unwrap();
    assert_eq!(updated, Money::new(1_75));
    assert!(matches!(
        engine.set_balance(GROUP, "zoe", Money::ZERO).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));

    let rescaled = engine
        .rescale_balances(GROUP, dec!(1), dec!(2))
        .await
        .unwrap();
    assert_eq!(rescaled[0].amount, Money::new(3_50));
}

#[tokio::test]
async fn delete_expense_reverses_its_shares() {
    let engine = group_with_members(&["alice", "bob"]).await;
    let first = engine
        .create_expense(GROUP, expense("tickets", "alice", 12_00, &[("bob", 12_00)]))
        .await
        .unwrap();
    engine
        .create_expense(GROUP, expense("water", "bob", 2_00, &[("alice", 2_00)]))
        .await
        .unwrap();

    let deleted = engine.delete_expense(GROUP, first.id).await.unwrap();
    assert_eq!(deleted.purpose, "tickets");
    assert_eq!(balance_of(&engine, "alice").await, Money::new(2_00));
    assert_eq!(balance_sum(&engine).await, Money::ZERO);
    assert!(matches!(
        engine.delete_expense(GROUP, first.id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn deleting_a_category_untags_expenses() {
    let engine = group_with_members(&["alice"]).await;
    engine.create_category(GROUP, "Travel").await.unwrap();
    engine
        .create_expense(GROUP, expense("train", "alice", 5_00, &[("alice", 5_00)]))
        .await
        .unwrap();
    engine.categorize_expenses(GROUP, "travel", "train").await.unwrap();

    engine.delete_category(GROUP, "TRAVEL").await.unwrap();
    assert!(engine.list_categories(GROUP).await.unwrap().is_empty());
    let expenses = engine.list_expenses(GROUP).await.unwrap();
    assert_eq!(expenses[0].category, None);
}

#[tokio::test]
async fn currency_setting_can_be_overwritten() {
    let engine = group_with_members(&["alice"]).await;
    let setting = CurrencySetting {
        base: "usd".parse().unwrap(),
        rate: dec!(0.74),
    };
    engine.set_currency_setting(GROUP, &setting).await.unwrap();
    assert_eq!(engine.currency_setting(GROUP).await.unwrap(), setting);

    let zero = CurrencySetting {
        rate: dec!(0),
        ..setting
    };
    assert!(matches!(
        engine.set_currency_setting(GROUP, &zero).await.unwrap_err(),
        EngineError::InvalidRate(_)
    ));
}
