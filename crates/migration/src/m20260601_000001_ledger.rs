//! Ledger schema.
//!
//! - `groups`: one row per chat, created by `/start`
//! - `members`: tracked participants of a group
//! - `admins`: users allowed to run destructive commands, one flagged owner
//! - `balances`: running balance per member, in cents
//! - `expenses`: recorded expenses, in cents of the group currency
//! - `expense_shares`: per-beneficiary split of an expense
//! - `categories`: labels attached to expenses
//! - `currency_settings`: base currency and rate of a group

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Members {
    Table,
    GroupId,
    Username,
}

#[derive(Iden)]
enum Admins {
    Table,
    GroupId,
    Username,
    IsOwner,
}

#[derive(Iden)]
enum Balances {
    Table,
    GroupId,
    Username,
    Balance,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    GroupId,
    Purpose,
    Payer,
    Amount,
    Currency,
    Category,
    CreatedAt,
}

#[derive(Iden)]
enum ExpenseShares {
    Table,
    Id,
    ExpenseId,
    GroupId,
    Username,
    SplitAmount,
}

#[derive(Iden)]
enum Categories {
    Table,
    GroupId,
    NameNorm,
    Name,
}

#[derive(Iden)]
enum CurrencySettings {
    Table,
    GroupId,
    BaseCurrency,
    Rate,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Groups::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Groups::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Groups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(Members::Username).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(Members::GroupId)
                            .col(Members::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-members-group_id")
                            .from(Members::Table, Members::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Admins::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Admins::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(Admins::Username).string().not_null())
                    .col(
                        ColumnDef::new(Admins::IsOwner)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(Index::create().col(Admins::GroupId).col(Admins::Username))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-admins-group_id")
                            .from(Admins::Table, Admins::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Balances::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Balances::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(Balances::Username).string().not_null())
                    .col(
                        ColumnDef::new(Balances::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(Balances::GroupId)
                            .col(Balances::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balances-group_id")
                            .from(Balances::Table, Balances::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Purpose).string().not_null())
                    .col(ColumnDef::new(Expenses::Payer).string().not_null())
                    .col(ColumnDef::new(Expenses::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Expenses::Currency)
                            .string()
                            .not_null()
                            .default("SGD"),
                    )
                    .col(ColumnDef::new(Expenses::Category).string())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-group_id")
                            .from(Expenses::Table, Expenses::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id-created_at")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseShares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseShares::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExpenseShares::ExpenseId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseShares::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(ExpenseShares::Username).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseShares::SplitAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_shares-expense_id")
                            .from(ExpenseShares::Table, ExpenseShares::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_shares-expense_id")
                    .table(ExpenseShares::Table)
                    .col(ExpenseShares::ExpenseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_shares-group_id-username")
                    .table(ExpenseShares::Table)
                    .col(ExpenseShares::GroupId)
                    .col(ExpenseShares::Username)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Categories::GroupId).big_integer().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(Categories::GroupId)
                            .col(Categories::NameNorm),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-group_id")
                            .from(Categories::Table, Categories::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CurrencySettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CurrencySettings::GroupId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CurrencySettings::BaseCurrency)
                            .string()
                            .not_null()
                            .default("SGD"),
                    )
                    .col(
                        ColumnDef::new(CurrencySettings::Rate)
                            .string()
                            .not_null()
                            .default("1"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-currency_settings-group_id")
                            .from(CurrencySettings::Table, CurrencySettings::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Children first.
        manager
            .drop_table(Table::drop().table(CurrencySettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Balances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Admins::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        Ok(())
    }
}
