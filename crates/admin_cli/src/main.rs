use std::{error::Error, fs::File, io, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use engine::Engine;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "expensplit_admin")]
#[command(about = "Admin utilities for expensplit (inspect and export group ledgers)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./expensplit.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a group's balances.
    Balances(GroupArgs),
    /// Write a group's expense shares as CSV.
    Export(ExportArgs),
    /// Owner and admins of a group.
    Admins(GroupArgs),
    /// Add an admin without going through the chat.
    Promote(PromoteArgs),
}

#[derive(Args, Debug)]
struct GroupArgs {
    /// Telegram chat id of the group.
    #[arg(long, allow_hyphen_values = true)]
    group: i64,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    group: GroupArgs,
    /// Output file, stdout when missing.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PromoteArgs {
    #[command(flatten)]
    group: GroupArgs,
    #[arg(long)]
    username: String,
    /// Existing admin granting the rights.
    #[arg(long = "as")]
    requester: String,
}

async fn connect_db(database_url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Balances(GroupArgs { group }) => {
            require_group(&engine, group).await?;
            let currency = engine.currency_setting(group).await?.base;
            for balance in engine.list_balances(group).await? {
                println!(
                    "{}\t{} {}\t{}",
                    balance.username,
                    balance.amount,
                    currency,
                    balance.status()
                );
            }
        }
        Command::Export(args) => {
            let group = args.group.group;
            require_group(&engine, group).await?;
            let rows = engine.export_rows(group).await?;
            let count = rows.len();
            match args.output {
                Some(path) => write_rows(csv::Writer::from_writer(File::create(&path)?), rows)?,
                None => write_rows(csv::Writer::from_writer(io::stdout()), rows)?,
            }
            eprintln!("exported {count} rows");
        }
        Command::Admins(GroupArgs { group }) => {
            require_group(&engine, group).await?;
            for admin in engine.list_admins(group).await? {
                if admin.is_owner {
                    println!("{} (owner)", admin.username);
                } else {
                    println!("{}", admin.username);
                }
            }
        }
        Command::Promote(args) => {
            let group = args.group.group;
            require_group(&engine, group).await?;
            engine
                .add_admin(group, &args.username, &args.requester)
                .await?;
            println!("{} is now an admin of {group}", args.username);
        }
    }

    Ok(())
}

async fn require_group(engine: &Engine, group: i64) -> Result<(), Box<dyn Error + Send + Sync>> {
    if !engine.group_exists(group).await? {
        return Err(format!("unknown group: {group}").into());
    }
    Ok(())
}

fn write_rows<W: io::Write>(
    mut writer: csv::Writer<W>,
    rows: Vec<engine::ExportRow>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
