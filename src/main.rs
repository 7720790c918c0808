mod balance;
mod cards;
mod cli;
mod db;
mod error;
mod feed;
mod fmt;
mod models;
mod reports;
mod settings;
mod tags;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{
    CardsCommands, Cli, Commands, DepositsCommands, ExportCommands, ReportCommands, TagsCommands,
    WithdrawalsCommands,
};

/// Log to stderr; `RUST_LOG` overrides the default of warnings only.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cardbook=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Status => cli::status::run(),
        Commands::Dashboard => cli::report::dashboard(),
        Commands::Cards { command } => match command {
            CardsCommands::Add {
                bank_name,
                card_number,
            } => cli::cards::add(&bank_name, &card_number),
            CardsCommands::List => cli::cards::list(),
            CardsCommands::Edit {
                id,
                bank_name,
                card_number,
            } => cli::cards::edit(id, bank_name.as_deref(), card_number.as_deref()),
            CardsCommands::Delete { id } => cli::cards::delete(id),
            CardsCommands::Verify => cli::cards::verify(),
        },
        Commands::Tags { command } => match command {
            TagsCommands::Add { name, color } => cli::tags::add(&name, color.as_deref()),
            TagsCommands::List => cli::tags::list(),
            TagsCommands::Edit { id, name, color } => {
                cli::tags::edit(id, name.as_deref(), color.as_deref())
            }
            TagsCommands::Delete { id } => cli::tags::delete(id),
        },
        Commands::Deposits { command } => match command {
            DepositsCommands::Add {
                amount,
                card,
                purpose,
                depositor,
                date,
                tag,
            } => cli::deposits::add(amount, card, &purpose, &depositor, date, tag),
            DepositsCommands::Show { id } => cli::deposits::show(id),
            DepositsCommands::Edit {
                id,
                purpose,
                depositor,
                date,
                tag,
                clear_tag,
            } => cli::deposits::edit(id, purpose, depositor, date, tag, clear_tag),
            DepositsCommands::Delete { id } => cli::deposits::delete(id),
        },
        Commands::Withdrawals { command } => match command {
            WithdrawalsCommands::Add {
                amount,
                card,
                purpose,
                date,
                tag,
            } => cli::withdrawals::add(amount, card, &purpose, date, tag),
            WithdrawalsCommands::Show { id } => cli::withdrawals::show(id),
            WithdrawalsCommands::Edit {
                id,
                purpose,
                date,
                tag,
                clear_tag,
            } => cli::withdrawals::edit(id, purpose, date, tag, clear_tag),
            WithdrawalsCommands::Delete { id } => cli::withdrawals::delete(id),
        },
        Commands::Transactions { filter, page } => cli::transactions::run(&filter, page.as_deref()),
        Commands::Report { command } => match command {
            ReportCommands::Tags => cli::report::tags(),
        },
        Commands::Export { command } => match command {
            ExportCommands::Transactions { filter, output } => {
                cli::export::transactions(&filter, output)
            }
        },
        Commands::Backup { output } => cli::backup::run(output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
