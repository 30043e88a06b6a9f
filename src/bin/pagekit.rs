//! Binary entry point: serve the pagination API or run one-off store commands.
#![forbid(unsafe_code)]

use std::error::Error;
use std::io::IsTerminal;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nu_ansi_term::{Color, Style};
use pagekit::{
    config::AppConfig,
    data_generator::DataGenerator,
    logging::init_logging,
    seed::{SeedReport, Seeder},
    server::{self, AppState},
    CursorPage, CursorPaginator, OffsetPage, OffsetPaginator, Record, RecordStore, SqliteStore,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(
    name = "pagekit",
    version,
    about = "Cursor and offset pagination over a SQLite record table",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "PAGEKIT_CONFIG",
        value_name = "FILE",
        help = "Path to the TOML config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "PAGEKIT_DB",
        value_name = "DB",
        help = "Database file (overrides database.path)"
    )]
    db: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "PAGEKIT_LOG",
        value_name = "FILTER",
        help = "Log filter directive (overrides logging.level)"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for command results"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ServeCmd {
    #[arg(long, value_name = "HOST", help = "Bind address host")]
    host: Option<IpAddr>,

    #[arg(long, value_name = "PORT", help = "Bind port")]
    port: Option<u16>,

    #[arg(
        long,
        value_name = "COUNT",
        help = "Records to seed before serving (overrides seed.records)"
    )]
    seed: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Seed the store and serve the HTTP API")]
    Serve(ServeCmd),

    #[command(about = "Insert generated records in one transaction")]
    Seed {
        #[arg(long, value_name = "COUNT", help = "Number of records (defaults to seed.records)")]
        count: Option<usize>,

        #[arg(long, value_name = "SEED", help = "Deterministic generator seed")]
        rng_seed: Option<u64>,
    },

    #[command(about = "Print the number of stored records")]
    Count,

    #[command(about = "Fetch one page newest-first, below a cursor")]
    Cursor {
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        cursor: i64,

        #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
        limit: i64,
    },

    #[command(about = "Fetch one page oldest-first, by page number")]
    Offset {
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        page: i64,

        #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
        limit: i64,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct CountReport {
    records: u64,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.clone())?;
    if let Some(db) = cli.db.clone() {
        config.database.path = db;
    }
    if let Some(level) = cli.log_level.clone() {
        config.logging.level = level;
    }
    init_logging(&config.logging.level)?;

    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open(
        &config.database.path,
        &config.store_options(),
    )?);
    let cancel = CancellationToken::new();

    match cli.command {
        Command::Serve(cmd) => {
            if let Some(host) = cmd.host {
                config.server.host = host;
            }
            if let Some(port) = cmd.port {
                config.server.port = port;
            }
            let count = cmd.seed.unwrap_or(config.seed.records);
            Seeder::new(DataGenerator::new(), store.clone())
                .seed_blocking(count, cancel.clone())
                .await?;
            server::serve(config.listen_addr(), AppState::new(store)).await?;
        }
        Command::Seed { count, rng_seed } => {
            let generator = match rng_seed {
                Some(seed) => DataGenerator::with_seed(seed),
                None => DataGenerator::new(),
            };
            let mut seeder = Seeder::new(generator, store);
            let report = seeder.seed(count.unwrap_or(config.seed.records), &cancel)?;
            emit(cli.format, &report, || print_seed_text(&report))?;
        }
        Command::Count => {
            let report = CountReport {
                records: store.count(&cancel)?,
            };
            emit(cli.format, &report, || {
                println!("{} {}", heading("records:"), report.records)
            })?;
        }
        Command::Cursor { cursor, limit } => {
            let page = CursorPaginator::new(store).retrieve(cursor, limit, &cancel)?;
            emit(cli.format, &page, || print_cursor_text(&page))?;
        }
        Command::Offset { page, limit } => {
            let result = OffsetPaginator::new(store).retrieve(page, limit, &cancel)?;
            emit(cli.format, &result, || print_offset_text(&result))?;
        }
    }

    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn heading(text: &str) -> String {
    if std::io::stdout().is_terminal() {
        Style::new().fg(Color::Purple).bold().paint(text).to_string()
    } else {
        text.to_string()
    }
}

fn print_records(records: &[Record]) {
    for record in records {
        println!("  {:>8}  {} {}", record.id, record.name, record.surname);
    }
}

fn print_seed_text(report: &SeedReport) {
    println!(
        "{} {} records in {} ms",
        heading("seeded:"),
        report.inserted,
        report.elapsed.as_millis()
    );
}

fn print_cursor_text(page: &CursorPage) {
    println!("{} {} records", heading("page:"), page.users.len());
    print_records(&page.users);
    match page.next_cursor {
        Some(cursor) => println!("{} {cursor}", heading("next_cursor:")),
        None => println!("{} none", heading("next_cursor:")),
    }
}

fn print_offset_text(page: &OffsetPage) {
    let nav = &page.pagination;
    println!(
        "{} {}/{} (prev {}, next {})",
        heading("page:"),
        nav.current_page,
        nav.total_pages,
        nav.prev_page,
        nav.next_page
    );
    print_records(&page.users);
}
