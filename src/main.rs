mod extract;
mod fetch;
mod pipeline;
mod record;
mod store;
mod sync;

use std::time::Instant;

use clap::{Parser, Subcommand};

use store::SqliteStore;

#[derive(Parser)]
#[command(name = "sismo_scraper", about = "IGP seismic-report table scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the source table and replace the store with it
    Run {
        /// Source page to scrape (default: IGP reported quakes)
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Print stored records
    Show {
        /// Max records to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { url } => {
            let store = SqliteStore::open(store::DB_PATH)?;
            let url = url.as_deref().unwrap_or(fetch::SOURCE_URL);
            let outcome = pipeline::run(&store, url).await;
            let response = pipeline::respond(outcome);
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
        Commands::Show { limit } => {
            let store = SqliteStore::open(store::DB_PATH)?;
            let records = store.fetch_all(Some(limit))?;
            if records.is_empty() {
                println!("Store is empty. Run 'run' first.");
                return Ok(());
            }

            println!("{:>3} | {:<36} | {}", "#", "id", "fields");
            println!("{}", "-".repeat(100));
            for (i, r) in records.iter().enumerate() {
                let fields = r
                    .fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{:>3} | {:<36} | {}", i + 1, r.id, truncate(&fields, 120));
            }
            println!("\n{} records", records.len());
            Ok(())
        }
        Commands::Stats => {
            let store = SqliteStore::open(store::DB_PATH)?;
            let s = store.stats()?;
            println!("Records:     {}", s.records);
            println!("Last synced: {}", s.last_synced.as_deref().unwrap_or("never"));
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
