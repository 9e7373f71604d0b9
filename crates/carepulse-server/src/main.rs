use anyhow::Context;
use chrono::{Days, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use carepulse_core::{AdherenceExporter, Database, DoseTracker};
use carepulse_server::sweeper::spawn_sweeper;
use carepulse_server::config::{DEFAULT_EXPAND_DAYS, MAX_EXPAND_DAYS};
use carepulse_server::{api_router, ApiContext, Config, ServeArgs};

#[derive(Parser)]
#[command(name = "carepulse", version, about = "CarePulse remote patient monitoring back-office")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Apply pending schema migrations and list the applied ones
    Migrate,
    /// Mark overdue pending doses as missed
    Sweep,
    /// Create pending dose slots for active sessions
    Expand {
        /// Days ahead of today to cover
        #[arg(
            long,
            default_value_t = DEFAULT_EXPAND_DAYS,
            value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_EXPAND_DAYS))
        )]
        days: u32,
    },
    /// Print an adherence report
    Report {
        /// Restrict to one patient
        #[arg(long)]
        patient_id: Option<String>,
        /// First scheduled date (default: 29 days before --to)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last scheduled date (default: today in the reference zone)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.config.log)),
        )
        .init();

    let zone = cli.config.reference_zone()?;
    let db = Database::open(&cli.config.database)
        .with_context(|| format!("opening {}", cli.config.database.display()))?;

    match cli.command {
        Commands::Serve(args) => {
            let serve_args = args.clone();
            let completer = tokio::task::spawn_blocking(move || serve_args.completer()).await??;
            let ctx = ApiContext::new(db, zone, completer);

            let sweeper = args.sweep_interval().map(|period| {
                tracing::info!(period_secs = period.as_secs(), "Missed-dose sweeper enabled");
                spawn_sweeper(ctx.clone(), period)
            });

            let listener = tokio::net::TcpListener::bind(args.bind)
                .await
                .with_context(|| format!("binding {}", args.bind))?;
            tracing::info!(
                addr = %args.bind,
                version = env!("CARGO_PKG_VERSION"),
                utc_offset_minutes = cli.config.utc_offset_minutes,
                "CarePulse API listening"
            );

            axum::serve(listener, api_router(ctx))
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if let Some(handle) = sweeper {
                handle.abort();
            }
            tracing::info!("CarePulse API stopped");
        }
        Commands::Migrate => {
            for migration in db.applied_migrations()? {
                println!(
                    "{:>4}  {:<32}  {}  {}",
                    migration.version,
                    migration.name,
                    &migration.checksum[..12.min(migration.checksum.len())],
                    migration.applied_at.to_rfc3339()
                );
            }
            println!("schema version {}", db.schema_version()?);
        }
        Commands::Sweep => {
            let count = DoseTracker::new(&db, zone).sweep_missed(Utc::now())?;
            println!("{} dose(s) marked missed", count);
        }
        Commands::Expand { days } => {
            let through = Utc::now()
                .with_timezone(&zone)
                .date_naive()
                .checked_add_days(Days::new(u64::from(days)))
                .with_context(|| format!("{} days ahead is out of range", days))?;
            let created = DoseTracker::new(&db, zone).expand_all(through)?;
            println!("{} dose slot(s) created through {}", created, through);
        }
        Commands::Report {
            patient_id,
            from,
            to,
            format,
        } => {
            let to = to.unwrap_or_else(|| Utc::now().with_timezone(&zone).date_naive());
            let from = from.unwrap_or(to - Duration::days(29));
            anyhow::ensure!(from <= to, "--from {} is after --to {}", from, to);

            DoseTracker::new(&db, zone).sweep_missed(Utc::now())?;
            let report = AdherenceExporter::new(&db).export(patient_id.as_deref(), from, to)?;
            match format {
                ReportFormat::Json => println!("{}", report.to_json()?),
                ReportFormat::Csv => print!("{}", report.to_csv()),
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_days_are_bounded() {
        let cli = Cli::try_parse_from(["carepulse", "expand", "--days", "30"]).unwrap();
        assert!(matches!(cli.command, Commands::Expand { days: 30 }));

        let cli = Cli::try_parse_from(["carepulse", "expand"]).unwrap();
        assert!(matches!(cli.command, Commands::Expand { days } if days == DEFAULT_EXPAND_DAYS));

        assert!(Cli::try_parse_from(["carepulse", "expand", "--days", "367"]).is_err());
        assert!(Cli::try_parse_from(["carepulse", "expand", "--days", "4294967295"]).is_err());
    }
}
