use std::process::ExitCode;

use anyhow::{Context, anyhow};
use chrono::Local;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use ats_mileage::{Config, exit_status, init_logging, summary_json, summary_lines};
use mileage_client::{SmtpNotifier, SoapClient, XmlRecordExtractor};
use mileage_core::{SyncService, TracingReporter, yesterday_of};
use mileage_db::MileageRepository;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();

    let config = Config::parse();
    init_logging(config.verbose, config.log_file.as_deref())?;

    // The pool connects on first use so an unreachable database is reported
    // as a failed run instead of a startup error.
    let db_config = config.db_config();
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .acquire_timeout(db_config.acquire_timeout)
        .connect_lazy(&config.database_url)
        .context("Invalid DATABASE_URL")?;
    let repo = MileageRepository::new(pool);

    if config.init_schema {
        info!("Creating arac_km_log schema...");
        repo.ensure_schema()
            .await
            .map_err(|e| anyhow!(e.user_message()))
            .context("Failed to create arac_km_log schema")?;
    }

    let soap = SoapClient::new(config.soap_config()).map_err(|e| anyhow!(e.user_message()))?;
    if config.mail_settings_incomplete() {
        warn!(
            "Mail notification disabled: SMTP_USER, SMTP_PASSWORD, MAIL_FROM and MAIL_TO must all be set (or set MAIL_ENABLED)"
        );
    }
    let notifier = SmtpNotifier::new(config.smtp_config());
    if !notifier.is_enabled() {
        info!("Mail notification disabled");
    }

    let service = SyncService::with_config(
        soap,
        XmlRecordExtractor::default(),
        repo,
        notifier,
        config.sync_config(),
    );

    let date = config
        .date
        .unwrap_or_else(|| yesterday_of(Local::now().date_naive()));
    let run = service
        .run_for_date_with_progress(date, &TracingReporter)
        .await;

    if config.json {
        println!("{}", summary_json(&run)?);
    } else {
        for line in summary_lines(&run) {
            info!("{}", line);
        }
    }

    Ok(ExitCode::from(exit_status(&run)))
}
