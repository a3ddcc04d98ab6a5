//! CarePortal
//!
//! Main entry point for the CarePortal clinic service.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context};
use careportal::clinic::requests::SlotQuery;
use careportal::config::{self, Config};
use careportal::core::access::{dashboard_path, navigation};
use careportal::core::clock::SystemClock;
use careportal::models::Role;
use careportal::{api, ClinicService};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "careportal", version, about = "Clinic appointments, encounters, pharmacy and lab")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print the sidebar routes of a role
    Routes {
        #[arg(long)]
        role: Role,
    },
    /// Print a demo doctor's slots for a day
    Slots {
        #[arg(long)]
        doctor_email: String,
        #[arg(long)]
        date: NaiveDate,
    },
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;
    init_tracing(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Routes { role } => {
            println!("{} (dashboard {})", role, dashboard_path(role));
            for item in navigation(role) {
                println!("  {:<18} {}", item.label, item.path);
            }
            Ok(())
        }
        Command::Slots { doctor_email, date } => {
            let mut config = config;
            config.portal.seed_demo_data = true;
            let service = ClinicService::bootstrap(&config, Arc::new(SystemClock))?;
            let doctor = service
                .db()
                .user_by_email(&doctor_email)
                .filter(|user| user.role == Role::Doctor)
                .ok_or_else(|| anyhow!("no demo doctor with email {}", doctor_email))?;
            for slot in service.doctor_slots(doctor.id, SlotQuery { date })? {
                println!(
                    "{}-{}  {}",
                    slot.start.format("%H:%M"),
                    slot.end.format("%H:%M"),
                    if slot.available { "available" } else { "taken" }
                );
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let service = ClinicService::bootstrap(&config, Arc::new(SystemClock))?;
    let state = web::Data::new(service);
    let bind = (config.server.host.clone(), config.server.port);
    info!(host = %bind.0, port = bind.1, latency_ms = config.portal.simulated_latency_ms, "starting CarePortal");

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .configure(api::configure)
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }
    server
        .bind(bind)
        .context("failed to bind HTTP listener")?
        .run()
        .await
        .context("HTTP server stopped with an error")
}
