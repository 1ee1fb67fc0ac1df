//! mdmq operator tool
//!
//! Manages the command queue and device registry in an mdmq database.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use mdmq_core::config::{self, Config};
use mdmq_core::db::unix_timestamp;
use mdmq_server::protocol::{NewCommand, RequestType};
use mdmq_server::storage::MdmDatabase;
use mdmq_server::AckDispatcher;

#[derive(Parser, Debug)]
#[command(name = "mdmq")]
#[command(version, about = "mdmq - MDM command queue operator tool")]
struct Args {
    /// Path to a JSON settings file.
    #[arg(long, env = "MDMQ_CONFIG")]
    config: Option<PathBuf>,

    /// Path to SQLite database file (overrides the settings file).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// OTLP collector endpoint for traces and metrics.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "MDMQ_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an enrolled device.
    Enroll {
        #[arg(long)]
        udid: String,
        #[arg(long)]
        serial: Option<String>,
        /// Device is mid-setup and expects DeviceConfigured once drained.
        #[arg(long)]
        awaiting_configuration: bool,
    },
    /// Queue a command for a device.
    Enqueue {
        #[arg(long)]
        udid: String,
        /// Protocol request type, e.g. DeviceInformation.
        #[arg(long)]
        request_type: String,
    },
    /// List a device's pending commands in delivery order.
    Pending {
        #[arg(long)]
        udid: String,
    },
    /// Set or clear a device's awaiting-configuration flag.
    Configure {
        #[arg(long)]
        udid: String,
        #[arg(long, action = clap::ArgAction::Set)]
        awaiting: bool,
    },
    /// Delete metadata of commands resolved longer ago than the retention.
    Prune,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(path) = &args.db_path {
        config.storage.database_path = Some(path.clone());
    }

    let filter = mdmq_core::tracing_init::default_filter("mdmq_server", &config.log_level);
    let telemetry = init_telemetry(&args, &filter)?;

    let db = open_database(&config).await?;
    run(args.command, &db, &config).await?;

    shutdown_telemetry(telemetry)
}

#[cfg(feature = "metrics")]
type Telemetry = Option<mdmq_core::metrics::MetricsGuard>;
#[cfg(not(feature = "metrics"))]
type Telemetry = ();

#[cfg(feature = "metrics")]
fn init_telemetry(args: &Args, filter: &str) -> anyhow::Result<Telemetry> {
    match &args.otlp_endpoint {
        Some(endpoint) => Ok(Some(mdmq_core::metrics::init_tracing_with_otlp(
            filter,
            args.log_json,
            endpoint,
        )?)),
        None => {
            mdmq_core::tracing_init::init_tracing(filter, args.log_json);
            Ok(None)
        }
    }
}

#[cfg(not(feature = "metrics"))]
#[allow(clippy::unnecessary_wraps)]
fn init_telemetry(args: &Args, filter: &str) -> anyhow::Result<Telemetry> {
    mdmq_core::tracing_init::init_tracing(filter, args.log_json);
    Ok(())
}

#[cfg(feature = "metrics")]
fn shutdown_telemetry(telemetry: Telemetry) -> anyhow::Result<()> {
    if let Some(guard) = telemetry {
        guard.shutdown()?;
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
#[allow(clippy::unnecessary_wraps)]
fn shutdown_telemetry((): Telemetry) -> anyhow::Result<()> {
    Ok(())
}

async fn open_database(config: &Config) -> anyhow::Result<MdmDatabase> {
    let path = match &config.storage.database_path {
        Some(path) => path.clone(),
        None => config::database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine default database path"))?,
    };
    info!(path = %path.display(), "Opening mdmq database");
    Ok(MdmDatabase::open(&path, &config.storage).await?)
}

#[allow(clippy::print_stdout)]
async fn run(command: Command, db: &MdmDatabase, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Enroll {
            udid,
            serial,
            awaiting_configuration,
        } => {
            let device = db
                .enroll_device(&udid, serial.as_deref(), awaiting_configuration)
                .await?;
            println!("{}", device.uuid);
        }
        Command::Enqueue { udid, request_type } => {
            let dispatcher = AckDispatcher::from_database(db);
            let command = NewCommand::new(udid, RequestType::from(request_type))?;
            let id = dispatcher.enqueue(&command).await?;
            println!("{id}");
        }
        Command::Pending { udid } => {
            for command in db.pending_commands(&udid).await? {
                println!(
                    "{}\t{}\t{}",
                    command.command_uuid, command.request_type, command.created_at
                );
            }
        }
        Command::Configure { udid, awaiting } => {
            if !db.set_awaiting_configuration(&udid, awaiting).await? {
                anyhow::bail!("No device with udid {udid}");
            }
            info!(udid = %udid, awaiting, "Awaiting-configuration flag updated");
        }
        Command::Prune => {
            let cutoff = unix_timestamp() - config.queue.command_retention_secs;
            let removed = db.prune_resolved_commands(cutoff).await?;
            info!(removed, cutoff, "Pruned resolved command metadata");
            println!("{removed}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_enqueue() {
        let args = Args::try_parse_from([
            "mdmq",
            "--db-path",
            "/tmp/mdmq.db",
            "enqueue",
            "--udid",
            "udid-1",
            "--request-type",
            "DeviceInformation",
        ]);
        assert!(args.is_ok());
    }

    #[test]
    fn configure_requires_explicit_value() {
        assert!(
            Args::try_parse_from(["mdmq", "configure", "--udid", "u", "--awaiting", "false"])
                .is_ok()
        );
        assert!(Args::try_parse_from(["mdmq", "configure", "--udid", "u"]).is_err());
    }
}
