//! # edi-sync
//!
//! Synchronizes purchase orders with a trading partner: acknowledges
//! inbound 850s with 997s through the partner mailbox and stores new orders
//! from the Selling Partner API.
//!
//! Exit codes: `0` clean run, `1` fatal error, `2` the cycle finished but
//! some inbound documents were skipped or the order feed was cut short at
//! the page limit.

mod config;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use edi_adapter_mailbox::DirectoryMailbox;
use edi_adapter_sftp::SftpMailbox;
use edi_adapter_spapi::SpApiClient;
use edi_adapter_x12::{AcknowledgmentBuilder, extract};
use edi_pipeline::inventory::{build_flat_cost_inventory, read_inventory_csv};
use edi_pipeline::{Checkpoint, Mailbox, TransferOrchestrator, Verbosity};
use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_CONFIG_PATH};

const EXIT_FATAL: u8 = 1;
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser)]
#[command(name = "edi-sync")]
#[command(about = "Purchase order synchronization with a trading partner")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Partial configuration applied on top of --config
    #[arg(long = "override", global = true)]
    override_config: Option<PathBuf>,

    /// Log full remote payloads
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute (defaults to run)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one synchronization cycle
    Run,

    /// Render the 997 acknowledgment for a local 850 file
    Ack {
        /// Input file path
        input: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Acknowledge as this sender instead of edi.senderId
        #[arg(long)]
        sender_id: Option<String>,

        /// Address this partner instead of edi.partnerId
        #[arg(long)]
        partner_id: Option<String>,
    },

    /// Print the stored order watermark
    Checkpoint {
        /// Overwrite the watermark first
        #[arg(long)]
        set: Option<String>,
    },

    /// Build the cost/inventory feed and put it to the outbound mailbox
    InventoryFeed {
        /// CSV with sku,cost,qty columns
        items: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // stderr keeps stdout clean for `ack`
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let verbosity = Verbosity::from_flag(cli.verbose);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = load_config(&cli.config, cli.override_config.as_deref())?;
            run_cycle(&config, verbosity)
        }
        Commands::Ack {
            input,
            output,
            sender_id,
            partner_id,
        } => {
            // Flags alone are enough; the config file is only read for what they leave out
            let config = match sender_id {
                Some(_) if !cli.config.exists() => None,
                _ => Some(load_config(&cli.config, cli.override_config.as_deref())?),
            };
            let sender_id = match (sender_id, &config) {
                (Some(id), _) => id,
                (None, Some(config)) => {
                    config.validate_edi()?;
                    config.edi.sender_id.clone()
                }
                (None, None) => anyhow::bail!("--sender-id or edi.senderId is required"),
            };
            let partner_id = partner_id
                .or_else(|| config.map(|c| c.edi.partner_id))
                .unwrap_or_else(|| edi_adapter_x12::acknowledgment::DEFAULT_PARTNER_ID.to_string());

            acknowledge_file(&input, output.as_deref(), &sender_id, &partner_id)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Checkpoint { set } => {
            let config = load_config(&cli.config, cli.override_config.as_deref())?;
            let checkpoint = Checkpoint::new(config.storage_dir());
            if let Some(value) = set {
                checkpoint.save(&value)?;
                info!(watermark = %value, "Checkpoint overwritten");
            }
            println!("{}", checkpoint.load()?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::InventoryFeed { items } => {
            let config = load_config(&cli.config, cli.override_config.as_deref())?;
            config.validate_edi()?;
            put_inventory_feed(&config, &items)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: &Path, override_path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(override_path) = override_path {
        config.apply_override_file(override_path)?;
    }
    Ok(config)
}

fn run_cycle(config: &Config, verbosity: Verbosity) -> anyhow::Result<ExitCode> {
    config.validate()?;

    let cycle = config.cycle_config(verbosity);
    let mut orchestrator = TransferOrchestrator::new(cycle);
    if config.edi.active {
        orchestrator = orchestrator.with_mailbox(open_mailbox(config)?);
    }
    if config.api.active {
        let client = SpApiClient::new(config.sp_api_config(verbosity))?;
        orchestrator = orchestrator.with_order_feed(client);
    }

    let report = orchestrator.run_cycle()?;

    if let Some(inbound) = &report.inbound {
        for skipped in &inbound.skipped {
            warn!(document = %skipped.name, reason = %skipped.reason, "Not acknowledged");
        }
    }
    if let Some(orders) = &report.orders {
        info!(
            fetched = orders.fetched,
            stored = orders.stored.len(),
            watermark = %orders.watermark,
            "Order feed synchronized"
        );
        if orders.truncated {
            warn!(
                max_pages = config.api.max_pages,
                "Order feed longer than api.maxPages; checkpoint not advanced"
            );
        }
    }

    if report.is_clean() {
        info!("Cycle completed");
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Cycle completed with skipped documents or a truncated order feed");
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}

/// SFTP when `edi.host` is set, local directories otherwise
fn open_mailbox(config: &Config) -> anyhow::Result<Box<dyn Mailbox>> {
    if config.uses_sftp() {
        let mailbox = SftpMailbox::connect(config.sftp_config())
            .with_context(|| format!("cannot open mailbox on {}", config.edi.host))?;
        Ok(Box::new(mailbox))
    } else {
        Ok(Box::new(DirectoryMailbox::new(
            &config.edi.inbound_dir,
            &config.edi.outbound_dir,
        )))
    }
}

fn acknowledge_file(
    input: &Path,
    output: Option<&Path>,
    sender_id: &str,
    partner_id: &str,
) -> anyhow::Result<()> {
    let content =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let ids = extract(&content).with_context(|| format!("cannot acknowledge {}", input.display()))?;

    let rendered = AcknowledgmentBuilder::new(sender_id)
        .with_partner_id(partner_id)
        .build(&ids, Utc::now().naive_utc())
        .render();

    match output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(output = %path.display(), "Wrote acknowledgment");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn put_inventory_feed(config: &Config, items_path: &Path) -> anyhow::Result<()> {
    let items = read_inventory_csv(items_path)?;
    let feed = build_flat_cost_inventory(&items, &config.edi.sender_id, Utc::now().naive_utc());

    let mailbox = open_mailbox(config)?;
    mailbox.put_outbound(&feed.file_name, &feed.content)?;
    info!(file = %feed.file_name, items = items.len(), "Put cost/inventory feed");
    println!("{}", feed.file_name);
    Ok(())
}
