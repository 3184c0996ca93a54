//! Packet pool command-line interface
//!
//! This CLI provides tools for:
//! - Inspecting the effective pool configuration
//! - Simulating seeded traffic through the pool and MAC selection queries
//! - Emitting a status snapshot as JSON

mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshpool_core::{
    report_status, Address, Component, PacketPool, PoolConfig, PoolSnapshot, StatusSink, SyncFlag,
    DEFAULT_CAPACITY,
};
use simulate::{SimParams, SimReport, Simulation};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "meshpool")]
#[command(author, version, about = "Mesh node packet pool CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective pool configuration as JSON
    Config {
        /// Pool configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run seeded random traffic through a pool
    Simulate {
        /// Number of MAC slots to simulate
        #[arg(long, default_value = "1000")]
        steps: u64,

        /// Random seed
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Slots before the node synchronizes
        #[arg(long, default_value = "0")]
        unsync_steps: u64,

        /// Pool configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a short fixed scenario and emit the pool status as JSON
    Status {
        /// Pool configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<PoolConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<PoolConfig>(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => PoolConfig::default(),
    };
    config
        .validate(DEFAULT_CAPACITY)
        .context("Invalid pool configuration")?;
    Ok(config)
}

fn cmd_config(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_simulate(
    steps: u64,
    seed: u64,
    unsync_steps: u64,
    config: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let params = SimParams {
        steps,
        seed,
        unsync_steps,
    };
    let report = Simulation::new(config, params)?.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimReport) {
    let stats = &report.stats;

    println!("=== Packet Pool Simulation ===");
    println!();
    println!("Steps: {}", report.steps);
    println!("Seed:  {}", report.seed);
    println!();
    println!("Acquired:             {}", stats.acquired);
    println!("Released:             {}", stats.released);
    println!("Refused (unsynced):   {}", stats.refused_unsynchronized);
    println!("Refused (quota):      {}", stats.refused_quota);
    println!("Refused (exhausted):  {}", stats.refused_exhausted);
    println!("Peak occupancy:       {}", stats.peak_occupancy);
    println!();
    println!("Sent control frames:  {}", stats.sent_control);
    println!("Sent beacons:         {}", stats.sent_beacon);
    println!("Sent data frames:     {}", stats.sent_data);
    println!("Idle slots:           {}", stats.idle_slots);
    println!("Received frames:      {}", stats.received);
    println!();
    print_snapshot(&report.snapshot);
}

fn print_snapshot(snapshot: &PoolSnapshot) {
    println!("Final pool state ({}/{} in use):", snapshot.occupancy(), snapshot.slots.len());
    println!("{:<6} {:<14} {:<14}", "Slot", "Creator", "Owner");
    println!("{}", "-".repeat(34));
    for (slot, status) in snapshot.slots.iter().enumerate() {
        if status.is_free() {
            println!("{:<6} {:<14} {:<14}", slot, "-", "free");
        } else {
            println!("{:<6} {:<14} {:<14}", slot, status.creator, status.owner);
        }
    }
}

/// Writes each snapshot as one JSON document
struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> StatusSink for JsonSink<W> {
    type Error = anyhow::Error;

    fn emit(&mut self, snapshot: &PoolSnapshot) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, snapshot)
            .context("Failed to serialize status snapshot")?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn cmd_status(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let pool: PacketPool = PacketPool::new(config, Arc::new(SyncFlag::synchronized()))?;
    let neighbor = Address::long_from_u64(0x0012_4b00_0614_2a01);

    // One queued data frame, one beacon, one reception in flight
    let data = pool
        .acquire(Component::Udp)
        .context("Pool refused the data frame")?;
    pool.modify(data, Component::Udp, |r| r.l2.next_or_previous_hop = neighbor)?;
    pool.hand_off(data, Component::Udp, Component::ToMac)?;

    let beacon = pool
        .acquire(Component::Reservation)
        .context("Pool refused the beacon")?;
    pool.modify(beacon, Component::Reservation, |r| {
        r.l2.next_or_previous_hop = Address::BROADCAST_LONG
    })?;
    pool.hand_off(beacon, Component::Reservation, Component::ToMac)?;

    let rx = pool
        .acquire(Component::Tsch)
        .context("Pool refused the reception buffer")?;
    pool.hand_off(rx, Component::Tsch, Component::FromMac)?;

    info!(occupancy = pool.occupancy(), "scenario ready");

    let stdout = std::io::stdout();
    let mut sink = JsonSink {
        writer: stdout.lock(),
    };
    report_status(&pool, &mut sink)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config { config } => cmd_config(config),

        Commands::Simulate {
            steps,
            seed,
            unsync_steps,
            config,
            json,
        } => cmd_simulate(steps, seed, unsync_steps, config, json),

        Commands::Status { config } => cmd_status(config),
    }
}
