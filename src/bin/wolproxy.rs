use wolproxy::probe;
use wolproxy::proxy::{Inventory, Route, Subnet};
use wolproxy::sweep;
use wolproxy::wol;

use clap::{Parser, Subcommand};
use log::{error, info};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a magic packet to a broadcast address or a proxy.
    Wake {
        /// Target MAC address, in xx:xx:xx:xx:xx:xx or xx-xx-xx-xx-xx-xx form.
        #[arg(long)]
        mac: String,

        /// Destination address. Use a proxy address to relay onto its subnet.
        #[arg(long, default_value_t = wol::BROADCAST_ADDR.to_string())]
        to: String,

        /// Send to the directed broadcast address of this subnet instead.
        #[arg(long, conflicts_with = "to")]
        subnet: Option<Subnet>,

        #[arg(long, default_value_t = wol::DEFAULT_PORT)]
        port: u16,
    },
    /// Wake a machine from the inventory, through its proxy if it has one.
    WakeMachine {
        /// JSON inventory of proxies and machines.
        #[arg(long, env = "WOLPROXY_INVENTORY")]
        inventory: PathBuf,

        #[arg(long)]
        machine_id: u32,

        /// Relay through this proxy instead of picking one by subnet.
        #[arg(long)]
        proxy_id: Option<u32>,
    },
    /// Check whether a proxy is accepting connections.
    Check {
        #[arg(long)]
        address: String,

        #[arg(long, default_value_t = wol::DEFAULT_PORT)]
        port: u16,

        #[arg(long, default_value_t = probe::DEFAULT_TIMEOUT.as_secs_f64())]
        timeout_secs: f64,
    },
    /// Check the status of every proxy in the inventory.
    Sweep {
        /// JSON inventory of proxies and machines.
        #[arg(long, env = "WOLPROXY_INVENTORY")]
        inventory: PathBuf,

        /// Only check this proxy.
        #[arg(long)]
        proxy_id: Option<u32>,

        #[arg(long, default_value_t = probe::SWEEP_TIMEOUT.as_secs_f64())]
        timeout_secs: f64,

        /// Also print the statuses as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Load and validate an inventory file.
    Validate {
        #[arg(long, env = "WOLPROXY_INVENTORY")]
        inventory: PathBuf,
    },
}

fn timeout(secs: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    Ok(Duration::try_from_secs_f64(secs)?)
}

fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::Wake {
            mac,
            to,
            subnet,
            port,
        } => {
            let to = subnet.map_or(to, |s| s.broadcast().to_string());
            wol::send_magic_packet(&mac, &to, port)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::WakeMachine {
            inventory,
            machine_id,
            proxy_id,
        } => {
            let inventory = Inventory::load(inventory)?;
            let machine = inventory.machine(machine_id)?;
            let route = match proxy_id {
                Some(id) => Route::Proxy(inventory.proxy(id)?),
                None => inventory.route(machine),
            };
            let (address, port) = route.destination();
            wol::send_magic_packet(&machine.mac_address, &address, port)?;
            info!("WOL packet sent to {} via {}", machine.name, route);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            address,
            port,
            timeout_secs,
        } => {
            let status = probe::check_reachable(&address, port, timeout(timeout_secs)?);
            println!(
                "{}",
                json!({"status": status, "ip_address": address, "port": port})
            );
            Ok(if status.is_reachable() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Sweep {
            inventory,
            proxy_id,
            timeout_secs,
            json,
        } => {
            let inventory = Inventory::load(inventory)?;
            if let Some(id) = proxy_id {
                inventory.proxy(id)?;
            }
            let statuses = sweep::sweep(&inventory.proxies, proxy_id, timeout(timeout_secs)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { inventory } => {
            let inventory = Inventory::load(inventory)?;
            info!(
                "inventory ok: {} proxies, {} machines",
                inventory.proxies.len(),
                inventory.machines.len()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("INFO"))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();

    match run(args.command) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
