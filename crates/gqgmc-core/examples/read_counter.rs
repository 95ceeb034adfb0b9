//! GQ GMC read-out tool
//!
//! Prints the unit's identity and current readings, then streams heartbeat
//! readings for a few seconds.
//!
//! Usage:
//!   cargo run --example read_counter -- [PORT] [BAUD]
//!
//! Without BAUD the rate is probed. Set RUST_LOG=debug to see every frame.

use anyhow::Context;
use gqgmc_core::protocol::{list_ports, Session, SessionConfig};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let port_name = match args.next() {
        Some(name) => name,
        None => list_ports()
            .into_iter()
            .next()
            .map(|p| p.name)
            .context("no serial ports found")?,
    };

    let mut config = SessionConfig::new(&port_name);
    if let Some(baud) = args.next() {
        config = config.with_baud_rate(baud.parse().context("invalid baud rate")?);
    }

    let session = Session::open(&config).with_context(|| format!("opening {}", port_name))?;
    println!("Version:     {}", session.get_version()?);
    println!("Serial:      {}", session.get_serial()?);
    println!("Clock:       {}", session.get_datetime()?);
    println!("CPM:         {}", session.get_counts_per_minute()?);
    println!("Battery:     {:.1} V", session.get_voltage()? as f64 / 10.0);

    println!("Streaming heartbeat for 5 seconds...");
    session.enable_heartbeat(|cps| println!("  {} CPS", cps))?;
    std::thread::sleep(Duration::from_secs(5));
    session.disable_heartbeat()?;

    session.close()?;
    Ok(())
}
