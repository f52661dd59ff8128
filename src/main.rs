use std::{error::Error, time::Duration};

use log::info;
use scpi_client::{connect, Client};

/// `scpi-client <host:port> <command>...`
///
/// Commands ending in `?` are queried and their reply printed; the rest are
/// executed and checked against the error queue.
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let address = args
        .next()
        .ok_or("usage: scpi-client <host:port> <command>...")?;

    let mut session = connect("tcp", &address, Duration::from_secs(3))?;
    info!("connected to {}", address);
    for cmd in args {
        if cmd.ends_with('?') {
            println!("{}", session.query(&cmd)?.trim_end());
        } else {
            session.exec(&cmd)?;
        }
    }
    session.close()?;
    Ok(())
}
