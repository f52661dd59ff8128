//! Client for instruments speaking SCPI over TCP.
//!
//! Every executed command is checked against the instrument's error queue
//! (`SYST:ERR?`), and faults come back as typed [`Error`]s:
//!
//! ```no_run
//! use std::time::Duration;
//! use scpi_client::{connect, Client, Handler};
//!
//! # fn main() -> scpi_client::Result<()> {
//! let mut session = connect("tcp", "192.168.0.10:5025", Duration::from_secs(3))?;
//! session.bulk_exec(&["CONF:VOLT:DC 10", "TRIG:SOUR IMM"])?;
//! println!("{}", session.query("READ?")?);
//!
//! let mut dmm = Handler::new(session);
//! dmm.reset()?;
//! dmm.wait_for_complete(Duration::from_secs(5))?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod instruments;
pub mod protocols;
pub mod scpi;
pub mod session;
pub mod waiter;

pub use client::Client;
pub use context::{CancelHandle, Context};
pub use error::{Error, Result};
pub use instruments::{Handler, Identity};
pub use protocols::{connect, Protocol, Stream, Tcp};
pub use scpi::scpi_error::{CommandError, ErrorClass, InvalidFormatError};
pub use session::Session;
pub use waiter::wait_for_complete;
