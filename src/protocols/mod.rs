use std::{
    io::{Read, Write},
    time::Duration,
};

use crate::{
    error::{Error, Result},
    session::Session,
};

pub mod tcp;

pub use self::tcp::Tcp;

/// Byte stream a [`Session`] can own.
///
/// The timeout hooks let a session bound native blocking reads and writes with the
/// caller's deadline. Streams without timeouts keep the no-op defaults.
pub trait Stream: Read + Write + Send + 'static {
    /// Baseline timeout configured on the stream when the session took it over.
    fn io_timeout(&self) -> Option<Duration> {
        None
    }
    fn set_io_timeout(&mut self, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }
    fn shutdown(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub trait Protocol {
    type Address: ?Sized;
    type IO: Stream;
    fn connect(&self, address: &Self::Address, time_out: Duration) -> Result<Self::IO>;

    /// Connects and hands the stream to a new session.
    fn open(&self, address: &Self::Address, time_out: Duration) -> Result<Session<Self::IO>> {
        Ok(Session::new(self.connect(address, time_out)?))
    }
}

/// Opens a session by protocol name. Only `"tcp"` is supported.
pub fn connect(proto: &str, address: &str, time_out: Duration) -> Result<Session<std::net::TcpStream>> {
    match proto {
        "tcp" => Tcp::default().open(address, time_out),
        _ => Err(Error::InvalidProtocol(proto.to_string())),
    }
}
