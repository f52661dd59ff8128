use std::{
    io::{self, ErrorKind},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Protocol, Stream};
use crate::error::Result;

/// TCP transport settings, typically port 5025 on LAN instruments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tcp {
    /// Disable Nagle so short command lines leave immediately.
    pub nodelay: bool,
    /// Read/write timeout applied to the socket; `None` blocks indefinitely.
    pub io_timeout: Option<Duration>,
}

impl Default for Tcp {
    fn default() -> Self {
        Self {
            nodelay: true,
            io_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl Protocol for Tcp {
    type Address = str;
    type IO = TcpStream;

    fn connect(&self, address: &str, time_out: Duration) -> Result<TcpStream> {
        let mut last_err = None;
        for addr in address.to_socket_addrs()? {
            debug!("dialing {} ({}) with timeout {:?}", address, addr, time_out);
            match TcpStream::connect_timeout(&addr, time_out) {
                Ok(mut stream) => {
                    stream.set_nodelay(self.nodelay)?;
                    stream.set_io_timeout(self.io_timeout)?;
                    debug!("connected to {}", addr);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| {
                io::Error::new(
                    ErrorKind::AddrNotAvailable,
                    format!("'{}' did not resolve to any address", address),
                )
            })
            .into())
    }
}

impl Stream for TcpStream {
    fn io_timeout(&self) -> Option<Duration> {
        self.read_timeout().ok().flatten()
    }
    fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        // A zero timeout is rejected by the OS.
        let timeout = timeout.map(|t| t.max(Duration::from_millis(1)));
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
    fn shutdown(&mut self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
