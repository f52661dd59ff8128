//! One open connection to one instrument.
//!
//! Commands go out as `\n` terminated lines. Replies are taken from a single read
//! into a fixed buffer: whatever arrives in that read is the whole response, and a
//! longer reply is cut at the buffer size. Every executed command is followed by a
//! `SYST:ERR?` round trip whose answer decides the command's outcome.

use std::{
    io::{self, Read, Write},
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};

use crate::{
    client::Client,
    context::Context,
    error::{is_timeout_kind, Error, Result},
    protocols::Stream,
    scpi::{self, scpi_error},
};

pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// How often a cycle waiting for the connection re-checks its context.
const LOCK_POLL: Duration = Duration::from_millis(10);

/// Phases of an executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Send,
    Verify,
}

struct Link<IO> {
    io: Option<IO>,
    buffer_size: usize,
    io_timeout: Option<Duration>,
}

/// Exclusive owner of an instrument connection.
///
/// Only one command/response cycle runs at a time. Cycles borrow the session
/// mutably, and a cycle left running by [`Client::spawn_query`] holds the
/// connection until its reply has been read, so the next cycle never picks up a
/// stale reply. A cycle queued behind it still gives up when its own context
/// ends.
pub struct Session<IO: Stream> {
    link: Arc<Mutex<Link<IO>>>,
}

impl<IO: Stream> Session<IO> {
    pub fn new(io: IO) -> Self {
        Self::with_buffer_size(io, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(io: IO, buffer_size: usize) -> Self {
        let io_timeout = io.io_timeout();
        Self {
            link: Arc::new(Mutex::new(Link {
                io: Some(io),
                buffer_size: buffer_size.max(1),
                io_timeout,
            })),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.link.lock().buffer_size
    }

    pub fn is_closed(&self) -> bool {
        self.link.lock().io.is_none()
    }

    /// Like [`Client::query_with`] but returns the reply bytes untouched.
    pub fn query_raw_with(&mut self, ctx: &Context, cmd: &str) -> Result<Bytes> {
        acquire(&self.link, ctx)?.query(ctx, cmd)
    }

    pub fn query_raw(&mut self, cmd: &str) -> Result<Bytes> {
        self.query_raw_with(&Context::background(), cmd)
    }
}

impl<IO: Stream> Client for Session<IO> {
    fn exec_with(&mut self, ctx: &Context, cmd: &str) -> Result<()> {
        acquire(&self.link, ctx)?.exec(ctx, cmd)
    }

    fn query_with(&mut self, ctx: &Context, cmd: &str) -> Result<String> {
        let reply = self.query_raw_with(ctx, cmd)?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Succeeds while the session is open and `ctx` is live. Nothing is sent.
    fn ping_with(&mut self, ctx: &Context) -> Result<()> {
        if acquire(&self.link, ctx)?.io.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut io = self.link.lock().io.take().ok_or(Error::Closed)?;
        debug!("closing session");
        io.shutdown()?;
        Ok(())
    }

    /// With a deadline in `ctx`, the worker's read is bounded by that deadline
    /// alone, not by the stream's baseline timeout.
    fn spawn_query(&self, ctx: &Context, cmd: &str) -> Result<mpsc::Receiver<Result<String>>> {
        let (tx, rx) = mpsc::sync_channel(1);
        let link = Arc::clone(&self.link);
        let ctx = ctx.clone();
        let cmd = cmd.to_string();
        thread::Builder::new()
            .name("scpi-query".into())
            .spawn(move || {
                let reply = acquire(&link, &ctx)
                    .and_then(|mut link| link.query_detached(&ctx, &cmd))
                    .map(|b| String::from_utf8_lossy(&b).into_owned());
                // The receiver is gone when the caller stopped waiting.
                if tx.send(reply).is_err() {
                    debug!("discarding late reply to '{}'", cmd);
                }
            })?;
        Ok(rx)
    }
}

impl<IO: Stream> std::fmt::Debug for Session<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.link.try_lock() {
            Some(link) => f
                .debug_struct("Session")
                .field("open", &link.io.is_some())
                .field("buffer_size", &link.buffer_size)
                .finish(),
            None => f.debug_struct("Session").field("busy", &true).finish(),
        }
    }
}

/// Waits for the connection until `ctx` is cancelled or runs out.
fn acquire<'a, IO>(link: &'a Mutex<Link<IO>>, ctx: &Context) -> Result<MutexGuard<'a, Link<IO>>> {
    loop {
        ctx.check()?;
        let slice = ctx.remaining().map_or(LOCK_POLL, |left| left.min(LOCK_POLL));
        if let Some(guard) = link.try_lock_for(slice) {
            return Ok(guard);
        }
    }
}

impl<IO: Stream> Link<IO> {
    fn exec(&mut self, ctx: &Context, cmd: &str) -> Result<()> {
        let mut phase = Phase::Send;
        while let Some(next) = self.advance(ctx, cmd, phase)? {
            phase = next;
        }
        Ok(())
    }

    /// Runs one phase of an executed command and returns the phase that follows.
    fn advance(&mut self, ctx: &Context, cmd: &str, phase: Phase) -> Result<Option<Phase>> {
        match phase {
            Phase::Send => {
                self.send(ctx, cmd)?;
                Ok(Some(Phase::Verify))
            }
            Phase::Verify => {
                let report = self.query(ctx, scpi::SYST_ERR)?;
                scpi_error::decode(cmd, &String::from_utf8_lossy(&report))?;
                Ok(None)
            }
        }
    }

    fn query(&mut self, ctx: &Context, cmd: &str) -> Result<Bytes> {
        self.send(ctx, cmd)?;
        self.receive(ctx)
    }

    /// Query whose deadline, when `ctx` has one, replaces the baseline timeout.
    fn query_detached(&mut self, ctx: &Context, cmd: &str) -> Result<Bytes> {
        if ctx.deadline().is_none() {
            return self.query(ctx, cmd);
        }
        let base = self.io_timeout.take();
        let reply = self.query(ctx, cmd);
        self.io_timeout = base;
        reply
    }

    /// Checks `ctx` and bounds the stream by whatever time it has left.
    fn stream(&mut self, ctx: &Context) -> Result<&mut IO> {
        ctx.check()?;
        let timeout = match (ctx.remaining(), self.io_timeout) {
            (Some(left), Some(base)) => Some(left.min(base)),
            (left, base) => left.or(base),
        };
        let io = self.io.as_mut().ok_or(Error::Closed)?;
        io.set_io_timeout(timeout)?;
        Ok(io)
    }

    fn send(&mut self, ctx: &Context, cmd: &str) -> Result<()> {
        let mut line = BytesMut::with_capacity(cmd.len() + 1);
        line.put_slice(cmd.as_bytes());
        line.put_u8(scpi::TERMINATOR);
        let io = self.stream(ctx)?;
        io.write_all(&line)
            .and_then(|_| io.flush())
            .map_err(|e| deadline_or(ctx, e))?;
        trace!("-> {}", cmd);
        Ok(())
    }

    fn receive(&mut self, ctx: &Context) -> Result<Bytes> {
        let size = self.buffer_size;
        let io = self.stream(ctx)?;
        let mut buf = vec![0u8; size];
        let n = io.read(&mut buf).map_err(|e| deadline_or(ctx, e))?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by instrument",
            )
            .into());
        }
        if n == size {
            debug!("reply filled the {} byte receive buffer and may be cut", size);
        }
        buf.truncate(n);
        trace!("<- {:?}", String::from_utf8_lossy(&buf));
        Ok(Bytes::from(buf))
    }
}

fn deadline_or(ctx: &Context, e: io::Error) -> Error {
    if is_timeout_kind(e.kind()) && ctx.is_expired() {
        Error::DeadlineExceeded
    } else {
        e.into()
    }
}
