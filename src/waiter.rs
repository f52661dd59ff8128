use std::{
    io,
    sync::mpsc::RecvTimeoutError,
    time::{Duration, Instant},
};

use log::{trace, warn};

use crate::{
    client::Client,
    context::Context,
    error::{Error, Result},
    scpi,
};

/// Extra time the abandoned worker gets to read the late reply.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Waits until every queued instrument operation has finished, or `timeout` passes.
///
/// `*WAI;*OPC?` is issued on a background worker and raced against the timer. When
/// the timer wins the worker is abandoned rather than interrupted: its query keeps
/// the connection until the reply lands, then the reply is dropped.
///
/// The worker's read is bounded by `timeout` plus a short grace period, not by the
/// stream's baseline timeout, so operations slower than that baseline still
/// complete.
pub fn wait_for_complete<C: Client>(client: &C, timeout: Duration) -> Result<()> {
    let started = Instant::now();
    let worker = Context::with_deadline(started + timeout + DRAIN_GRACE);
    let pending = client.spawn_query(&worker, scpi::WAIT_OPC)?;
    match pending.recv_timeout(timeout) {
        Ok(reply) => {
            let reply = reply?;
            trace!("operation complete ({:?}) after {:?}", reply.trim(), started.elapsed());
            Ok(())
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!("no operation complete reply within {:?}, abandoning the query", timeout);
            Err(Error::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
            io::ErrorKind::Other,
            "query worker exited without a reply",
        )
        .into()),
    }
}
