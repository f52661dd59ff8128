use std::sync::mpsc::Receiver;

use crate::{context::Context, error::Result, scpi};

/// Client of a device controlled with SCPI commands.
///
/// Implementors supply the context-aware primitives; the plain forms run them with
/// [`Context::background`].
pub trait Client {
    /// Sends `cmd` and checks the instrument's error queue for it.
    fn exec_with(&mut self, ctx: &Context, cmd: &str) -> Result<()>;

    /// Sends `cmd` and returns the reply without consulting the error queue.
    fn query_with(&mut self, ctx: &Context, cmd: &str) -> Result<String>;

    fn ping_with(&mut self, ctx: &Context) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Runs one query cycle on a background worker under `ctx`. The receiver yields
    /// exactly one result and the worker never blocks on delivering it.
    fn spawn_query(&self, ctx: &Context, cmd: &str) -> Result<Receiver<Result<String>>>;

    fn exec(&mut self, cmd: &str) -> Result<()> {
        self.exec_with(&Context::background(), cmd)
    }

    /// Executes several commands as one line joined with `;`.
    ///
    /// The error queue is checked once, so a fault is attributed to the joined line
    /// rather than the sub-command that caused it.
    fn bulk_exec_with<S: AsRef<str>>(&mut self, ctx: &Context, cmds: &[S]) -> Result<()>
    where
        Self: Sized,
    {
        self.exec_with(ctx, &scpi::join(cmds))
    }

    fn bulk_exec<S: AsRef<str>>(&mut self, cmds: &[S]) -> Result<()>
    where
        Self: Sized,
    {
        self.bulk_exec_with(&Context::background(), cmds)
    }

    fn query(&mut self, cmd: &str) -> Result<String> {
        self.query_with(&Context::background(), cmd)
    }

    fn ping(&mut self) -> Result<()> {
        self.ping_with(&Context::background())
    }
}
