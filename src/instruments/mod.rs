//! Named instrument operations on top of any [`Client`].

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    client::Client,
    error::{Error, Result},
    scpi::{self, EventStatusByte, StatusByte},
    waiter,
};

pub mod common;

use self::common::{Command, Query};

/// Highest non-volatile setup slot for `*SAV` / `*RCL`.
pub const MAX_LOCATION: u8 = 9;

static REGISTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{1,3}").expect("register pattern is valid"));

/// The four fields of an `*IDN?` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    /// `0` when the instrument does not report one.
    pub serial: String,
    pub firmware: String,
}

/// Handler for a device controlled using SCPI commands.
#[derive(Debug)]
pub struct Handler<C: Client> {
    client: C,
}

impl<C: Client> Handler<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Restores the factory condition and clears the error log.
    pub fn reset(&mut self) -> Result<()> {
        self.client
            .bulk_exec(&[Command::RST.as_str(), Command::CLS.as_str()])
    }

    pub fn clear_status(&mut self) -> Result<()> {
        self.client.exec(Command::CLS.as_str())
    }

    /// Triggers the device when bus triggering is selected; ignored otherwise.
    pub fn trigger(&mut self) -> Result<()> {
        self.client.exec(Command::TRG.as_str())
    }

    /// Raw identification: manufacturer, model, serial number (or 0), firmware.
    pub fn identify(&mut self) -> Result<String> {
        Ok(self.client.query(Query::IDN.as_str())?.trim().to_string())
    }

    pub fn identity(&mut self) -> Result<Identity> {
        let id = self.identify()?;
        let mut fields = id.splitn(4, ',').map(|f| f.trim().to_string());
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(manufacturer), Some(model), Some(serial), Some(firmware)) => Ok(Identity {
                manufacturer,
                model,
                serial,
                firmware,
            }),
            _ => Err(Error::UnexpectedResponse(id)),
        }
    }

    /// Runs the internal self test; `0` means passed.
    pub fn self_test(&mut self) -> Result<i32> {
        let res = self.client.query(Query::TST.as_str())?;
        res.trim()
            .trim_start_matches('+')
            .parse()
            .map_err(|_| Error::UnexpectedResponse(res))
    }

    /// Bits set here are summarised in bit 5 of the Status Byte.
    pub fn set_event_status_enable(&mut self, bits: EventStatusByte) -> Result<()> {
        let cmd = scpi::Command::new(Command::ESE.as_str()).para(bits.to_string());
        self.client.exec(cmd.as_str())
    }

    pub fn event_status_enable(&mut self) -> Result<EventStatusByte> {
        self.register(Query::ESE).map(EventStatusByte::new)
    }

    /// Reading the register clears it.
    pub fn event_status_register(&mut self) -> Result<EventStatusByte> {
        self.register(Query::ESR).map(EventStatusByte::new)
    }

    pub fn set_service_request_enable(&mut self, bits: StatusByte) -> Result<()> {
        let cmd = scpi::Command::new(Command::SRE.as_str()).para(bits.to_string());
        self.client.exec(cmd.as_str())
    }

    pub fn service_request_enable(&mut self) -> Result<StatusByte> {
        self.register(Query::SRE).map(StatusByte::new)
    }

    pub fn status_byte(&mut self) -> Result<StatusByte> {
        self.register(Query::STB).map(StatusByte::new)
    }

    /// Stores the current setup in non-volatile slot `mem` (0 to 9).
    pub fn save(&mut self, mem: u8) -> Result<()> {
        self.exec_location(Command::SAV, mem)
    }

    /// Restores a setup previously stored with [`Handler::save`].
    pub fn recall(&mut self, mem: u8) -> Result<()> {
        self.exec_location(Command::RCL, mem)
    }

    /// Sets the Operation Complete bit of the Event Status Register once every
    /// pending operation has finished.
    pub fn set_operation_complete(&mut self) -> Result<()> {
        self.client.exec(Command::OPC.as_str())
    }

    /// `*OPC?`: blocks on the instrument side until pending operations finish, then
    /// reads back `1`.
    pub fn operation_complete(&mut self) -> Result<bool> {
        let res = self.client.query(Query::OPC.as_str())?;
        match res.trim() {
            "1" | "+1" => Ok(true),
            "0" | "+0" => Ok(false),
            _ => Err(Error::UnexpectedResponse(res)),
        }
    }

    /// Holds back later commands on the instrument until pending operations finish.
    pub fn wait(&mut self) -> Result<()> {
        self.client.exec(Command::WAI.as_str())
    }

    pub fn wait_for_complete(&self, timeout: Duration) -> Result<()> {
        waiter::wait_for_complete(&self.client, timeout)
    }

    fn exec_location(&mut self, command: Command, mem: u8) -> Result<()> {
        if mem > MAX_LOCATION {
            return Err(Error::InvalidLocation(mem));
        }
        let cmd = scpi::Command::new(command.as_str()).para(mem.to_string());
        self.client.exec(cmd.as_str())
    }

    fn register(&mut self, query: Query) -> Result<u8> {
        let res = self.client.query(query.as_str())?;
        REGISTER
            .find(&res)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or(Error::UnexpectedResponse(res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use std::collections::HashMap;
    use std::sync::mpsc::{self, Receiver};

    /// Records traffic and answers queries from a table.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<String>,
        answers: HashMap<&'static str, &'static str>,
    }

    impl Recorder {
        fn answering(answers: &[(&'static str, &'static str)]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Client for Recorder {
        fn exec_with(&mut self, _: &Context, cmd: &str) -> Result<()> {
            self.sent.push(cmd.to_string());
            Ok(())
        }
        fn query_with(&mut self, _: &Context, cmd: &str) -> Result<String> {
            self.sent.push(cmd.to_string());
            self.answers
                .get(cmd)
                .map(|a| a.to_string())
                .ok_or(Error::Closed)
        }
        fn ping_with(&mut self, _: &Context) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn spawn_query(&self, _: &Context, cmd: &str) -> Result<Receiver<Result<String>>> {
            let (tx, rx) = mpsc::sync_channel(1);
            let reply = self.answers.get(cmd).map(|a| a.to_string()).ok_or(Error::Closed);
            tx.send(reply).unwrap();
            Ok(rx)
        }
    }

    #[test]
    fn reset_is_one_line() {
        let mut h = Handler::new(Recorder::default());
        h.reset().unwrap();
        h.trigger().unwrap();
        assert_eq!(h.into_inner().sent, ["*RST;*CLS", "*TRG"]);
    }

    #[test]
    fn register_writes() {
        let mut h = Handler::new(Recorder::default());
        h.set_event_status_enable(EventStatusByte::default().command_err())
            .unwrap();
        h.set_service_request_enable(StatusByte::new(16)).unwrap();
        assert_eq!(h.client().sent, ["*ESE 32", "*SRE 16"]);
    }

    #[test]
    fn register_reads() {
        let mut h = Handler::new(Recorder::answering(&[
            ("*ESR?", "+33\n"),
            ("*STB?", "0\n"),
            ("*ESE?", "garbage"),
        ]));
        let esr = h.event_status_register().unwrap();
        assert!(esr.is_command_err() && esr.is_opera_complete());
        assert_eq!(h.status_byte().unwrap().byte(), 0);
        assert!(matches!(
            h.event_status_enable(),
            Err(Error::UnexpectedResponse(r)) if r == "garbage"
        ));
    }

    #[test]
    fn save_and_recall_slots() {
        let mut h = Handler::new(Recorder::default());
        h.save(3).unwrap();
        h.recall(9).unwrap();
        assert!(matches!(h.save(10), Err(Error::InvalidLocation(10))));
        assert!(matches!(h.recall(42), Err(Error::InvalidLocation(42))));
        assert_eq!(h.client().sent, ["*SAV 3", "*RCL 9"]);
    }

    #[test]
    fn identity_fields() {
        let mut h = Handler::new(Recorder::answering(&[(
            "*IDN?",
            "Keysight Technologies,34461A,MY12345678,A.02.14-02.40\n",
        )]));
        let id = h.identity().unwrap();
        assert_eq!(id.manufacturer, "Keysight Technologies");
        assert_eq!(id.model, "34461A");
        assert_eq!(id.serial, "MY12345678");
        assert_eq!(id.firmware, "A.02.14-02.40");
    }

    #[test]
    fn identify_propagates_failure() {
        let mut h = Handler::new(Recorder::default());
        assert!(h.identify().is_err());
    }

    #[test]
    fn self_test_result() {
        let mut h = Handler::new(Recorder::answering(&[("*TST?", "+0\n")]));
        assert_eq!(h.self_test().unwrap(), 0);
    }

    #[test]
    fn waits_through_client() {
        let h = Handler::new(Recorder::answering(&[("*WAI;*OPC?", "1\n")]));
        assert!(h.wait_for_complete(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn operation_complete_commands() {
        let mut h = Handler::new(Recorder::answering(&[("*OPC?", "1\n")]));
        h.set_operation_complete().unwrap();
        h.wait().unwrap();
        assert!(h.operation_complete().unwrap());
        assert_eq!(h.client().sent, ["*OPC", "*WAI", "*OPC?"]);

        let mut h = Handler::new(Recorder::answering(&[("*OPC?", "busy")]));
        assert!(matches!(
            h.operation_complete(),
            Err(Error::UnexpectedResponse(r)) if r == "busy"
        ));
    }
}
