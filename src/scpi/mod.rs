pub mod scpi_error;

/// Error-queue query issued after every executed command.
pub const SYST_ERR: &str = "SYST:ERR?";
/// Holds the reply until every pending operation has finished.
pub const WAIT_OPC: &str = "*WAI;*OPC?";
/// Line terminator appended to outgoing commands.
pub const TERMINATOR: u8 = b'\n';
/// Separator used to pack several commands into one line.
pub const SEPARATOR: &str = ";";

/// Joins commands into a single program line, preserving order.
pub fn join<S: AsRef<str>>(cmds: &[S]) -> String {
    let mut line = String::new();
    for (i, cmd) in cmds.iter().enumerate() {
        if i > 0 {
            line.push_str(SEPARATOR);
        }
        line.push_str(cmd.as_ref());
    }
    line
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    pub fn new<S: ToString>(s: S) -> Self {
        Self(s.to_string())
    }
    pub fn query(mut self) -> Self {
        self.0.push('?');
        self
    }
    pub fn para<P: AsRef<str>>(mut self, para: P) -> Self {
        self.0.push(' ');
        self.0.push_str(para.as_ref());
        self
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status Byte register (`*STB?`, `*SRE`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusByte(u8);

impl StatusByte {
    const ERROR_QUEUE: u8 = 1 << 2;
    const QUESTIONABLE: u8 = 1 << 3;
    const MESSAGE_AVAILABLE: u8 = 1 << 4;
    const EVENT_STATUS: u8 = 1 << 5;
    const SERVICE_REQUEST: u8 = 1 << 6;
    const OPERATION: u8 = 1 << 7;

    pub fn new(b: u8) -> Self {
        Self(b)
    }
    pub fn byte(&self) -> u8 {
        self.0
    }
    pub fn has_error(&self) -> bool {
        self.0 & Self::ERROR_QUEUE != 0
    }
    pub fn is_questionable(&self) -> bool {
        self.0 & Self::QUESTIONABLE != 0
    }
    pub fn is_message_available(&self) -> bool {
        self.0 & Self::MESSAGE_AVAILABLE != 0
    }
    pub fn message_available(mut self) -> Self {
        self.0 |= Self::MESSAGE_AVAILABLE;
        self
    }
    pub fn is_event_happened(&self) -> bool {
        self.0 & Self::EVENT_STATUS != 0
    }
    pub fn event_happened(mut self) -> Self {
        self.0 |= Self::EVENT_STATUS;
        self
    }
    pub fn is_requesting_service(&self) -> bool {
        self.0 & Self::SERVICE_REQUEST != 0
    }
    pub fn is_operation_event(&self) -> bool {
        self.0 & Self::OPERATION != 0
    }
    pub fn error_queue(mut self) -> Self {
        self.0 |= Self::ERROR_QUEUE;
        self
    }
}

/// Standard Event Status register (`*ESR?`, `*ESE`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStatusByte(u8);

impl EventStatusByte {
    const OPERATION_COMPLETE: u8 = 1 << 0;
    const QUERY_ERR: u8 = 1 << 2;
    const DEVICE_DEP_ERR: u8 = 1 << 3;
    const EXECUTION_ERR: u8 = 1 << 4;
    const COMMAND_ERR: u8 = 1 << 5;
    const POWER_ON: u8 = 1 << 7;

    pub fn new(b: u8) -> Self {
        Self(b)
    }
    pub fn byte(&self) -> u8 {
        self.0
    }
    pub fn is_command_err(&self) -> bool {
        self.0 & Self::COMMAND_ERR != 0
    }
    pub fn command_err(mut self) -> Self {
        self.0 |= Self::COMMAND_ERR;
        self
    }
    pub fn is_execution_err(&self) -> bool {
        self.0 & Self::EXECUTION_ERR != 0
    }
    pub fn execution_err(mut self) -> Self {
        self.0 |= Self::EXECUTION_ERR;
        self
    }
    pub fn is_device_dep_err(&self) -> bool {
        self.0 & Self::DEVICE_DEP_ERR != 0
    }
    pub fn device_dep_err(mut self) -> Self {
        self.0 |= Self::DEVICE_DEP_ERR;
        self
    }
    pub fn is_query_err(&self) -> bool {
        self.0 & Self::QUERY_ERR != 0
    }
    pub fn query_err(mut self) -> Self {
        self.0 |= Self::QUERY_ERR;
        self
    }
    pub fn is_opera_complete(&self) -> bool {
        self.0 & Self::OPERATION_COMPLETE != 0
    }
    pub fn opera_complete(mut self) -> Self {
        self.0 |= Self::OPERATION_COMPLETE;
        self
    }
    pub fn is_power_on(&self) -> bool {
        self.0 & Self::POWER_ON != 0
    }
    /// Any of the four error bits.
    pub fn has_error(&self) -> bool {
        self.is_command_err()
            || self.is_execution_err()
            || self.is_device_dep_err()
            || self.is_query_err()
    }
}

impl std::fmt::Display for StatusByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for EventStatusByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
