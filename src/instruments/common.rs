//! IEEE 488.2 common commands understood by every SCPI instrument.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    ///Identification query
    IDN,
    ///Self-test query
    TST,
    ///Operation complete query
    OPC,
    ///Event status enable query
    ESE,
    ///Event status register query
    ESR,
    ///Service request enable query
    SRE,
    ///Read status byte query
    STB,
}

impl Query {
    pub fn as_str(self) -> &'static str {
        match self {
            Query::IDN => "*IDN?",
            Query::TST => "*TST?",
            Query::OPC => "*OPC?",
            Query::ESE => "*ESE?",
            Query::ESR => "*ESR?",
            Query::SRE => "*SRE?",
            Query::STB => "*STB?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ///Reset
    RST,
    ///Operation complete
    OPC,
    ///Wait to complete
    WAI,
    ///Clear status
    CLS,
    ///Event status enable
    ESE,
    ///Service request enable
    SRE,
    ///Bus trigger
    TRG,
    ///Save setup
    SAV,
    ///Recall setup
    RCL,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::RST => "*RST",
            Command::OPC => "*OPC",
            Command::WAI => "*WAI",
            Command::ESE => "*ESE",
            Command::CLS => "*CLS",
            Command::SRE => "*SRE",
            Command::TRG => "*TRG",
            Command::SAV => "*SAV",
            Command::RCL => "*RCL",
        }
    }
}
