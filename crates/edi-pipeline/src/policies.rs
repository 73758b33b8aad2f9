//! Integration modes and logging verbosity

/// Which halves of the cycle are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrations {
    /// Nothing enabled; rejected at startup
    None,

    /// Mailbox acknowledgment only
    EdiOnly,

    /// Order feed polling only
    ApiOnly,

    /// Both phases, inbound first
    Both,
}

impl Integrations {
    /// Derive the mode from the two `active` configuration flags
    pub fn from_flags(edi_active: bool, api_active: bool) -> Self {
        match (edi_active, api_active) {
            (true, true) => Self::Both,
            (true, false) => Self::EdiOnly,
            (false, true) => Self::ApiOnly,
            (false, false) => Self::None,
        }
    }

    pub fn includes_edi(self) -> bool {
        matches!(self, Self::EdiOnly | Self::Both)
    }

    pub fn includes_api(self) -> bool {
        matches!(self, Self::ApiOnly | Self::Both)
    }
}

/// How much of each remote exchange is logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// One-line summaries
    #[default]
    Normal,

    /// Full payloads at debug level
    Verbose,
}

impl Verbosity {
    pub fn from_flag(verbose: bool) -> Self {
        if verbose { Self::Verbose } else { Self::Normal }
    }

    pub fn is_verbose(self) -> bool {
        self == Self::Verbose
    }
}
