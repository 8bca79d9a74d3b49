use std::fmt;

/// Machine-readable error codes shared by every lineup error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MalformedOrder,
    UnknownKey,
    IndexOutOfRange,
    IneligibleSortColumn,
    DuplicateRelationship,
    EmptySelection,
    TransportFailure,
    PreferenceStoreFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::MalformedOrder => "E2001",
            Self::UnknownKey => "E2002",
            Self::IndexOutOfRange => "E2003",
            Self::IneligibleSortColumn => "E2004",
            Self::DuplicateRelationship => "E3001",
            Self::EmptySelection => "E3002",
            Self::TransportFailure => "E4001",
            Self::PreferenceStoreFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MalformedOrder => "Persisted order is malformed",
            Self::UnknownKey => "Key not present in dataset",
            Self::IndexOutOfRange => "Position out of range",
            Self::IneligibleSortColumn => "Column cannot be used as a sort rule",
            Self::DuplicateRelationship => "Relationship already exists",
            Self::EmptySelection => "Nothing selected",
            Self::TransportFailure => "Relationship store call failed",
            Self::PreferenceStoreFailed => "Preference store failure",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .lineup/config.toml and retry."),
            Self::MalformedOrder => {
                Some("The default alphabetical order was used; commit a tier to overwrite it.")
            }
            Self::UnknownKey => Some("Reload the dataset; the key may have been removed."),
            Self::IndexOutOfRange => Some("Positions are zero-based and must be inside the list."),
            Self::IneligibleSortColumn => {
                Some("Disable the hierarchical order to sort by level columns.")
            }
            Self::DuplicateRelationship => {
                Some("Deselect the listed items or remove the existing relationships first.")
            }
            Self::EmptySelection => Some("Select at least one item before granting."),
            Self::TransportFailure => Some("Retry the failed edges; the rest of the plan was applied."),
            Self::PreferenceStoreFailed => Some("Check permissions on the .lineup directory."),
            Self::LockContention => Some("Retry after the other `lineup` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
