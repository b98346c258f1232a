use std::fmt;

/// Machine-readable error codes for the runtime failure kinds of a build.
///
/// Argument-shape errors from the original design have no runtime
/// counterpart here: collection parameters are typed, so passing a
/// non-iterable is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnknownExpansionPolicy,
    VenueNotFound,
    UnresolvedAffiliation,
    DegenerateSeries,
    CatalogQueryFailed,
    SnapshotIoFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnknownExpansionPolicy => "E1001",
            Self::VenueNotFound => "E1002",
            Self::UnresolvedAffiliation => "E2001",
            Self::DegenerateSeries => "E2002",
            Self::CatalogQueryFailed => "E3001",
            Self::SnapshotIoFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UnknownExpansionPolicy => "Unknown paper-expansion policy",
            Self::VenueNotFound => "Venue abbreviation not found",
            Self::UnresolvedAffiliation => "Affiliation could not be resolved",
            Self::DegenerateSeries => "Trend series has no usable signal",
            Self::CatalogQueryFailed => "Catalog query failed",
            Self::SnapshotIoFailed => "Rating snapshot read/write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::UnknownExpansionPolicy => {
                Some("Use `n_hops` or `conf` as the expansion policy selector.")
            }
            Self::VenueNotFound => {
                Some("Check the venue abbreviation against the catalog's venues table.")
            }
            Self::UnresolvedAffiliation => None,
            Self::DegenerateSeries => None,
            Self::CatalogQueryFailed => Some("Verify the catalog database path and schema."),
            Self::SnapshotIoFailed => {
                Some("Check snapshot directory permissions and free disk space.")
            }
            Self::InternalUnexpected => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 7] = [
        ErrorCode::UnknownExpansionPolicy,
        ErrorCode::VenueNotFound,
        ErrorCode::UnresolvedAffiliation,
        ErrorCode::DegenerateSeries,
        ErrorCode::CatalogQueryFailed,
        ErrorCode::SnapshotIoFailed,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn codes_are_unique() {
        let codes: HashSet<&str> = ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn display_includes_code_and_message() {
        let rendered = ErrorCode::SnapshotIoFailed.to_string();
        assert!(rendered.starts_with("E5001"));
        assert!(rendered.contains("snapshot"));
    }
}
