//! Entity keys and publication records.
//!
//! Every bibliographic entity is addressed by a normalized string key:
//! identifiers are trimmed on construction so that catalog rows carrying
//! stray `\r\n` (a known artifact of the source dumps) compare equal to
//! clean ones. Keys are plain newtypes, ordered and hashable, so node sets
//! iterate deterministically when stored in `BTreeSet`/`BTreeMap`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Publication year label. `0` marks an unknown year.
pub type Year = i32;

macro_rules! entity_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Build a key from a raw catalog value, trimming surrounding
            /// whitespace.
            #[must_use]
            pub fn new(raw: impl AsRef<str>) -> Self {
                Self(raw.as_ref().trim().to_owned())
            }

            /// The normalized key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_key!(
    /// Paper identifier (the citing/cited key of the citation relation).
    PaperId
);
entity_key!(
    /// Author identifier (cluster key in the source data).
    AuthorId
);
entity_key!(
    /// Affiliation (institution) identifier.
    AffilId
);
entity_key!(
    /// Venue (conference/journal) identifier.
    VenueId
);

/// One paper's publication year plus its author → affiliations map.
///
/// This is the join-row shape the projection paths consume: a paper, its
/// year, and for each author the (possibly empty) set of affiliations the
/// catalog knows for that authorship.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubRecord {
    pub year: Year,
    pub authors: BTreeMap<AuthorId, BTreeSet<AffilId>>,
}

impl PubRecord {
    /// Record with a year and no authors yet.
    #[must_use]
    pub fn with_year(year: Year) -> Self {
        Self {
            year,
            authors: BTreeMap::new(),
        }
    }

    /// Union of all affiliations across this paper's authors.
    #[must_use]
    pub fn affiliations(&self) -> BTreeSet<AffilId> {
        self.authors.values().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_trimmed_on_construction() {
        assert_eq!(PaperId::new("p1\r\n"), PaperId::new("p1"));
        assert_eq!(AuthorId::new("  a9 "), AuthorId::new("a9"));
    }

    #[test]
    fn keys_serialize_transparently() {
        let json = serde_json::to_string(&AffilId::new("mit")).expect("serialize");
        assert_eq!(json, "\"mit\"");
    }

    #[test]
    fn pub_record_affiliations_unions_authors() {
        let mut record = PubRecord::with_year(2014);
        record.authors.insert(
            AuthorId::new("a1"),
            [AffilId::new("f1"), AffilId::new("f2")].into(),
        );
        record
            .authors
            .insert(AuthorId::new("a2"), [AffilId::new("f2")].into());

        let affils = record.affiliations();
        assert_eq!(affils.len(), 2);
        assert!(affils.contains(&AffilId::new("f1")));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Normalization is idempotent: a key built from another key's
            /// string form compares equal to it.
            #[test]
            fn key_normalization_is_idempotent(raw in "[ \t]{0,2}[a-z0-9]{1,8}[ \t]{0,2}") {
                let once = PaperId::new(&raw);
                let twice = PaperId::new(once.as_str());
                prop_assert_eq!(once, twice);
            }

            /// Keys survive a JSON round trip unchanged.
            #[test]
            fn keys_round_trip_through_json(raw in "[a-z0-9]{1,12}") {
                let key = AuthorId::new(&raw);
                let json = serde_json::to_string(&key).expect("serialize");
                let back: AuthorId = serde_json::from_str(&json).expect("deserialize");
                prop_assert_eq!(key, back);
            }
        }
    }
}
