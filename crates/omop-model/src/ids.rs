#![deny(unsafe_code)]

use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// OMOP vocabulary concept identifier.
    ConceptId
);
entity_id!(
    /// Scan report identifier.
    ScanReportId
);
entity_id!(
    /// Scan report table identifier.
    TableId
);
entity_id!(
    /// Scan report field identifier.
    FieldId
);
entity_id!(
    /// Scan report value identifier.
    ValueId
);
entity_id!(
    /// Identifier of a concept-to-source-element assignment.
    SrConceptId
);
entity_id!(
    /// Destination (CDM) table identifier.
    OmopTableId
);
entity_id!(
    /// Destination (CDM) field identifier.
    OmopFieldId
);
entity_id!(
    /// Mapping rule identifier.
    RuleId
);
