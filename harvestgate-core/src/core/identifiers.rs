// harvestgate-core/src/core/identifiers.rs
// ============================================================================
// Module: Harvestgate Identifiers
// Description: Opaque 128-bit identifiers for every entity in the data model.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: uuid, serde
// ============================================================================

//! ## Overview
//! Every entity with a single opaque identifier gets its own newtype
//! wrapping a [`uuid::Uuid`]. Composite-keyed
//! entities (`SessionVault`, `DomainStats`, `DomainConfig`) are *not* given
//! identifiers here — they are addressed by their natural keys, defined
//! alongside their entity structs.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID, e.g. one loaded from storage.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

opaque_id!(JobId, "Identifies one declarative extraction request.");
opaque_id!(FieldMapId, "Identifies one per-job, per-field mapping.");
opaque_id!(RunId, "Identifies one execution attempt of a Job.");
opaque_id!(RecordId, "Identifies one extracted item within a Run.");
opaque_id!(RunEventId, "Identifies one append-only log entry of a Run.");
opaque_id!(InterventionTaskId, "Identifies one human-intervention pause record.");
opaque_id!(RuleCandidateId, "Identifies one human-authored rule produced by resolving an intervention.");
