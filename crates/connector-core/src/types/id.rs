//! Newtype wrappers around `String` for every identifier the pipeline keys by.
//!
//! Using distinct types prevents accidentally passing a `ProjectId` where an
//! `ApplicationId` is expected, which matters because the conversion cache is
//! keyed by both.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around `String`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner string value.
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the identifier is empty (never valid as a key).
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifies one host-native object within its document.
    ///
    /// Stable across sends as long as the underlying object is unmodified.
    /// Hosts derive it from a GUID, a handle, or a composite such as
    /// `{layer id}_{row index}`; the latter is only as stable as the host's
    /// row numbering.
    ApplicationId
);

define_id!(
    /// Identifies the project a send targets.
    ProjectId
);

define_id!(
    /// Identifies one logical send/receive target (a model card).
    UnitOfWorkId
);

define_id!(
    /// Content hash identifying a shared instance definition.
    DefinitionId
);

define_id!(
    /// Identifies a user-facing setting that alters conversion output.
    SettingId
);
