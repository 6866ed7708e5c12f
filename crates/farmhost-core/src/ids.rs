//! Core identifier types for farmhost.
//!
//! Every record tracked by the host manager (hosts, allocations, procs) and every
//! external entity it refers to (frames, jobs, shows, local assignments) is named by
//! a UUID wrapped in its own type, so a `ProcId` can never be passed where a
//! `HostId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create an identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Create an identifier from its raw 16 bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(bytes))
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Return the bytes of the UUID.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }
    };
}

uuid_id! {
    /// Identifier of a render host.
    ///
    /// Assigned once when a previously unknown host first reports in.
    HostId
}

uuid_id! {
    /// Identifier of an allocation (a named pool of hosts).
    AllocationId
}

uuid_id! {
    /// Identifier of a virtual proc, a reservation of host resources for one frame.
    ProcId
}

uuid_id! {
    /// Identifier of a frame in the external job registry.
    FrameId
}

uuid_id! {
    /// Identifier of a job in the external job registry.
    JobId
}

uuid_id! {
    /// Identifier of a show.
    ShowId
}

uuid_id! {
    /// Identifier of a local host assignment (a user booking their own workstation).
    LocalAssignmentId
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_id_roundtrip() {
        let id = HostId::generate();
        let parsed = HostId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn proc_id_from_bytes() {
        let id = ProcId::generate();
        assert_eq!(ProcId::from_bytes(*id.as_bytes()), id);
    }

    #[test]
    fn invalid_uuid_rejected() {
        let result = AllocationId::from_str("not-a-uuid");
        assert!(matches!(result, Err(IdError::InvalidUuid)));
    }

    #[test]
    fn serde_uses_string_form() {
        let id = FrameId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let parsed: FrameId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn debug_names_the_type() {
        let id = ShowId::from_bytes([0u8; 16]);
        assert_eq!(
            format!("{id:?}"),
            "ShowId(00000000-0000-0000-0000-000000000000)"
        );
    }
}
