//! Validated usernames and room names.
//!
//! Both follow the same rules: at least one non-whitespace character, at most
//! [`MAX_NAME_CHARS`] characters, no control characters. Accepted input is
//! stored verbatim. Names are never trimmed or case-folded, so `"Lobby"` and
//! `"lobby"` are different rooms.

use std::{borrow::Borrow, fmt};

use easel_proto::payloads::room::RoomRef;
use serde::{Deserialize, Serialize};

use crate::NameError;

/// Maximum length of a username or room name, in characters.
pub const MAX_NAME_CHARS: usize = 15;

fn validate(input: &str) -> Result<(), NameError> {
    if input.trim().is_empty() {
        return Err(NameError::Empty);
    }

    let len = input.chars().count();
    if len > MAX_NAME_CHARS {
        return Err(NameError::TooLong { len });
    }

    if input.chars().any(char::is_control) {
        return Err(NameError::ControlCharacter);
    }

    Ok(())
}

macro_rules! validated_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate `input` and keep it verbatim.
            pub fn new(input: impl Into<String>) -> Result<Self, NameError> {
                let input = input.into();
                validate(&input)?;
                Ok(Self(input))
            }

            /// The name as entered.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the underlying string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = NameError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = NameError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

validated_name! {
    /// Display name a user picks before using rooms.
    Username
}

validated_name! {
    /// Unique, case-sensitive key of a room.
    RoomName
}

impl From<&RoomName> for RoomRef {
    fn from(name: &RoomName) -> Self {
        Self::new(name.as_str())
    }
}

impl TryFrom<&RoomRef> for RoomName {
    type Error = NameError;

    fn try_from(value: &RoomRef) -> Result<Self, Self::Error> {
        Self::new(value.room.as_str())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn accepts_fifteen_characters() {
        let name = RoomName::new("abcdefghijklmno").expect("15 chars is allowed");
        assert_eq!(name.as_str().len(), 15);
    }

    #[test]
    fn rejects_sixteen_characters() {
        assert_eq!(RoomName::new("abcdefghijklmnop"), Err(NameError::TooLong { len: 16 }));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 15 characters, 30 bytes
        let name = "ééééééééééééééé";
        assert_eq!(name.len(), 30);
        assert!(Username::new(name).is_ok());
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(Username::new(""), Err(NameError::Empty));
        assert_eq!(Username::new("   "), Err(NameError::Empty));
    }

    #[test]
    fn rejects_control_characters() {
        assert_eq!(RoomName::new("lob\nby"), Err(NameError::ControlCharacter));
    }

    #[test]
    fn stores_verbatim_and_case_sensitive() {
        let padded = RoomName::new(" Lobby ").expect("valid");
        assert_eq!(padded.as_str(), " Lobby ");
        assert_ne!(RoomName::new("Lobby").expect("valid"), RoomName::new("lobby").expect("valid"));
    }

    #[test]
    fn deserialize_validates() {
        use serde::de::{IntoDeserializer, value::StringDeserializer};

        let long: StringDeserializer<serde::de::value::Error> = "x".repeat(16).into_deserializer();
        assert!(Username::deserialize(long).is_err());

        let ok: StringDeserializer<serde::de::value::Error> = "ada".to_string().into_deserializer();
        assert_eq!(Username::deserialize(ok).expect("valid").as_str(), "ada");
    }

    proptest! {
        #[test]
        fn valid_names_round_trip_through_string(input in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,14}") {
            let name = RoomName::new(input.clone()).expect("generated names are valid");
            prop_assert_eq!(String::from(name), input);
        }

        #[test]
        fn long_names_always_rejected(input in "[a-z]{16,40}") {
            let rejected = matches!(Username::new(input), Err(NameError::TooLong { .. }));
            prop_assert!(rejected);
        }
    }
}
