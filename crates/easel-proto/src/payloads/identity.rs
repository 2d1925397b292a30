//! Identity payloads: who is on the other end of a connection.

use serde::{Deserialize, Serialize};

/// Display name update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUsername {
    /// Requested display name (validated by the server)
    pub username: String,
}

/// Avatar update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAvatar {
    /// Chosen avatar
    pub avatar: Avatar,
}

/// Avatar shown next to a user's name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Avatar {
    /// Elephant in a circus tent
    #[default]
    ElephantCircus,
    /// Kawaii dinosaur
    KawaiiDinosaur,
    /// Rubber duck
    RubberDuck,
    /// Santa's little helper
    SantasLittleHelper,
}

impl Avatar {
    /// Every avatar, in picker order.
    pub const ALL: [Self; 4] =
        [Self::ElephantCircus, Self::KawaiiDinosaur, Self::RubberDuck, Self::SantasLittleHelper];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ElephantCircus => "Elephant Circus",
            Self::KawaiiDinosaur => "Kawaii Dinosaur",
            Self::RubberDuck => "Rubber Duck",
            Self::SantasLittleHelper => "Santas Little Helper",
        }
    }

    /// Stable identifier, as used on the wire and on the command line.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::ElephantCircus => "elephant_circus",
            Self::KawaiiDinosaur => "kawaii_dinosaur",
            Self::RubberDuck => "rubber_duck",
            Self::SantasLittleHelper => "santas_little_helper",
        }
    }

    /// Parse a slug or a label (case-insensitive, `-` and `_` interchangeable).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let wanted: String = input
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        Self::ALL.into_iter().find(|avatar| avatar.slug() == wanted)
    }
}

impl std::fmt::Display for Avatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
