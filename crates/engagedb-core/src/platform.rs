use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Social platform a post was published on.
///
/// Stored as lowercase text in the `posts.platform` and
/// `follower_samples.platform` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tiktok,
    Instagram,
    Youtube,
    Facebook,
    Twitter,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Tiktok,
        Platform::Instagram,
        Platform::Youtube,
        Platform::Facebook,
        Platform::Twitter,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "tiktok" => Ok(Platform::Tiktok),
            "instagram" | "ig" => Ok(Platform::Instagram),
            "youtube" | "yt" => Ok(Platform::Youtube),
            "facebook" | "fb" => Ok(Platform::Facebook),
            "twitter" | "x" => Ok(Platform::Twitter),
            _ => Err(CoreError::InvalidPlatform(s.to_string())),
        }
    }
}
