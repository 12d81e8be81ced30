//! Identity types: which tab and which streaming site a detector serves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Browser tab identifier, assigned by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Streaming platforms with a dedicated detector profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    YouTube,
    Hulu,
    HboMax,
    Paramount,
    Peacock,
    Twitch,
}

impl Site {
    /// Every supported site.
    pub const ALL: [Site; 6] = [
        Site::YouTube,
        Site::Hulu,
        Site::HboMax,
        Site::Paramount,
        Site::Peacock,
        Site::Twitch,
    ];

    /// Stable lowercase key, used in config tables and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Site::YouTube => "youtube",
            Site::Hulu => "hulu",
            Site::HboMax => "hbomax",
            Site::Paramount => "paramount",
            Site::Peacock => "peacock",
            Site::Twitch => "twitch",
        }
    }

    /// Human-readable platform name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Site::YouTube => "YouTube",
            Site::Hulu => "Hulu",
            Site::HboMax => "HBO Max",
            Site::Paramount => "Paramount+",
            Site::Peacock => "Peacock",
            Site::Twitch => "Twitch",
        }
    }

    fn domains(&self) -> &'static [&'static str] {
        match self {
            Site::YouTube => &["youtube.com"],
            Site::Hulu => &["hulu.com"],
            Site::HboMax => &["max.com", "hbomax.com"],
            Site::Paramount => &["paramountplus.com"],
            Site::Peacock => &["peacocktv.com"],
            Site::Twitch => &["twitch.tv"],
        }
    }

    /// Resolve the site a page host belongs to (`www.hulu.com` -> Hulu).
    pub fn from_host(host: &str) -> Option<Site> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        Site::ALL.into_iter().find(|site| {
            site.domains().iter().any(|domain| {
                host == *domain
                    || host
                        .strip_suffix(*domain)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
        })
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Returned when a site key is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown site: {0}")]
pub struct ParseSiteError(pub String);

impl FromStr for Site {
    type Err = ParseSiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Site::ALL
            .into_iter()
            .find(|site| site.key() == key)
            .ok_or(ParseSiteError(s.to_string()))
    }
}
