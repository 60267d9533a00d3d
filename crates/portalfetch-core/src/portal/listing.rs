use std::fmt;
use std::str::FromStr;

use crate::cache::ContentKind;

/// Listing endpoints of the content API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listing {
    Channels,
    Categories,
    Topics,
    Trending,
    Hot,
    Breaking,
    Recommend,
}

impl Listing {
    pub const ALL: [Listing; 7] = [
        Listing::Channels,
        Listing::Categories,
        Listing::Topics,
        Listing::Trending,
        Listing::Hot,
        Listing::Breaking,
        Listing::Recommend,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Listing::Channels => "channels",
            Listing::Categories => "categories",
            Listing::Topics => "topics",
            Listing::Trending => "trending",
            Listing::Hot => "hot",
            Listing::Breaking => "breaking",
            Listing::Recommend => "recommend",
        }
    }

    pub fn path(&self) -> String {
        format!("/api/{}", self.name())
    }

    /// Cache classification of the listing's payload.
    pub fn content_kind(&self) -> ContentKind {
        match self {
            Listing::Trending => ContentKind::Trending,
            Listing::Hot => ContentKind::Hot,
            Listing::Breaking => ContentKind::Breaking,
            Listing::Recommend => ContentKind::Recommend,
            Listing::Channels | Listing::Categories | Listing::Topics => ContentKind::Normal,
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown listing '{0}' (expected one of: channels, categories, topics, trending, hot, breaking, recommend)")]
pub struct UnknownListing(pub String);

impl FromStr for Listing {
    type Err = UnknownListing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Listing::ALL
            .into_iter()
            .find(|l| l.name() == wanted)
            .ok_or_else(|| UnknownListing(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        for listing in Listing::ALL {
            assert_eq!(listing.name().parse::<Listing>().unwrap(), listing);
        }
        assert_eq!("Trending".parse::<Listing>().unwrap(), Listing::Trending);
        assert!("sidebar".parse::<Listing>().is_err());
    }

    #[test]
    fn kinds_and_paths() {
        assert_eq!(Listing::Breaking.content_kind(), ContentKind::Breaking);
        assert_eq!(Listing::Topics.content_kind(), ContentKind::Normal);
        assert_eq!(Listing::Recommend.path(), "/api/recommend");
    }
}
