//! Externally addressable feed positions.
//!
//! A [`Locator`] is the "where am I" value a host keeps in its route or URL.
//! [`FeedRoute`] is the textual form used by routers: `/<feed>`,
//! `/<feed>/<index>` or `/<feed>/<item-id>`.

use crate::error::FeedError;
use crate::item::ItemId;
use crate::result::FeedResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position reference carried by the host's address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// Points at an item by identity. Survives reordering.
    ByItem(ItemId),
    /// Legacy numeric position, clamped on resolution.
    ByIndex(usize),
    /// No position in the address; resolves to the head of the feed.
    #[default]
    Head,
}

impl Locator {
    pub fn item(id: impl Into<ItemId>) -> Self {
        Self::ByItem(id.into())
    }

    pub fn item_id(&self) -> Option<&ItemId> {
        match self {
            Self::ByItem(id) => Some(id),
            _ => None,
        }
    }

    /// Parse a single route segment. Digits only is an index, empty is head,
    /// anything else an item id.
    pub fn from_segment(segment: &str) -> Self {
        if segment.is_empty() {
            Self::Head
        } else if segment.bytes().all(|b| b.is_ascii_digit()) {
            match segment.parse::<usize>() {
                Ok(index) => Self::ByIndex(index),
                Err(_) => Self::ByItem(ItemId::from(segment)),
            }
        } else {
            Self::ByItem(ItemId::from(segment))
        }
    }

    /// The route segment for this locator, `None` for head.
    pub fn to_segment(&self) -> Option<String> {
        match self {
            Self::ByItem(id) => Some(id.to_string()),
            Self::ByIndex(index) => Some(index.to_string()),
            Self::Head => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByItem(id) => write!(f, "item:{}", id),
            Self::ByIndex(index) => write!(f, "index:{}", index),
            Self::Head => f.write_str("head"),
        }
    }
}

/// A named feed plus a position in it, e.g. `/home/3` or `/explore/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRoute {
    pub feed: String,
    pub locator: Locator,
}

impl FeedRoute {
    pub fn new(feed: impl Into<String>, locator: Locator) -> Self {
        Self {
            feed: feed.into(),
            locator,
        }
    }

    /// Same feed, different position.
    pub fn with_locator(&self, locator: Locator) -> Self {
        Self {
            feed: self.feed.clone(),
            locator,
        }
    }

    pub fn path(&self) -> String {
        match self.locator.to_segment() {
            Some(segment) => format!("/{}/{}", self.feed, segment),
            None => format!("/{}", self.feed),
        }
    }
}

impl fmt::Display for FeedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for FeedRoute {
    type Err = FeedError;

    fn from_str(path: &str) -> FeedResult<Self> {
        let trimmed = path.trim();
        let rest = trimmed
            .strip_prefix('/')
            .ok_or_else(|| FeedError::InvalidRoute(format!("{} (must start with '/')", path)))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let mut segments = rest.split('/');
        let feed = segments.next().unwrap_or_default();
        if feed.is_empty() {
            return Err(FeedError::InvalidRoute(format!("{} (missing feed name)", path)));
        }

        let locator = segments
            .next()
            .map(Locator::from_segment)
            .unwrap_or_default();

        if segments.next().is_some() {
            return Err(FeedError::InvalidRoute(format!("{} (too many segments)", path)));
        }

        Ok(Self::new(feed, locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_head() {
        let route: FeedRoute = "/home".parse().unwrap();
        assert_eq!(route.feed, "home");
        assert_eq!(route.locator, Locator::Head);
    }

    #[test]
    fn test_parse_index_and_item() {
        let route: FeedRoute = "/home/3".parse().unwrap();
        assert_eq!(route.locator, Locator::ByIndex(3));

        let route: FeedRoute = "/explore/note1abc".parse().unwrap();
        assert_eq!(route.feed, "explore");
        assert_eq!(route.locator, Locator::item("note1abc"));
    }

    #[test]
    fn test_trailing_slash_is_head() {
        let route: FeedRoute = "/home/".parse().unwrap();
        assert_eq!(route.locator, Locator::Head);
    }

    #[test]
    fn test_invalid_routes() {
        assert!(matches!(
            "home/3".parse::<FeedRoute>(),
            Err(FeedError::InvalidRoute(_))
        ));
        assert!(matches!(
            "/".parse::<FeedRoute>(),
            Err(FeedError::InvalidRoute(_))
        ));
        assert!(matches!(
            "/home/3/extra".parse::<FeedRoute>(),
            Err(FeedError::InvalidRoute(_))
        ));
    }

    #[test]
    fn test_path_round_trip() {
        for path in ["/home", "/home/7", "/explore/abc123"] {
            let route: FeedRoute = path.parse().unwrap();
            assert_eq!(route.path(), path);
        }
    }

    #[test]
    fn test_oversized_number_is_an_item() {
        let locator = Locator::from_segment("99999999999999999999999999");
        assert!(matches!(locator, Locator::ByItem(_)));
    }

    #[test]
    fn test_locator_json_shape() {
        let json = serde_json::to_value(Locator::item("v1")).unwrap();
        assert_eq!(json["kind"], "by_item");
        assert_eq!(json["value"], "v1");

        let json = serde_json::to_value(Locator::Head).unwrap();
        assert_eq!(json["kind"], "head");
    }
}
