use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// One row in a feed cell.
#[derive(Debug, Clone)]
pub struct ItemSummary {
    pub id: u64,
    pub title: String,
    pub source: String,
    pub published: DateTime<Utc>,
}

/// Full content for the article panel.
#[derive(Debug, Clone)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub source: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("article {0} is not available")]
    NotFound(u64),
}

pub trait FeedService: Send + Sync {
    fn feed_title(&self, feed_id: &str) -> String;
    fn items(&self, feed_id: &str) -> Result<Vec<ItemSummary>>;
}

pub trait ArticleService: Send + Sync {
    fn article(&self, item_id: u64) -> Result<Article, ArticleError>;
}

struct SampleFeed {
    id: &'static str,
    title: &'static str,
    items: Vec<(u64, &'static str, &'static str)>,
}

/// Canned feeds so the binary runs without a network. Fetching real feeds
/// is a separate concern and lives behind the service traits.
pub struct SampleLibrary {
    feeds: Vec<SampleFeed>,
}

impl SampleLibrary {
    pub fn new() -> Self {
        Self {
            feeds: vec![
                SampleFeed {
                    id: "getting-started",
                    title: "Getting Started",
                    items: vec![
                        (1, "Welcome to Lector", "lector"),
                        (2, "Reading with the keyboard", "lector"),
                        (3, "Resizing the article panel", "lector"),
                    ],
                },
                SampleFeed {
                    id: "release-notes",
                    title: "Release Notes",
                    items: vec![
                        (10, "Lector 0.1.0", "lector"),
                        (11, "Card and list layouts", "lector"),
                    ],
                },
                SampleFeed {
                    id: "tips",
                    title: "Tips",
                    items: vec![
                        (20, "Searching your items", "lector"),
                        (21, "Switching view modes", "lector"),
                        (22, "Where settings live", "lector"),
                    ],
                },
            ],
        }
    }

    pub fn feed_ids(&self) -> Vec<String> {
        self.feeds.iter().map(|feed| feed.id.to_string()).collect()
    }

    fn find(&self, feed_id: &str) -> Option<&SampleFeed> {
        self.feeds.iter().find(|feed| feed.id == feed_id)
    }
}

impl Default for SampleLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedService for SampleLibrary {
    fn feed_title(&self, feed_id: &str) -> String {
        self.find(feed_id)
            .map(|feed| feed.title.to_string())
            .unwrap_or_else(|| feed_id.to_string())
    }

    fn items(&self, feed_id: &str) -> Result<Vec<ItemSummary>> {
        let Some(feed) = self.find(feed_id) else {
            return Ok(Vec::new());
        };
        let base = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_else(Utc::now);
        Ok(feed
            .items
            .iter()
            .enumerate()
            .map(|(idx, (id, title, source))| ItemSummary {
                id: *id,
                title: (*title).to_string(),
                source: (*source).to_string(),
                published: base - chrono::Duration::hours(idx as i64),
            })
            .collect())
    }
}

impl ArticleService for SampleLibrary {
    fn article(&self, item_id: u64) -> Result<Article, ArticleError> {
        let (title, body) = match item_id {
            1 => (
                "Welcome to Lector",
                "Lector shows your feeds side by side with the article you are \
reading.\n\nOpen an item with Enter or a click. In card view the article \
floats above the grid; press Esc or click outside it to go back. In list \
view the article sits next to the list.",
            ),
            2 => (
                "Reading with the keyboard",
                "j/k move the selection, h/l move between feeds, Enter opens \
the selected item. While an article is open, n and p jump to the next and \
previous item, and j/k scroll the text.",
            ),
            3 => (
                "Resizing the article panel",
                "Grab either edge of the floating article with the mouse and \
drag. The width is remembered between sessions and always stays within the \
configured bounds.",
            ),
            10 => (
                "Lector 0.1.0",
                "First release: card and list layouts, a resizable article \
panel, and persistent reading preferences.",
            ),
            11 => (
                "Card and list layouts",
                "Press v to cycle the view mode. Card-like modes show one \
cell per feed; list mode shows a single list with the article inline.",
            ),
            20 => (
                "Searching your items",
                "Press / and type to filter the visible items. Esc clears \
the search.",
            ),
            21 => (
                "Switching view modes",
                "The last view mode you used is saved and restored on the \
next start.",
            ),
            22 => (
                "Where settings live",
                "Press s for the settings screen. It shows the effective \
configuration and the path of the config file.",
            ),
            other => return Err(ArticleError::NotFound(other)),
        };
        Ok(Article {
            id: item_id,
            title: title.to_string(),
            source: "lector".to_string(),
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_feeds_have_items() {
        let library = SampleLibrary::new();
        for id in library.feed_ids() {
            assert!(!library.items(&id).unwrap().is_empty(), "feed {id}");
        }
    }

    #[test]
    fn unknown_feed_is_empty_not_an_error() {
        let library = SampleLibrary::new();
        assert!(library.items("nope").unwrap().is_empty());
    }

    #[test]
    fn unknown_article_is_not_found() {
        let library = SampleLibrary::new();
        assert!(matches!(
            library.article(999),
            Err(ArticleError::NotFound(999))
        ));
    }

    #[test]
    fn every_listed_item_resolves() {
        let library = SampleLibrary::new();
        for id in library.feed_ids() {
            for item in library.items(&id).unwrap() {
                assert!(library.article(item.id).is_ok(), "item {}", item.id);
            }
        }
    }
}
