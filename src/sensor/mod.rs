use crate::models::{Feed, MediaItem, User};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Which per-user feed a sensor projects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedKind {
    Recommendations,
    Recent,
}

impl FeedKind {
    /// Attribute key carrying the full item list.
    pub fn attribute_key(&self) -> &'static str {
        match self {
            FeedKind::Recommendations => "recommendations",
            FeedKind::Recent => "recent",
        }
    }

    fn entity_prefix(&self) -> &'static str {
        match self {
            FeedKind::Recommendations => "plex_recommendations",
            FeedKind::Recent => "plex_recent",
        }
    }
}

/// State payload published to Home Assistant. The state value is the item
/// count; the attribute set carries the feed itself.
#[derive(Debug, Clone, Serialize)]
pub struct SensorState {
    pub state: String,
    pub attributes: Map<String, Value>,
}

/// Entity id (without the `sensor.` domain prefix) for a user's feed sensor,
/// e.g. `plex_recommendations_daniel`.
pub fn entity_id(kind: FeedKind, user: &User) -> String {
    let mut slug = slugify(user.display_name());
    if slug.is_empty() {
        slug = slugify(&user.id);
    }
    format!("{}_{}", kind.entity_prefix(), slug)
}

/// Lowercase a name into a Home Assistant entity slug: every run of
/// non-alphanumeric characters becomes a single underscore.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            slug.push(c.to_ascii_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Project a freshly fetched feed into sensor state. Each call rebuilds the
/// full attribute set; nothing from a previous poll survives.
pub fn build_sensor_state(kind: FeedKind, user: &User, feed: &Feed) -> SensorState {
    let mut attributes = Map::new();
    attributes.insert("user_id".to_string(), json!(user.id));

    if let Some(ref generated_at) = feed.generated_at {
        attributes.insert("generated_at".to_string(), json!(generated_at));
    }

    attributes.insert(kind.attribute_key().to_string(), json!(feed.items));

    if !feed.items.is_empty() {
        let titles: Vec<&str> = feed
            .items
            .iter()
            .take(10)
            .map(|item| item.title.as_deref().unwrap_or("Unknown"))
            .collect();
        attributes.insert("titles".to_string(), json!(titles));

        for (i, item) in feed.items.iter().take(3).enumerate() {
            flatten_item(&mut attributes, i + 1, item);
        }
    }

    attributes.insert("last_poll".to_string(), json!(Utc::now().to_rfc3339()));

    SensorState {
        state: feed.items.len().to_string(),
        attributes,
    }
}

/// Dashboard-card shortcuts: the first three items get their key fields
/// exposed as flat `item_<n>_*` attributes.
fn flatten_item(attributes: &mut Map<String, Value>, n: usize, item: &MediaItem) {
    let prefix = format!("item_{}_", n);
    attributes.insert(format!("{}title", prefix), json!(item.title));
    attributes.insert(format!("{}year", prefix), json!(item.year));
    attributes.insert(format!("{}type", prefix), json!(item.media_type));
    attributes.insert(format!("{}poster", prefix), json!(item.poster_url));
    attributes.insert(format!("{}deep_link", prefix), json!(item.deep_link));
    attributes.insert(format!("{}rating_key", prefix), json!(item.plex_rating_key));
    if let Some(ref reason) = item.reason {
        attributes.insert(format!("{}reason", prefix), json!(reason));
    }
    if let Some(score) = item.score {
        let rounded = (score * 100.0).round() / 100.0;
        attributes.insert(format!("{}score", prefix), json!(rounded));
    }
    if let Some(percent) = item.percent_complete {
        attributes.insert(format!("{}percent_complete", prefix), json!(percent));
    }
}
