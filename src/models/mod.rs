use serde::{Deserialize, Serialize};

/// A user known to the recommendations engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One recommendation or recently-watched entry.
///
/// Only the fields the sensor projection flattens are typed; everything else
/// the engine sends rides along in `extra` so published attribute lists match
/// the engine payload exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plex_rating_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-user feed payload. The recommendations endpoint names the list
/// `recommendations`, the recently-watched endpoint names it `recent`; both
/// deserialize into `items`.
#[derive(Debug, Clone, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(rename = "recommendations", alias = "recent", default)]
    pub items: Vec<MediaItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_display_name_falls_back_to_id() {
        let named: User = serde_json::from_str(r#"{"id": "u1", "name": "Daniel"}"#).unwrap();
        assert_eq!(named.display_name(), "Daniel");

        let unnamed: User = serde_json::from_str(r#"{"id": "u1"}"#).unwrap();
        assert_eq!(unnamed.display_name(), "u1");
    }

    #[test]
    fn feed_accepts_recommendations_key() {
        let feed: Feed = serde_json::from_str(
            r#"{
                "user_id": "u1",
                "generated_at": "2026-08-01T10:00:00Z",
                "recommendations": [
                    {"title": "Heat", "year": 1995, "type": "movie", "score": 0.91}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(feed.generated_at.as_deref(), Some("2026-08-01T10:00:00Z"));
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title.as_deref(), Some("Heat"));
        assert_eq!(feed.items[0].year, Some(1995));
        assert_eq!(feed.items[0].media_type.as_deref(), Some("movie"));
    }

    #[test]
    fn feed_accepts_recent_key() {
        let feed: Feed =
            serde_json::from_str(r#"{"recent": [{"title": "Alien", "percent_complete": 42.5}]}"#)
                .unwrap();

        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].percent_complete, Some(42.5));
        assert!(feed.generated_at.is_none());
    }

    #[test]
    fn media_item_round_trips_exactly() {
        let raw = r#"{"poster_url":"http://x/p.jpg","plex_rating_key":"123"}"#;
        let item: MediaItem = serde_json::from_str(raw).unwrap();
        let back = serde_json::to_value(&item).unwrap();

        let expected: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(back, expected);
    }

    #[test]
    fn media_item_keeps_unknown_fields() {
        let item: MediaItem =
            serde_json::from_str(r#"{"title": "Heat", "audience_rating": 8.4, "studio": "WB"}"#)
                .unwrap();

        assert_eq!(item.extra["audience_rating"], 8.4);
        assert_eq!(item.extra["studio"], "WB");

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["studio"], "WB");
    }
}
