use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Engagement counts exactly as the page renders them ("1.2K", "3", ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PostMetrics {
    #[serde(deserialize_with = "lenient_string")]
    pub likes: String,
    #[serde(deserialize_with = "lenient_string")]
    pub retweets: String,
}

/// One stored post. Missing fields read back as empty strings and scalar
/// values are taken as their text, so older or hand-edited stores still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Post {
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient_metrics")]
    pub metrics: PostMetrics,
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub scraped_at: String,
}

// null reads as "", numbers and booleans as their JSON text
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_metrics<'de, D>(deserializer: D) -> Result<PostMetrics, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value).unwrap_or_default()),
        _ => Ok(PostMetrics::default()),
    }
}

/// What the page projection yields before a post is tied to an account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawPost {
    pub text: String,
    pub timestamp: String,
    pub likes: String,
    pub retweets: String,
}

impl RawPost {
    pub fn into_post(self, username: &str, scraped_at: &str) -> Post {
        Post {
            text: self.text,
            timestamp: self.timestamp,
            metrics: PostMetrics {
                likes: self.likes,
                retweets: self.retweets,
            },
            username: username.to_string(),
            scraped_at: scraped_at.to_string(),
        }
    }
}

// ISO-8601 with millisecond precision and a trailing Z
pub fn format_scraped_at(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stamp a whole batch with its account and one shared scrape time.
pub fn stamp_batch(raw_posts: Vec<RawPost>, username: &str, now: DateTime<Utc>) -> Vec<Post> {
    let scraped_at = format_scraped_at(now);
    raw_posts
        .into_iter()
        .map(|raw| raw.into_post(username, &scraped_at))
        .collect()
}
