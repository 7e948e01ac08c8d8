use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_DATA_FILE;
use crate::error::{Result, ScrapingError};
use crate::parser::Post;

pub const MAX_POSTS_PER_ACCOUNT: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_posts: usize,
    pub posts_per_account: BTreeMap<String, usize>,
}

impl StorageStats {
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut posts_per_account = BTreeMap::new();
        for post in posts {
            *posts_per_account.entry(post.username.clone()).or_insert(0) += 1;
        }

        Self {
            total_posts: posts.len(),
            posts_per_account,
        }
    }
}

/// Where scraped batches end up. Failures are handled inside; callers
/// never see them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore {
    async fn append_and_cap(&self, posts: Vec<Post>);
}

/// The whole collection as one pretty-printed JSON array, rewritten on
/// every save.
pub struct JsonFileStore {
    data_path: PathBuf,
    max_per_account: usize,
}

impl JsonFileStore {
    pub fn new(data_path: PathBuf) -> Self {
        Self::with_cap(data_path, MAX_POSTS_PER_ACCOUNT)
    }

    pub fn with_cap(data_path: PathBuf, max_per_account: usize) -> Self {
        Self {
            data_path,
            max_per_account,
        }
    }

    /// Current collection. Missing, unreadable or non-array storage reads as
    /// empty. Records are converted one by one; only non-object entries are
    /// dropped.
    pub async fn load_posts(&self) -> Vec<Post> {
        let content = match fs::read_to_string(&self.data_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No existing store at {}, starting fresh", self.data_path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read store {}: {}, starting fresh", self.data_path.display(), e);
                return Vec::new();
            }
        };

        let records = match serde_json::from_str::<Vec<Value>>(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Store {} is not a valid post list ({}), starting fresh", self.data_path.display(), e);
                return Vec::new();
            }
        };

        let mut posts = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Post>(record) {
                Ok(post) => posts.push(post),
                Err(e) => warn!("Skipping unreadable record #{} in {}: {}", index, self.data_path.display(), e),
            }
        }
        posts
    }

    /// Merge a batch into the stored collection and write it back.
    pub async fn save_posts(&self, new_posts: Vec<Post>) -> Result<StorageStats> {
        let new_count = new_posts.len();
        let existing = self.load_posts().await;
        let merged = merge_capped(new_posts, existing, self.max_per_account);

        let content = serde_json::to_string_pretty(&merged)
            .map_err(|e| ScrapingError::StorageError(format!("JSON serialization failed: {}", e)))?;
        self.write_atomically(&content).await?;

        let stats = StorageStats::from_posts(&merged);
        info!(
            "Saved {} new posts ({} stored across {} accounts)",
            new_count,
            stats.total_posts,
            stats.posts_per_account.len()
        );
        Ok(stats)
    }

    pub async fn get_storage_stats(&self) -> StorageStats {
        StorageStats::from_posts(&self.load_posts().await)
    }

    fn temp_path(&self) -> PathBuf {
        let mut file_name = self
            .data_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from(DEFAULT_DATA_FILE));
        file_name.push(".tmp");
        self.data_path.with_file_name(file_name)
    }

    // write beside the target, then rename over it
    async fn write_atomically(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.data_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ScrapingError::StorageError(format!("Failed to create directory: {}", e)))?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| ScrapingError::StorageError(format!("Failed to create {}: {}", temp_path.display(), e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| ScrapingError::StorageError(format!("Failed to write content: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| ScrapingError::StorageError(format!("Failed to sync file: {}", e)))?;
        drop(file);

        fs::rename(&temp_path, &self.data_path)
            .await
            .map_err(|e| ScrapingError::StorageError(format!("Failed to replace {}: {}", self.data_path.display(), e)))?;

        Ok(())
    }
}

#[async_trait]
impl PostStore for JsonFileStore {
    async fn append_and_cap(&self, posts: Vec<Post>) {
        if let Err(e) = self.save_posts(posts).await {
            error!("Error saving posts: {}", e);
        }
    }
}

/// New posts go in front of the existing ones; each account then keeps its
/// first `cap` entries. Accounts come out in order of first appearance.
pub fn merge_capped(new_posts: Vec<Post>, existing: Vec<Post>, cap: usize) -> Vec<Post> {
    let mut groups: Vec<Vec<Post>> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for post in new_posts.into_iter().chain(existing) {
        let slot = match group_index.get(&post.username) {
            Some(&slot) => slot,
            None => {
                groups.push(Vec::new());
                group_index.insert(post.username.clone(), groups.len() - 1);
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        if group.len() < cap {
            group.push(post);
        }
    }

    groups.into_iter().flatten().collect()
}
