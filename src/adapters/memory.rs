use crate::domain::model::SourceStoreConfig;
use crate::domain::ports::{ListPage, ObjectStore};
use crate::utils::error::{Result, TransferError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// 記憶體中的物件儲存，行為模擬 S3 的 delimiter 列表與分頁。
///
/// 用於測試；可以指定讓某些前綴的列表或某些 key 的下載失敗。
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Vec<u8>>,
    page_size: usize,
    bucket: Option<String>,
    failing_prefixes: Vec<String>,
    failing_keys: HashSet<String>,
    list_calls: AtomicUsize,
}

enum Entry {
    Key(String),
    Prefix(String),
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            ..Default::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_object(mut self, key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(key, data);
        self
    }

    /// 列表前綴以此開頭時回傳連線錯誤
    pub fn with_failing_listing(mut self, prefix: impl Into<String>) -> Self {
        self.failing_prefixes.push(prefix.into());
        self
    }

    pub fn with_failing_download(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects.insert(key.into(), data.into());
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// 目前為止 `list_page` 被呼叫的次數
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    fn entries(&self, prefix: &str, delimiter: Option<&str>) -> Vec<Entry> {
        let mut entries: Vec<Entry> = Vec::new();

        for key in self.objects.keys().filter(|k| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            let grouped = delimiter
                .filter(|d| !d.is_empty())
                .and_then(|d| rest.find(d).map(|idx| format!("{}{}", prefix, &rest[..idx + d.len()])));

            match grouped {
                Some(common) => {
                    // 排序後相同前綴的 key 必定相鄰
                    let duplicate = matches!(entries.last(), Some(Entry::Prefix(last)) if *last == common);
                    if !duplicate {
                        entries.push(Entry::Prefix(common));
                    }
                }
                None => entries.push(Entry::Key(key.clone())),
            }
        }

        entries
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn configure(&mut self, config: &SourceStoreConfig) -> Result<()> {
        self.bucket = Some(config.bucket.clone());
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);

        if self.failing_prefixes.iter().any(|p| prefix.starts_with(p.as_str())) {
            return Err(TransferError::store(
                format!("Failed to list objects under '{}'", prefix),
                "simulated listing failure",
            ));
        }

        let start = match continuation_token {
            Some(token) => token.parse::<usize>().map_err(|e| {
                TransferError::store(format!("Invalid continuation token '{}'", token), e)
            })?,
            None => 0,
        };

        let entries = self.entries(prefix, delimiter);
        let end = (start + self.page_size.max(1)).min(entries.len());

        let mut page = ListPage::default();
        for entry in entries.iter().take(end).skip(start) {
            match entry {
                Entry::Key(key) => page.keys.push(key.clone()),
                Entry::Prefix(common) => page.common_prefixes.push(common.clone()),
            }
        }
        if end < entries.len() {
            page.next_continuation_token = Some(end.to_string());
        }

        Ok(page)
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        if self.failing_keys.contains(key) {
            return Err(TransferError::store(
                format!("Failed to download '{}'", key),
                "simulated download failure",
            ));
        }

        self.objects.get(key).cloned().ok_or_else(|| {
            TransferError::store(
                format!("Failed to download '{}'", key),
                std::io::Error::new(std::io::ErrorKind::NotFound, "NoSuchKey"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> MemoryStore {
        MemoryStore::new()
            .with_object("images/cats/", Vec::new())
            .with_object("images/cats/a.jpg", b"a".to_vec())
            .with_object("images/cats/b.jpg", b"b".to_vec())
            .with_object("images/dogs/c.png", b"c".to_vec())
            .with_object("images/readme.txt", b"r".to_vec())
    }

    #[tokio::test]
    async fn test_delimiter_groups_common_prefixes() {
        let store = sample_store();
        let page = store.list_page("images/", Some("/"), None).await.unwrap();

        assert_eq!(page.common_prefixes, vec!["images/cats/", "images/dogs/"]);
        assert_eq!(page.keys, vec!["images/readme.txt"]);
        assert!(page.next_continuation_token.is_none());
    }

    #[tokio::test]
    async fn test_pagination_tokens() {
        let store = sample_store().with_page_size(2);

        let first = store.list_page("images/cats/", None, None).await.unwrap();
        assert_eq!(first.keys, vec!["images/cats/", "images/cats/a.jpg"]);
        let token = first.next_continuation_token.clone();
        assert!(token.is_some());

        let second = store.list_page("images/cats/", None, token).await.unwrap();
        assert_eq!(second.keys, vec!["images/cats/b.jpg"]);
        assert!(second.next_continuation_token.is_none());
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_store_errors() {
        let store = sample_store()
            .with_failing_listing("images/dogs")
            .with_failing_download("images/cats/a.jpg");

        let err = store.list_page("images/dogs/", None, None).await.unwrap_err();
        assert!(matches!(err, TransferError::StoreConnection { .. }));

        let err = store.get_object("images/cats/a.jpg").await.unwrap_err();
        assert!(matches!(err, TransferError::StoreConnection { .. }));

        assert!(store.get_object("missing").await.is_err());
        assert_eq!(store.get_object("images/cats/b.jpg").await.unwrap(), b"b");
    }
}
