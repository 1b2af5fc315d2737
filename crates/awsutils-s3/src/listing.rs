use std::sync::Arc;

use awsutils_common::{error::Result, types::ObjectInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    object::S3Object,
    traits::{ListObjectsRequest, ObjectStore},
};

/// Window on `last_modified`; both bounds are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeFilter {
    #[default]
    All,
    After(DateTime<Utc>),
    Before(DateTime<Utc>),
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl TimeFilter {
    pub fn from_bounds(after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        match (after, before) {
            (None, None) => Self::All,
            (Some(after), None) => Self::After(after),
            (None, Some(before)) => Self::Before(before),
            (Some(after), Some(before)) => Self::Between(after, before),
        }
    }

    pub fn matches(&self, last_modified: DateTime<Utc>) -> bool {
        match *self {
            Self::All => true,
            Self::After(after) => last_modified > after,
            Self::Before(before) => last_modified < before,
            Self::Between(after, before) => last_modified > after && last_modified < before,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSummary {
    pub count: u64,
    pub bytes: u64,
}

/// Walks a listing page by page with a `start-after` cursor.
pub struct ObjectPages<'a> {
    store: &'a dyn ObjectStore,
    request: ListObjectsRequest,
    pages: usize,
    done: bool,
}

impl<'a> ObjectPages<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &str, prefix: &str) -> Self {
        Self {
            store,
            request: ListObjectsRequest {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                ..Default::default()
            },
            pages: 0,
            done: false,
        }
    }

    pub fn with_page_size(mut self, max_keys: i32) -> Self {
        self.request.max_keys = Some(max_keys);
        self
    }

    /// `None` once the store reports no more pages or an empty page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ObjectInfo>>> {
        if self.done {
            return Ok(None);
        }

        let page = self.store.list_objects(&self.request).await?;
        self.pages += 1;
        debug!(
            bucket = %self.request.bucket,
            prefix = %self.request.prefix,
            page = self.pages,
            keys = page.key_count,
            truncated = page.is_truncated,
            "listed page"
        );

        let Some(last) = page.objects.last() else {
            self.done = true;
            return Ok(None);
        };
        if page.key_count == 0 {
            self.done = true;
            return Ok(None);
        }

        self.request.start_after = last.key.clone();
        if !page.is_truncated {
            self.done = true;
        }
        Ok(Some(page.objects))
    }
}

/// Every object under `prefix` accepted by `filter`, in listing order.
pub async fn list_objects(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    prefix: &str,
    filter: TimeFilter,
) -> Result<Vec<S3Object>> {
    let mut pages = ObjectPages::new(store.as_ref(), bucket, prefix);
    let mut objects = Vec::new();
    while let Some(page) = pages.next_page().await? {
        objects.extend(
            page.into_iter()
                .filter(|info| filter.matches(info.last_modified))
                .map(|info| S3Object::from_info(Arc::clone(store), info)),
        );
    }
    Ok(objects)
}

/// Count and byte total of every object under `prefix`.
pub async fn total_size(store: &dyn ObjectStore, bucket: &str, prefix: &str) -> Result<SizeSummary> {
    let mut pages = ObjectPages::new(store, bucket, prefix);
    let mut summary = SizeSummary::default();
    while let Some(page) = pages.next_page().await? {
        for info in &page {
            summary.count += 1;
            summary.bytes += info.size;
        }
    }
    Ok(summary)
}
