//! Option source adapter: turns a field plus a search fragment into
//! `(value, label)` pairs, either immediately from a static list or through
//! an async [`OptionLoader`].
use crate::schema::{FieldSpec, OptionItem, OptionSource};
use crate::suggest::match_rank;

use anyhow::Result;
use async_trait::async_trait;
use lookup_cancel::CancellationToken;
use std::{fmt, sync::Arc, time::Duration};

/// Async source of options for an enumerated field.
///
/// Implementations may poll `token` and stop early once a newer lookup has
/// started; the builder discards superseded responses either way.
#[async_trait]
pub trait OptionLoader: Send + Sync {
    async fn load(&self, search: &str, token: &CancellationToken) -> Result<Vec<OptionItem>>;
}

pub enum Lookup {
    Ready(Vec<OptionItem>),
    Deferred(Arc<dyn OptionLoader>),
}

/// Resolves `search` against the option source of `field`.
///
/// Fields without a source resolve to an empty list.
pub fn lookup(field: &FieldSpec, search: &str) -> Lookup {
    match field.source() {
        Some(OptionSource::Loader(loader)) => Lookup::Deferred(loader.clone()),
        Some(OptionSource::Static(items)) => Lookup::Ready(filter_static(items, search)),
        None => Lookup::Ready(Vec::new()),
    }
}

/// Case-insensitive label filter; prefix matches come first, ties keep
/// declaration order.
pub fn filter_static(items: &[OptionItem], search: &str) -> Vec<OptionItem> {
    let mut ranked: Vec<(u8, &OptionItem)> = items
        .iter()
        .filter_map(|item| match_rank(&item.label, search).map(|rank| (rank, item)))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, item)| item.clone()).collect()
}

/// An async lookup the host has to drive to completion.
pub struct LookupRequest {
    pub field: String,
    pub search: String,
    pub token: CancellationToken,
    loader: Arc<dyn OptionLoader>,
}

impl LookupRequest {
    pub(crate) fn new(
        field: String,
        search: String,
        token: CancellationToken,
        loader: Arc<dyn OptionLoader>,
    ) -> Self {
        Self {
            field,
            search,
            token,
            loader,
        }
    }

    pub async fn run(self) -> LookupResponse {
        let result = self.loader.load(&self.search, &self.token).await;
        LookupResponse {
            field: self.field,
            search: self.search,
            token: self.token,
            result,
        }
    }
}

impl fmt::Debug for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupRequest")
            .field("field", &self.field)
            .field("search", &self.search)
            .field("version", &self.token.version())
            .finish()
    }
}

#[derive(Debug)]
pub struct LookupResponse {
    pub field: String,
    pub search: String,
    pub token: CancellationToken,
    pub result: Result<Vec<OptionItem>>,
}

/// Loader over a fixed list, optionally answering after `latency`.
pub struct StaticLoader {
    items: Vec<OptionItem>,
    latency: Option<Duration>,
}

impl StaticLoader {
    pub fn new(items: Vec<OptionItem>) -> Self {
        Self {
            items,
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl OptionLoader for StaticLoader {
    async fn load(&self, search: &str, _token: &CancellationToken) -> Result<Vec<OptionItem>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(filter_static(&self.items, search))
    }
}
