//! Fetch strategies for cached catalog reads.
//!
//! Every read through `CatalogService` uses one of four strategies:
//!
//! | Strategy | Cache Hit | Cache Miss | Use Case |
//! |----------|-----------|-----------|----------|
//! | **Fresh** | Return | Return empty | Cache-only views; never touch the backend |
//! | **Refresh** | Return | Client fallback | Default; prefer cache, ensure availability |
//! | **Invalidate** | Delete | Fetch client | Known-stale data, after an external change |
//! | **Bypass** | Ignore | Client always | Read-your-writes, e.g. before a status change |
//!
//! Refresh, Invalidate and Bypass all store the fetched result so later
//! readers can hit it.

/// Strategy enum controlling cache lookup and fallback for one read.
///
/// ```
/// use delivery_kit::strategy::FetchStrategy;
///
/// assert_eq!(FetchStrategy::default(), FetchStrategy::Refresh);
/// assert_eq!(FetchStrategy::Bypass.to_string(), "Bypass");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    /// Cache only. A miss yields no rows.
    Fresh,

    /// Cache first, query the client on a miss and store the result.
    #[default]
    Refresh,

    /// Drop the cached entry, then query the client and store the result.
    Invalidate,

    /// Skip the cache lookup, query the client and store the result.
    Bypass,
}

impl FetchStrategy {
    /// Does this strategy consult the cache before the client?
    pub fn reads_cache(&self) -> bool {
        matches!(self, FetchStrategy::Fresh | FetchStrategy::Refresh)
    }
}

impl std::fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStrategy::Fresh => write!(f, "Fresh"),
            FetchStrategy::Refresh => write!(f, "Refresh"),
            FetchStrategy::Invalidate => write!(f, "Invalidate"),
            FetchStrategy::Bypass => write!(f, "Bypass"),
        }
    }
}
