/// What the failure plan does when it is asked to scan SQL `NULL`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NullSearch {
    /// Try every registered type, in ascending OID order, until one scans `NULL` into the
    /// target.
    #[default]
    AllTypes,

    /// Report the resolution failure.
    Disabled,
}

/// Options for a [`PgTypeMap`][super::PgTypeMap].
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub(crate) max_depth: usize,
    pub(crate) null_search: NullSearch,
    pub(crate) plan_cache_capacity: usize,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            max_depth: 8,
            null_search: NullSearch::AllTypes,
            plan_cache_capacity: 1024,
        }
    }
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many times the wrapping chain may re-enter plan resolution before giving up.
    ///
    /// The default is 8.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets how the failure plan handles an untyped `NULL`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use pgcodec_postgres::{MapOptions, NullSearch};
    /// let options = MapOptions::new().null_search(NullSearch::Disabled);
    /// assert_eq!(options.get_null_search(), NullSearch::Disabled);
    /// ```
    pub fn null_search(mut self, search: NullSearch) -> Self {
        self.null_search = search;
        self
    }

    /// Sets the capacity of each plan cache (one for encode plans, one for scan plans).
    /// Caching is handled using LRU, so the least recently used plan is dropped when the limit
    /// is hit. A capacity of `0` disables caching.
    ///
    /// The default capacity is 1024 plans.
    pub fn plan_cache_capacity(mut self, capacity: usize) -> Self {
        self.plan_cache_capacity = capacity;
        self
    }
}

impl MapOptions {
    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn get_null_search(&self) -> NullSearch {
        self.null_search
    }

    pub fn get_plan_cache_capacity(&self) -> usize {
        self.plan_cache_capacity
    }
}
