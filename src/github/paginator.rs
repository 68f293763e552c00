//! Count-aware pagination
//!
//! Naive pagination discovers the end of a listing by fetching one page too
//! many and finding it empty. Several GitHub endpoints declare a total
//! count in the response body; `SmartPaginator` tracks it so iteration
//! stops as soon as the total has been consumed, falling back to the
//! short-page heuristic when no total is ever declared.

use std::collections::VecDeque;

use futures::future::BoxFuture;
use futures::stream::{self, Stream};

use crate::error::Result;

/// One fetched page: the mapped items plus the declared total, if any
#[derive(Debug)]
pub struct PageItems<T> {
    /// Items extracted from the response body
    pub items: Vec<T>,
    /// The endpoint's `total_count` (or similar) field
    pub total_count: Option<usize>,
}

/// Lazy, forward-only iterator over a paged list endpoint
///
/// Constructed with a request function taking `(page, per_page)`; pages are
/// numbered from 1. Each advance past the buffered page is a suspension
/// point. Dropping the paginator mid-iteration performs no further
/// requests and holds nothing that needs explicit release.
pub struct SmartPaginator<'a, T> {
    request: Box<dyn FnMut(u32, u8) -> BoxFuture<'a, Result<PageItems<T>>> + Send + 'a>,
    per_page: u8,
    next_page: u32,
    total: Option<usize>,
    consumed: usize,
    buffered: VecDeque<T>,
    exhausted: bool,
}

impl<'a, T: Send + 'a> SmartPaginator<'a, T> {
    /// Create a paginator over a request function
    pub fn new<F>(per_page: u8, request: F) -> Self
    where
        F: FnMut(u32, u8) -> BoxFuture<'a, Result<PageItems<T>>> + Send + 'a,
    {
        Self {
            request: Box::new(request),
            per_page,
            next_page: 1,
            total: None,
            consumed: 0,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Get the next item, fetching a new page if warranted
    ///
    /// Returns `Ok(None)` once the listing is exhausted: either a declared
    /// total has been consumed, or a page came back short. A request error
    /// ends the iteration; later calls return `Ok(None)`.
    pub async fn try_next(&mut self) -> Result<Option<T>> {
        if let Some(item) = self.buffered.pop_front() {
            self.consumed += 1;
            return Ok(Some(item));
        }

        if self.exhausted {
            return Ok(None);
        }

        if let Some(total) = self.total {
            if self.consumed >= total {
                self.exhausted = true;
                return Ok(None);
            }
        }

        let page = match (self.request)(self.next_page, self.per_page).await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };
        self.next_page += 1;

        if page.total_count.is_some() {
            self.total = page.total_count;
        }
        if page.items.len() < self.per_page as usize {
            self.exhausted = true;
        }
        self.buffered.extend(page.items);

        match self.buffered.pop_front() {
            Some(item) => {
                self.consumed += 1;
                Ok(Some(item))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Drain the remaining items into a vector
    pub async fn try_collect(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Adapt into a `Stream` of results
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + 'a {
        stream::unfold(self, |mut paginator| async move {
            match paginator.try_next().await {
                Ok(Some(item)) => Some((Ok(item), paginator)),
                Ok(None) => None,
                Err(e) => Some((Err(e), paginator)),
            }
        })
    }
}
