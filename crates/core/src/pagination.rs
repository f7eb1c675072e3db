//! Page requests and paginated results.

use serde::{Deserialize, Serialize};

/// Default page size for order and admin listings.
pub const DEFAULT_PAGE_SIZE: i64 = 12;

/// Upper bound on any client-supplied page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A 1-based page request, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    size: i64,
}

impl PageRequest {
    /// Build a request from optional query values.
    ///
    /// Missing or non-positive pages become 1; the size is clamped to
    /// `1..=MAX_PAGE_SIZE` and defaults to `default_size`.
    #[must_use]
    pub fn new(page: Option<i64>, size: Option<i64>, default_size: i64) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            size: size
                .filter(|s| *s > 0)
                .unwrap_or(default_size)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Page `page` with the default size.
    #[must_use]
    pub fn page(page: Option<i64>) -> Self {
        Self::new(page, None, DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub const fn number(&self) -> i64 {
        self.page
    }

    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.size
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::page(None)
    }
}

/// One page of results plus the totals a client needs to page through them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub count: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    #[must_use]
    pub fn new(data: Vec<T>, count: i64, request: PageRequest) -> Self {
        Self {
            data,
            count,
            total_pages: total_pages(count, request.size()),
        }
    }

    /// Transform every item, keeping the counts.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(count / size)`; zero when there is nothing to show.
#[must_use]
pub const fn total_pages(count: i64, size: i64) -> i64 {
    if count <= 0 || size <= 0 {
        return 0;
    }
    (count + size - 1) / size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let req = PageRequest::new(None, None, 15);
        assert_eq!((req.number(), req.size(), req.offset()), (1, 15, 0));

        let req = PageRequest::new(Some(0), Some(1000), 15);
        assert_eq!((req.number(), req.size()), (1, MAX_PAGE_SIZE));

        let req = PageRequest::new(Some(3), Some(-4), 15);
        assert_eq!((req.size(), req.offset()), (15, 30));
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 12), 0);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        assert_eq!(total_pages(1, 12), 1);
    }

    #[test]
    fn test_map_keeps_counts() {
        let page = Paginated::new(vec![1, 2, 3], 27, PageRequest::page(Some(1)));
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.data, vec![10, 20, 30]);
        assert_eq!((mapped.count, mapped.total_pages), (27, 3));
    }
}
