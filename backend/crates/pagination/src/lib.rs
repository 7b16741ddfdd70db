//! Offset pagination primitives shared by backend list endpoints.
//!
//! A [`PageRequest`] is validated against endpoint-specific [`PageLimits`]
//! before it reaches a repository. Handlers wrap the resulting rows in a
//! [`Paginated`] envelope, which can also render navigation links relative to
//! the request URL.

use serde::Serialize;
use url::Url;

/// Query parameter carrying the 1-based page number.
pub const PAGE_PARAM: &str = "page";
/// Query parameter carrying the requested page size.
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// Errors raised while validating a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// Pages are numbered from one.
    #[error("page must be at least 1")]
    ZeroPage,
    /// A page must hold at least one item.
    #[error("page size must be at least 1")]
    ZeroPageSize,
    /// The requested page size exceeds the endpoint maximum.
    #[error("page size {requested} exceeds the maximum of {max}")]
    PageSizeTooLarge {
        /// Size supplied by the caller.
        requested: u32,
        /// Largest size the endpoint accepts.
        max: u32,
    },
}

/// Default and maximum page sizes for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default_size: u32,
    max_size: u32,
}

impl PageLimits {
    /// Build limits; the default is clamped to the maximum.
    #[must_use]
    pub const fn new(default_size: u32, max_size: u32) -> Self {
        let clamped = if default_size > max_size {
            max_size
        } else {
            default_size
        };
        Self {
            default_size: clamped,
            max_size,
        }
    }

    /// Page size used when the caller supplies none.
    #[must_use]
    pub const fn default_size(&self) -> u32 {
        self.default_size
    }

    /// Largest page size accepted.
    #[must_use]
    pub const fn max_size(&self) -> u32 {
        self.max_size
    }
}

/// A validated request for one page of results.
///
/// # Examples
/// ```
/// use pagination::{PageLimits, PageRequest};
///
/// let request = PageRequest::new(Some(3), None, PageLimits::new(10, 50))?;
/// assert_eq!(request.offset(), 20);
/// assert_eq!(request.page_size(), 10);
/// # Ok::<(), pagination::PaginationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate optional caller input against `limits`.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError`] when the page or page size is zero, or the
    /// page size exceeds [`PageLimits::max_size`].
    pub const fn new(
        page: Option<u32>,
        page_size: Option<u32>,
        limits: PageLimits,
    ) -> Result<Self, PaginationError> {
        let resolved_page = match page {
            Some(value) => value,
            None => 1,
        };
        let resolved_size = match page_size {
            Some(value) => value,
            None => limits.default_size,
        };
        if resolved_page == 0 {
            return Err(PaginationError::ZeroPage);
        }
        if resolved_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        if resolved_size > limits.max_size {
            return Err(PaginationError::PageSizeTooLarge {
                requested: resolved_size,
                max: limits.max_size,
            });
        }
        Ok(Self {
            page: resolved_page,
            page_size: resolved_size,
        })
    }

    /// First page with the endpoint default size.
    #[must_use]
    pub const fn first(limits: PageLimits) -> Self {
        Self {
            page: 1,
            page_size: if limits.default_size == 0 {
                1
            } else {
                limits.default_size
            },
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip before this page starts.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * (self.page_size as u64)
    }
}

/// Navigation links for a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLinks {
    /// Link to the current page.
    #[serde(rename = "self")]
    pub current: String,
    /// Link to the following page, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Link to the preceding page, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

/// One page of results plus the totals needed to navigate the rest.
///
/// # Examples
/// ```
/// use pagination::{PageLimits, PageRequest, Paginated};
///
/// let request = PageRequest::first(PageLimits::new(2, 10));
/// let page = Paginated::new(vec!["a", "b"], request, 5);
/// assert_eq!(page.total_pages, 3);
/// assert!(page.has_next());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Number of items across all pages.
    pub total_items: u64,
    /// Number of pages needed for `total_items`.
    pub total_pages: u64,
    /// Navigation links, when the envelope was rendered for a request URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<PageLinks>,
}

impl<T> Paginated<T> {
    /// Wrap `data` for `request` given the overall item count.
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            data,
            page: request.page(),
            page_size: request.page_size(),
            total_items,
            total_pages: total_items.div_ceil(u64::from(request.page_size())),
            links: None,
        }
    }

    /// Whether a page follows this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }

    /// Whether a page precedes this one.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Convert each item, keeping the pagination metadata.
    #[must_use]
    pub fn map<U>(self, convert: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(convert).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            links: self.links,
        }
    }

    /// Attach links derived from `base`, replacing any paging parameters it
    /// already carries.
    #[must_use]
    pub fn with_links(mut self, base: &Url) -> Self {
        let next = self
            .has_next()
            .then(|| page_url(base, self.page.saturating_add(1), self.page_size));
        let prev = self
            .has_prev()
            .then(|| page_url(base, self.page.saturating_sub(1), self.page_size));
        self.links = Some(PageLinks {
            current: page_url(base, self.page, self.page_size),
            next,
            prev,
        });
        self
    }
}

fn page_url(base: &Url, page: u32, page_size: u32) -> String {
    let mut target = base.clone();
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM && key != PAGE_SIZE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    target
        .query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PAGE_PARAM, &page.to_string())
        .append_pair(PAGE_SIZE_PARAM, &page_size.to_string());
    target.into()
}
