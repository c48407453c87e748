//! Page-number pagination shared by every post listing.

use serde::Serialize;
use thiserror::Error;

use crate::error::RepoError;

/// Posts per listing page.
pub const PAGE_SIZE: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Invalid page number: {0}")]
    Invalid(String),

    #[error("Page {number} is out of range (1..={num_pages})")]
    OutOfRange { number: u64, num_pages: u64 },
}

impl From<PageError> for RepoError {
    fn from(_: PageError) -> Self {
        RepoError::NotFound
    }
}

/// A 1-based page number together with the page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: u64,
    size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: 1,
            size: PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(number: u64) -> Result<Self, PageError> {
        if number == 0 {
            return Err(PageError::Invalid(number.to_string()));
        }
        Ok(Self {
            number,
            size: PAGE_SIZE,
        })
    }

    /// Parse the `?page=` query value; a missing value means the first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, PageError> {
        match raw {
            None => Ok(Self::default()),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| PageError::Invalid(raw.to_string()))
                .and_then(Self::new),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.size
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// An empty listing still has one (empty) page.
    pub fn num_pages_for(total: u64, size: u64) -> u64 {
        total.div_ceil(size).max(1)
    }

    /// Check that `request` falls inside a listing of `total` items.
    pub fn check_range(request: PageRequest, total: u64) -> Result<(), PageError> {
        let num_pages = Self::num_pages_for(total, request.size());
        if request.number() > num_pages {
            return Err(PageError::OutOfRange {
                number: request.number(),
                num_pages,
            });
        }
        Ok(())
    }

    /// Wrap an already-fetched slice of a listing of `total` items.
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Result<Self, PageError> {
        Self::check_range(request, total)?;
        let num_pages = Self::num_pages_for(total, request.size());
        Ok(Self {
            items,
            number: request.number(),
            num_pages,
            total,
            has_next: request.number() < num_pages,
            has_previous: request.number() > 1,
        })
    }

    /// Cut the requested page out of a fully materialized listing.
    pub fn paginate(all: Vec<T>, request: PageRequest) -> Result<Self, PageError> {
        let total = all.len() as u64;
        Self::check_range(request, total)?;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.size() as usize)
            .collect();
        Self::new(items, request, total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }

    /// Like [`Page::map`], stopping at the first failing item.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_numbers() {
        assert_eq!(PageRequest::parse(None).unwrap().number(), 1);
        assert_eq!(PageRequest::parse(Some("3")).unwrap().number(), 3);
        assert!(matches!(PageRequest::parse(Some("0")), Err(PageError::Invalid(_))));
        assert!(matches!(PageRequest::parse(Some("last")), Err(PageError::Invalid(_))));
        assert!(matches!(PageRequest::parse(Some("-1")), Err(PageError::Invalid(_))));
    }

    #[test]
    fn test_paginate_splits_into_tens() {
        let all: Vec<u32> = (0..25).collect();

        let first = Page::paginate(all.clone(), PageRequest::new(1).unwrap()).unwrap();
        assert_eq!(first.items, (0..10).collect::<Vec<_>>());
        assert_eq!(first.num_pages, 3);
        assert_eq!(first.total, 25);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = Page::paginate(all, PageRequest::new(3).unwrap()).unwrap();
        assert_eq!(last.items, (20..25).collect::<Vec<_>>());
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page = Page::<u32>::paginate(Vec::new(), PageRequest::default()).unwrap();
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());

        let err = Page::<u32>::paginate(Vec::new(), PageRequest::new(2).unwrap()).unwrap_err();
        assert_eq!(err, PageError::OutOfRange { number: 2, num_pages: 1 });
    }
}
