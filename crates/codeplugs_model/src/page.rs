use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// A single page holding every item.
    pub fn whole(data: Vec<T>) -> Self {
        let total = data.len();

        Self {
            data,
            meta: PageMeta {
                total,
                page: 1,
                limit: total,
            },
        }
    }
}

/// A 1-based page request. Out-of-range values fall back to the first page
/// and the default limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: usize) -> Self {
        let page = page.filter(|page| *page >= 1).unwrap_or(1) as usize;
        let limit = limit
            .filter(|limit| *limit >= 1)
            .map(|limit| limit as usize)
            .unwrap_or(default_limit);

        Self { page, limit }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Cuts the requested page out of an already filtered and sorted list.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let data = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit)
            .collect();

        Page {
            data,
            meta: PageMeta {
                total,
                page: self.page,
                limit: self.limit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(
            PageRequest::new(None, None, 50),
            PageRequest { page: 1, limit: 50 }
        );
        assert_eq!(
            PageRequest::new(Some(0), Some(-3), 100),
            PageRequest { page: 1, limit: 100 }
        );
        assert_eq!(
            PageRequest::new(Some(3), Some(20), 50),
            PageRequest { page: 3, limit: 20 }
        );
    }

    #[test]
    fn test_paginate() {
        let page = PageRequest::new(Some(2), Some(2), 50).paginate((1..=5).collect());

        assert_eq!(page.data, vec![3, 4]);
        assert_eq!(
            page.meta,
            PageMeta {
                total: 5,
                page: 2,
                limit: 2
            }
        );
    }

    #[test]
    fn test_whole() {
        let page = Page::whole(vec!["a", "b", "c"]);

        assert_eq!(page.data.len(), 3);
        assert_eq!(
            page.meta,
            PageMeta {
                total: 3,
                page: 1,
                limit: 3
            }
        );
    }

    #[test]
    fn test_paginate_past_end() {
        let page = PageRequest::new(Some(9), Some(10), 50).paginate(vec!["a", "b"]);

        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 2);
    }
}
