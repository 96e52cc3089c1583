use crate::error::{ModelError, ModelResult};

/// Server-side ceiling for `limit` on every list endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;

/// `limit` the backend applies when none is sent.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Zero-based page cursor translated into `skip`/`limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    index: u32,
    size: u32,
}

impl PageRequest {
    pub fn new(index: u32, size: u32) -> ModelResult<Self> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(ModelError::PageSizeOutOfRange {
                size,
                max: MAX_PAGE_SIZE,
            });
        }
        Ok(Self { index, size })
    }

    pub fn first(size: u32) -> ModelResult<Self> {
        Self::new(0, size)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.index) * u64::from(self.size)
    }

    pub fn limit(&self) -> u32 {
        self.size
    }

    pub fn with_index(self, index: u32) -> Self {
        Self { index, ..self }
    }
}

/// One page of a server-backed collection.
///
/// Pages are replaced wholesale on every successful fetch and never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub index: u32,
    pub size: u32,
}

impl<T> ListPage<T> {
    pub fn empty(size: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            index: 0,
            size,
        }
    }

    pub fn from_response(
        request: PageRequest,
        items: Vec<T>,
        total: u64,
    ) -> Self {
        Self {
            items,
            total,
            index: request.index(),
            size: request.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages needed to show `total` items; at least one.
    pub fn page_count(&self) -> u32 {
        if self.total == 0 || self.size == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_is_index_times_size() {
        let request = PageRequest::new(3, 25).unwrap();
        assert_eq!(request.skip(), 75);
        assert_eq!(request.limit(), 25);
    }

    #[test]
    fn rejects_sizes_outside_server_bounds() {
        assert!(PageRequest::new(0, 0).is_err());
        assert!(PageRequest::new(0, MAX_PAGE_SIZE + 1).is_err());
        assert!(PageRequest::new(0, MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn page_count_rounds_up_and_never_drops_below_one() {
        let page: ListPage<u8> = ListPage {
            items: vec![],
            total: 21,
            index: 2,
            size: 10,
        };
        assert_eq!(page.page_count(), 3);
        assert!(!page.has_next());
        assert!(page.has_previous());

        assert_eq!(ListPage::<u8>::empty(10).page_count(), 1);
    }
}
