//! Fixed-size pages over a sorted listing. Pages are 1-based.

/// Entries on `page`: `[(page-1)*size, min(page*size, len))`.
pub fn slice<T>(all: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= all.len() {
        return &[];
    }
    let end = page.saturating_mul(page_size).min(all.len());
    &all[start..end]
}

/// True while `page` ends before the last entry.
pub fn has_more<T>(all: &[T], page: usize, page_size: usize) -> bool {
    page.saturating_mul(page_size) < all.len()
}

/// Number of pages needed for `len` entries.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Current page of one page session. Only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    current_page: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current<'a, T>(&self, all: &'a [T]) -> &'a [T] {
        slice(all, self.current_page, self.page_size)
    }

    /// Everything shown so far: pages `1..=current_page`.
    pub fn visible<'a, T>(&self, all: &'a [T]) -> &'a [T] {
        let end = self.current_page.saturating_mul(self.page_size).min(all.len());
        &all[..end]
    }

    pub fn has_more<T>(&self, all: &[T]) -> bool {
        has_more(all, self.current_page, self.page_size)
    }

    /// Move to the next page and return its entries.
    pub fn advance<'a, T>(&mut self, all: &'a [T]) -> &'a [T] {
        self.current_page += 1;
        self.current(all)
    }

    /// Jump straight to `page` (used when a reload asks for several pages).
    /// Never moves backwards.
    pub fn advance_to(&mut self, page: usize) {
        self.current_page = self.current_page.max(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slices_partition_the_listing() {
        for len in 0..25usize {
            for size in 1..7usize {
                let all: Vec<usize> = (0..len).collect();
                let mut joined = Vec::new();
                for page in 1..=page_count(len, size) {
                    let part = slice(&all, page, size);
                    assert!(!part.is_empty());
                    assert!(part.len() <= size);
                    joined.extend_from_slice(part);
                }
                assert_eq!(joined, all, "len={len} size={size}");
                assert!(slice(&all, page_count(len, size) + 1, size).is_empty());
            }
        }
    }

    #[test]
    fn test_has_more_boundary() {
        let all = [1, 2, 3, 4];
        assert!(has_more(&all, 1, 3));
        assert!(!has_more(&all, 2, 3));
        assert!(!has_more(&all, 1, 4));
        assert!(!has_more::<i32>(&[], 1, 4));
    }

    #[test]
    fn test_page_zero_is_empty() {
        assert!(slice(&[1, 2, 3], 0, 2).is_empty());
        assert!(slice(&[1, 2, 3], 1, 0).is_empty());
    }

    #[test]
    fn test_pager_advances_monotonically() {
        let all: Vec<u32> = (0..7).collect();
        let mut pager = Pager::new(3);
        assert_eq!(pager.current(&all), &[0, 1, 2]);
        assert!(pager.has_more(&all));

        assert_eq!(pager.advance(&all), &[3, 4, 5]);
        assert_eq!(pager.visible(&all), &[0, 1, 2, 3, 4, 5]);

        assert_eq!(pager.advance(&all), &[6]);
        assert!(!pager.has_more(&all));
        assert_eq!(pager.visible(&all), all.as_slice());

        pager.advance_to(1);
        assert_eq!(pager.current_page(), 3);
    }
}
