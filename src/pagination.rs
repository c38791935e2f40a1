/// Posts per page on every feed.
pub const PAGE_SIZE: i64 = 10;

/// One page of a feed. Page numbers start at 1.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
}

/// Position of a requested page within `total` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Out-of-range and unparsable page numbers clamp instead of failing.
    pub fn resolve(raw: Option<&str>, total: i64) -> Self {
        let num_pages = if total <= 0 {
            1
        } else {
            (total + PAGE_SIZE - 1) / PAGE_SIZE
        };
        let requested = raw.map_or(1, requested_page);
        let number = requested.clamp(1, num_pages);

        PageWindow {
            number,
            num_pages,
            offset: (number - 1) * PAGE_SIZE,
            limit: PAGE_SIZE,
        }
    }

    pub fn with_items<T>(self, items: Vec<T>, total: i64) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            total,
        }
    }
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> i64 {
        (self.number - 1).max(1)
    }

    pub fn next_page_number(&self) -> i64 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn has_other_pages(&self) -> bool {
        self.num_pages > 1
    }
}

/// Integers too large for `i64` still count as far past the last page.
fn requested_page(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return n;
    }
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    if raw.starts_with('-') {
        1
    } else {
        i64::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_feed_has_one_page() {
        let w = PageWindow::resolve(None, 0);
        assert_eq!(w.number, 1);
        assert_eq!(w.num_pages, 1);
        assert_eq!(w.offset, 0);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(PageWindow::resolve(None, 10).num_pages, 1);
        assert_eq!(PageWindow::resolve(None, 11).num_pages, 2);
        assert_eq!(PageWindow::resolve(None, 25).num_pages, 3);
    }

    #[test]
    fn beyond_last_page_clamps_to_last() {
        let w = PageWindow::resolve(Some("99"), 25);
        assert_eq!(w.number, 3);
        assert_eq!(w.offset, 20);

        let huge = PageWindow::resolve(Some("99999999999999999999"), 25);
        assert_eq!(huge.number, 3);
        assert_eq!(huge.offset, 20);
        assert_eq!(PageWindow::resolve(Some("+99999999999999999999"), 25).number, 3);
        assert_eq!(PageWindow::resolve(Some("-99999999999999999999"), 25).number, 1);
    }

    #[test]
    fn below_first_page_clamps_to_first() {
        assert_eq!(PageWindow::resolve(Some("0"), 25).number, 1);
        assert_eq!(PageWindow::resolve(Some("-4"), 25).number, 1);
    }

    #[test]
    fn garbage_page_means_first() {
        assert_eq!(PageWindow::resolve(Some("last"), 25).number, 1);
        assert_eq!(PageWindow::resolve(Some(""), 25).number, 1);
        assert_eq!(PageWindow::resolve(Some("-"), 25).number, 1);
        assert_eq!(PageWindow::resolve(Some("9e99"), 25).number, 1);
    }

    #[test]
    fn navigation_helpers() {
        let page = PageWindow::resolve(Some("2"), 25).with_items(vec![1, 2, 3], 25);
        assert!(page.has_previous());
        assert!(page.has_next());
        assert_eq!(page.previous_page_number(), 1);
        assert_eq!(page.next_page_number(), 3);

        let last = PageWindow::resolve(Some("3"), 25).with_items(Vec::<i32>::new(), 25);
        assert!(!last.has_next());
        assert_eq!(last.map(|x| x * 2).number, 3);
    }
}
