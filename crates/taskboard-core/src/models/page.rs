use serde::{Deserialize, Serialize};

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PageMeta {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
    pub per_page: u32,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            page: 1,
            pages: 1,
            total: 0,
            per_page: 10,
        }
    }
}

impl PageMeta {
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// "Page 2 of 5 (43 total)"
    pub fn summary(&self) -> String {
        format!(
            "Page {} of {} ({} total)",
            self.page,
            self.pages.max(1),
            self.total
        )
    }
}

/// A page of records plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: PageMeta,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            meta: PageMeta::default(),
        }
    }
}

/// Acknowledgement returned by delete endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_meta_navigation() {
        let meta = PageMeta {
            page: 2,
            pages: 3,
            total: 25,
            per_page: 10,
        };
        assert!(meta.has_next());
        assert!(meta.has_prev());

        let last = PageMeta { page: 3, ..meta };
        assert!(!last.has_next());

        let first = PageMeta::default();
        assert!(!first.has_prev());
        assert!(!first.has_next());
    }

    #[test]
    fn test_page_summary_never_shows_zero_pages() {
        let meta = PageMeta {
            page: 1,
            pages: 0,
            total: 0,
            per_page: 10,
        };
        assert_eq!(meta.summary(), "Page 1 of 1 (0 total)");
    }

    #[test]
    fn test_parse_page_envelope() {
        let json = r#"{"data": [1, 2, 3], "meta": {"page": 1, "pages": 1, "total": 3, "per_page": 10}}"#;
        let page: Page<i64> = serde_json::from_str(json).unwrap();
        assert_eq!(page.data, vec![1, 2, 3]);
        assert_eq!(page.meta.total, 3);
    }
}
