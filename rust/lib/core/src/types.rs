use serde::Serialize;

/// One page of a paginated listing.
///
/// Serialized as `{"pageSize": .., "currentPage": .., "data": [..]}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub page_size: usize,
    pub current_page: usize,
    pub data: Vec<T>,
}

impl<T: Serialize> Page<T> {
    /// Zero-based offset of the first item on `page`.
    pub fn offset(page: usize, page_size: usize) -> usize {
        page.saturating_mul(page_size)
    }

    /// Slice one page out of an already ordered sequence.
    pub fn slice(items: impl IntoIterator<Item = T>, page: usize, page_size: usize) -> Self {
        let data = items
            .into_iter()
            .skip(Self::offset(page, page_size))
            .take(page_size)
            .collect();
        Self {
            page_size,
            current_page: page,
            data,
        }
    }
}

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
    }

    #[test]
    fn test_now_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.contains('T'));
    }

    #[test]
    fn test_page_slice() {
        let first = Page::slice(0..15, 0, 10);
        assert_eq!(first.data.len(), 10);
        assert_eq!(first.data[0], 0);

        let second = Page::slice(0..15, 1, 10);
        assert_eq!(second.data, vec![10, 11, 12, 13, 14]);
        assert_eq!(second.current_page, 1);

        let past_end = Page::slice(0..15, 2, 10);
        assert!(past_end.data.is_empty());

        // Huge page numbers must not overflow.
        let far = Page::slice(0..15, usize::MAX, 10);
        assert!(far.data.is_empty());
    }

    #[test]
    fn test_page_wire_format() {
        let page = Page::slice(vec!["a"], 0, 10);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"pageSize": 10, "currentPage": 0, "data": ["a"]})
        );
    }
}
