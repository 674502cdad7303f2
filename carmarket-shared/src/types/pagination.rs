use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u64 = 12;
pub const MAX_PER_PAGE: u64 = 100;

/// 1-based page request, as sent by listing pages.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { DEFAULT_PER_PAGE }

impl PaginationParams {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    pub fn offset(&self) -> u64 {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit())
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    /// Slice an already filtered and ordered collection into one page.
    pub fn paginate<T: Serialize + Clone>(&self, items: &[T]) -> Paginated<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX).min(items.len());
        let end = offset.saturating_add(self.limit() as usize).min(items.len());
        Paginated::new(items[offset..end].to_vec(), items.len() as u64, self)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PER_PAGE }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        let total_pages = if total == 0 { 0 } else { total.div_ceil(per_page) };
        Self {
            items,
            total,
            page: params.page.max(1),
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_slices_requested_page() {
        let items: Vec<u32> = (1..=30).collect();
        let page = PaginationParams::new(3, 12).paginate(&items);
        assert_eq!(page.items, vec![25, 26, 27, 28, 29, 30]);
        assert_eq!(page.total, 30);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let items: Vec<u32> = (1..=5).collect();
        let page = PaginationParams::new(4, 2).paginate(&items);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn huge_page_number_is_empty_not_wrapped() {
        let items: Vec<u32> = (1..=5).collect();
        let page = PaginationParams::new(u64::MAX, 12).paginate(&items);
        assert!(page.items.is_empty());
        assert_eq!(page.page, u64::MAX);

        let page = PaginationParams::new((1 << 62) + 1, 12).paginate(&items);
        assert!(page.items.is_empty());
        assert_eq!(PaginationParams::new(u64::MAX, 100).offset(), u64::MAX);
    }

    #[test]
    fn per_page_is_capped() {
        let params = PaginationParams::new(1, 10_000);
        assert_eq!(params.limit(), MAX_PER_PAGE);
        assert_eq!(PaginationParams::new(0, 0).offset(), 0);
    }
}
