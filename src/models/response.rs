
/// 分页参数
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: usize,
    pub per_page: usize,
}

impl Page {
    pub fn new(page: Option<usize>, per_page: usize) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        // page 来自查询字符串，可能非常大
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset()).take(self.per_page).collect()
    }
}
