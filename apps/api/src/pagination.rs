use serde::Deserialize;

/// Rows per page for every paginated listing.
pub const ITEMS_PER_PAGE: i64 = 6;

const MAX_PAGE: i64 = i64::MAX / ITEMS_PER_PAGE;

/// `?query=&page=` as sent by the dashboard search box.
/// `page` is kept as text so a malformed value falls back to page 1 instead of a 400.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub page: Option<String>,
}

impl SearchQuery {
    pub fn term(&self) -> &str {
        self.query.as_deref().map(str::trim).unwrap_or("")
    }

    /// 1-based page number; anything missing, non-numeric or below 1 is page 1.
    /// Pages whose offset would not fit in an `i64` also fall back to 1.
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| (1..=MAX_PAGE).contains(p))
            .unwrap_or(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * ITEMS_PER_PAGE
    }

    /// `ILIKE` pattern matching the term anywhere. `%`, `_` and `\` are escaped.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::from("%");
        for ch in self.term().chars() {
            if matches!(ch, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('%');
        pattern
    }
}

/// `ceil(total / ITEMS_PER_PAGE)`.
pub fn total_pages(total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (total + ITEMS_PER_PAGE - 1) / ITEMS_PER_PAGE
}
