//! Stateless filtering of the paper index.

use crate::models::{Paper, SearchFilters};

/// Keep the papers matching every non-empty filter dimension.
///
/// Output order follows input order.
pub fn filter_papers(papers: &[Paper], filters: &SearchFilters) -> Vec<Paper> {
    if filters.is_empty() {
        return papers.to_vec();
    }
    papers
        .iter()
        .filter(|paper| filters.matches(paper))
        .cloned()
        .collect()
}
