use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::model::ContactModel;

/// Per-panel view over a `ContactModel`: optional sort by the first visible
/// column and a wildcard filter over all visible columns.
#[derive(Debug, Clone, Default)]
pub struct SortFilterProxy {
    pattern: Option<Regex>,
    sorted: bool,
    rows: Vec<usize>,
}

impl SortFilterProxy {
    /// Set the wildcard filter (`*` any run, `?` one character). An empty
    /// filter shows every row. Matching is case-insensitive.
    pub fn set_filter_wildcard(&mut self, filter: &str) {
        self.pattern = if filter.is_empty() {
            None
        } else {
            match RegexBuilder::new(&wildcard_to_regex(filter))
                .case_insensitive(true)
                .build()
            {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!(filter, error = %err, "invalid filter pattern");
                    None
                }
            }
        };
    }

    pub fn set_sorted(&mut self, sorted: bool) {
        self.sorted = sorted;
    }

    /// Recompute the visible rows from `model`.
    pub fn rebuild(&mut self, model: &ContactModel, date_format: &str) {
        let columns = model.column_count();
        self.rows = (0..model.row_count())
            .filter(|&row| match &self.pattern {
                Some(re) => (0..columns).any(|col| re.is_match(&model.cell(row, col, date_format))),
                None => true,
            })
            .collect();
        if self.sorted && columns > 0 {
            self.rows
                .sort_by_cached_key(|&row| model.cell(row, 0, date_format).to_lowercase());
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn map_to_source(&self, view_row: usize) -> Option<usize> {
        self.rows.get(view_row).copied()
    }

    pub fn map_from_source(&self, model_row: usize) -> Option<usize> {
        self.rows.iter().position(|&r| r == model_row)
    }
}

fn wildcard_to_regex(wildcard: &str) -> String {
    let mut out = String::with_capacity(wildcard.len() * 2);
    for ch in wildcard.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4]))),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::{ContactColumn, ContactItem};

    fn model() -> ContactModel {
        let mut model = ContactModel::new(&ContactColumn::DEFAULT);
        model.add_row(ContactItem::with_names("Zoe", "Young"));
        model.add_row(ContactItem::with_names("adam", "brown"));
        model.add_row(ContactItem::with_names("Carl", "Adams"));
        model
    }

    #[test]
    fn unfiltered_unsorted_is_identity() {
        let mut proxy = SortFilterProxy::default();
        proxy.rebuild(&model(), "dd.MM.yyyy");
        assert_eq!(proxy.rows(), &[0, 1, 2]);
    }

    #[test]
    fn sorting_is_case_insensitive_on_first_column() {
        let mut proxy = SortFilterProxy::default();
        proxy.set_sorted(true);
        proxy.rebuild(&model(), "dd.MM.yyyy");
        assert_eq!(proxy.rows(), &[2, 1, 0]);
        assert_eq!(proxy.map_to_source(0), Some(2));
        assert_eq!(proxy.map_from_source(0), Some(2));
        assert_eq!(proxy.map_to_source(3), None);
    }

    #[test]
    fn wildcard_filter_matches_any_column() {
        let mut proxy = SortFilterProxy::default();
        proxy.set_filter_wildcard("ad?m*");
        proxy.rebuild(&model(), "dd.MM.yyyy");
        assert_eq!(proxy.rows(), &[1, 2]);
        assert_eq!(proxy.map_from_source(0), None);

        proxy.set_filter_wildcard("");
        proxy.rebuild(&model(), "dd.MM.yyyy");
        assert_eq!(proxy.row_count(), 3);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert_eq!(wildcard_to_regex("a.b*"), "a\\.b.*");
        let mut proxy = SortFilterProxy::default();
        proxy.set_filter_wildcard("(");
        proxy.rebuild(&model(), "dd.MM.yyyy");
        assert_eq!(proxy.row_count(), 0);
    }
}
