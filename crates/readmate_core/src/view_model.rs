//! crates/readmate_core/src/view_model.rs
//!
//! The book list view-model: filtering, sorting and summary counts applied to an
//! already-loaded collection. Everything here is pure and total.

use crate::domain::{Book, BookStatus};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(BookStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: BookStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = crate::domain::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "All" {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Title,
    /// Newest first.
    #[default]
    DateAdded,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::DateAdded => "dateAdded",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a sort order")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortKey::Title),
            "dateAdded" => Ok(SortKey::DateAdded),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

/// The controls above a book list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub search: String,
    pub status: StatusFilter,
    pub sort: SortKey,
}

impl BookQuery {
    pub fn includes(&self, book: &Book) -> bool {
        self.status.matches(book.status) && matches_search(book, &self.search)
    }

    /// Filters and orders `books` for display.
    pub fn apply(&self, books: &[Book]) -> Vec<Book> {
        let mut visible: Vec<Book> = books.iter().filter(|b| self.includes(b)).cloned().collect();
        sort_books(&mut visible, self.sort);
        visible
    }
}

fn matches_search(book: &Book, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    book.title.to_lowercase().contains(&term) || book.author.to_lowercase().contains(&term)
}

/// Stable in-place sort by the given key.
pub fn sort_books(books: &mut [Book], key: SortKey) {
    match key {
        SortKey::Title => books.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::DateAdded => books.sort_by(|a, b| b.added_at().cmp(&a.added_at())),
    }
}

/// Orders strings the way a reader expects: accents and case only matter when
/// the letters are otherwise identical.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

//=========================================================================================
// Stats
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookStats {
    pub to_read: usize,
    pub reading: usize,
    pub completed: usize,
    pub total: usize,
}

impl BookStats {
    pub fn from_books(books: &[Book]) -> Self {
        books.iter().fold(BookStats::default(), |mut stats, book| {
            match book.status {
                BookStatus::ToRead => stats.to_read += 1,
                BookStatus::Reading => stats.reading += 1,
                BookStatus::Completed => stats.completed += 1,
            }
            stats.total += 1;
            stats
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn book(id: &str, title: &str, author: &str, status: BookStatus, date_added: &str) -> Book {
        Book {
            id: id.to_string(),
            owner_id: "u1".to_string(),
            title: title.to_string(),
            author: author.to_string(),
            status,
            notes: String::new(),
            date_added: date_added.to_string(),
        }
    }

    fn shelf() -> Vec<Book> {
        vec![
            book("1", "Dune", "Frank Herbert", BookStatus::ToRead, "2024-01-01T10:00:00.000Z"),
            book("2", "Foundation", "Isaac Asimov", BookStatus::Reading, "2024-02-01T10:00:00.000Z"),
            book("3", "Émile", "Jean-Jacques Rousseau", BookStatus::Completed, "2023-12-01T10:00:00.000Z"),
            book("4", "children of dune", "Frank Herbert", BookStatus::Completed, "2024-03-01T10:00:00.000Z"),
            book("5", "Broken Record", "Nobody", BookStatus::ToRead, "not a date"),
        ]
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[test]
    fn status_filter_only_keeps_that_status() {
        for status in BookStatus::ALL {
            let query = BookQuery { status: StatusFilter::Only(status), ..Default::default() };
            let visible = query.apply(&shelf());
            assert!(!visible.is_empty());
            assert!(visible.iter().all(|b| b.status == status));
        }
    }

    #[test]
    fn search_matches_title_or_author_ignoring_case() {
        let query = BookQuery { search: "HERBERT".into(), ..Default::default() };
        let visible = query.apply(&shelf());
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|b| b.author.to_lowercase().contains("herbert")
            || b.title.to_lowercase().contains("herbert")));

        let query = BookQuery { search: "dune".into(), ..Default::default() };
        assert_eq!(query.apply(&shelf()).len(), 2);
    }

    #[test]
    fn empty_search_keeps_everything_that_passes_the_status_filter() {
        let query = BookQuery { status: StatusFilter::Only(BookStatus::Completed), ..Default::default() };
        assert_eq!(query.apply(&shelf()).len(), 2);
        assert_eq!(BookQuery::default().apply(&shelf()).len(), 5);
    }

    #[test]
    fn date_sort_is_newest_first_with_bad_dates_last() {
        let visible = BookQuery::default().apply(&shelf());
        assert_eq!(
            titles(&visible),
            vec!["children of dune", "Foundation", "Dune", "Émile", "Broken Record"]
        );
    }

    #[test]
    fn title_sort_ignores_case_and_accents() {
        let query = BookQuery { sort: SortKey::Title, ..Default::default() };
        let visible = query.apply(&shelf());
        assert_eq!(
            titles(&visible),
            vec!["Broken Record", "children of dune", "Dune", "Émile", "Foundation"]
        );
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        for key in [SortKey::Title, SortKey::DateAdded] {
            let mut once = shelf();
            sort_books(&mut once, key);
            let mut twice = once.clone();
            sort_books(&mut twice, key);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn sorts_are_stable_for_equal_keys() {
        let mut books = vec![
            book("a", "Same", "One", BookStatus::ToRead, "2024-01-01T00:00:00.000Z"),
            book("b", "Same", "Two", BookStatus::ToRead, "2024-01-01T00:00:00.000Z"),
        ];
        sort_books(&mut books, SortKey::Title);
        assert_eq!(books[0].id, "a");
        sort_books(&mut books, SortKey::DateAdded);
        assert_eq!(books[0].id, "a");
    }

    #[test]
    fn dune_and_foundation_scenario() {
        let books = vec![
            book("1", "Dune", "Frank Herbert", BookStatus::ToRead, "2024-01-01T10:00:00.000Z"),
            book("2", "Foundation", "Isaac Asimov", BookStatus::ToRead, "2024-01-02T10:00:00.000Z"),
        ];
        let by_date = BookQuery { sort: SortKey::DateAdded, ..Default::default() }.apply(&books);
        assert_eq!(titles(&by_date), vec!["Foundation", "Dune"]);
        let by_title = BookQuery { sort: SortKey::Title, ..Default::default() }.apply(&books);
        assert_eq!(titles(&by_title), vec!["Dune", "Foundation"]);
    }

    #[test]
    fn stats_add_up_including_empty() {
        assert_eq!(BookStats::from_books(&[]), BookStats::default());

        let stats = BookStats::from_books(&shelf());
        assert_eq!(stats.to_read, 2);
        assert_eq!(stats.reading, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.to_read + stats.reading + stats.completed, stats.total);
    }

    #[test]
    fn controls_parse_from_their_wire_names() {
        assert_eq!("All".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("Reading".parse::<StatusFilter>(), Ok(StatusFilter::Only(BookStatus::Reading)));
        assert_eq!("title".parse::<SortKey>(), Ok(SortKey::Title));
        assert!("author".parse::<SortKey>().is_err());
    }
}
