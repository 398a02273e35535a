//! Server-side search queries
//!
//! A [`Query`] is the AND of its terms, which is also how IMAP reads a
//! space-separated list of search keys. `Display` renders the query in
//! IMAP `SEARCH` syntax.

use chrono::NaiveDate;
use std::fmt;

/// A single IMAP search key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    Subject(String),
    From(String),
    Body(String),
    Seen,
    Unseen,
    /// Internal date on or after the day.
    Since(NaiveDate),
    /// Internal date within the day.
    On(NaiveDate),
    Or(Box<SearchTerm>, Box<SearchTerm>),
}

impl SearchTerm {
    fn is_ascii(&self) -> bool {
        match self {
            Self::Subject(s) | Self::From(s) | Self::Body(s) => s.is_ascii(),
            Self::Or(a, b) => a.is_ascii() && b.is_ascii(),
            Self::Seen | Self::Unseen | Self::Since(_) | Self::On(_) => true,
        }
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject(s) => write!(f, "SUBJECT {}", quote(s)),
            Self::From(s) => write!(f, "FROM {}", quote(s)),
            Self::Body(s) => write!(f, "BODY {}", quote(s)),
            Self::Seen => f.write_str("SEEN"),
            Self::Unseen => f.write_str("UNSEEN"),
            Self::Since(d) => write!(f, "SINCE {}", imap_date(*d)),
            Self::On(d) => write!(f, "ON {}", imap_date(*d)),
            Self::Or(a, b) => write!(f, "OR {a} {b}"),
        }
    }
}

/// Conjunction of search terms. No terms means `ALL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<SearchTerm>,
}

impl Query {
    #[must_use]
    pub const fn all() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn push(&mut self, term: SearchTerm) {
        self.terms.push(term);
    }

    #[must_use]
    pub fn terms(&self) -> &[SearchTerm] {
        &self.terms
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("ALL");
        }
        if !self.terms.iter().all(SearchTerm::is_ascii) {
            f.write_str("CHARSET UTF-8 ")?;
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

/// IMAP quoted string: backslash and double quote are escaped, line
/// breaks are dropped since quoted strings cannot hold them.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\r' | '\n' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn imap_date(d: NaiveDate) -> String {
    d.format("%-d-%b-%Y").to_string()
}
