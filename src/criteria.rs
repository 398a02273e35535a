//! Search criteria and how they split between server and client

use crate::provider::KeywordSearch;
use crate::query::{Query, SearchTerm};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::time::Duration;

/// Optional message filters. Every supplied criterion must hold for a
/// message to match; empty strings count as not supplied.
///
/// # Examples
///
/// ```
/// use mailkit::SearchCriteria;
///
/// let criteria = SearchCriteria::new()
///     .subject("Invoice")
///     .sender("billing@example.com");
/// assert!(!criteria.is_empty());
/// assert!(SearchCriteria::new().subject("").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub subject: Option<String>,
    pub sender: Option<String>,
    /// Matches when found in the subject or the body.
    pub keyword: Option<String>,
    /// `Some(true)` for read messages only, `Some(false)` for unread.
    pub seen: Option<bool>,
    pub since: Option<NaiveDate>,
    pub on: Option<NaiveDate>,
    /// Exact lower bound on the message date. IMAP dates only have day
    /// granularity, so the server is asked for the surrounding days and
    /// the bound itself is checked on each fetched message.
    pub received_after: Option<DateTime<Utc>>,
}

impl SearchCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = non_empty(subject.into());
        self
    }

    #[must_use]
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = non_empty(sender.into());
        self
    }

    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = non_empty(keyword.into());
        self
    }

    #[must_use]
    pub const fn seen(mut self, seen: bool) -> Self {
        self.seen = Some(seen);
        self
    }

    #[must_use]
    pub const fn since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    #[must_use]
    pub const fn on(mut self, date: NaiveDate) -> Self {
        self.on = Some(date);
        self
    }

    #[must_use]
    pub const fn received_after(mut self, cutoff: DateTime<Utc>) -> Self {
        self.received_after = Some(cutoff);
        self
    }

    /// Messages dated within `window` of now.
    #[must_use]
    pub fn received_within(self, window: Duration) -> Self {
        let cutoff = TimeDelta::from_std(window)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.received_after(cutoff)
    }

    /// True when no criterion is supplied, i.e. everything matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subject_text().is_none()
            && self.sender_text().is_none()
            && self.keyword_text().is_none()
            && self.seen.is_none()
            && self.since.is_none()
            && self.on.is_none()
            && self.received_after.is_none()
    }

    /// Build the server-side part of the search.
    ///
    /// With [`KeywordSearch::ClientSide`] the keyword is left out and
    /// must be applied with [`SearchCriteria::matches_keyword`].
    #[must_use]
    pub fn to_query(&self, keyword: KeywordSearch) -> Query {
        let mut query = Query::all();
        if let Some(subject) = self.subject_text() {
            query.push(SearchTerm::Subject(subject.to_string()));
        }
        if let Some(sender) = self.sender_text() {
            query.push(SearchTerm::From(sender.to_string()));
        }
        if let (Some(kw), KeywordSearch::ServerSide) = (self.keyword_text(), keyword) {
            query.push(SearchTerm::Or(
                Box::new(SearchTerm::Subject(kw.to_string())),
                Box::new(SearchTerm::Body(kw.to_string())),
            ));
        }
        match self.seen {
            Some(true) => query.push(SearchTerm::Seen),
            Some(false) => query.push(SearchTerm::Unseen),
            None => {}
        }
        if let Some(date) = self.since {
            query.push(SearchTerm::Since(date));
        }
        if let Some(date) = self.on {
            query.push(SearchTerm::On(date));
        }
        if let Some(cutoff) = self.received_after {
            // A day of slack for servers that keep dates in a timezone
            // behind UTC.
            let day = cutoff.date_naive();
            query.push(SearchTerm::Since(day.pred_opt().unwrap_or(day)));
        }
        query
    }

    /// Whether a message dated `date` satisfies
    /// [`SearchCriteria::received_after`]. Always true when unset.
    #[must_use]
    pub fn matches_received(&self, date: &DateTime<Utc>) -> bool {
        self.received_after.is_none_or(|cutoff| *date >= cutoff)
    }

    /// Whether fetched messages still need local keyword matching.
    #[must_use]
    pub fn needs_post_filter(&self, keyword: KeywordSearch) -> bool {
        keyword == KeywordSearch::ClientSide && self.keyword_text().is_some()
    }

    /// Case-insensitive keyword match against subject or body. Always
    /// true when no keyword is set.
    #[must_use]
    pub fn matches_keyword(&self, subject: &str, body: &str) -> bool {
        let Some(kw) = self.keyword_text() else {
            return true;
        };
        let needle = kw.to_lowercase();
        subject.to_lowercase().contains(&needle) || body.to_lowercase().contains(&needle)
    }

    fn subject_text(&self) -> Option<&str> {
        self.subject.as_deref().filter(|s| !s.is_empty())
    }

    fn sender_text(&self) -> Option<&str> {
        self.sender.as_deref().filter(|s| !s.is_empty())
    }

    fn keyword_text(&self) -> Option<&str> {
        self.keyword.as_deref().filter(|s| !s.is_empty())
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
