use serde::{Deserialize, Serialize};

/// One bookmark as stored by the remote repository. The id is assigned
/// externally and immutable; title, description, and date_added are opaque
/// to the audit and carried only for display.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub date_added: Option<String>,
}

/// One page of the repository's paginated bookmark listing. The `next`
/// cursor is a complete URL to follow verbatim; absent or empty means the
/// listing is exhausted.
#[derive(Debug, Clone, Deserialize)]
pub struct BookmarkPage {
    pub count: i64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Bookmark>,
}

impl BookmarkPage {
    /// The cursor for the following page, with empty strings treated the
    /// same as an absent field.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next
            .as_deref()
            .map(str::trim)
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Classified result of probing one URL. Exactly one variant applies per
/// probe; transport failures are outcomes, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    Reachable,
    DnsFailure,
    OtherFailure,
    HttpFailure(u16),
}

impl HealthOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }

    /// Short display label used by progress lines and the audit ledger.
    pub fn label(&self) -> String {
        match self {
            Self::Reachable => "ok".to_string(),
            Self::DnsFailure => "DNS".to_string(),
            Self::OtherFailure => "other".to_string(),
            Self::HttpFailure(status) => format!("HTTP_{status}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BookmarkPage, HealthOutcome};

    #[test]
    fn bookmark_page_parses_repository_wire_shape() {
        let payload = r#"{
            "count": 2,
            "next": "https://links.example.org/api/bookmarks/?limit=1&offset=1",
            "previous": null,
            "results": [
                {
                    "id": 7,
                    "url": "https://example.org",
                    "title": "Example",
                    "description": "",
                    "tag_names": ["reading", "@HEALTH_HTTP_404"],
                    "date_added": "2026-01-12T08:30:00Z"
                }
            ]
        }"#;

        let page: BookmarkPage = serde_json::from_str(payload).expect("parse page");
        assert_eq!(page.count, 2);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, 7);
        assert_eq!(page.results[0].tag_names.len(), 2);
        assert!(page.next_cursor().is_some());
    }

    #[test]
    fn empty_next_cursor_counts_as_absent() {
        let payload = r#"{"count": 0, "next": "", "previous": "", "results": []}"#;
        let page: BookmarkPage = serde_json::from_str(payload).expect("parse page");
        assert!(page.next_cursor().is_none());

        let payload = r#"{"count": 0, "results": []}"#;
        let page: BookmarkPage = serde_json::from_str(payload).expect("parse page");
        assert!(page.next_cursor().is_none());
    }

    #[test]
    fn outcome_labels_match_tag_suffixes() {
        assert_eq!(HealthOutcome::Reachable.label(), "ok");
        assert_eq!(HealthOutcome::DnsFailure.label(), "DNS");
        assert_eq!(HealthOutcome::OtherFailure.label(), "other");
        assert_eq!(HealthOutcome::HttpFailure(404).label(), "HTTP_404");
    }
}
