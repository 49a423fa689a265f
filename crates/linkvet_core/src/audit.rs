use anyhow::Result;
use serde::Serialize;

use crate::config::LinkvetConfig;
use crate::linkding::{BookmarkReadApi, BookmarkWriteApi, LinkdingClient};
use crate::model::Bookmark;
use crate::probe::{ProbeClient, ProbeClientConfig, UrlProbe};
use crate::reconcile::reconcile;

#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkAuditResult {
    pub id: i64,
    pub url: String,
    pub outcome: String,
    pub action: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub success: bool,
    pub dry_run: bool,
    pub fetched: usize,
    pub reachable: usize,
    pub broken: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub bookmarks: Vec<BookmarkAuditResult>,
    pub request_count: usize,
    pub probe_count: usize,
}

/// Progress seam for the pass. The core mandates no output format; the CLI
/// prints lines, tests record events.
pub trait AuditObserver {
    fn page_fetched(&mut self, _fetched_so_far: usize) {}
    fn fetch_completed(&mut self, _total: usize) {}
    fn bookmark_audited(&mut self, _result: &BookmarkAuditResult) {}
}

pub struct SilentObserver;

impl AuditObserver for SilentObserver {}

/// Fetch state: drain the paginated listing into one ordered sequence.
/// Any page failure aborts the run; nothing is reconciled against a
/// partial listing.
pub fn fetch_all_bookmarks<A: BookmarkReadApi>(
    api: &mut A,
    observer: &mut dyn AuditObserver,
) -> Result<Vec<Bookmark>> {
    let mut bookmarks = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = api.fetch_page(cursor.as_deref())?;
        cursor = page.next_cursor().map(ToString::to_string);
        bookmarks.extend(page.results);
        observer.page_fetched(bookmarks.len());
        if cursor.is_none() {
            break;
        }
    }

    observer.fetch_completed(bookmarks.len());
    Ok(bookmarks)
}

/// One full reconciliation pass against the configured repository.
pub fn audit_bookmarks(
    config: &LinkvetConfig,
    options: &AuditOptions,
    observer: &mut dyn AuditObserver,
) -> Result<AuditReport> {
    let mut api = LinkdingClient::from_config(config)?;
    let mut probe = ProbeClient::new(ProbeClientConfig::from_config(config))?;
    audit_bookmarks_with_api(options, &mut api, &mut probe, observer)
}

/// Driver over the repository and probe seams. Probing has no error path;
/// a failed patch is recorded and skipped so one unpatchable bookmark never
/// blocks the rest of the pass.
pub fn audit_bookmarks_with_api<A, P>(
    options: &AuditOptions,
    api: &mut A,
    probe: &mut P,
    observer: &mut dyn AuditObserver,
) -> Result<AuditReport>
where
    A: BookmarkWriteApi,
    P: UrlProbe,
{
    let bookmarks = fetch_all_bookmarks(api, observer)?;

    let mut report = AuditReport {
        success: true,
        dry_run: options.dry_run,
        fetched: bookmarks.len(),
        reachable: 0,
        broken: 0,
        updated: 0,
        unchanged: 0,
        skipped: 0,
        errors: Vec::new(),
        bookmarks: Vec::new(),
        request_count: 0,
        probe_count: 0,
    };

    for bookmark in bookmarks {
        let outcome = probe.probe(&bookmark.url);
        if outcome.is_reachable() {
            report.reachable += 1;
        } else {
            report.broken += 1;
        }

        let result = reconcile(&bookmark.tag_names, &outcome);
        let (action, detail) = if !result.changed {
            report.unchanged += 1;
            ("unchanged".to_string(), None)
        } else if options.dry_run {
            report.skipped += 1;
            ("skipped".to_string(), Some("tags differ (dry run)".to_string()))
        } else {
            match api.update_tags(bookmark.id, &result.tags) {
                Ok(()) => {
                    report.updated += 1;
                    ("updated".to_string(), None)
                }
                Err(error) => {
                    report
                        .errors
                        .push(format!("bookmark {}: {error:#}", bookmark.id));
                    ("error".to_string(), Some(format!("{error:#}")))
                }
            }
        };

        let row = BookmarkAuditResult {
            id: bookmark.id,
            url: bookmark.url,
            outcome: outcome.label(),
            action,
            detail,
        };
        observer.bookmark_audited(&row);
        report.bookmarks.push(row);
    }

    report.request_count = api.request_count();
    report.probe_count = probe.probe_count();
    report.success = report.errors.is_empty();
    Ok(report)
}
