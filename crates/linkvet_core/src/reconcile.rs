use crate::model::HealthOutcome;

/// Prefix shared by every tag the audit owns. Tags outside this prefix are
/// opaque user data and must pass through untouched.
pub const HEALTH_TAG_PREFIX: &str = "@HEALTH_";

/// The tag derived from a probe outcome, or None for a reachable URL.
pub fn health_tag(outcome: &HealthOutcome) -> Option<String> {
    match outcome {
        HealthOutcome::Reachable => None,
        HealthOutcome::DnsFailure => Some(format!("{HEALTH_TAG_PREFIX}DNS")),
        HealthOutcome::OtherFailure => Some(format!("{HEALTH_TAG_PREFIX}other")),
        HealthOutcome::HttpFailure(status) => {
            Some(format!("{HEALTH_TAG_PREFIX}HTTP_{status}"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub tags: Vec<String>,
    pub changed: bool,
}

/// Compute the next tag set for a bookmark from its current tags and a probe
/// outcome.
///
/// Recovery clears every health tag regardless of which error previously
/// applied. A failure appends its derived tag only if absent; health tags for
/// other error types are kept, so a link drifting between failure modes
/// accumulates markers until it recovers. Kept tags are never reordered,
/// which makes sequence equality a faithful stand-in for set equality when
/// deciding `changed`.
pub fn reconcile(current: &[String], outcome: &HealthOutcome) -> ReconciliationResult {
    let tags: Vec<String> = match health_tag(outcome) {
        None => current
            .iter()
            .filter(|tag| !tag.starts_with(HEALTH_TAG_PREFIX))
            .cloned()
            .collect(),
        Some(derived) => {
            let mut tags = current.to_vec();
            if !tags.iter().any(|tag| *tag == derived) {
                tags.push(derived);
            }
            tags
        }
    };

    let changed = tags != current;
    ReconciliationResult { tags, changed }
}
