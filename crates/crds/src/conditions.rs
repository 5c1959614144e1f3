//! Status conditions shared by all managed resources
//!
//! Two condition types are reported:
//! - `Ready`: whether the external resource is usable (Available, Creating,
//!   Deleting, Unavailable)
//! - `Synced`: whether the last reconciliation succeeded (ReconcileSuccess,
//!   ReconcileError)

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reporting external resource readiness
pub const TYPE_READY: &str = "Ready";
/// Condition type reporting reconcile health
pub const TYPE_SYNCED: &str = "Synced";

/// Ready reason: the external resource is usable
pub const REASON_AVAILABLE: &str = "Available";
/// Ready reason: the external resource is being provisioned
pub const REASON_CREATING: &str = "Creating";
/// Ready reason: the external resource is being removed
pub const REASON_DELETING: &str = "Deleting";
/// Ready reason: the external resource exists but is not usable
pub const REASON_UNAVAILABLE: &str = "Unavailable";
/// Synced reason: last reconcile succeeded
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";
/// Synced reason: last reconcile failed
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";

/// Status of a condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A single observation of a managed resource's state
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (`Ready` or `Synced`)
    #[serde(rename = "type")]
    pub type_: String,

    /// True, False or Unknown
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition's last transition
    pub reason: String,

    /// Human-readable detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition changed status, reason or message
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    fn new(type_: &str, status: ConditionStatus, reason: &str, message: Option<String>) -> Self {
        Self {
            type_: type_.to_string(),
            status,
            reason: reason.to_string(),
            message,
            last_transition_time: Utc::now(),
        }
    }

    /// The external resource is available for use
    pub fn available() -> Self {
        Self::new(TYPE_READY, ConditionStatus::True, REASON_AVAILABLE, None)
    }

    /// The external resource is being created
    pub fn creating() -> Self {
        Self::new(TYPE_READY, ConditionStatus::False, REASON_CREATING, None)
    }

    /// The external resource is being deleted
    pub fn deleting() -> Self {
        Self::new(TYPE_READY, ConditionStatus::False, REASON_DELETING, None)
    }

    /// The external resource exists but is not usable
    pub fn unavailable() -> Self {
        Self::new(TYPE_READY, ConditionStatus::False, REASON_UNAVAILABLE, None)
    }

    /// The last reconciliation succeeded
    pub fn reconcile_success() -> Self {
        Self::new(TYPE_SYNCED, ConditionStatus::True, REASON_RECONCILE_SUCCESS, None)
    }

    /// The last reconciliation failed with the given message
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(TYPE_SYNCED, ConditionStatus::False, REASON_RECONCILE_ERROR, Some(message.into()))
    }

    /// Equal in everything but the transition timestamp
    pub fn equal_ignoring_time(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Set (add or replace) a condition, keeping the existing transition time
/// when nothing but the timestamp would change.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) if existing.equal_ignoring_time(&condition) => {}
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}

/// Find a condition by type
pub fn get_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Whether the conditions report `Ready=True`
pub fn is_ready(conditions: &[Condition]) -> bool {
    get_condition(conditions, TYPE_READY).is_some_and(|c| c.status == ConditionStatus::True)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_condition_adds_new_type() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, Condition::creating());
        set_condition(&mut conditions, Condition::reconcile_success());
        assert_eq!(conditions.len(), 2);
        assert!(!is_ready(&conditions));
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_unchanged() {
        let mut original = Condition::available();
        original.last_transition_time = DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default();
        let mut conditions = vec![original.clone()];

        set_condition(&mut conditions, Condition::available());

        assert_eq!(conditions[0].last_transition_time, original.last_transition_time);
        assert!(is_ready(&conditions));
    }

    #[test]
    fn test_set_condition_replaces_on_reason_change() {
        let mut conditions = vec![Condition::creating()];
        set_condition(&mut conditions, Condition::available());
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].reason, REASON_AVAILABLE);
    }

    #[test]
    fn test_reconcile_error_message_change_is_a_transition() {
        let a = Condition::reconcile_error("first");
        let b = Condition::reconcile_error("second");
        assert!(!a.equal_ignoring_time(&b));
    }
}
