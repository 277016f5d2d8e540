//! Impersonation policy configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default impersonation length in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;
/// Default upper bound on impersonation length in minutes.
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 480;
/// Default lower bound on impersonation length in minutes.
pub const DEFAULT_MIN_DURATION_MINUTES: u32 = 1;
/// Default minimum justification length in characters.
pub const DEFAULT_MIN_REASON_LENGTH: usize = 10;
/// Default maximum justification length in characters.
pub const DEFAULT_MAX_REASON_LENGTH: usize = 500;
/// Default sweep interval in minutes.
pub const DEFAULT_CLEANUP_INTERVAL_MINUTES: u64 = 15;
/// Default permission checked before an impersonation may start.
pub const DEFAULT_PERMISSION_NAME: &str = "impersonate:user";

/// Impersonation policy.
///
/// Zero-valued numeric fields and an empty permission name are treated as
/// "unset" and replaced by [`ImpersonationConfig::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpersonationConfig {
    /// Duration used when a request does not specify one.
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
    /// Longest allowed impersonation.
    #[serde(default = "default_max_duration")]
    pub max_duration_minutes: u32,
    /// Shortest allowed impersonation.
    #[serde(default = "default_min_duration")]
    pub min_duration_minutes: u32,
    /// Whether a written justification is mandatory.
    #[serde(default = "default_true")]
    pub require_reason: bool,
    /// Whether a ticket reference is mandatory.
    #[serde(default)]
    pub require_ticket: bool,
    /// Minimum justification length in characters.
    #[serde(default = "default_min_reason_length")]
    pub min_reason_length: usize,
    /// Maximum justification length in characters.
    #[serde(default = "default_max_reason_length")]
    pub max_reason_length: usize,
    /// Whether the authorizer must approve each start.
    #[serde(default = "default_true")]
    pub require_permission: bool,
    /// Permission evaluated against the target user.
    #[serde(default = "default_permission_name")]
    pub impersonate_permission_name: String,
    /// Record `action_performed` events for in-session actions.
    #[serde(default = "default_true")]
    pub audit_all_actions: bool,
    /// Run the background expiry sweeper.
    #[serde(default = "default_true")]
    pub auto_cleanup_enabled: bool,
    /// Minutes between sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
    /// Show a banner to the impersonating actor (UI pass-through).
    #[serde(default = "default_true")]
    pub show_indicator: bool,
    /// Banner text (UI pass-through).
    #[serde(default = "default_indicator_message")]
    pub indicator_message: String,
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
            require_reason: true,
            require_ticket: false,
            min_reason_length: DEFAULT_MIN_REASON_LENGTH,
            max_reason_length: DEFAULT_MAX_REASON_LENGTH,
            require_permission: true,
            impersonate_permission_name: DEFAULT_PERMISSION_NAME.to_string(),
            audit_all_actions: true,
            auto_cleanup_enabled: true,
            cleanup_interval_minutes: DEFAULT_CLEANUP_INTERVAL_MINUTES,
            show_indicator: true,
            indicator_message: default_indicator_message(),
        }
    }
}

impl ImpersonationConfig {
    /// Fill unset fields with defaults and reject inconsistent bounds.
    ///
    /// Fails when `min_duration_minutes > max_duration_minutes`, when the
    /// default duration lies outside `[min, max]`, or when the reason
    /// length bounds are inverted.
    pub fn validate(&mut self) -> Result<(), AppError> {
        if self.default_duration_minutes == 0 {
            self.default_duration_minutes = DEFAULT_DURATION_MINUTES;
        }
        if self.max_duration_minutes == 0 {
            self.max_duration_minutes = DEFAULT_MAX_DURATION_MINUTES;
        }
        if self.min_duration_minutes == 0 {
            self.min_duration_minutes = DEFAULT_MIN_DURATION_MINUTES;
        }
        if self.min_reason_length == 0 {
            self.min_reason_length = DEFAULT_MIN_REASON_LENGTH;
        }
        if self.max_reason_length == 0 {
            self.max_reason_length = DEFAULT_MAX_REASON_LENGTH;
        }
        if self.cleanup_interval_minutes == 0 {
            self.cleanup_interval_minutes = DEFAULT_CLEANUP_INTERVAL_MINUTES;
        }
        if self.impersonate_permission_name.trim().is_empty() {
            self.impersonate_permission_name = DEFAULT_PERMISSION_NAME.to_string();
        }

        if self.min_duration_minutes > self.max_duration_minutes {
            return Err(AppError::configuration(format!(
                "impersonation.min_duration_minutes ({}) exceeds max_duration_minutes ({})",
                self.min_duration_minutes, self.max_duration_minutes
            )));
        }
        if !self.duration_in_bounds(self.default_duration_minutes) {
            return Err(AppError::configuration(format!(
                "impersonation.default_duration_minutes ({}) is outside [{}, {}]",
                self.default_duration_minutes, self.min_duration_minutes, self.max_duration_minutes
            )));
        }
        if self.min_reason_length > self.max_reason_length {
            return Err(AppError::configuration(format!(
                "impersonation.min_reason_length ({}) exceeds max_reason_length ({})",
                self.min_reason_length, self.max_reason_length
            )));
        }
        Ok(())
    }

    /// Whether `minutes` lies within the configured duration bounds.
    pub fn duration_in_bounds(&self, minutes: u32) -> bool {
        (self.min_duration_minutes..=self.max_duration_minutes).contains(&minutes)
    }

    /// Sweep interval as a [`Duration`].
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes.saturating_mul(60))
    }
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

fn default_max_duration() -> u32 {
    DEFAULT_MAX_DURATION_MINUTES
}

fn default_min_duration() -> u32 {
    DEFAULT_MIN_DURATION_MINUTES
}

fn default_min_reason_length() -> usize {
    DEFAULT_MIN_REASON_LENGTH
}

fn default_max_reason_length() -> usize {
    DEFAULT_MAX_REASON_LENGTH
}

fn default_cleanup_interval() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_MINUTES
}

fn default_permission_name() -> String {
    DEFAULT_PERMISSION_NAME.to_string()
}

fn default_indicator_message() -> String {
    "You are impersonating another user".to_string()
}

fn default_true() -> bool {
    true
}
