//! Cooldown guard for unauthenticated refresh actions
//!
//! Refresh buttons are available to everyone, including users who haven't
//! logged in — those requests hit the shared installation identity, so they
//! get rate limited per message. The message's own edit timestamp is the
//! timer; nothing is persisted here.

use chrono::{DateTime, TimeDelta, Utc};

use crate::core::session::LoginState;

/// How long a logged-out user must wait between refreshes of one message
pub const REFRESH_COOLDOWN_SECS: i64 = 60;

/// Outcome of the cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// The action may proceed
    Allowed,
    /// The action is rejected until `retry_at`
    Blocked {
        /// When the user may try again
        retry_at: DateTime<Utc>,
    },
}

impl CooldownDecision {
    /// Whether the action may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allowed)
    }
}

/// Check whether a refresh action is allowed
///
/// Logged-in users are never limited. For logged-out users the action is
/// blocked while the message was last edited less than
/// [`REFRESH_COOLDOWN_SECS`] ago; at exactly the boundary it is allowed. A
/// message that was never edited carries no timer.
pub fn check_refresh_cooldown(
    state: LoginState,
    last_edited_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CooldownDecision {
    if state == LoginState::LoggedOut {
        if let Some(edited_at) = last_edited_at {
            let retry_at = edited_at + TimeDelta::seconds(REFRESH_COOLDOWN_SECS);
            if retry_at > now {
                return CooldownDecision::Blocked { retry_at };
            }
        }
    }
    CooldownDecision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_within_window() {
        let now = Utc::now();
        let edited = now - TimeDelta::seconds(30);

        let decision = check_refresh_cooldown(LoginState::LoggedOut, Some(edited), now);
        assert_eq!(
            decision,
            CooldownDecision::Blocked {
                retry_at: edited + TimeDelta::seconds(60)
            }
        );
    }

    #[test]
    fn test_allowed_at_exact_boundary() {
        let now = Utc::now();
        let edited = now - TimeDelta::seconds(60);

        let decision = check_refresh_cooldown(LoginState::LoggedOut, Some(edited), now);
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_blocked_one_second_before_boundary() {
        let now = Utc::now();
        let edited = now - TimeDelta::seconds(59);

        let decision = check_refresh_cooldown(LoginState::LoggedOut, Some(edited), now);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_logged_in_never_limited() {
        let now = Utc::now();
        let decision = check_refresh_cooldown(LoginState::LoggedIn, Some(now), now);
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_unedited_message_has_no_timer() {
        let now = Utc::now();
        let decision = check_refresh_cooldown(LoginState::LoggedOut, None, now);
        assert!(decision.is_allowed());
    }
}
