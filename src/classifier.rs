//! Account age and comment karma heuristic.

use crate::models::UserProfile;
use crate::settings::ModerationConfig;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpamVerdict {
    pub is_spam: bool,
    pub reason: String,
}

/// Account age in calendar months. Only year and month are compared, so an
/// account created on the 31st is one month old on the 1st of the next month.
pub fn account_age_months(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let years = i64::from(now.year() - created_at.year());
    let months = i64::from(now.month()) - i64::from(created_at.month());
    years * 12 + months
}

/// Flags an account that is both young enough and low enough on comment
/// karma. Both thresholds are inclusive.
pub fn classify(
    profile: &UserProfile,
    config: &ModerationConfig,
    now: DateTime<Utc>,
) -> SpamVerdict {
    let age_months = account_age_months(profile.created_at, now);
    let young = age_months <= i64::from(config.max_account_age_months);
    let low_karma = profile.comment_karma <= i64::from(config.max_comment_karma);

    if young && low_karma {
        log::info!(
            "{} does not meet minimum age and karma limits ({} months, {} comment karma)",
            profile.username,
            age_months,
            profile.comment_karma
        );
        return SpamVerdict {
            is_spam: true,
            reason: format!(
                "account is {} months old (limit {}) with {} comment karma (limit {})",
                age_months,
                config.max_account_age_months,
                profile.comment_karma,
                config.max_comment_karma
            ),
        };
    }

    let reason = if young {
        format!(
            "comment karma {} is above {}",
            profile.comment_karma, config.max_comment_karma
        )
    } else {
        format!(
            "account age {} months is above {}",
            age_months, config.max_account_age_months
        )
    };

    SpamVerdict {
        is_spam: false,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ListenerScope;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn profile(created_at: DateTime<Utc>, comment_karma: i64) -> UserProfile {
        UserProfile {
            id: "t2_abc".to_string(),
            username: "someone".to_string(),
            created_at,
            comment_karma,
        }
    }

    fn config(max_age: u32, max_karma: u32) -> ModerationConfig {
        ModerationConfig {
            listener_scope: ListenerScope::Both,
            max_account_age_months: max_age,
            max_comment_karma: max_karma,
        }
    }

    #[test]
    fn test_same_month_is_zero_months() {
        assert_eq!(account_age_months(at(2024, 5, 1), at(2024, 5, 31)), 0);
        assert_eq!(account_age_months(at(2024, 5, 31), at(2024, 5, 1)), 0);
    }

    #[test]
    fn test_age_ignores_day_of_month() {
        assert_eq!(account_age_months(at(2024, 1, 31), at(2024, 2, 1)), 1);
        assert_eq!(account_age_months(at(2023, 11, 15), at(2024, 2, 14)), 3);
        assert_eq!(account_age_months(at(2020, 6, 1), at(2024, 6, 1)), 48);
    }

    #[test]
    fn test_young_low_karma_is_spam() {
        let now = at(2024, 6, 10);
        let verdict = classify(&profile(at(2024, 3, 10), 2), &config(6, 5), now);
        assert!(verdict.is_spam);
        assert!(verdict.reason.contains("3 months"));
    }

    #[test]
    fn test_old_account_is_not_spam() {
        let now = at(2024, 6, 10);
        let verdict = classify(&profile(at(2023, 6, 10), 2), &config(6, 5), now);
        assert!(!verdict.is_spam);
        assert!(verdict.reason.contains("age 12 months"));
    }

    #[test]
    fn test_high_karma_is_not_spam() {
        let now = at(2024, 6, 10);
        let verdict = classify(&profile(at(2024, 6, 1), 6), &config(6, 5), now);
        assert!(!verdict.is_spam);
        assert!(verdict.reason.contains("karma"));
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let now = at(2024, 6, 10);
        let verdict = classify(&profile(at(2023, 12, 25), 5), &config(6, 5), now);
        assert!(verdict.is_spam);
    }

    proptest! {
        #[test]
        fn prop_spam_iff_both_limits_hold(
            age in 0i64..240,
            karma in -100i64..10_000,
            max_age in 1u32..120,
            max_karma in 1u32..5_000,
        ) {
            let now = at(2030, 1, 15);
            let created = now - chrono::Months::new(age as u32);
            let verdict = classify(&profile(created, karma), &config(max_age, max_karma), now);

            let expected = age <= i64::from(max_age) && karma <= i64::from(max_karma);
            prop_assert_eq!(verdict.is_spam, expected);
        }
    }
}
