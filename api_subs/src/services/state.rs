//! Subscription lifecycle classification.
//!
//! Pure functions over a subscription record and an instant. Nothing here
//! fails: missing or malformed fields degrade to the safest state or text.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::models::{
    state::{Classification, SubscriptionState, SuggestedAction},
    sub::{STATUS_ACTIVE, STATUS_CANCELED, STATUS_TRIALING, Subscription},
};

const MILLIS_PER_DAY: i64 = 86_400_000;
const DEFAULT_ACTIVE_LABEL: &str = "Pro";

/// Which rule wins when `cancelAtPeriodEnd` is set on an active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPrecedence {
    /// The cancel flag is checked before the status, so an active
    /// subscription that is winding down reads as `Canceled` and
    /// `CanceledButActive` never occurs. Matches the shipped UI.
    #[default]
    CancelFlagFirst,
    /// An active status is checked first and yields `CanceledButActive`
    /// when the cancel flag is set.
    StatusFirst,
}

impl FromStr for CancelPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cancel_flag_first" => Ok(CancelPrecedence::CancelFlagFirst),
            "status_first" => Ok(CancelPrecedence::StatusFirst),
            other => Err(format!("unknown cancel precedence '{}'", other)),
        }
    }
}

/// Text shown for an `Active` subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveLabel {
    /// Always "Pro".
    #[default]
    Fixed,
    /// The capitalized plan name, "Pro" when the plan is empty or free.
    Plan,
}

impl FromStr for ActiveLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(ActiveLabel::Fixed),
            "plan" => Ok(ActiveLabel::Plan),
            other => Err(format!("unknown active label '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassifierOptions {
    pub cancel_precedence: CancelPrecedence,
    pub active_label: ActiveLabel,
}

/// Classifies `subscription` at `now` and renders its status text and action.
pub fn classify(
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
    options: &ClassifierOptions,
) -> Classification {
    let state = classify_state(subscription, now, options.cancel_precedence);
    Classification {
        state,
        status_text: status_text(state, subscription, now, options.active_label),
        suggested_action: suggested_action(state),
    }
}

/// Maps a subscription to exactly one lifecycle state. First match wins.
pub fn classify_state(
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
    precedence: CancelPrecedence,
) -> SubscriptionState {
    let Some(sub) = subscription else {
        return SubscriptionState::NoSubscription;
    };

    match precedence {
        CancelPrecedence::CancelFlagFirst => {
            if sub.cancel_requested() {
                return SubscriptionState::Canceled;
            }
            if let Some(state) = trial_state(sub, now) {
                return state;
            }
            if sub.status == STATUS_ACTIVE {
                return SubscriptionState::Active;
            }
        }
        CancelPrecedence::StatusFirst => {
            if sub.status == STATUS_ACTIVE {
                return if sub.cancel_requested() {
                    SubscriptionState::CanceledButActive
                } else {
                    SubscriptionState::Active
                };
            }
            if sub.cancel_requested() {
                return SubscriptionState::Canceled;
            }
            if let Some(state) = trial_state(sub, now) {
                return state;
            }
        }
    }

    // free plans and statuses we don't know land here too
    if sub.status == STATUS_CANCELED {
        SubscriptionState::Canceled
    } else {
        SubscriptionState::NoSubscription
    }
}

fn trial_state(sub: &Subscription, now: DateTime<Utc>) -> Option<SubscriptionState> {
    if sub.status != STATUS_TRIALING {
        return None;
    }
    match sub.trial_end_at() {
        Some(trial_end) if trial_end > now => Some(SubscriptionState::Trial),
        _ => Some(SubscriptionState::TrialExpired),
    }
}

/// Renders the human-readable status for `state`.
pub fn status_text(
    state: SubscriptionState,
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
    active_label: ActiveLabel,
) -> String {
    match state {
        SubscriptionState::NoSubscription => "No Subscription".to_string(),
        SubscriptionState::Trial => {
            match subscription.and_then(Subscription::trial_end_at) {
                Some(trial_end) => {
                    format!("Trial: {} days remaining", days_remaining(trial_end, now))
                }
                None => "Trial".to_string(),
            }
        }
        SubscriptionState::TrialExpired => "Trial Expired".to_string(),
        SubscriptionState::Active => match active_label {
            ActiveLabel::Fixed => DEFAULT_ACTIVE_LABEL.to_string(),
            ActiveLabel::Plan => plan_label(subscription.map(|sub| sub.plan.as_str())),
        },
        SubscriptionState::CanceledButActive => {
            match subscription.and_then(Subscription::current_period_end_at) {
                Some(period_end) => format!(
                    "Canceled - {} days remaining",
                    days_remaining(period_end, now)
                ),
                None => "Canceled".to_string(),
            }
        }
        SubscriptionState::Canceled => "Subscription Canceled".to_string(),
    }
}

pub fn suggested_action(state: SubscriptionState) -> SuggestedAction {
    state.suggested_action()
}

/// Whole days left until `end`, rounded up and never negative.
pub fn days_remaining(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (end - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

fn plan_label(plan: Option<&str>) -> String {
    let plan = plan.map(str::trim).unwrap_or_default();
    if plan.is_empty() || plan.eq_ignore_ascii_case("free") {
        return DEFAULT_ACTIVE_LABEL.to_string();
    }
    let mut chars = plan.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => DEFAULT_ACTIVE_LABEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::sub::RawTimestamp;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn sub(status: &str) -> Subscription {
        Subscription {
            status: status.to_string(),
            plan: "pro".to_string(),
            ..Default::default()
        }
    }

    fn trialing_until(trial_end: DateTime<Utc>) -> Subscription {
        Subscription {
            trial_end: Some(trial_end.into()),
            ..sub("trialing")
        }
    }

    fn status_first() -> ClassifierOptions {
        ClassifierOptions {
            cancel_precedence: CancelPrecedence::StatusFirst,
            ..Default::default()
        }
    }

    #[test]
    fn missing_subscription_has_no_subscription() {
        let result = classify(None, now(), &ClassifierOptions::default());
        assert_eq!(result.state, SubscriptionState::NoSubscription);
        assert_eq!(result.status_text, "No Subscription");
        assert_eq!(result.suggested_action, SuggestedAction::StartTrial);
    }

    #[test]
    fn active_subscription_reads_pro() {
        let active = Subscription {
            cancel_at_period_end: Some(false),
            ..sub("active")
        };
        let result = classify(Some(&active), now(), &ClassifierOptions::default());
        assert_eq!(result.state, SubscriptionState::Active);
        assert_eq!(result.status_text, "Pro");
        assert_eq!(result.suggested_action, SuggestedAction::Cancel);
    }

    #[test]
    fn trial_boundary_is_exclusive() {
        let options = ClassifierOptions::default();
        let just_ahead = trialing_until(now() + Duration::milliseconds(1));
        let exactly_now = trialing_until(now());
        let just_behind = trialing_until(now() - Duration::milliseconds(1));

        assert_eq!(
            classify(Some(&just_ahead), now(), &options).state,
            SubscriptionState::Trial
        );
        assert_eq!(
            classify(Some(&exactly_now), now(), &options).state,
            SubscriptionState::TrialExpired
        );
        assert_eq!(
            classify(Some(&just_behind), now(), &options).state,
            SubscriptionState::TrialExpired
        );
    }

    #[test]
    fn trial_without_end_date_is_expired() {
        let result = classify(Some(&sub("trialing")), now(), &ClassifierOptions::default());
        assert_eq!(result.state, SubscriptionState::TrialExpired);
        assert_eq!(result.status_text, "Trial Expired");
    }

    #[test]
    fn trial_days_round_up() {
        let options = ClassifierOptions::default();
        let one_day = trialing_until(now() + Duration::milliseconds(86_400_000));
        let one_day_and_a_bit = trialing_until(now() + Duration::milliseconds(86_400_001));
        let one_ms = trialing_until(now() + Duration::milliseconds(1));

        assert_eq!(
            classify(Some(&one_day), now(), &options).status_text,
            "Trial: 1 days remaining"
        );
        assert_eq!(
            classify(Some(&one_day_and_a_bit), now(), &options).status_text,
            "Trial: 2 days remaining"
        );
        assert_eq!(
            classify(Some(&one_ms), now(), &options).status_text,
            "Trial: 1 days remaining"
        );
    }

    #[test]
    fn days_remaining_never_negative() {
        assert_eq!(days_remaining(now() - Duration::milliseconds(1), now()), 0);
        assert_eq!(days_remaining(now() - Duration::days(40), now()), 0);
        assert_eq!(days_remaining(now(), now()), 0);
    }

    #[test]
    fn cancel_flag_wins_by_default() {
        let winding_down = Subscription {
            cancel_at_period_end: Some(true),
            current_period_end: Some((now() + Duration::days(3)).into()),
            ..sub("active")
        };
        let result = classify(Some(&winding_down), now(), &ClassifierOptions::default());
        assert_eq!(result.state, SubscriptionState::Canceled);
        assert_eq!(result.status_text, "Subscription Canceled");
        assert_eq!(result.suggested_action, SuggestedAction::Renew);
    }

    #[test]
    fn status_first_reports_canceled_but_active() {
        let winding_down = Subscription {
            cancel_at_period_end: Some(true),
            current_period_end: Some((now() + Duration::hours(49)).into()),
            ..sub("active")
        };
        let result = classify(Some(&winding_down), now(), &status_first());
        assert_eq!(result.state, SubscriptionState::CanceledButActive);
        assert_eq!(result.status_text, "Canceled - 3 days remaining");
        assert_eq!(result.suggested_action, SuggestedAction::Renew);

        let no_period_end = Subscription {
            current_period_end: None,
            ..winding_down
        };
        assert_eq!(
            classify(Some(&no_period_end), now(), &status_first()).status_text,
            "Canceled"
        );
    }

    #[test]
    fn status_first_still_cancels_non_active_records() {
        let trial_canceling = Subscription {
            cancel_at_period_end: Some(true),
            ..trialing_until(now() + Duration::days(5))
        };
        assert_eq!(
            classify_state(Some(&trial_canceling), now(), CancelPrecedence::StatusFirst),
            SubscriptionState::Canceled
        );
        assert_eq!(
            classify_state(Some(&trial_canceling), now(), CancelPrecedence::CancelFlagFirst),
            SubscriptionState::Canceled
        );
    }

    #[test]
    fn canceled_status_and_free_plan_are_distinct() {
        let options = ClassifierOptions::default();
        let canceled = sub("canceled");
        let free = Subscription {
            plan: "free".to_string(),
            ..sub("")
        };
        assert_eq!(
            classify(Some(&canceled), now(), &options).state,
            SubscriptionState::Canceled
        );
        assert_eq!(
            classify(Some(&free), now(), &options).state,
            SubscriptionState::NoSubscription
        );
    }

    #[test]
    fn unknown_status_falls_back_to_no_subscription() {
        for status in ["past_due", "incomplete", "paused", "ACTIVE", ""] {
            assert_eq!(
                classify_state(Some(&sub(status)), now(), CancelPrecedence::CancelFlagFirst),
                SubscriptionState::NoSubscription,
                "{status}"
            );
        }
    }

    #[test]
    fn malformed_trial_end_counts_as_absent() {
        let garbled = Subscription {
            trial_end: Some(RawTimestamp::Text("not-a-date".to_string())),
            ..sub("trialing")
        };
        let result = classify(Some(&garbled), now(), &ClassifierOptions::default());
        assert_eq!(result.state, SubscriptionState::TrialExpired);
    }

    #[test]
    fn plan_label_capitalizes_plan() {
        let options = ClassifierOptions {
            active_label: ActiveLabel::Plan,
            ..Default::default()
        };
        let team = Subscription {
            plan: "team".to_string(),
            ..sub("active")
        };
        let unnamed = Subscription {
            plan: String::new(),
            ..sub("active")
        };
        assert_eq!(classify(Some(&team), now(), &options).status_text, "Team");
        assert_eq!(classify(Some(&unnamed), now(), &options).status_text, "Pro");
    }

    #[test]
    fn classification_is_total_and_idempotent() {
        let statuses = ["trialing", "active", "canceled", "past_due", ""];
        let plans = ["free", "pro", ""];
        let flags = [None, Some(false), Some(true)];
        let dates = [
            None,
            Some(RawTimestamp::from(now() + Duration::days(2))),
            Some(RawTimestamp::from(now() - Duration::days(2))),
            Some(RawTimestamp::Millis(i64::MAX)),
            Some(RawTimestamp::Text("garbage".to_string())),
        ];

        for options in [ClassifierOptions::default(), status_first()] {
            for status in statuses {
                for plan in plans {
                    for flag in flags {
                        for date in &dates {
                            let record = Subscription {
                                status: status.to_string(),
                                plan: plan.to_string(),
                                trial_end: date.clone(),
                                current_period_end: date.clone(),
                                cancel_at_period_end: flag,
                                ..Default::default()
                            };
                            let first = classify(Some(&record), now(), &options);
                            let second = classify(Some(&record), now(), &options);
                            assert_eq!(first, second);
                            assert!(SubscriptionState::ALL.contains(&first.state));
                            assert!(!first.status_text.is_empty());
                            assert!(!first.status_text.contains("-1"), "{}", first.status_text);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn parses_option_names() {
        assert_eq!(
            "status_first".parse::<CancelPrecedence>(),
            Ok(CancelPrecedence::StatusFirst)
        );
        assert_eq!(" Plan ".parse::<ActiveLabel>(), Ok(ActiveLabel::Plan));
        assert!("sometimes".parse::<CancelPrecedence>().is_err());
    }
}
