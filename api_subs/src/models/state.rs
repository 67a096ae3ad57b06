use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    NoSubscription,
    Canceled,
    Trial,
    TrialExpired,
    Active,
    CanceledButActive,
}

impl SubscriptionState {
    pub const ALL: [SubscriptionState; 6] = [
        SubscriptionState::NoSubscription,
        SubscriptionState::Canceled,
        SubscriptionState::Trial,
        SubscriptionState::TrialExpired,
        SubscriptionState::Active,
        SubscriptionState::CanceledButActive,
    ];

    /// The single call to action a consumer should present for this state.
    pub fn suggested_action(self) -> SuggestedAction {
        match self {
            SubscriptionState::NoSubscription => SuggestedAction::StartTrial,
            SubscriptionState::Trial | SubscriptionState::TrialExpired => SuggestedAction::Upgrade,
            SubscriptionState::Active => SuggestedAction::Cancel,
            SubscriptionState::CanceledButActive | SubscriptionState::Canceled => {
                SuggestedAction::Renew
            }
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoSubscription => "no_subscription",
            Self::Canceled => "canceled",
            Self::Trial => "trial",
            Self::TrialExpired => "trial_expired",
            Self::Active => "active",
            Self::CanceledButActive => "canceled_but_active",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    StartTrial,
    Upgrade,
    Cancel,
    Renew,
    /// Show no call to action.
    None,
}

/// Everything a view needs to render the subscription badge and button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub state: SubscriptionState,
    pub status_text: String,
    pub suggested_action: SuggestedAction,
}
