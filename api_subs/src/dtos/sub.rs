use serde::Deserialize;

use crate::models::sub::Subscription;

/// Body of a classification request. A missing or `null` subscription is
/// the "never subscribed" case.
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub subscription: Option<Subscription>,
}
