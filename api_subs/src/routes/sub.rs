use actix_web::{Responder, post, web};
use chrono::Utc;
use common::http::Success;

use crate::{dtos::sub::ClassifyRequest, services};

/// Classifies the caller's subscription for the dashboard badge and button.
///
/// # Input
/// - `options`: classifier options built from the server configuration
/// - `req`: JSON payload with the subscription record as returned by the
///   backend, or `null` when the user never subscribed
///
/// # Output
/// - Success: `{ "state", "statusText", "suggestedAction" }`
/// - Error: 400 Bad Request if the body is not JSON
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/sub/state', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ subscription: user.subscription ?? null })
/// });
/// // { state: "trial", statusText: "Trial: 5 days remaining", suggestedAction: "upgrade" }
/// ```
#[post("/state")]
pub async fn post_state(
    options: web::Data<services::state::ClassifierOptions>,
    req: web::Json<ClassifyRequest>,
) -> impl Responder {
    let req = req.into_inner();
    let classification =
        services::state::classify(req.subscription.as_ref(), Utc::now(), options.get_ref());
    log::debug!(
        "Classified subscription as {} ({})",
        classification.state,
        classification.status_text
    );
    Success::ok(classification)
}
