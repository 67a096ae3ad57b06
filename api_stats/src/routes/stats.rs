use actix_web::{Responder, delete, get, post, web};
use common::{error::Res, http::Success, session::Session};

use crate::services::registry::StatsRegistry;

/// Returns the dashboard stats for the calling session.
///
/// Served from memory while the cached copy is younger than the TTL.
/// Requests arriving while a fetch is running wait for that fetch.
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/stats', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// });
/// // { totalBooks: 4, totalDownloads: 120, totalViews: 900, totalEmailsCaptured: 37 }
/// ```
#[get("/stats")]
pub async fn get_stats(
    registry: web::Data<StatsRegistry>,
    session: web::ReqData<Session>,
) -> Res<impl Responder> {
    let stats = registry.get(&session).await?;
    Success::ok(stats)
}

/// Drops the cached stats and fetches fresh ones. Used by the "retry" button.
#[post("/stats/refresh")]
pub async fn post_refresh_stats(
    registry: web::Data<StatsRegistry>,
    session: web::ReqData<Session>,
) -> Res<impl Responder> {
    let stats = registry.refresh(&session).await?;
    Success::ok(stats)
}

/// Forgets the session's cache, e.g. on logout.
#[delete("/stats")]
pub async fn delete_stats(
    registry: web::Data<StatsRegistry>,
    session: web::ReqData<Session>,
) -> Res<impl Responder> {
    if registry.evict(&session) {
        log::debug!("Evicted stats cache for a session");
    }
    Success::no_content()
}
