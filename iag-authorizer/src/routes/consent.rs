//! Consent decision endpoint

use actix_web::{post, web, Responder};
use tracing::info;

use iag_common::{ConsentRequest, Result};

use crate::{now_ts, policy, AppState};

#[post("/consent")]
pub async fn consent(
    state: web::Data<AppState>,
    body: web::Json<ConsentRequest>,
) -> Result<impl Responder> {
    let request = body.into_inner();
    let now = now_ts();

    let delegation = state
        .store
        .find(&request.subject, &request.agent_id, &request.tool_id)
        .await?
        .filter(|d| d.not_after > now);

    let decision = policy::consent(delegation.as_ref(), &request, now);
    info!(
        subject = %request.subject,
        tool_id = %request.tool_id,
        allow = decision.allow,
        record_id = decision.record_id.as_deref(),
        "consent decided"
    );

    Ok(web::Json(decision))
}
