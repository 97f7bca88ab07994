//! Policy evaluation endpoint

use actix_web::{post, web, Responder};
use tracing::info;

use iag_common::{EvaluateRequest, Result};

use crate::{now_ts, policy, AppState};

#[post("/evaluate")]
pub async fn evaluate(
    state: web::Data<AppState>,
    body: web::Json<EvaluateRequest>,
) -> Result<impl Responder> {
    let request = body.into_inner();
    let now = now_ts();

    let delegation = state
        .store
        .find(&request.subject, &request.agent_id, &request.tool_id)
        .await?
        .filter(|d| d.not_after > now);

    let decision = policy::evaluate(
        delegation.as_ref(),
        &request,
        state.config.strict,
        state.config.obligation_ttl,
    );
    info!(
        subject = %request.subject,
        tool_id = %request.tool_id,
        allow = decision.allow,
        reason = decision.reason.as_deref(),
        "evaluated"
    );

    Ok(web::Json(decision))
}
