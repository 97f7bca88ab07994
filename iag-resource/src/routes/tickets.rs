//! Ticket listing tool (`tickets:read`)

use actix_web::{get, web, HttpRequest, Responder};

use crate::{auth, AppState, Result};

#[get("/tickets")]
pub async fn tickets(state: web::Data<AppState>, request: HttpRequest) -> Result<impl Responder> {
    let identity = auth::authorize(&state, &request, "tickets:read").await?;

    Ok(web::Json(serde_json::json!({
        "ok": true,
        "user": identity.sub,
        "tickets": [
            { "id": "TCK-1001", "subject": "Cannot log in", "status": "open" },
            { "id": "TCK-1002", "subject": "Billing question", "status": "pending" },
            { "id": "TCK-1003", "subject": "Feature request: dark mode", "status": "closed" },
        ],
    })))
}
