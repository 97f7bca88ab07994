//! Echo tool (`echo:read`)

use actix_web::{get, web, HttpRequest, Responder};
use serde::Deserialize;

use crate::{auth, AppState, Result};

#[derive(Debug, Deserialize)]
pub struct EchoQuery {
    #[serde(default)]
    pub msg: String,
}

#[get("/mcp/echo")]
pub async fn echo(
    state: web::Data<AppState>,
    request: HttpRequest,
    query: web::Query<EchoQuery>,
) -> Result<impl Responder> {
    let identity = auth::authorize(&state, &request, "echo:read").await?;

    Ok(web::Json(serde_json::json!({
        "ok": true,
        "echo": query.msg,
        "user": identity.sub,
        "scope": "echo:read",
    })))
}
