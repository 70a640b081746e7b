//! 辅助操作 API
//!
//! 包含 /processes/:container/reload 和 /certificates 端点

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::domain::deployment::CertificateRequest;
use crate::domain::ActionResult;
use crate::error::ApiResult;
use crate::middleware::RequireApiKey;
use crate::state::AppState;

/// 创建辅助操作路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/processes/:container/reload", post(reload_process))
        .route("/certificates", post(issue_certificate))
}

/// 重新加载容器内进程（nginx -s reload）
///
/// POST /processes/:container/reload
/// 需要 API Key
async fn reload_process(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(container): Path<String>,
) -> Json<ActionResult> {
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    Json(state.lifecycle.reload_process(&container, &cancel).await)
}

/// 签发证书
///
/// POST /certificates
/// 需要 API Key
async fn issue_certificate(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CertificateRequest>, JsonRejection>,
) -> ApiResult<Json<ActionResult>> {
    let Json(request) = payload?;
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    Ok(Json(
        state
            .lifecycle
            .issue_certificate(&request.domain, &cancel)
            .await,
    ))
}
