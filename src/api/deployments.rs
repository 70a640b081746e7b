//! 部署管理 API
//!
//! 包含 /deployments/* 端点。业务失败以 200 + `ActionResult` 返回，由调用方按 error_code 分支

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::domain::deployment::ComposeRequest;
use crate::domain::{ActionResult, AppStatus};
use crate::error::ApiResult;
use crate::middleware::RequireApiKey;
use crate::state::AppState;

/// 创建部署管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deployments/:id", put(update_compose))
        .route("/deployments/:id/start", post(start_compose))
        .route("/deployments/:id/stop", post(stop_app))
        .route("/deployments/:id/restart", post(restart_app))
        .route("/deployments/:id/status", get(get_status))
}

/// 创建并启动部署
///
/// POST /deployments/:id/start
/// 需要 API Key
async fn start_compose(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ComposeRequest>, JsonRejection>,
) -> ApiResult<Json<ActionResult>> {
    let Json(request) = payload?;
    // 请求被放弃时 guard 被丢弃，令牌取消，子进程随之终止
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let result = state
        .lifecycle
        .start(&id, &request.compose_yaml, &cancel)
        .await;
    Ok(Json(result))
}

/// 停止部署
///
/// POST /deployments/:id/stop
/// 需要 API Key
async fn stop_app(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ActionResult> {
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    Json(state.lifecycle.stop(&id, &cancel).await)
}

/// 重启部署
///
/// POST /deployments/:id/restart
/// 需要 API Key
async fn restart_app(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ActionResult> {
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    Json(state.lifecycle.restart(&id, &cancel).await)
}

/// 更新部署清单
///
/// PUT /deployments/:id
/// 需要 API Key
async fn update_compose(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ComposeRequest>, JsonRejection>,
) -> ApiResult<Json<ActionResult>> {
    let Json(request) = payload?;
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let result = state
        .lifecycle
        .update(&id, &request.compose_yaml, &cancel)
        .await;
    Ok(Json(result))
}

/// 查询部署状态
///
/// GET /deployments/:id/status
/// 需要 API Key
async fn get_status(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<AppStatus> {
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    Json(state.lifecycle.status(&id, &cancel).await)
}
