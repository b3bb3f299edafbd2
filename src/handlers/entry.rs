use crate::error::{AppError, AppResult};
use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::EntryService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/giveaways/{giveaway_id}/entries",
    tag = "entries",
    params(("giveaway_id" = Uuid, Path, description = "Giveaway id")),
    request_body(content = EnterGiveawayRequest, description = "可选: 推荐码 / 邮箱 / metadata"),
    security(("user_token" = [])),
    responses(
        (status = 201, description = "参与成功, 返回推荐码", body = EnterGiveawayResponse),
        (status = 400, description = "推荐码无效"),
        (status = 401, description = "未登录"),
        (status = 403, description = "参与人数已达档位上限"),
        (status = 404, description = "giveaway 不存在"),
        (status = 409, description = "未开始 / 已结束 / 已参与")
    )
)]
/// 参与 giveaway
///
/// 请求体可以为空; 非空时必须是合法的 `EnterGiveawayRequest`, 否则返回 400
pub async fn enter_giveaway(
    service: web::Data<EntryService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    let body = match parse_enter_body(&body) {
        Ok(body) => body,
        Err(e) => return Ok(e.error_response()),
    };
    match service
        .enter(path.into_inner(), caller.as_deref(), body)
        .await
    {
        Ok(data) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

fn parse_enter_body(body: &[u8]) -> AppResult<EnterGiveawayRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(EnterGiveawayRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::ValidationError(format!("Invalid request body: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/giveaways/{giveaway_id}/entries/me",
    tag = "entries",
    params(("giveaway_id" = Uuid, Path, description = "Giveaway id")),
    security(("user_token" = [])),
    responses(
        (status = 200, description = "当前用户参与状态", body = UserEntryResponse)
    )
)]
/// 当前用户是否已参与 (未登录返回 has_entered = false)
pub async fn my_entry(
    service: web::Data<EntryService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    match service
        .user_entry(path.into_inner(), caller.as_deref())
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/giveaways/{giveaway_id}/entries",
    tag = "entries",
    params(
        ("tenant_id" = String, Path, description = "Tenant (company) id"),
        ("giveaway_id" = Uuid, Path, description = "Giveaway id"),
        PaginationParams
    ),
    security(("user_token" = [])),
    responses(
        (status = 200, description = "参与列表", body = PaginatedEntries),
        (status = 403, description = "不属于该 tenant"),
        (status = 404, description = "giveaway 不存在")
    )
)]
pub async fn list_entries(
    service: web::Data<EntryService>,
    req: HttpRequest,
    path: web::Path<(String, Uuid)>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    let (tenant_id, giveaway_id) = path.into_inner();
    match service
        .list_entries(&tenant_id, giveaway_id, caller.as_deref(), &query.into_inner())
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn entry_config(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/giveaways/{giveaway_id}/entries",
        web::post().to(enter_giveaway),
    )
    .route("/giveaways/{giveaway_id}/entries/me", web::get().to(my_entry))
    .route(
        "/tenants/{tenant_id}/giveaways/{giveaway_id}/entries",
        web::get().to(list_entries),
    );
}
