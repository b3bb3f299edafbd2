use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::GiveawayService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/giveaways",
    tag = "giveaways",
    params(("tenant_id" = String, Path, description = "Tenant (company) id")),
    request_body = CreateGiveawayRequest,
    security(("user_token" = [])),
    responses(
        (status = 201, description = "创建成功", body = CreateGiveawayResponse),
        (status = 400, description = "参数错误"),
        (status = 401, description = "未登录"),
        (status = 403, description = "超出档位配额")
    )
)]
/// 创建 giveaway (直接进入 active 状态)
pub async fn create_giveaway(
    service: web::Data<GiveawayService>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreateGiveawayRequest>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    match service
        .create_giveaway(&path.into_inner(), caller.as_deref(), body.into_inner())
        .await
    {
        Ok(data) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/giveaways",
    tag = "giveaways",
    params(
        ("tenant_id" = String, Path, description = "Tenant (company) id"),
        PaginationParams
    ),
    security(("user_token" = [])),
    responses(
        (status = 200, description = "giveaway 列表", body = PaginatedGiveaways),
        (status = 401, description = "未登录")
    )
)]
/// 分页获取 tenant 的 giveaway (新的在前)
pub async fn list_giveaways(
    service: web::Data<GiveawayService>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    match service
        .list_giveaways(&path.into_inner(), caller.as_deref(), &query.into_inner())
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/stats",
    tag = "giveaways",
    params(("tenant_id" = String, Path, description = "Tenant (company) id")),
    security(("user_token" = [])),
    responses(
        (status = 200, description = "仪表盘统计", body = DashboardStats),
        (status = 401, description = "未登录")
    )
)]
pub async fn dashboard_stats(
    service: web::Data<GiveawayService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    match service
        .dashboard_stats(&path.into_inner(), caller.as_deref())
        .await
    {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": stats }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/giveaways/{giveaway_id}/status",
    tag = "giveaways",
    params(
        ("tenant_id" = String, Path, description = "Tenant (company) id"),
        ("giveaway_id" = Uuid, Path, description = "Giveaway id")
    ),
    request_body = UpdateStatusRequest,
    security(("user_token" = [])),
    responses(
        (status = 200, description = "状态已更新", body = GiveawayResponse),
        (status = 403, description = "不属于该 tenant 或超出配额"),
        (status = 404, description = "giveaway 不存在"),
        (status = 409, description = "状态不可回退")
    )
)]
/// 状态流转 draft -> active -> ended
pub async fn update_status(
    service: web::Data<GiveawayService>,
    req: HttpRequest,
    path: web::Path<(String, Uuid)>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    let (tenant_id, giveaway_id) = path.into_inner();
    match service
        .update_status(&tenant_id, giveaway_id, caller.as_deref(), body.status)
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/giveaways/{giveaway_id}",
    tag = "giveaways",
    params(("giveaway_id" = Uuid, Path, description = "Giveaway id")),
    responses(
        (status = 200, description = "giveaway 详情", body = GiveawayResponse),
        (status = 404, description = "giveaway 不存在")
    )
)]
/// 参与页读取 giveaway (无需登录)
pub async fn get_giveaway(
    service: web::Data<GiveawayService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match service.get_giveaway(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn giveaway_config(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/tenants/{tenant_id}/giveaways",
        web::post().to(create_giveaway),
    )
    .route("/tenants/{tenant_id}/giveaways", web::get().to(list_giveaways))
    .route("/tenants/{tenant_id}/stats", web::get().to(dashboard_stats))
    .route(
        "/tenants/{tenant_id}/giveaways/{giveaway_id}/status",
        web::put().to(update_status),
    )
    .route("/giveaways/{giveaway_id}", web::get().to(get_giveaway));
}
