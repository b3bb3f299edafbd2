use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::WinnerService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/giveaways/{giveaway_id}/winners",
    tag = "winners",
    params(
        ("tenant_id" = String, Path, description = "Tenant (company) id"),
        ("giveaway_id" = Uuid, Path, description = "Giveaway id")
    ),
    security(("user_token" = [])),
    responses(
        (status = 201, description = "抽出一位中奖者", body = PickWinnerResponse),
        (status = 401, description = "未登录"),
        (status = 403, description = "不属于该 tenant 或超出档位中奖人数"),
        (status = 404, description = "giveaway 不存在"),
        (status = 409, description = "giveaway 未结束或已抽满"),
        (status = 422, description = "没有可抽的 entry")
    )
)]
/// 按 entry_count 加权随机抽取下一位中奖者
pub async fn pick_winner(
    service: web::Data<WinnerService>,
    req: HttpRequest,
    path: web::Path<(String, Uuid)>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    let (tenant_id, giveaway_id) = path.into_inner();
    match service
        .pick_winner(&tenant_id, giveaway_id, caller.as_deref())
        .await
    {
        Ok(data) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/giveaways/{giveaway_id}/winners",
    tag = "winners",
    params(
        ("tenant_id" = String, Path, description = "Tenant (company) id"),
        ("giveaway_id" = Uuid, Path, description = "Giveaway id")
    ),
    security(("user_token" = [])),
    responses(
        (status = 200, description = "中奖列表", body = [WinnerResponse]),
        (status = 403, description = "不属于该 tenant"),
        (status = 404, description = "giveaway 不存在")
    )
)]
pub async fn list_winners(
    service: web::Data<WinnerService>,
    req: HttpRequest,
    path: web::Path<(String, Uuid)>,
) -> Result<HttpResponse> {
    let caller = current_user_id(&req);
    let (tenant_id, giveaway_id) = path.into_inner();
    match service
        .list_winners(&tenant_id, giveaway_id, caller.as_deref())
        .await
    {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn winner_config(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/tenants/{tenant_id}/giveaways/{giveaway_id}/winners",
        web::post().to(pick_winner),
    )
    .route(
        "/tenants/{tenant_id}/giveaways/{giveaway_id}/winners",
        web::get().to(list_winners),
    );
}
