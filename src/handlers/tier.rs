use crate::error::AppError;
use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::TierService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/tier",
    tag = "tiers",
    params(("tenant_id" = String, Path, description = "Tenant (company) id")),
    security(("user_token" = [])),
    responses(
        (status = 200, description = "当前档位、配额与用量", body = TierInfoResponse),
        (status = 401, description = "未登录")
    )
)]
pub async fn tier_info(
    service: web::Data<TierService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if current_user_id(&req).is_none() {
        return Ok(AppError::Unauthenticated("Please sign in to continue".into()).error_response());
    }
    match service.tier_info(&path.into_inner()).await {
        Ok(info) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": info }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn tier_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/tenants/{tenant_id}/tier", web::get().to(tier_info));
}
