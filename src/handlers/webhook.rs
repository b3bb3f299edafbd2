use crate::external::WebhookVerifier;
use crate::models::CommerceEvent;
use crate::tasks::{SubmitOutcome, WebhookQueue};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use log::{error, info, warn};

/// Commerce platform webhook
///
/// 签名校验通过后立即返回 200, 事件交给后台队列处理
#[utoipa::path(
    post,
    path = "/webhook/commerce",
    tag = "webhooks",
    request_body(content = String, description = "原始事件 JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "已接收", body = String),
        (status = 401, description = "签名无效")
    )
)]
pub async fn commerce_webhook(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<WebhookVerifier>,
    queue: web::Data<WebhookQueue>,
) -> Result<HttpResponse> {
    if let Err(e) = verifier.verify(req.headers(), &body, Utc::now().timestamp()) {
        return Ok(e.error_response());
    }

    // 签名合法但内容无法解析时仍然确认, 避免平台反复重试
    let event = match CommerceEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to parse webhook payload: {e}");
            return Ok(HttpResponse::Ok().body("OK"));
        }
    };

    let event_type = event.event_type().to_string();
    match queue.submit(event) {
        SubmitOutcome::Queued => info!("Webhook event {event_type} queued"),
        SubmitOutcome::Dropped => error!("Webhook event {event_type} dropped"),
    }

    Ok(HttpResponse::Ok().body("OK"))
}

/// 路由配置
pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/commerce", web::post().to(commerce_webhook)));
}
