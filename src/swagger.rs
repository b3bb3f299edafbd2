use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{GiveawayStatus, PrizeDetails, Tier, WinnerSelectionMethod};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // 宿主平台下发的用户 token, 放在 x-user-token 头里
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-user-token"))),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::giveaway::create_giveaway,
        handlers::giveaway::list_giveaways,
        handlers::giveaway::dashboard_stats,
        handlers::giveaway::update_status,
        handlers::giveaway::get_giveaway,
        handlers::entry::enter_giveaway,
        handlers::entry::my_entry,
        handlers::entry::list_entries,
        handlers::winner::pick_winner,
        handlers::winner::list_winners,
        handlers::tier::tier_info,
        handlers::webhook::commerce_webhook,
    ),
    components(
        schemas(
            GiveawayStatus,
            WinnerSelectionMethod,
            PrizeDetails,
            Tier,
            CreateGiveawayRequest,
            CreateGiveawayResponse,
            UpdateStatusRequest,
            GiveawayResponse,
            GiveawaySummary,
            DashboardStats,
            EnterGiveawayRequest,
            EnterGiveawayResponse,
            EntryResponse,
            UserEntryResponse,
            PickWinnerResponse,
            WinnerResponse,
            TierLimits,
            TierDisplay,
            TierInfoResponse,
            PaginatedGiveaways,
            PaginatedEntries,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "giveaways", description = "Giveaway management API"),
        (name = "entries", description = "Entry and referral API"),
        (name = "winners", description = "Winner selection API"),
        (name = "tiers", description = "Subscription tier API"),
        (name = "webhooks", description = "Commerce platform webhooks"),
    ),
    info(
        title = "Giveaway Backend API",
        version = "0.1.0",
        description = "Multi-tenant giveaway REST API documentation"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
