use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use giveaway_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{IdentityVerifier, JwtIdentityVerifier, WebhookVerifier},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks::{self, WebhookQueue},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");
    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {e}");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
    }

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建服务
    let tier_service = TierService::new(pool.clone(), config.plans.clone());
    let giveaway_service = GiveawayService::new(pool.clone(), tier_service.clone());
    let entry_service = EntryService::new(pool.clone(), tier_service.clone());
    let winner_service = WinnerService::new(pool.clone(), tier_service.clone());
    let subscription_service = SubscriptionService::new(pool.clone(), tier_service.clone());

    // 身份校验与 webhook 签名
    let identity: Arc<dyn IdentityVerifier> = Arc::new(JwtIdentityVerifier::new(
        &config.identity.secret,
        &config.identity.header,
    ));
    let webhook_verifier =
        WebhookVerifier::new(&config.webhook.secret, config.webhook.tolerance_secs);

    // 启动后台任务
    let (webhook_queue, _webhook_worker) =
        WebhookQueue::start(config.webhook.queue_capacity, subscription_service);
    tasks::spawn_all(
        giveaway_service.clone(),
        config.scheduler.expire_interval_secs,
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(identity.clone()))
            .app_data(web::Data::new(tier_service.clone()))
            .app_data(web::Data::new(giveaway_service.clone()))
            .app_data(web::Data::new(entry_service.clone()))
            .app_data(web::Data::new(winner_service.clone()))
            .app_data(web::Data::new(webhook_verifier.clone()))
            .app_data(web::Data::new(webhook_queue.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::giveaway_config)
                    .configure(handlers::entry_config)
                    .configure(handlers::winner_config)
                    .configure(handlers::tier_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
