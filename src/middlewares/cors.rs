use actix_cors::Cors;

/// 仪表盘嵌入在宿主平台的 iframe 中, 来源域名不固定
pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
