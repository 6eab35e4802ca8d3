//! 缓存管理接口
//!
//! - GET /cache - 各分类缓存的股票数量
//! - DELETE /cache - 清空缓存

use actix_web::{web, HttpResponse, Result};

use super::{ok, respond};
use crate::services::FinanceService;

/// 缓存统计
///
/// GET /api/v1/cache
pub async fn cache_stats(service: web::Data<FinanceService>) -> Result<HttpResponse> {
    Ok(ok(service.cache().stats()))
}

/// 清空缓存
///
/// DELETE /api/v1/cache
pub async fn clear_cache(service: web::Data<FinanceService>) -> Result<HttpResponse> {
    Ok(respond(service.clear_cache().await.map(|_| "Cache cleared")))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/cache")
            .route(web::get().to(cache_stats))
            .route(web::delete().to(clear_cache)),
    );
}
