//! 健康检查接口（不需要认证）

use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use super::ok;
use crate::services::{CacheStats, FinanceService};

/// 服务状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// 默认数据源
    pub source: String,
    /// 各分类缓存的股票数量
    pub cache: CacheStats,
}

/// GET /api/v1/health
pub async fn health_check(service: web::Data<FinanceService>) -> Result<HttpResponse> {
    Ok(ok(HealthStatus {
        status: "ok",
        source: service.source().to_string(),
        cache: service.cache().stats(),
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
