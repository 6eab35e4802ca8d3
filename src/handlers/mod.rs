pub mod analysis;
pub mod cache;
pub mod company;
pub mod finance;
pub mod health;
pub mod market;

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::models::{parse_date, ApiResponse, Source};
use crate::services::vnstock::normalize_symbol;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(company::config)
            .configure(finance::config)
            .configure(analysis::config)
            .configure(market::config)
            .configure(cache::config)
    );
}

// ==================== 公共辅助 ====================

/// 成功响应
fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data))
}

/// 参数错误（400）
fn bad_request(error: anyhow::Error) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()>::error(error.to_string()))
}

/// 上游或内部错误（500）
fn server_error(error: anyhow::Error) -> HttpResponse {
    log::error!("❌ 请求处理失败: {:#}", error);
    HttpResponse::InternalServerError().json(ApiResponse::<()>::error(format!("{:#}", error)))
}

/// 服务调用结果转成响应
fn respond<T: Serialize>(result: anyhow::Result<T>) -> HttpResponse {
    match result {
        Ok(data) => ok(data),
        Err(e) => server_error(e),
    }
}

/// 解析可选的数据源参数
fn parse_source(source: Option<&str>) -> anyhow::Result<Option<Source>> {
    source
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Source>())
        .transpose()
}

/// 解析可选的日期参数
fn parse_optional_date(date: Option<&str>) -> anyhow::Result<Option<chrono::NaiveDate>> {
    date.filter(|s| !s.trim().is_empty())
        .map(parse_date)
        .transpose()
}

/// 校验路径中的股票代码
fn symbol_param(symbol: &str) -> anyhow::Result<String> {
    normalize_symbol(symbol)
}
