//! 市场数据接口
//!
//! - GET /market/listing - 全部上市代码
//! - GET /market/price_board?tickers=VCB,FPT&source=VCI - 实时报价

use actix_web::{web, HttpResponse, Result};

use super::{bad_request, parse_source, respond};
use crate::models::{split_list, PriceBoardQuery};
use crate::services::FinanceService;

/// 获取全部上市代码
///
/// GET /api/v1/market/listing
pub async fn get_listing(service: web::Data<FinanceService>) -> Result<HttpResponse> {
    Ok(respond(service.get_listing().await))
}

/// 获取实时报价
///
/// GET /api/v1/market/price_board
pub async fn get_price_board(
    service: web::Data<FinanceService>,
    query: web::Query<PriceBoardQuery>,
) -> Result<HttpResponse> {
    let tickers = split_list(&query.tickers);
    if tickers.is_empty() {
        return Ok(bad_request(anyhow::anyhow!("tickers 不能为空")));
    }
    let source = match parse_source(query.source.as_deref()) {
        Ok(s) => s,
        Err(e) => return Ok(bad_request(e)),
    };
    if let Err(e) = tickers
        .iter()
        .try_for_each(|t| crate::services::vnstock::normalize_symbol(t).map(|_| ()))
    {
        return Ok(bad_request(e));
    }

    Ok(respond(service.get_trading_data(&tickers, source).await))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/market")
            .route("/listing", web::get().to(get_listing))
            .route("/price_board", web::get().to(get_price_board)),
    );
}
