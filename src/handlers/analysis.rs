//! 分析数据接口（先查缓存）
//!
//! - GET /stocks/{symbol}/prices?start_date=&end_date=
//! - GET /stocks/{symbol}/metrics?end_date=&period=&limit=
//! - GET /stocks/{symbol}/market_cap?end_date=
//! - GET /stocks/{symbol}/line_items?items=a,b&end_date=&period=&limit=
//! - GET /stocks/{symbol}/insider_trades?end_date=&start_date=&limit=
//! - GET /stocks/{symbol}/news?end_date=&start_date=&limit=

use actix_web::{web, HttpResponse, Result};
use chrono::NaiveDate;

use super::{bad_request, parse_optional_date, respond, symbol_param};
use crate::models::{
    parse_date, split_list, DateRangeQuery, LineItemsQuery, MetricsQuery, Period, PriceQuery,
};
use crate::services::finance_service::{DEFAULT_PERIOD_LIMIT, DEFAULT_RECORD_LIMIT};
use crate::services::FinanceService;

/// 截止日期参数
#[derive(Debug, serde::Deserialize)]
pub struct EndDateQuery {
    pub end_date: String,
}

/// 获取日线价格
///
/// GET /api/v1/stocks/{symbol}/prices
pub async fn get_prices(
    service: web::Data<FinanceService>,
    path: web::Path<String>,
    query: web::Query<PriceQuery>,
) -> Result<HttpResponse> {
    let parsed = (|| -> anyhow::Result<(String, NaiveDate, NaiveDate)> {
        let start = parse_date(&query.start_date)?;
        let end = parse_date(&query.end_date)?;
        if start > end {
            anyhow::bail!("开始日期 {} 晚于结束日期 {}", start, end);
        }
        Ok((symbol_param(&path)?, start, end))
    })();
    let (symbol, start, end) = match parsed {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };

    Ok(respond(service.get_prices(&symbol, start, end).await))
}

/// 获取财务指标
///
/// GET /api/v1/stocks/{symbol}/metrics
pub async fn get_financial_metrics(
    service: web::Data<FinanceService>,
    path: web::Path<String>,
    query: web::Query<MetricsQuery>,
) -> Result<HttpResponse> {
    let parsed = symbol_param(&path).and_then(|s| Ok((s, parse_date(&query.end_date)?)));
    let (symbol, end) = match parsed {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };
    let period = query.period.as_deref().map(Period::parse_lenient).unwrap_or_default();
    let limit = query.limit.unwrap_or(DEFAULT_PERIOD_LIMIT);

    Ok(respond(
        service.get_financial_metrics(&symbol, end, period, limit).await,
    ))
}

/// 获取市值（十亿越南盾）
///
/// GET /api/v1/stocks/{symbol}/market_cap
pub async fn get_market_cap(
    service: web::Data<FinanceService>,
    path: web::Path<String>,
    query: web::Query<EndDateQuery>,
) -> Result<HttpResponse> {
    let parsed = symbol_param(&path).and_then(|s| Ok((s, parse_date(&query.end_date)?)));
    let (symbol, end) = match parsed {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };

    Ok(respond(service.get_market_cap(&symbol, end).await))
}

/// 获取报表科目
///
/// GET /api/v1/stocks/{symbol}/line_items
pub async fn search_line_items(
    service: web::Data<FinanceService>,
    path: web::Path<String>,
    query: web::Query<LineItemsQuery>,
) -> Result<HttpResponse> {
    let parsed = (|| -> anyhow::Result<(String, Vec<String>, NaiveDate)> {
        let items = split_list(&query.items);
        if items.is_empty() {
            anyhow::bail!("items 不能为空");
        }
        Ok((symbol_param(&path)?, items, parse_date(&query.end_date)?))
    })();
    let (symbol, items, end) = match parsed {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };
    let period = query.period.as_deref().map(Period::parse_lenient).unwrap_or_default();
    let limit = query.limit.unwrap_or(DEFAULT_PERIOD_LIMIT);

    Ok(respond(
        service
            .search_line_items(&symbol, &items, end, period, limit)
            .await,
    ))
}

/// 解析日期区间参数
fn date_range(
    symbol: &str,
    query: &DateRangeQuery,
) -> anyhow::Result<(String, NaiveDate, Option<NaiveDate>, usize)> {
    let end = parse_date(&query.end_date)?;
    let start = parse_optional_date(query.start_date.as_deref())?;
    if start.is_some_and(|s| s > end) {
        anyhow::bail!("开始日期晚于结束日期 {}", end);
    }
    Ok((
        symbol_param(symbol)?,
        end,
        start,
        query.limit.unwrap_or(DEFAULT_RECORD_LIMIT),
    ))
}

/// 获取内部人交易
///
/// GET /api/v1/stocks/{symbol}/insider_trades
pub async fn get_insider_trades(
    service: web::Data<FinanceService>,
    path: web::Path<String>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse> {
    let (symbol, end, start, limit) = match date_range(&path, &query) {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };

    Ok(respond(
        service.get_insider_trades(&symbol, end, start, limit).await,
    ))
}

/// 获取公司新闻
///
/// GET /api/v1/stocks/{symbol}/news
pub async fn get_company_news(
    service: web::Data<FinanceService>,
    path: web::Path<String>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse> {
    let (symbol, end, start, limit) = match date_range(&path, &query) {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };

    Ok(respond(
        service.get_company_news(&symbol, end, start, limit).await,
    ))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/stocks/{symbol}/prices", web::get().to(get_prices))
        .route("/stocks/{symbol}/metrics", web::get().to(get_financial_metrics))
        .route("/stocks/{symbol}/market_cap", web::get().to(get_market_cap))
        .route("/stocks/{symbol}/line_items", web::get().to(search_line_items))
        .route("/stocks/{symbol}/insider_trades", web::get().to(get_insider_trades))
        .route("/stocks/{symbol}/news", web::get().to(get_company_news));
}
