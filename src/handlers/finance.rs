//! 财务报表接口
//!
//! - GET /stocks/{symbol}/finance/{report} - 报表数据
//! - GET /stocks/{symbol}/finance/{report}/info - 报表概要（行列数、空值数、列类型）
//!
//! report: ratio / income_statement / balance_sheet / cash_flow
//! 查询参数: source, period (year/quarter), lang (en/vi), dropna

use actix_web::{web, HttpResponse, Result};

use super::{bad_request, parse_source, respond, symbol_param};
use crate::models::{FinanceQuery, Lang, Period, ReportKind, Source};
use crate::services::FinanceService;

/// 已校验的报表请求参数
struct ReportParams {
    symbol: String,
    kind: ReportKind,
    period: Period,
    lang: Lang,
    dropna: bool,
    source: Option<Source>,
}

fn report_params(symbol: &str, report: &str, query: &FinanceQuery) -> anyhow::Result<ReportParams> {
    Ok(ReportParams {
        symbol: symbol_param(symbol)?,
        kind: report.parse()?,
        period: query
            .period
            .as_deref()
            .map(Period::parse_lenient)
            .unwrap_or_default(),
        lang: match query.lang.as_deref() {
            Some(lang) => lang.parse()?,
            None => Lang::En,
        },
        dropna: query.dropna.unwrap_or(false),
        source: parse_source(query.source.as_deref())?,
    })
}

async fn fetch(service: &FinanceService, p: &ReportParams) -> anyhow::Result<crate::models::DataTable> {
    service
        .finance_table(&p.symbol, p.kind, p.period, p.lang, p.dropna, p.source)
        .await
}

/// 获取财务报表
///
/// GET /api/v1/stocks/{symbol}/finance/{report}
pub async fn get_report(
    service: web::Data<FinanceService>,
    path: web::Path<(String, String)>,
    query: web::Query<FinanceQuery>,
) -> Result<HttpResponse> {
    let (symbol, report) = path.into_inner();
    let params = match report_params(&symbol, &report, &query) {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };

    Ok(respond(fetch(&service, &params).await))
}

/// 获取财务报表概要
///
/// GET /api/v1/stocks/{symbol}/finance/{report}/info
pub async fn get_report_info(
    service: web::Data<FinanceService>,
    path: web::Path<(String, String)>,
    query: web::Query<FinanceQuery>,
) -> Result<HttpResponse> {
    let (symbol, report) = path.into_inner();
    let params = match report_params(&symbol, &report, &query) {
        Ok(p) => p,
        Err(e) => return Ok(bad_request(e)),
    };

    Ok(respond(fetch(&service, &params).await.map(|table| table.info())))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/stocks/{symbol}/finance/{report}", web::get().to(get_report))
        .route("/stocks/{symbol}/finance/{report}/info", web::get().to(get_report_info));
}
