//! 公司信息接口
//!
//! - GET /stocks/{symbol}/company/{section}?source=TCBS
//!
//! section: overview / profile / shareholders / officers / events / news / insider_deals / dividends

use actix_web::{web, HttpResponse, Result};

use super::{bad_request, parse_source, respond, symbol_param};
use crate::models::{CompanySection, SourceQuery};
use crate::services::FinanceService;

/// 获取公司信息表
///
/// GET /api/v1/stocks/{symbol}/company/{section}
pub async fn get_company_section(
    service: web::Data<FinanceService>,
    path: web::Path<(String, String)>,
    query: web::Query<SourceQuery>,
) -> Result<HttpResponse> {
    let (symbol, section) = path.into_inner();

    let symbol = match symbol_param(&symbol) {
        Ok(s) => s,
        Err(e) => return Ok(bad_request(e)),
    };
    let section: CompanySection = match section.parse() {
        Ok(s) => s,
        Err(e) => return Ok(bad_request(e)),
    };
    let source = match parse_source(query.source.as_deref()) {
        Ok(s) => s,
        Err(e) => return Ok(bad_request(e)),
    };

    Ok(respond(service.company_table(&symbol, section, source).await))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/stocks/{symbol}/company/{section}",
        web::get().to(get_company_section),
    );
}
