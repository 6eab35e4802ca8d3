//! 集成测试公共工具：不访问网络的模拟数据源

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vnstock_backend::models::{CompanySection, DataTable, Period, ReportKind, Source};
use vnstock_backend::services::{DataSource, FinanceService, FinancialCache, Vnstock};

/// 模拟数据源，记录各类请求的次数
#[derive(Default)]
pub struct MockSource {
    pub price_calls: AtomicUsize,
    pub report_calls: AtomicUsize,
    pub company_calls: AtomicUsize,
    /// 为真时分红接口返回错误
    pub fail_dividends: bool,
    /// 冒充的数据源，默认 TCBS
    pub source: Option<Source>,
    /// 财务报表请求收到的报告期
    pub periods: Mutex<Vec<Period>>,
}

impl MockSource {
    pub fn named(source: Source) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn last_period(&self) -> Option<Period> {
        self.periods.lock().unwrap().last().copied()
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    pub fn company_calls(&self) -> usize {
        self.company_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn name(&self) -> Source {
        self.source.unwrap_or(Source::Tcbs)
    }

    async fn company(&self, symbol: &str, section: CompanySection) -> Result<DataTable> {
        self.company_calls.fetch_add(1, Ordering::SeqCst);
        let values = match section {
            CompanySection::Overview => vec![json!({
                "ticker": symbol, "exchange": "HOSE", "industry": "Ngân hàng",
                "outstanding_share": 100.0, "market_cap": 1500.0
            })],
            CompanySection::Dividends if self.fail_dividends => {
                return Err(anyhow!("分红接口不可用"));
            }
            CompanySection::Dividends => vec![
                json!({"exercise_date": "2023-06-01", "cash_year": 2023, "cash_dividend_percentage": 0.1, "issue_method": "cash"}),
                json!({"exercise_date": "2022-06-01", "cash_year": 2022, "cash_dividend_percentage": 0.08, "issue_method": "cash"}),
            ],
            CompanySection::InsiderDeals => vec![
                json!({"deal_announce_date": "2024-03-01", "deal_quantity": 10000.0, "deal_price": 15000.0, "name": "Nguyễn Văn A"}),
                json!({"deal_announce_date": "2023-11-15", "deal_quantity": -5000.0, "deal_price": 14000.0, "name": "Trần Thị B"}),
            ],
            CompanySection::News => vec![
                json!({"public_date": "2024-05-10", "news_title": "Kết quả kinh doanh quý 1", "news_source_link": "https://example.vn/a"}),
                json!({"public_date": "2024-04-02", "news_title": "Đại hội cổ đông", "news_source_link": "https://example.vn/b"}),
            ],
            other => return Err(anyhow!("模拟数据源不提供 {}", other)),
        };
        Ok(DataTable::from_values(values))
    }

    async fn financial_report(
        &self,
        _symbol: &str,
        kind: ReportKind,
        period: Period,
    ) -> Result<DataTable> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.periods.lock().unwrap().push(period);
        let values = match kind {
            ReportKind::Ratio => vec![
                json!({"report_period": "2023-12-31", "price_to_earning": 10.0, "earning_per_share": 2000.0, "roe": 0.18, "empty": null}),
                json!({"report_period": "2022-12-31", "price_to_earning": 9.0, "earning_per_share": 1500.0, "roe": 0.16, "empty": null}),
            ],
            ReportKind::IncomeStatement => vec![
                json!({"report_period": "2023-12-31", "revenue": 4000.0, "post_tax_profit": 200.0, "ebitda": 600.0, "operation_profit": 450.0}),
                json!({"report_period": "2022-12-31", "revenue": 3500.0, "post_tax_profit": 150.0, "ebitda": 500.0, "operation_profit": 400.0}),
            ],
            ReportKind::BalanceSheet => vec![
                json!({"report_period": "2023-12-31", "short_debt": 800.0, "long_debt": 200.0, "debt": 1500.0, "cash": 100.0, "inventory": 300.0}),
                json!({"report_period": "2022-12-31", "short_debt": 700.0, "long_debt": 250.0, "cash": 90.0, "inventory": 280.0}),
            ],
            ReportKind::CashFlow => vec![
                json!({"report_period": "2023-12-31", "invest_cost": -120.0, "free_cash_flow": 250.0, "from_sale": 370.0}),
                json!({"report_period": "2022-12-31", "invest_cost": -100.0, "free_cash_flow": 180.0, "from_sale": 280.0}),
            ],
        };
        Ok(DataTable::from_values(values))
    }

    async fn price_history(
        &self,
        _symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataTable> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let values = [
            ("2024-01-02", 90.0, 91.0),
            ("2024-01-03", 91.0, 91.8),
            ("2024-01-04", 91.8, 92.5),
        ]
        .iter()
        .filter(|(day, _, _)| {
            let day = day.to_string();
            start.format("%Y-%m-%d").to_string() <= day && day <= end.format("%Y-%m-%d").to_string()
        })
        .map(|(day, open, close)| {
            json!({"time": day, "open": open, "high": close + 0.5, "low": open - 0.5, "close": close, "volume": 1_000_000})
        })
        .collect();
        Ok(DataTable::from_values(values))
    }

    async fn price_board(&self, symbols: &[String]) -> Result<DataTable> {
        Ok(DataTable::from_values(
            symbols
                .iter()
                .map(|s| json!({"ticker": s, "price": 91800}))
                .collect(),
        ))
    }
}

/// 以模拟数据源创建服务，返回服务与数据源句柄
pub fn service_with(mock: MockSource, cache: FinancialCache) -> (FinanceService, Arc<MockSource>) {
    let mock = Arc::new(mock);
    let vnstock = Vnstock::empty(Source::Tcbs).with_source(Source::Tcbs, mock.clone());
    (FinanceService::new(vnstock, Arc::new(cache), true), mock)
}

pub fn service() -> (FinanceService, Arc<MockSource>) {
    service_with(MockSource::default(), FinancialCache::in_memory())
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}
