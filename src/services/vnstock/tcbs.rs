//! TCBS 数据源
//!
//! 对接 https://apipubaws.tcbs.com.vn 的 tcanalysis 与 stock-insight 接口。
//! 金额单位：财务报表为十亿越南盾，K线价格为越南盾。

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

use super::common::{
    add_report_period, date_to_timestamp, endpoint, extract_records, normalize_date_column,
    TCBS_BARS_LONG_TERM, TCBS_COMPANY_PROFILE, TCBS_DIVIDENDS, TCBS_EVENTS, TCBS_FINANCE,
    TCBS_INSIDER_DEALS, TCBS_NEWS, TCBS_OFFICERS, TCBS_PRICE_BOARD, TCBS_SHAREHOLDERS,
    TCBS_TICKER_OVERVIEW,
};
use super::DataSource;
use crate::models::{CompanySection, DataTable, Period, ReportKind, Source};

/// 内部人交易列名映射（上游名 -> 对外名）
const INSIDER_RENAMES: &[(&str, &str)] = &[
    ("an_date", "deal_announce_date"),
    ("dealing_method", "deal_method"),
    ("dealing_action", "deal_action"),
    ("quantity", "deal_quantity"),
    ("price", "deal_price"),
    ("ratio", "deal_ratio"),
];

/// K线列顺序
const PRICE_COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

/// TCBS 数据源
pub struct TcbsSource {
    /// HTTP 客户端
    client: Client,
    /// 接口根地址
    base_url: String,
}

impl TcbsSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 发送 GET 请求并解析 JSON
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        log::debug!("📡 请求 TCBS 接口 URL: {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .header("Referer", "https://tcinvest.tcbs.com.vn/")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("TCBS 请求失败 {}: {}", url, response.status()));
        }

        Ok(response.json().await?)
    }

    /// 公司信息分类对应的接口、列表字段和分页参数
    fn company_request(
        section: CompanySection,
    ) -> (&'static str, &'static [&'static str], Option<usize>) {
        match section {
            CompanySection::Overview => (TCBS_TICKER_OVERVIEW, &[], None),
            CompanySection::Profile => (TCBS_COMPANY_PROFILE, &[], None),
            CompanySection::Shareholders => (TCBS_SHAREHOLDERS, &["listShareHolder"], None),
            CompanySection::Officers => (TCBS_OFFICERS, &["listKeyOfficer"], None),
            CompanySection::Events => (TCBS_EVENTS, &["listEventNews"], Some(15)),
            CompanySection::News => (TCBS_NEWS, &["listActivityNews"], Some(15)),
            CompanySection::InsiderDeals => (TCBS_INSIDER_DEALS, &["listInsiderDealing"], Some(20)),
            CompanySection::Dividends => (TCBS_DIVIDENDS, &["listDividendPaymentHis"], Some(15)),
        }
    }

    /// 财务报表在接口路径中的名称
    fn report_path(kind: ReportKind) -> &'static str {
        match kind {
            ReportKind::Ratio => "financialratio",
            ReportKind::IncomeStatement => "incomestatement",
            ReportKind::BalanceSheet => "balancesheet",
            ReportKind::CashFlow => "cashflow",
        }
    }
}

/// 公司信息的列整理：统一日期格式、内部人交易改名并给卖出数量加负号
pub(crate) fn tidy_company_table(section: CompanySection, table: &mut DataTable) {
    match section {
        CompanySection::InsiderDeals => {
            for (from, to) in INSIDER_RENAMES {
                table.rename_column(from, to);
            }
            normalize_date_column(table, "deal_announce_date");

            // 上游 dealing_action: "0" 买入，"1" 卖出
            if table.has_column("deal_quantity") {
                *table = table.with_column("deal_quantity", |row| {
                    let sell = row.text("deal_action").as_deref() == Some("1");
                    row.f64("deal_quantity")
                        .map(|q| if sell { -q.abs() } else { q })
                });
            }
        }
        CompanySection::Dividends => normalize_date_column(table, "exercise_date"),
        CompanySection::Events | CompanySection::News => {
            normalize_date_column(table, "publish_date");
        }
        _ => {}
    }
}

/// 整理K线表：tradingDate -> time，只保留 OHLCV 列
pub(crate) fn tidy_price_table(mut table: DataTable) -> DataTable {
    table.rename_column("trading_date", "time");
    normalize_date_column(&mut table, "time");
    table
        .select(&PRICE_COLUMNS)
        .sort_by_column("time", false)
}

#[async_trait]
impl DataSource for TcbsSource {
    fn name(&self) -> Source {
        Source::Tcbs
    }

    async fn company(&self, symbol: &str, section: CompanySection) -> Result<DataTable> {
        let (path, list_keys, page_size) = Self::company_request(section);
        let url = endpoint(&self.base_url, path, symbol);

        let query: Vec<(&str, String)> = match page_size {
            Some(size) => vec![("page", "0".to_string()), ("size", size.to_string())],
            None => Vec::new(),
        };

        let value = self.get_json(&url, &query).await?;
        let mut table = DataTable::from_records(extract_records(value, list_keys));
        tidy_company_table(section, &mut table);

        log::info!("获取 {} {} 成功，共 {} 行", symbol, section, table.len());
        Ok(table)
    }

    async fn financial_report(
        &self,
        symbol: &str,
        kind: ReportKind,
        period: Period,
    ) -> Result<DataTable> {
        let path = TCBS_FINANCE.replace("{report}", Self::report_path(kind));
        let url = endpoint(&self.base_url, &path, symbol);
        let yearly = if period == Period::Year { "1" } else { "0" };

        let value = self
            .get_json(&url, &[("yearly", yearly.to_string()), ("isAll", "true".to_string())])
            .await?;

        let mut table = DataTable::from_records(extract_records(value, &[]));
        if !table.is_empty() {
            add_report_period(&mut table, period);
        }

        log::info!(
            "获取 {} {} ({}) 成功，形状 {:?}",
            symbol,
            kind,
            period,
            table.shape()
        );
        Ok(table)
    }

    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataTable> {
        let url = format!("{}/{}", self.base_url, TCBS_BARS_LONG_TERM);
        // 结束日期包含当天
        let to = date_to_timestamp(end) + 86_400;
        let query = [
            ("ticker", symbol.to_string()),
            ("type", "stock".to_string()),
            ("resolution", "D".to_string()),
            ("from", date_to_timestamp(start).to_string()),
            ("to", to.to_string()),
        ];

        let value = self.get_json(&url, &query).await?;
        let table = tidy_price_table(DataTable::from_records(extract_records(value, &[])));

        log::info!("获取 {} K线 {} ~ {}，共 {} 条", symbol, start, end, table.len());
        Ok(table)
    }

    async fn price_board(&self, symbols: &[String]) -> Result<DataTable> {
        let url = format!("{}/{}", self.base_url, TCBS_PRICE_BOARD);
        let value = self
            .get_json(&url, &[("tickers", symbols.join(","))])
            .await?;
        Ok(DataTable::from_records(extract_records(value, &[])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tidy_insider_deals() {
        println!("\n========== 测试内部人交易整理 ==========");
        let mut table = DataTable::from_values(vec![
            json!({"anDate": "12/07/22", "dealingMethod": 0, "dealingAction": "1", "quantity": 10000.0, "price": 15000.0, "ratio": 0.01}),
            json!({"anDate": "01/03/23", "dealingMethod": 0, "dealingAction": "0", "quantity": 5000.0, "price": 16000.0, "ratio": 0.02}),
        ]);
        tidy_company_table(CompanySection::InsiderDeals, &mut table);
        println!("{}", table);

        assert!(table.has_column("deal_announce_date"));
        assert!(table.has_column("deal_price"));
        assert!(!table.has_column("an_date"));
        assert_eq!(table.str_at(0, "deal_announce_date"), Some("2022-07-12"));
        assert_eq!(table.f64_at(0, "deal_quantity"), Some(-10000.0));
        assert_eq!(table.f64_at(1, "deal_quantity"), Some(5000.0));
    }

    #[test]
    fn test_tidy_dividends_dates() {
        let mut table = DataTable::from_values(vec![json!({
            "exerciseDate": "25/08/23", "cashYear": 2023, "cashDividendPercentage": 0.1, "issueMethod": "cash"
        })]);
        tidy_company_table(CompanySection::Dividends, &mut table);
        assert_eq!(table.str_at(0, "exercise_date"), Some("2023-08-25"));
    }

    #[test]
    fn test_tidy_price_table() {
        let table = DataTable::from_values(vec![
            json!({"open": 10.0, "high": 11.0, "low": 9.5, "close": 10.5, "volume": 1000, "tradingDate": "2024-01-03T00:00:00.000Z"}),
            json!({"open": 9.8, "high": 10.2, "low": 9.6, "close": 10.0, "volume": 800, "tradingDate": "2024-01-02T00:00:00.000Z"}),
        ]);
        let tidy = tidy_price_table(table);
        assert_eq!(tidy.columns, PRICE_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        assert_eq!(tidy.str_at(0, "time"), Some("2024-01-02"));
        assert_eq!(tidy.f64_at(1, "close"), Some(10.5));
    }

    #[test]
    fn test_company_request_table() {
        for section in CompanySection::ALL {
            let (path, _, _) = TcbsSource::company_request(section);
            assert!(path.contains("{symbol}"), "{} 路径缺少代码占位符", section);
        }
        assert_eq!(TcbsSource::report_path(ReportKind::CashFlow), "cashflow");
    }
}
