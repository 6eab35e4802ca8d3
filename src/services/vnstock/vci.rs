//! VCI（Vietcap）数据源
//!
//! 对接 https://trading.vietcap.com.vn：
//! - REST 行情接口：上市代码、日K线、实时报价
//! - GraphQL 接口（`data-mt/graphql`）：公司信息、比率表和三张财务报表
//!
//! 财务数据来自 `CompanyFinancialRatio` 一个查询，比率字段按 TCBS 比率表的列名输出，
//! 报表科目（`BS*` / `IS*` / `CF*`）按 `ListFinancialRatio` 给出的英文名转成 snake_case。
//! 内部人交易和分红历史不提供。

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tokio::sync::OnceCell;

use super::common::{
    add_report_period, date_to_timestamp, extract_records, flatten_record, normalize_date,
    normalize_date_column, unsupported, VCI_ALL_SYMBOLS, VCI_GRAPHQL, VCI_OHLC_CHART,
    VCI_PRICE_BOARD,
};
use super::DataSource;
use crate::models::{
    camel_to_snake, value_as_i64, CompanySection, DataTable, Period, ReportKind, Source,
};

/// 比率字段：VCI 字段名 -> 输出列名（与 TCBS 比率表一致）
const RATIO_COLUMNS: &[(&str, &str)] = &[
    ("pe", "price_to_earning"),
    ("pb", "price_to_book"),
    ("ps", "price_to_sale"),
    ("pcf", "price_to_cash_flow"),
    ("evPerEbitda", "value_before_ebitda"),
    ("ev", "enterprise_value"),
    ("eps", "earning_per_share"),
    ("bvps", "book_value_per_share"),
    ("roe", "roe"),
    ("roa", "roa"),
    ("roic", "roic"),
    ("grossMargin", "gross_profit_margin"),
    ("netProfitMargin", "post_tax_margin"),
    ("ebitMargin", "ebit_margin"),
    ("currentRatio", "current_payment"),
    ("quickRatio", "quick_payment"),
    ("cashRatio", "cash_payment"),
    ("interestCoverage", "interest_coverage"),
    ("revenue", "revenue"),
    ("revenueGrowth", "revenue_growth"),
    ("netProfit", "net_profit"),
    ("netProfitGrowth", "post_tax_profit_growth"),
    ("issueShare", "issue_share"),
];

/// 报表固定列，科目名与之重复时改用字段代码
const KEY_COLUMNS: [&str; 4] = ["ticker", "year", "quarter", "report_period"];

/// 日期列
const DATE_COLUMNS: [&str; 5] = [
    "public_date",
    "update_date",
    "issue_date",
    "record_date",
    "exright_date",
];

const RATIO_FIELDS_QUERY: &str =
    "query Query { ListFinancialRatio { fieldName en_Name en_Type order } }";

const OVERVIEW_QUERY: &str = "query Query($ticker: String!) { CompanyListingInfo(ticker: $ticker) { \
    id issueShare icbName2 enIcbName2 icbName3 enIcbName3 icbName4 enIcbName4 } }";

const PROFILE_QUERY: &str = "query Query($ticker: String!) { CompanyListingInfo(ticker: $ticker) { \
    id companyProfile en_CompanyProfile history en_History } }";

const SHAREHOLDERS_QUERY: &str = "query Query($ticker: String!) { OrganizationShareHolders(ticker: $ticker) { \
    id ticker ownerFullName en_OwnerFullName quantity percentage updateDate } }";

const OFFICERS_QUERY: &str = "query Query($ticker: String!) { OrganizationManagers(ticker: $ticker) { \
    id ticker fullName en_FullName positionName en_PositionName quantity percentage updateDate } }";

const EVENTS_QUERY: &str = "query Query($ticker: String!) { OrganizationEvents(ticker: $ticker) { \
    id ticker eventTitle en_EventTitle publicDate issueDate sourceUrl eventListCode ratio value \
    recordDate exrightDate eventListName en_EventListName } }";

const NEWS_QUERY: &str = "query Query($ticker: String!) { News(ticker: $ticker, langCode: \"vi\") { \
    id ticker newsTitle newsSubTitle newsSourceLink publicDate newsShortContent \
    closePrice referencePrice percentPriceChange } }";

/// VCI 数据源
pub struct VciSource {
    /// HTTP 客户端
    client: Client,
    /// 接口根地址
    base_url: String,
    /// 报表科目元数据，首次请求报表时加载
    ratio_fields: OnceCell<Vec<RatioField>>,
}

impl VciSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ratio_fields: OnceCell::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        log::debug!("📡 请求 VCI 接口 URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Referer", "https://trading.vietcap.com.vn/")
            .header("Origin", "https://trading.vietcap.com.vn")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("VCI 请求失败 {}: {}", url, response.status()));
        }
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self.url(path);
        log::debug!("📡 请求 VCI 接口 URL: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Referer", "https://trading.vietcap.com.vn/")
            .header("Origin", "https://trading.vietcap.com.vn")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("VCI 请求失败 {}: {}", url, response.status()));
        }
        Ok(response.json().await?)
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        self.post_json(VCI_GRAPHQL, &json!({ "query": query, "variables": variables }))
            .await
    }

    async fn ratio_fields(&self) -> Result<&[RatioField]> {
        let fields = self
            .ratio_fields
            .get_or_try_init(|| async {
                let value = self.graphql(RATIO_FIELDS_QUERY, json!({})).await?;
                let fields = parse_ratio_fields(value)?;
                log::info!("✅ 加载 VCI 报表科目 {} 个", fields.len());
                Ok::<_, anyhow::Error>(fields)
            })
            .await?;
        Ok(fields.as_slice())
    }
}

// ==================== GraphQL 解析 ====================

/// 取出 GraphQL 响应中的 `data`，带 `errors` 时返回第一条错误
pub(crate) fn graphql_data(value: Value) -> Result<Map<String, Value>> {
    if let Some(error) = value
        .get("errors")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
    {
        let message = error["message"].as_str().unwrap_or("未知错误");
        return Err(anyhow!("VCI GraphQL 错误: {}", message));
    }

    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(data)) => Ok(data),
            _ => Err(anyhow!("VCI GraphQL 响应缺少 data")),
        },
        _ => Err(anyhow!("VCI GraphQL 响应格式错误")),
    }
}

/// `ListFinancialRatio` 中的一项
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RatioField {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "en_Name", default)]
    pub en_name: Option<String>,
}

impl RatioField {
    /// 按字段代码前缀归属报表
    fn kind(&self) -> Option<ReportKind> {
        match self.field_name.get(..2)? {
            "BS" => Some(ReportKind::BalanceSheet),
            "IS" => Some(ReportKind::IncomeStatement),
            "CF" => Some(ReportKind::CashFlow),
            _ => None,
        }
    }
}

/// 字段代码会拼进查询语句，只接受字母数字
fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// 解析报表科目元数据，只保留三张报表的科目
pub(crate) fn parse_ratio_fields(value: Value) -> Result<Vec<RatioField>> {
    let mut data = graphql_data(value)?;
    let fields: Vec<RatioField> = match data.remove("ListFinancialRatio") {
        Some(list @ Value::Array(_)) => serde_json::from_value(list)?,
        _ => Vec::new(),
    };
    Ok(fields
        .into_iter()
        .filter(|f| f.kind().is_some() && is_field_name(&f.field_name))
        .collect())
}

/// 英文科目名转列名：`Cash and cash equivalents` -> `cash_and_cash_equivalents`
pub(crate) fn label_to_column(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

/// 某类报表要查询的 (VCI 字段名, 输出列名)
///
/// 英文名缺失、为空或重复的科目用字段代码作列名（`BSA1` -> `bsa1`）。
pub(crate) fn report_columns(kind: ReportKind, fields: &[RatioField]) -> Vec<(String, String)> {
    if kind == ReportKind::Ratio {
        return RATIO_COLUMNS
            .iter()
            .map(|(field, column)| (field.to_string(), column.to_string()))
            .collect();
    }

    let mut used: HashSet<String> = KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
    fields
        .iter()
        .filter(|f| f.kind() == Some(kind))
        .map(|f| {
            let column = f
                .en_name
                .as_deref()
                .map(label_to_column)
                .filter(|c| !c.is_empty() && !used.contains(c))
                .unwrap_or_else(|| camel_to_snake(&f.field_name));
            used.insert(column.clone());
            (f.field_name.clone(), column)
        })
        .collect()
}

/// 财务数据查询语句
pub(crate) fn financial_ratio_query(columns: &[(String, String)]) -> String {
    let fields: Vec<&str> = columns.iter().map(|(field, _)| field.as_str()).collect();
    format!(
        "query Query($ticker: String!, $period: String!) {{ \
         CompanyFinancialRatio(ticker: $ticker, period: $period) {{ \
         ratio {{ ticker yearReport lengthReport {} }} period }} }}",
        fields.join(" ")
    )
}

/// 解析 `CompanyFinancialRatio`
///
/// `lengthReport` 为 1-4 的是季度数据，其余（年报为 5）是年度数据，按 `period` 过滤。
/// 输出列为 ticker/year/quarter + `columns`，再加 `report_period`。
pub(crate) fn parse_financial_ratio(
    value: Value,
    symbol: &str,
    period: Period,
    columns: &[(String, String)],
) -> Result<DataTable> {
    let mut data = graphql_data(value)?;
    let ratio = data
        .remove("CompanyFinancialRatio")
        .and_then(|mut v| v.get_mut("ratio").map(Value::take))
        .unwrap_or(Value::Null);

    let quarterly = period == Period::Quarter;
    let rows = extract_records(ratio, &[])
        .into_iter()
        .filter(|record| {
            let length = record.get("lengthReport").and_then(value_as_i64);
            matches!(length, Some(1..=4)) == quarterly
        })
        .map(|mut record| {
            let mut row = vec![
                Value::String(symbol.to_string()),
                record.remove("yearReport").unwrap_or(Value::Null),
                record.remove("lengthReport").unwrap_or(Value::Null),
            ];
            row.extend(
                columns
                    .iter()
                    .map(|(field, _)| record.remove(field).unwrap_or(Value::Null)),
            );
            row
        })
        .collect();

    let names = KEY_COLUMNS[..3]
        .iter()
        .map(|c| c.to_string())
        .chain(columns.iter().map(|(_, column)| column.clone()))
        .collect();

    let mut table = DataTable::new(names, rows);
    add_report_period(&mut table, period);
    Ok(table)
}

/// 公司信息的 (根字段, 查询语句)，不提供的分类为 None
fn company_query(section: CompanySection) -> Option<(&'static str, &'static str)> {
    match section {
        CompanySection::Overview => Some(("CompanyListingInfo", OVERVIEW_QUERY)),
        CompanySection::Profile => Some(("CompanyListingInfo", PROFILE_QUERY)),
        CompanySection::Shareholders => Some(("OrganizationShareHolders", SHAREHOLDERS_QUERY)),
        CompanySection::Officers => Some(("OrganizationManagers", OFFICERS_QUERY)),
        CompanySection::Events => Some(("OrganizationEvents", EVENTS_QUERY)),
        CompanySection::News => Some(("News", NEWS_QUERY)),
        CompanySection::InsiderDeals | CompanySection::Dividends => None,
    }
}

/// 解析公司信息
///
/// 概览补充 `ticker`、`industry`（ICB 三级行业英文名）和
/// `outstanding_share`（百万股，与 TCBS 概览一致），日期列统一为 YYYY-MM-DD。
pub(crate) fn parse_company(
    value: Value,
    symbol: &str,
    section: CompanySection,
) -> Result<DataTable> {
    let (root, _) = company_query(section).ok_or_else(|| unsupported(Source::Vci, section.as_str()))?;
    let mut data = graphql_data(value)?;
    let records = extract_records(data.remove(root).unwrap_or(Value::Null), &[]);
    let mut table = DataTable::from_records(records);

    if section == CompanySection::Overview {
        table = table.with_column("outstanding_share", |row| {
            row.f64("issue_share").map(|v| v / 1_000_000.0)
        });
        table.rename_column("en_icb_name3", "industry");
        if !table.has_column("ticker") {
            let tickers = vec![Value::String(symbol.to_string()); table.len()];
            table.insert_column(0, "ticker", tickers);
        }
    }
    for column in DATE_COLUMNS {
        normalize_date_column(&mut table, column);
    }
    Ok(table)
}

/// 解析 VCI K线响应
///
/// 格式: `[{"symbol": "VCB", "o": [...], "h": [...], "l": [...], "c": [...], "v": [...], "t": [...]}]`，
/// 各数组按下标对齐，`t` 为 Unix 秒（数字或字符串）。
pub(crate) fn parse_ohlc_chart(value: &Value, symbol: &str) -> Result<DataTable> {
    let series = match value {
        Value::Array(items) => items
            .iter()
            .find(|item| item["symbol"].as_str() == Some(symbol))
            .or_else(|| items.first()),
        Value::Object(_) => Some(value),
        _ => None,
    };

    let Some(series) = series else {
        return Ok(DataTable::new(
            ["time", "open", "high", "low", "close", "volume"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            Vec::new(),
        ));
    };

    let column = |key: &str| -> Vec<Value> {
        series[key].as_array().cloned().unwrap_or_default()
    };
    let (times, opens, highs, lows, closes, volumes) =
        (column("t"), column("o"), column("h"), column("l"), column("c"), column("v"));

    if [&opens, &highs, &lows, &closes, &volumes]
        .iter()
        .any(|c| c.len() != times.len())
    {
        return Err(anyhow!("VCI K线数据长度不一致"));
    }

    let rows = times
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let time = normalize_date(t).map(Value::String).unwrap_or(Value::Null);
            vec![
                time,
                opens[i].clone(),
                highs[i].clone(),
                lows[i].clone(),
                closes[i].clone(),
                volumes[i].clone(),
            ]
        })
        .collect();

    Ok(DataTable::new(
        ["time", "open", "high", "low", "close", "volume"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows,
    ))
}

#[async_trait]
impl DataSource for VciSource {
    fn name(&self) -> Source {
        Source::Vci
    }

    async fn company(&self, symbol: &str, section: CompanySection) -> Result<DataTable> {
        let (_, query) =
            company_query(section).ok_or_else(|| unsupported(self.name(), section.as_str()))?;
        let value = self.graphql(query, json!({ "ticker": symbol })).await?;
        let table = parse_company(value, symbol, section)?;
        log::info!("获取 {} 公司信息 [{}] 成功，共 {} 条", symbol, section, table.len());
        Ok(table)
    }

    async fn financial_report(
        &self,
        symbol: &str,
        kind: ReportKind,
        period: Period,
    ) -> Result<DataTable> {
        let columns = match kind {
            ReportKind::Ratio => report_columns(kind, &[]),
            _ => report_columns(kind, self.ratio_fields().await?),
        };
        if columns.is_empty() {
            return Err(anyhow!("VCI 没有 {} 的科目定义", kind));
        }

        let period_code = match period {
            Period::Year => "Y",
            Period::Quarter => "Q",
        };
        let value = self
            .graphql(
                &financial_ratio_query(&columns),
                json!({ "ticker": symbol, "period": period_code }),
            )
            .await?;
        let table = parse_financial_ratio(value, symbol, period, &columns)?;
        log::info!(
            "获取 {} {} ({}) 成功，共 {} 期",
            symbol,
            kind,
            period,
            table.len()
        );
        Ok(table)
    }

    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataTable> {
        let body = json!({
            "timeFrame": "ONE_DAY",
            "symbols": [symbol],
            "from": date_to_timestamp(start),
            "to": date_to_timestamp(end) + 86_400,
        });

        let value = self.post_json(VCI_OHLC_CHART, &body).await?;
        let table = parse_ohlc_chart(&value, symbol)?;
        log::info!("获取 {} K线 {} ~ {}，共 {} 条", symbol, start, end, table.len());
        Ok(table)
    }

    async fn price_board(&self, symbols: &[String]) -> Result<DataTable> {
        let value = self
            .post_json(VCI_PRICE_BOARD, &json!({ "symbols": symbols }))
            .await?;
        let records = extract_records(value, &[])
            .into_iter()
            .map(flatten_record);
        Ok(DataTable::from_records(records))
    }

    async fn all_symbols(&self) -> Result<DataTable> {
        let value = self.get_json(VCI_ALL_SYMBOLS).await?;
        let table = DataTable::from_records(extract_records(value, &[]));
        log::info!("获取上市代码列表成功，共 {} 个", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ohlc_chart() {
        println!("\n========== 测试解析 VCI K线 ==========");
        let value = json!([{
            "symbol": "VCB",
            "o": [90000, 91000],
            "h": [91500, 92000],
            "l": [89500, 90500],
            "c": [91000, 91800],
            "v": [1200000, 1500000],
            "t": ["1704153600", 1704240000]
        }]);

        let table = parse_ohlc_chart(&value, "VCB").unwrap();
        println!("{}", table);
        assert_eq!(table.shape(), (2, 6));
        assert_eq!(table.str_at(0, "time"), Some("2024-01-02"));
        assert_eq!(table.str_at(1, "time"), Some("2024-01-03"));
        assert_eq!(table.f64_at(1, "close"), Some(91800.0));
    }

    #[test]
    fn test_parse_ohlc_chart_mismatch() {
        let value = json!([{"symbol": "VCB", "o": [1], "h": [], "l": [1], "c": [1], "v": [1], "t": [1704153600]}]);
        assert!(parse_ohlc_chart(&value, "VCB").is_err());
    }

    #[test]
    fn test_parse_ohlc_chart_empty() {
        let table = parse_ohlc_chart(&json!([]), "VCB").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 6);
    }

    fn fields() -> Vec<RatioField> {
        parse_ratio_fields(json!({"data": {"ListFinancialRatio": [
            {"fieldName": "BSA1", "en_Name": "Current assets", "en_Type": "Balance Sheet", "order": 1},
            {"fieldName": "BSA2", "en_Name": "Cash and cash equivalents", "en_Type": "Balance Sheet", "order": 2},
            {"fieldName": "BSB97", "en_Name": "Cash and cash equivalents", "en_Type": "Balance Sheet", "order": 3},
            {"fieldName": "ISA1", "en_Name": "Revenue (Bn. VND)", "en_Type": "Income Statement", "order": 1},
            {"fieldName": "ISA20", "en_Name": "Year", "en_Type": "Income Statement", "order": 2},
            {"fieldName": "CFA18", "en_Name": null, "en_Type": "Cash Flow", "order": 1},
            {"fieldName": "pe", "en_Name": "P/E", "en_Type": "Valuation", "order": 1},
            {"fieldName": "BS A3; x", "en_Name": "Injected", "en_Type": "Balance Sheet", "order": 9}
        ]}}))
        .unwrap()
    }

    #[test]
    fn test_graphql_errors() {
        let err = graphql_data(json!({"errors": [{"message": "Cannot query field"}], "data": null}))
            .unwrap_err();
        assert!(err.to_string().contains("Cannot query field"));
        assert!(graphql_data(json!({"data": null})).is_err());
        assert!(graphql_data(json!({"data": {"News": []}})).is_ok());
    }

    #[test]
    fn test_parse_ratio_fields() {
        let fields = fields();
        let names: Vec<&str> = fields.iter().map(|f| f.field_name.as_str()).collect();
        // 比率字段和非法代码被过滤
        assert_eq!(names, vec!["BSA1", "BSA2", "BSB97", "ISA1", "ISA20", "CFA18"]);
    }

    #[test]
    fn test_report_columns() {
        println!("\n========== 测试 VCI 报表列名 ==========");
        let fields = fields();

        let balance = report_columns(ReportKind::BalanceSheet, &fields);
        println!("{:?}", balance);
        assert_eq!(
            balance,
            vec![
                ("BSA1".to_string(), "current_assets".to_string()),
                ("BSA2".to_string(), "cash_and_cash_equivalents".to_string()),
                ("BSB97".to_string(), "bsb97".to_string()),
            ]
        );

        let income = report_columns(ReportKind::IncomeStatement, &fields);
        assert_eq!(income[0].1, "revenue_bn_vnd");
        // 与固定列重名时用字段代码
        assert_eq!(income[1].1, "isa20");

        let cash_flow = report_columns(ReportKind::CashFlow, &fields);
        assert_eq!(cash_flow, vec![("CFA18".to_string(), "cfa18".to_string())]);

        let ratio = report_columns(ReportKind::Ratio, &fields);
        assert!(ratio.contains(&("pe".to_string(), "price_to_earning".to_string())));
        assert!(ratio.contains(&("evPerEbitda".to_string(), "value_before_ebitda".to_string())));
        assert!(financial_ratio_query(&ratio).contains("ratio { ticker yearReport lengthReport pe pb"));
    }

    #[test]
    fn test_parse_financial_ratio_by_period() {
        println!("\n========== 测试解析 VCI 财务数据 ==========");
        let columns = report_columns(ReportKind::Ratio, &[]);
        let value = json!({"data": {"CompanyFinancialRatio": {"period": "Q", "ratio": [
            {"ticker": "VCI", "yearReport": 2022, "lengthReport": 5, "pe": 12.1, "eps": 1800.0, "roe": 0.11},
            {"ticker": "VCI", "yearReport": 2023, "lengthReport": 5, "pe": 25.4, "eps": 1150.0, "roe": 0.09},
            {"ticker": "VCI", "yearReport": 2023, "lengthReport": 3, "pe": 30.0, "eps": 300.0, "roe": 0.02},
            {"ticker": "VCI", "yearReport": 2023, "lengthReport": 4, "pe": 28.0, "eps": 320.0, "roe": 0.03}
        ]}}});

        let yearly = parse_financial_ratio(value.clone(), "VCI", Period::Year, &columns).unwrap();
        println!("{}", yearly);
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly.columns[0], "report_period");
        assert_eq!(yearly.str_at(0, "report_period"), Some("2023-12-31"));
        assert_eq!(yearly.f64_at(0, "price_to_earning"), Some(25.4));
        assert_eq!(yearly.f64_at(0, "earning_per_share"), Some(1150.0));
        assert_eq!(yearly.f64_at(1, "roe"), Some(0.11));
        assert_eq!(yearly.str_at(1, "ticker"), Some("VCI"));
        // 缺失字段为空值，dropna 时会被删除
        assert_eq!(yearly.f64_at(0, "price_to_book"), None);
        assert!(!yearly.drop_null_columns().has_column("price_to_book"));

        let quarterly = parse_financial_ratio(value, "VCI", Period::Quarter, &columns).unwrap();
        assert_eq!(quarterly.len(), 2);
        assert_eq!(quarterly.str_at(0, "report_period"), Some("2023-12-31"));
        assert_eq!(quarterly.str_at(1, "report_period"), Some("2023-09-30"));
    }

    #[test]
    fn test_parse_statement_columns() {
        let columns = report_columns(ReportKind::BalanceSheet, &fields());
        let value = json!({"data": {"CompanyFinancialRatio": {"ratio": [
            {"ticker": "VCI", "yearReport": 2023, "lengthReport": 5, "BSA1": 15000.5, "BSA2": 820.0, "BSB97": null}
        ]}}});
        let table = parse_financial_ratio(value, "VCI", Period::Year, &columns).unwrap();
        assert_eq!(table.f64_at(0, "current_assets"), Some(15000.5));
        assert_eq!(table.f64_at(0, "cash_and_cash_equivalents"), Some(820.0));
        assert_eq!(table.shape(), (1, 7));

        let empty = parse_financial_ratio(json!({"data": {"CompanyFinancialRatio": null}}), "VCI", Period::Year, &columns)
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_company_overview() {
        println!("\n========== 测试解析 VCI 公司概览 ==========");
        let value = json!({"data": {"CompanyListingInfo": {
            "id": "1", "issueShare": 718_013_965.0, "icbName3": "Môi giới chứng khoán",
            "enIcbName3": "Financial Services", "enIcbName4": "Investment Services"
        }}});
        let table = parse_company(value, "VCI", CompanySection::Overview).unwrap();
        println!("{}", table);
        assert_eq!(table.len(), 1);
        assert_eq!(table.str_at(0, "ticker"), Some("VCI"));
        assert_eq!(table.str_at(0, "industry"), Some("Financial Services"));
        let shares = table.f64_at(0, "outstanding_share").unwrap();
        assert!((shares - 718.013965).abs() < 1e-9);
    }

    #[test]
    fn test_parse_company_news() {
        let value = json!({"data": {"News": [
            {"id": 1, "ticker": "VCI", "newsTitle": "VCI công bố kết quả kinh doanh",
             "newsSourceLink": "https://vietcap.com.vn/a", "publicDate": 1715299200000_i64,
             "newsShortContent": "Lợi nhuận tăng"},
            {"id": 2, "ticker": "VCI", "newsTitle": "Đại hội cổ đông", "publicDate": "2024-04-02 08:00:00"}
        ]}});
        let table = parse_company(value, "VCI", CompanySection::News).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.str_at(0, "public_date"), Some("2024-05-10"));
        assert_eq!(table.str_at(1, "public_date"), Some("2024-04-02"));
        assert_eq!(table.str_at(0, "news_title"), Some("VCI công bố kết quả kinh doanh"));
        assert_eq!(table.str_at(0, "news_source_link"), Some("https://vietcap.com.vn/a"));
    }

    #[test]
    fn test_company_sections_without_query() {
        for section in [CompanySection::InsiderDeals, CompanySection::Dividends] {
            assert!(company_query(section).is_none());
            assert!(parse_company(json!({"data": {}}), "VCI", section).is_err());
        }
        let officers = parse_company(json!({"data": {"OrganizationManagers": []}}), "VCI", CompanySection::Officers)
            .unwrap();
        assert!(officers.is_empty());
    }
}
