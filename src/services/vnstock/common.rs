//! 公共常量和辅助函数

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Asia::Ho_Chi_Minh;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::{ApiConfig, ProviderConfig};
use crate::models::{DataTable, Period, Source};

// ==================== TCBS 接口路径 ====================

/// 公司概览
pub const TCBS_TICKER_OVERVIEW: &str = "tcanalysis/v1/ticker/{symbol}/overview";
/// 公司简介
pub const TCBS_COMPANY_PROFILE: &str = "tcanalysis/v1/company/{symbol}/overview";
/// 大股东
pub const TCBS_SHAREHOLDERS: &str = "tcanalysis/v1/company/{symbol}/large-share-holders";
/// 高管
pub const TCBS_OFFICERS: &str = "tcanalysis/v1/company/{symbol}/key-officers";
/// 公司事件
pub const TCBS_EVENTS: &str = "tcanalysis/v1/ticker/{symbol}/events-news";
/// 新闻
pub const TCBS_NEWS: &str = "tcanalysis/v1/ticker/{symbol}/activity-news";
/// 内部人交易
pub const TCBS_INSIDER_DEALS: &str = "tcanalysis/v1/company/{symbol}/insider-dealing";
/// 分红历史
pub const TCBS_DIVIDENDS: &str = "tcanalysis/v1/company/{symbol}/dividend-payment-histories";
/// 财务报表
pub const TCBS_FINANCE: &str = "tcanalysis/v1/finance/{symbol}/{report}";
/// 长周期K线
pub const TCBS_BARS_LONG_TERM: &str = "stock-insight/v1/stock/bars-long-term";
/// 实时报价
pub const TCBS_PRICE_BOARD: &str = "stock-insight/v1/stock/second-tc-price";

// ==================== VCI 接口路径 ====================

/// 全部上市代码
pub const VCI_ALL_SYMBOLS: &str = "api/price/symbols/getAll";
/// K线
pub const VCI_OHLC_CHART: &str = "api/chart/OHLCChart/gap-chart";
/// 实时报价
pub const VCI_PRICE_BOARD: &str = "api/price/symbols/getList";
/// 公司信息与财务数据（GraphQL）
pub const VCI_GRAPHQL: &str = "data-mt/graphql";

/// 创建共享的 HTTP 客户端
pub fn build_client(api: &ApiConfig, provider: &ProviderConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(provider.user_agent.clone())
        .timeout(Duration::from_secs(api.timeout_secs))
        .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
        .gzip(true)
        .build()?;
    Ok(client)
}

/// 拼接根地址和路径，并替换路径中的 `{symbol}`
pub fn endpoint(base_url: &str, path: &str, symbol: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.replace("{symbol}", symbol)
    )
}

/// 数据源不支持某个操作
pub fn unsupported(source: Source, operation: &str) -> anyhow::Error {
    anyhow!("数据源 {} 不支持 {}", source, operation)
}

/// 从响应中取出记录列表
///
/// 上游的返回形态不统一：可能是数组、带列表字段的对象（如 `listShareHolder`、
/// `data`），也可能是单个对象。单个对象作为只有一行的表。
pub fn extract_records(value: Value, list_keys: &[&str]) -> Vec<Map<String, Value>> {
    let objects = |items: Vec<Value>| -> Vec<Map<String, Value>> {
        items
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    };

    match value {
        Value::Array(items) => objects(items),
        Value::Object(mut map) => {
            for key in list_keys.iter().chain(["data"].iter()) {
                if matches!(map.get(*key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(*key) {
                        return objects(items);
                    }
                }
            }
            if map.is_empty() {
                Vec::new()
            } else {
                vec![map]
            }
        }
        _ => Vec::new(),
    }
}

/// 展开嵌套对象：`{"a": {"b": 1}}` -> `{"a_b": 1}`
pub fn flatten_record(record: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (key, value) in record {
        match value {
            Value::Object(inner) => {
                for (inner_key, inner_value) in flatten_record(inner) {
                    flat.insert(format!("{}_{}", key, inner_key), inner_value);
                }
            }
            other => {
                flat.insert(key, other);
            }
        }
    }
    flat
}

/// 报告期截止日：年度为 12 月 31 日，季度为该季度最后一天
pub fn period_end(year: i32, quarter: Option<i64>, period: Period) -> Option<NaiveDate> {
    let quarter = match (period, quarter) {
        (Period::Quarter, Some(q @ 1..=4)) => q as u32,
        _ => 4,
    };
    let (month, day) = match quarter {
        1 => (3, 31),
        2 => (6, 30),
        3 => (9, 30),
        _ => (12, 31),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 为财务报表添加 `report_period` 列并按报告期倒序排列
pub fn add_report_period(table: &mut DataTable, period: Period) {
    let values: Vec<Value> = table
        .iter_rows()
        .map(|row| {
            row.i64("year")
                .and_then(|year| period_end(year as i32, row.i64("quarter"), period))
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null)
        })
        .collect();

    table.insert_column(0, "report_period", values);
    *table = table.sort_by_column("report_period", true);
}

/// 日期的 Unix 时间戳（越南时间零点）
pub fn date_to_timestamp(date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    Ho_Chi_Minh
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| naive.and_utc().timestamp())
}

/// Unix 时间戳（秒或毫秒）转越南时间日期
pub fn timestamp_to_date(ts: i64) -> Option<NaiveDate> {
    let secs = if ts.abs() > 100_000_000_000 { ts / 1000 } else { ts };
    DateTime::from_timestamp(secs, 0).map(|dt| dt.with_timezone(&Ho_Chi_Minh).date_naive())
}

/// 把上游的各种日期表示统一为 YYYY-MM-DD
///
/// 支持：ISO 日期/时间字符串、`dd/mm/yy`、`dd/mm/yyyy`、秒或毫秒时间戳
pub fn normalize_date(value: &Value) -> Option<String> {
    let date = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(timestamp_to_date),
        Value::String(s) => parse_date_text(s.trim()),
        _ => None,
    }?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if let Some(prefix) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }
    for fmt in ["%d/%m/%y", "%d/%m/%Y", "%Y%m%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    s.parse::<i64>().ok().and_then(timestamp_to_date)
}

/// 将某列的日期统一为 YYYY-MM-DD，无法解析的保持原值
pub fn normalize_date_column(table: &mut DataTable, column: &str) {
    table.map_column(column, |v| {
        normalize_date(v).map(Value::String).unwrap_or_else(|| v.clone())
    });
}
