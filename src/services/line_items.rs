//! 报表科目提取
//!
//! 把四张财务报表按报告期合并成一张宽表，再按科目名取值：
//! 能直接映射到上游列的科目直接取值，其余由多列计算得出。

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::metrics::{
    enterprise_value, market_cap_from_ratio, periods_until, report_year, safe_div, total_debt,
    Statements, CURRENCY,
};
use crate::models::{f64_to_value, DataTable, LineItem, Period, Row};

/// 股票面值（越南盾）
pub const PAR_VALUE: f64 = 10_000.0;

/// 科目名 -> 上游列名；None 表示需要计算
pub const FIELD_MAPPING: &[(&str, Option<&str>)] = &[
    // 资产负债表
    ("current_assets", Some("short_asset")),
    ("current_liabilities", Some("short_debt")),
    ("total_assets", Some("asset")),
    ("total_liabilities", Some("debt")),
    ("shareholders_equity", Some("equity")),
    ("cash_and_equivalents", Some("cash")),
    ("accounts_receivable", Some("short_receivable")),
    ("inventory", Some("inventory")),
    ("long_term_investments", Some("short_invest")),
    ("fixed_assets", Some("fixed_asset")),
    ("short_term_debt", Some("short_debt")),
    ("long_term_debt", Some("long_debt")),
    // 利润表
    ("revenue", Some("revenue")),
    ("net_income", Some("post_tax_profit")),
    ("operating_income", Some("operation_profit")),
    ("gross_profit", Some("gross_profit")),
    ("interest_expense", Some("interest_expense")),
    ("pretax_income", Some("pre_tax_profit")),
    ("ebitda", Some("ebitda")),
    ("ebit", Some("operation_profit")),
    // 现金流量表
    ("operating_cash_flow", Some("from_sale")),
    ("investing_cash_flow", Some("from_invest")),
    ("financing_cash_flow", Some("from_financial")),
    ("free_cash_flow", Some("free_cash_flow")),
    ("capital_expenditure", Some("invest_cost")),
    ("issuance_or_purchase_of_equity_shares", Some("from_financial")),
    // 财务比率
    ("price_to_earnings_ratio", Some("price_to_earning")),
    ("price_to_book_ratio", Some("price_to_book")),
    ("price_to_sales_ratio", Some("price_to_sale")),
    ("enterprise_value_to_ebitda_ratio", Some("value_before_ebitda")),
    ("gross_margin", Some("gross_profit_margin")),
    ("return_on_equity", Some("roe")),
    ("return_on_assets", Some("roa")),
    ("return_on_invested_capital", Some("roic")),
    ("asset_turnover", Some("revenue_on_asset")),
    ("days_sales_outstanding", Some("days_receivable")),
    ("working_capital_turnover", Some("revenue_on_work_capital")),
    ("current_ratio", Some("current_payment")),
    ("quick_ratio", Some("quick_payment")),
    ("debt_to_equity", Some("debt_on_equity")),
    ("debt_to_assets", Some("debt_on_asset")),
    ("interest_coverage", Some("ebit_on_interest")),
    ("book_value_growth", Some("book_value_per_share_change")),
    ("earnings_per_share_growth", Some("eps_change")),
    ("earnings_per_share", Some("earning_per_share")),
    ("book_value_per_share", Some("book_value_per_share")),
    // 计算得出
    ("outstanding_shares", None),
    ("depreciation_and_amortization", None),
    ("operating_margin", None),
    ("net_margin", None),
    ("dividends_and_other_cash_distributions", None),
    ("total_debt", None),
    ("working_capital", None),
    ("ev_to_ebitda_ratio", None),
    ("free_cash_flow_per_share", None),
    ("inventory_turnover", None),
    ("receivables_turnover", None),
    ("operating_cycle", None),
];

/// 查找科目的映射；未知科目返回 None
pub fn mapped_field(item: &str) -> Option<Option<&'static str>> {
    FIELD_MAPPING
        .iter()
        .find(|(name, _)| *name == item)
        .map(|(_, column)| *column)
}

/// 按 `cash_year` 汇总分红（十亿越南盾）
///
/// 每年的现金分红比例之和 × 总股本 × 面值。
pub fn dividends_by_year(dividends: &DataTable, shares: f64) -> BTreeMap<i64, f64> {
    if !dividends.has_column("cash_year") || !dividends.has_column("cash_dividend_percentage") {
        return BTreeMap::new();
    }
    dividends
        .group_sum("cash_year", "cash_dividend_percentage")
        .into_iter()
        .map(|(year, pct)| (year, pct * shares * PAR_VALUE / 1e9))
        .collect()
}

/// 按 `report_period` 合并多张报表
///
/// 同名列取第一个非空值（按传入顺序），结果按报告期倒序。
pub fn combine_statements(tables: &[&DataTable]) -> DataTable {
    let mut columns: Vec<String> = vec!["report_period".to_string()];
    let mut column_index: HashMap<String, usize> = HashMap::from([("report_period".to_string(), 0)]);
    let mut periods: BTreeMap<String, HashMap<usize, Value>> = BTreeMap::new();

    for table in tables {
        for row in table.iter_rows() {
            let Some(period) = row.str("report_period") else {
                continue;
            };
            let cells = periods.entry(period.to_string()).or_default();
            for (name, value) in table.columns.iter().zip(&table.rows[row.index()]) {
                if name == "report_period" || value.is_null() {
                    continue;
                }
                let col = match column_index.get(name) {
                    Some(&c) => c,
                    None => {
                        columns.push(name.clone());
                        column_index.insert(name.clone(), columns.len() - 1);
                        columns.len() - 1
                    }
                };
                cells.entry(col).or_insert_with(|| value.clone());
            }
        }
    }

    let width = columns.len();
    let rows = periods
        .into_iter()
        .rev()
        .map(|(period, mut cells)| {
            let mut row = vec![Value::Null; width];
            row[0] = Value::String(period);
            for (col, value) in cells.drain() {
                row[col] = value;
            }
            row
        })
        .collect();

    DataTable::new(columns, rows)
}

/// 计算单个报告期的科目值
struct ItemContext<'a> {
    shares: Option<f64>,
    dividends: Option<&'a BTreeMap<i64, f64>>,
}

impl ItemContext<'_> {
    fn market_cap(&self, row: Row<'_>) -> Option<f64> {
        market_cap_from_ratio(
            row.f64("price_to_earning"),
            row.f64("earning_per_share"),
            self.shares,
        )
    }

    fn total_debt(row: Row<'_>) -> Option<f64> {
        total_debt(row.f64("short_debt"), row.f64("long_debt"))
    }

    fn value(&self, item: &str, column: Option<&str>, row: Row<'_>, year: Option<i64>) -> Option<f64> {
        if let Some(column) = column {
            match row.f64(column) {
                Some(value) => {
                    return Some(match item {
                        // 上游投资支出为负数
                        "capital_expenditure" => -value,
                        // 千越南盾
                        "book_value_per_share" => value / 1000.0,
                        _ => value,
                    })
                }
                // 比率表没有估值倍数时再自行计算
                None if matches!(item, "price_to_sales_ratio" | "enterprise_value_to_ebitda_ratio") => {}
                None => return None,
            }
        }

        let f = |column: &str| row.f64(column);
        match item {
            "outstanding_shares" => self.shares,
            "depreciation_and_amortization" => Some(f("ebitda")? - f("operation_profit")?),
            "operating_margin" => f("operating_profit_margin")
                .or_else(|| safe_div(f("operation_profit"), f("revenue"))),
            "net_margin" => {
                f("post_tax_margin").or_else(|| safe_div(f("post_tax_profit"), f("revenue")))
            }
            "dividends_and_other_cash_distributions" => {
                let dividends = self.dividends?;
                // 现金流出记为负数，当年没有分红记为 0
                Some(year.and_then(|y| dividends.get(&y)).map_or(0.0, |v| -v))
            }
            "total_debt" => Self::total_debt(row),
            "working_capital" => Some(f("short_asset")? - f("short_debt")?),
            "price_to_sales_ratio" => safe_div(self.market_cap(row), f("revenue")),
            "enterprise_value_to_ebitda_ratio" | "ev_to_ebitda_ratio" => {
                let ev = enterprise_value(self.market_cap(row), Self::total_debt(row), f("cash"));
                safe_div(ev, f("ebitda"))
            }
            "free_cash_flow_per_share" => safe_div(f("free_cash_flow"), self.shares),
            "inventory_turnover" => {
                safe_div(f("cost_of_good_sold").map(f64::abs), f("inventory"))
            }
            "receivables_turnover" => safe_div(f("revenue"), f("short_receivable")),
            "operating_cycle" => Some(f("days_receivable")?.abs() + f("days_inventory")?.abs()),
            _ => None,
        }
    }
}

/// 提取各报告期的科目，按报告期倒序
///
/// 已知科目即使无法取值也会以 null 出现在结果中；未知科目被忽略。
pub fn build_line_items(
    ticker: &str,
    items: &[String],
    period: Period,
    end_date: NaiveDate,
    limit: usize,
    statements: &Statements,
) -> Vec<LineItem> {
    let combined = combine_statements(&[
        &statements.ratio,
        &statements.balance,
        &statements.income,
        &statements.cash_flow,
    ]);
    if combined.is_empty() {
        log::info!("{} 没有可用的财务报表数据", ticker);
        return Vec::new();
    }

    let combined = periods_until(&combined, end_date, limit);
    log::debug!("{} 合并报表形状: {:?}", ticker, combined.shape());

    let known: Vec<(&str, Option<&str>)> = items
        .iter()
        .filter_map(|item| match mapped_field(item) {
            Some(column) => Some((item.as_str(), column)),
            None => {
                log::warn!("⚠️ 未知的报表科目: {}", item);
                None
            }
        })
        .collect();

    let shares = statements.outstanding_shares();
    let dividends = match shares {
        Some(s) if known.iter().any(|(i, _)| *i == "dividends_and_other_cash_distributions") => {
            Some(dividends_by_year(&statements.dividends, s))
        }
        _ => None,
    };
    let ctx = ItemContext {
        shares,
        dividends: dividends.as_ref(),
    };

    combined
        .iter_rows()
        .filter_map(|row| {
            let report_period = row.str("report_period")?;
            let year = report_year(report_period);

            let mut values = Map::new();
            values.insert("outstanding_shares".to_string(), f64_to_value(shares));
            for (item, column) in &known {
                let value = ctx.value(item, *column, row, year);
                values.insert(item.to_string(), f64_to_value(value));
            }

            Some(LineItem {
                ticker: ticker.to_string(),
                report_period: report_period.to_string(),
                period: period.as_str().to_string(),
                currency: CURRENCY.to_string(),
                values,
            })
        })
        .collect()
}
