//! 财务指标计算
//!
//! 以财务比率表为主表，按 `report_period` 关联利润表、资产负债表和现金流量表，
//! 再结合公司概览（总股本、市值）和分红历史派生估值与效率指标。
//!
//! 单位约定：
//! - 报表金额、市值、企业价值：十亿越南盾
//! - 总股本：股
//! - 每股收益、每股净资产：千越南盾
//! - 每股自由现金流：十亿越南盾 / 股

use chrono::{Datelike, NaiveDate};

use super::line_items::dividends_by_year;
use crate::models::{DataTable, FinancialMetrics, Period, Row};

/// 报表货币
pub const CURRENCY: &str = "VND";

/// 计算所需的原始表
#[derive(Debug, Clone, Default)]
pub struct Statements {
    pub ratio: DataTable,
    pub income: DataTable,
    pub balance: DataTable,
    pub cash_flow: DataTable,
    pub overview: DataTable,
    pub dividends: DataTable,
}

impl Statements {
    /// 总股本（股）；概览中的 `outstanding_share` 单位为百万股
    pub fn outstanding_shares(&self) -> Option<f64> {
        self.overview
            .f64_at(0, "outstanding_share")
            .map(|s| s * 1e6)
            .filter(|s| *s > 0.0)
    }

    /// 概览中的市值
    pub fn overview_market_cap(&self) -> Option<f64> {
        self.overview.f64_at(0, "market_cap")
    }
}

/// 安全除法：分母为 0、缺失或结果非有限值时为 None
pub fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d).filter(|v| v.is_finite()),
        _ => None,
    }
}

/// 市值（十亿越南盾）= 市盈率 × 每股收益 × 总股本 / 1e9
pub fn market_cap_from_ratio(
    price_to_earning: Option<f64>,
    earning_per_share: Option<f64>,
    shares: Option<f64>,
) -> Option<f64> {
    Some(price_to_earning? * earning_per_share? * shares? / 1e9)
}

/// 有息负债 = 短期借款 + 长期借款，两者都缺失时为 None
pub fn total_debt(short_debt: Option<f64>, long_debt: Option<f64>) -> Option<f64> {
    if short_debt.is_none() && long_debt.is_none() {
        return None;
    }
    Some(short_debt.unwrap_or(0.0) + long_debt.unwrap_or(0.0))
}

/// 企业价值 = 市值 + 负债 − 现金
pub fn enterprise_value(
    market_cap: Option<f64>,
    debt: Option<f64>,
    cash: Option<f64>,
) -> Option<f64> {
    Some(market_cap? + debt? - cash?)
}

/// 按报告期查找行
pub fn find_period<'a>(table: &'a DataTable, report_period: &str) -> Option<Row<'a>> {
    table
        .iter_rows()
        .find(|row| row.str("report_period") == Some(report_period))
}

/// 筛选报告期不晚于 `end_date` 的行，倒序排列并截取前 `limit` 行（0 为不限）
pub fn periods_until(table: &DataTable, end_date: NaiveDate, limit: usize) -> DataTable {
    let end = end_date.format("%Y-%m-%d").to_string();
    let filtered = table
        .filter(|row| row.str("report_period").is_some_and(|p| p <= end.as_str()))
        .sort_by_column("report_period", true);

    if limit > 0 {
        filtered.head(limit)
    } else {
        filtered
    }
}

/// 报告期所属年份
pub fn report_year(report_period: &str) -> Option<i64> {
    NaiveDate::parse_from_str(report_period, "%Y-%m-%d")
        .ok()
        .map(|d| d.year() as i64)
}

fn field(row: Option<Row<'_>>, column: &str) -> Option<f64> {
    row.and_then(|r| r.f64(column))
}

/// 计算各报告期的财务指标，按报告期倒序
pub fn build_financial_metrics(
    ticker: &str,
    period: Period,
    end_date: NaiveDate,
    limit: usize,
    statements: &Statements,
) -> Vec<FinancialMetrics> {
    let ratio = periods_until(&statements.ratio, end_date, limit);
    if ratio.is_empty() {
        log::info!("{} 在 {} 之前没有财务比率数据", ticker, end_date);
        return Vec::new();
    }

    let shares = statements.outstanding_shares();
    let dividends = shares
        .map(|s| dividends_by_year(&statements.dividends, s))
        .unwrap_or_default();

    let mut result = Vec::with_capacity(ratio.len());
    for ratio_row in ratio.iter_rows() {
        let Some(report_period) = ratio_row.str("report_period") else {
            continue;
        };
        let income = find_period(&statements.income, report_period);
        let balance = find_period(&statements.balance, report_period);
        let cash_flow = find_period(&statements.cash_flow, report_period);
        let r = |column: &str| ratio_row.f64(column);

        let market_cap = market_cap_from_ratio(r("price_to_earning"), r("earning_per_share"), shares)
            .or_else(|| statements.overview_market_cap());
        let ev = enterprise_value(market_cap, field(balance, "debt"), field(balance, "cash"));

        let revenue = field(income, "revenue");
        let ebitda = field(income, "ebitda");
        let free_cash_flow = field(cash_flow, "free_cash_flow");
        let current_liabilities = field(balance, "short_debt");

        let inventory_turnover = safe_div(
            field(income, "cost_of_good_sold").map(f64::abs),
            field(balance, "inventory"),
        );

        let operating_cycle = match (r("days_receivable"), r("days_inventory")) {
            (Some(receivable), Some(inventory)) => Some(receivable.abs() + inventory.abs()),
            _ => None,
        };

        let payout_ratio = report_year(report_period)
            .and_then(|year| dividends.get(&year).copied())
            .and_then(|paid| safe_div(Some(paid), field(income, "post_tax_profit")));

        let metrics = FinancialMetrics {
            ticker: ticker.to_string(),
            report_period: report_period.to_string(),
            period: period.as_str().to_string(),
            currency: CURRENCY.to_string(),

            market_cap,
            enterprise_value: ev,
            price_to_earnings_ratio: r("price_to_earning"),
            price_to_book_ratio: r("price_to_book"),
            price_to_sales_ratio: safe_div(market_cap, revenue),
            enterprise_value_to_ebitda_ratio: safe_div(ev, ebitda),
            enterprise_value_to_revenue_ratio: safe_div(ev, revenue),
            free_cash_flow_yield: safe_div(free_cash_flow, market_cap),
            peg_ratio: None,

            gross_margin: r("gross_profit_margin"),
            operating_margin: r("operating_profit_margin")
                .or_else(|| safe_div(field(income, "operation_profit"), revenue)),
            net_margin: r("post_tax_margin"),
            return_on_equity: r("roe"),
            return_on_assets: r("roa"),
            return_on_invested_capital: r("roic"),

            asset_turnover: r("revenue_on_asset"),
            inventory_turnover,
            receivables_turnover: safe_div(revenue, field(balance, "short_receivable")),
            days_sales_outstanding: r("days_receivable").map(f64::abs),
            operating_cycle,
            working_capital_turnover: r("revenue_on_work_capital"),

            current_ratio: r("current_payment"),
            quick_ratio: r("quick_payment"),
            cash_ratio: safe_div(field(balance, "cash"), current_liabilities),
            operating_cash_flow_ratio: safe_div(field(cash_flow, "from_sale"), current_liabilities),

            debt_to_equity: r("debt_on_equity"),
            debt_to_assets: r("debt_on_asset"),
            interest_coverage: r("ebit_on_interest"),

            revenue_growth: field(income, "year_revenue_growth"),
            earnings_growth: field(income, "year_share_holder_income_growth"),
            book_value_growth: r("book_value_per_share_change"),
            earnings_per_share_growth: r("eps_change"),
            free_cash_flow_growth: None,
            operating_income_growth: field(income, "year_operation_profit_growth"),
            ebitda_growth: None,

            payout_ratio,
            earnings_per_share: r("earning_per_share").map(|v| v / 1000.0),
            book_value_per_share: r("book_value_per_share").map(|v| v / 1000.0),
            free_cash_flow_per_share: safe_div(free_cash_flow, shares),
        };

        log::debug!(
            "{} {} 市值 {:?}，企业价值 {:?}",
            ticker,
            report_period,
            metrics.market_cap,
            metrics.enterprise_value
        );
        result.push(metrics);
    }

    log::info!("{} 生成 {} 期财务指标", ticker, result.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn statements() -> Statements {
        Statements {
            ratio: DataTable::from_values(vec![
                json!({"report_period": "2023-12-31", "year": 2023, "price_to_earning": 10.0, "earning_per_share": 2000.0,
                       "price_to_book": 1.5, "roe": 0.15, "days_receivable": -30.0, "days_inventory": 60.0,
                       "operating_profit_margin": null, "book_value_per_share": 15000.0}),
                json!({"report_period": "2022-12-31", "year": 2022, "price_to_earning": 8.0, "earning_per_share": 1800.0}),
                json!({"report_period": "2024-12-31", "year": 2024, "price_to_earning": 12.0, "earning_per_share": 2500.0}),
            ]),
            income: DataTable::from_values(vec![json!({
                "report_period": "2023-12-31", "revenue": 5000.0, "ebitda": 1200.0, "operation_profit": 1000.0,
                "cost_of_good_sold": -3000.0, "post_tax_profit": 800.0, "year_revenue_growth": 0.1
            })]),
            balance: DataTable::from_values(vec![json!({
                "report_period": "2023-12-31", "short_debt": 1000.0, "long_debt": 500.0, "debt": 4000.0, "cash": 300.0,
                "inventory": 600.0, "short_receivable": 1250.0
            })]),
            cash_flow: DataTable::from_values(vec![json!({
                "report_period": "2023-12-31", "free_cash_flow": 400.0, "from_sale": 900.0
            })]),
            overview: DataTable::from_values(vec![json!({"outstanding_share": 100.0, "market_cap": 1234.0})]),
            dividends: DataTable::from_values(vec![
                json!({"cash_year": 2023, "cash_dividend_percentage": 0.1}),
                json!({"cash_year": 2023, "cash_dividend_percentage": 0.05}),
            ]),
        }
    }

    #[test]
    fn test_build_financial_metrics() {
        println!("\n========== 测试财务指标计算 ==========");
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let metrics = build_financial_metrics("VNM", Period::Year, end, 10, &statements());

        // 2024 年晚于截止日期
        assert_eq!(metrics.len(), 2);
        let m = &metrics[0];
        println!("{:#?}", m);
        assert_eq!(m.report_period, "2023-12-31");
        assert_eq!(m.period, "year");
        assert_eq!(m.currency, "VND");

        // 10 × 2000 × 1e8 / 1e9 = 2000
        assert_relative_eq!(m.market_cap.unwrap(), 2000.0);
        // 企业价值用资产负债表的 debt：2000 + 4000 − 300
        assert_relative_eq!(m.enterprise_value.unwrap(), 5700.0);
        assert_relative_eq!(m.price_to_sales_ratio.unwrap(), 0.4);
        assert_relative_eq!(m.enterprise_value_to_ebitda_ratio.unwrap(), 5700.0 / 1200.0);
        assert_relative_eq!(m.free_cash_flow_yield.unwrap(), 0.2);
        assert_relative_eq!(m.inventory_turnover.unwrap(), 5.0);
        assert_relative_eq!(m.receivables_turnover.unwrap(), 4.0);
        assert_relative_eq!(m.cash_ratio.unwrap(), 0.3);
        assert_relative_eq!(m.operating_cash_flow_ratio.unwrap(), 0.9);
        assert_relative_eq!(m.operating_margin.unwrap(), 0.2);
        assert_relative_eq!(m.days_sales_outstanding.unwrap(), 30.0);
        assert_relative_eq!(m.operating_cycle.unwrap(), 90.0);
        // 0.15 × 1e8 股 × 10000 / 1e9 = 150，派息率 150 / 800
        assert_relative_eq!(m.payout_ratio.unwrap(), 0.1875);
        // 400 / 1e8
        assert_relative_eq!(m.free_cash_flow_per_share.unwrap(), 4e-6);
        // 每股数据换算为千越南盾
        assert_relative_eq!(m.earnings_per_share.unwrap(), 2.0);
        assert_relative_eq!(m.book_value_per_share.unwrap(), 15.0);
        assert_eq!(m.revenue_growth, Some(0.1));
    }

    #[test]
    fn test_missing_statements_yield_none() {
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let metrics = build_financial_metrics("VNM", Period::Year, end, 10, &statements());
        let older = &metrics[1];
        assert_eq!(older.report_period, "2022-12-31");
        assert!(older.enterprise_value.is_none());
        assert!(older.price_to_sales_ratio.is_none());
        assert!(older.payout_ratio.is_none());
    }

    #[test]
    fn test_market_cap_falls_back_to_overview() {
        let mut s = statements();
        s.overview = DataTable::from_values(vec![json!({"market_cap": 1234.0})]);
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let metrics = build_financial_metrics("VNM", Period::Year, end, 1, &s);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].market_cap, Some(1234.0));
        assert!(metrics[0].free_cash_flow_per_share.is_none());
    }

    #[test]
    fn test_enterprise_value_needs_total_liabilities() {
        let mut s = statements();
        s.balance = DataTable::from_values(vec![json!({
            "report_period": "2023-12-31", "short_debt": 1000.0, "long_debt": 500.0, "cash": 300.0
        })]);
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let metrics = build_financial_metrics("VNM", Period::Year, end, 1, &s);
        // 只有借款没有 debt 列时不计算企业价值
        assert!(metrics[0].enterprise_value.is_none());
        assert!(metrics[0].enterprise_value_to_ebitda_ratio.is_none());
        assert_relative_eq!(metrics[0].cash_ratio.unwrap(), 0.3);
    }

    #[test]
    fn test_empty_ratio() {
        let end = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(build_financial_metrics("VNM", Period::Year, end, 10, &statements()).is_empty());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(safe_div(Some(1.0), Some(0.0)), None);
        assert_eq!(safe_div(None, Some(2.0)), None);
        assert_eq!(safe_div(Some(1.0), Some(4.0)), Some(0.25));
        assert_eq!(total_debt(None, None), None);
        assert_eq!(total_debt(Some(2.0), None), Some(2.0));
        assert_eq!(report_year("2023-06-30"), Some(2023));
        assert_eq!(report_year("bad"), None);
    }
}
