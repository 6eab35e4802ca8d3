//! 财务数据模型
//!
//! 定义由原始报表派生出的结构化数据：
//! - 日线价格
//! - 财务指标
//! - 报表科目（line item）
//! - 内部人交易
//! - 公司新闻
//!
//! 金额单位与数据源一致：财务报表金额为十亿越南盾，股价与每股数据为越南盾。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 日线价格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
    /// 交易日（YYYY-MM-DD）
    pub time: String,
}

/// 单个报告期的财务指标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub ticker: String,
    /// 报告期截止日（YYYY-MM-DD）
    pub report_period: String,
    /// year / quarter
    pub period: String,
    pub currency: String,

    // 估值
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub price_to_earnings_ratio: Option<f64>,
    pub price_to_book_ratio: Option<f64>,
    pub price_to_sales_ratio: Option<f64>,
    pub enterprise_value_to_ebitda_ratio: Option<f64>,
    pub enterprise_value_to_revenue_ratio: Option<f64>,
    pub free_cash_flow_yield: Option<f64>,
    pub peg_ratio: Option<f64>,

    // 盈利能力
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_invested_capital: Option<f64>,

    // 营运效率
    pub asset_turnover: Option<f64>,
    pub inventory_turnover: Option<f64>,
    pub receivables_turnover: Option<f64>,
    pub days_sales_outstanding: Option<f64>,
    pub operating_cycle: Option<f64>,
    pub working_capital_turnover: Option<f64>,

    // 流动性
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub cash_ratio: Option<f64>,
    pub operating_cash_flow_ratio: Option<f64>,

    // 偿债能力
    pub debt_to_equity: Option<f64>,
    pub debt_to_assets: Option<f64>,
    pub interest_coverage: Option<f64>,

    // 成长性
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub book_value_growth: Option<f64>,
    pub earnings_per_share_growth: Option<f64>,
    pub free_cash_flow_growth: Option<f64>,
    pub operating_income_growth: Option<f64>,
    pub ebitda_growth: Option<f64>,

    // 每股数据
    pub payout_ratio: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub free_cash_flow_per_share: Option<f64>,
}

/// 报表科目
///
/// 固定字段之外，请求的科目以 `科目名 -> 数值` 的形式平铺在同一层。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub ticker: String,
    pub report_period: String,
    pub period: String,
    pub currency: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl LineItem {
    /// 取某个科目的数值
    pub fn get(&self, item: &str) -> Option<f64> {
        self.values.get(item).and_then(|v| v.as_f64())
    }

    /// 科目存在且不为空
    pub fn has(&self, item: &str) -> bool {
        self.values.get(item).is_some_and(|v| !v.is_null())
    }
}

/// 内部人交易记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsiderTrade {
    pub ticker: String,
    pub issuer: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub is_board_director: Option<bool>,
    pub transaction_date: Option<String>,
    /// 成交股数，卖出为负
    pub transaction_shares: Option<f64>,
    pub transaction_price_per_share: Option<f64>,
    pub transaction_value: Option<f64>,
    pub shares_owned_before_transaction: Option<f64>,
    pub shares_owned_after_transaction: Option<f64>,
    pub security_title: Option<String>,
    pub filing_date: String,
}

impl InsiderTrade {
    /// 用于日期筛选和排序的日期：优先成交日，其次公告日
    pub fn effective_date(&self) -> &str {
        self.transaction_date.as_deref().unwrap_or(&self.filing_date)
    }
}

/// 公司新闻
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyNews {
    pub ticker: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub source: Option<String>,
    /// 发布日期（YYYY-MM-DD）
    pub date: String,
    pub url: Option<String>,
}
