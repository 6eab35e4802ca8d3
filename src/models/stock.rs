//! 股票数据参数与查询模型
//!
//! 定义数据源、报告期、语言、报表类型等参数，以及 HTTP 查询参数结构

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 上游数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    /// 德隆证券（TCBS）分析接口
    Tcbs,
    /// Vietcap（VCI）交易接口
    Vci,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Tcbs, Source::Vci];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Tcbs => "TCBS",
            Source::Vci => "VCI",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "TCBS" => Ok(Source::Tcbs),
            "VCI" => Ok(Source::Vci),
            other => Err(anyhow!("未知数据源: {}（可选 TCBS, VCI）", other)),
        }
    }
}

/// 报告期粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Year,
    Quarter,
}

impl Period {
    /// 宽松解析：除 `quarter` 外一律按年度处理
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("quarter") {
            Period::Quarter
        } else {
            Period::Year
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Year => "year",
            Period::Quarter => "quarter",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 列名语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Vi,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Vi => "vi",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Lang::En),
            "vi" => Ok(Lang::Vi),
            other => Err(anyhow!("不支持的语言: {}（可选 en, vi）", other)),
        }
    }
}

/// 财务报表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Ratio,
    IncomeStatement,
    BalanceSheet,
    CashFlow,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Ratio,
        ReportKind::IncomeStatement,
        ReportKind::BalanceSheet,
        ReportKind::CashFlow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Ratio => "ratio",
            ReportKind::IncomeStatement => "income_statement",
            ReportKind::BalanceSheet => "balance_sheet",
            ReportKind::CashFlow => "cash_flow",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ratio" => Ok(ReportKind::Ratio),
            "income_statement" => Ok(ReportKind::IncomeStatement),
            "balance_sheet" => Ok(ReportKind::BalanceSheet),
            "cash_flow" => Ok(ReportKind::CashFlow),
            other => Err(anyhow!("无效的报表类型: {}", other)),
        }
    }
}

/// 公司信息分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySection {
    /// 概览（行业、流通股本、市值等）
    Overview,
    /// 公司简介
    Profile,
    /// 大股东
    Shareholders,
    /// 高管
    Officers,
    /// 公司事件
    Events,
    /// 新闻
    News,
    /// 内部人交易
    InsiderDeals,
    /// 分红历史
    Dividends,
}

impl CompanySection {
    pub const ALL: [CompanySection; 8] = [
        CompanySection::Overview,
        CompanySection::Profile,
        CompanySection::Shareholders,
        CompanySection::Officers,
        CompanySection::Events,
        CompanySection::News,
        CompanySection::InsiderDeals,
        CompanySection::Dividends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySection::Overview => "overview",
            CompanySection::Profile => "profile",
            CompanySection::Shareholders => "shareholders",
            CompanySection::Officers => "officers",
            CompanySection::Events => "events",
            CompanySection::News => "news",
            CompanySection::InsiderDeals => "insider_deals",
            CompanySection::Dividends => "dividends",
        }
    }
}

impl fmt::Display for CompanySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanySection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| anyhow!("未知的公司信息分类: {}", s))
    }
}

/// 解析日期，支持 YYYY-MM-DD 和 YYYYMMDD
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| anyhow!("无效的日期: {}（格式 YYYY-MM-DD）", s))
}

// ==================== HTTP 查询参数 ====================

/// 数据源查询参数
#[derive(Debug, Default, Deserialize)]
pub struct SourceQuery {
    /// 数据源（TCBS / VCI），缺省使用配置
    pub source: Option<String>,
}

/// 财务报表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct FinanceQuery {
    pub source: Option<String>,
    /// year / quarter
    pub period: Option<String>,
    /// en / vi
    pub lang: Option<String>,
    /// 删除全为空值的列
    pub dropna: Option<bool>,
}

/// 价格查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PriceQuery {
    /// 开始日期（YYYY-MM-DD）
    pub start_date: String,
    /// 结束日期（YYYY-MM-DD）
    pub end_date: String,
}

/// 财务指标查询参数
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// 截止日期（YYYY-MM-DD）
    pub end_date: String,
    pub period: Option<String>,
    /// 返回期数，默认 10
    pub limit: Option<usize>,
}

/// 报表科目查询参数
#[derive(Debug, Default, Deserialize)]
pub struct LineItemsQuery {
    /// 逗号分隔的科目名
    pub items: String,
    pub end_date: String,
    pub period: Option<String>,
    pub limit: Option<usize>,
}

/// 按日期区间查询的参数（内部人交易、新闻）
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub end_date: String,
    pub start_date: Option<String>,
    /// 最大返回条数，默认 1000
    pub limit: Option<usize>,
}

/// 实时报价查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PriceBoardQuery {
    /// 逗号分隔的股票代码
    pub tickers: String,
    pub source: Option<String>,
}

/// 逗号分隔列表拆分，去掉空白项
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect()
}
