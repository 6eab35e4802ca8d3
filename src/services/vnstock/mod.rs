//! 越南股票数据客户端
//!
//! 按“股票代码 + 数据源”创建句柄，再通过固定的访问方法取回记录表：
//!
//! ```text
//! Vnstock::stock("NVL", Source::Tcbs)
//!     .company()  -> overview / profile / shareholders / officers
//!                    events / news / insider_deals / dividends
//!     .finance()  -> ratio / income_statement / balance_sheet / cash_flow
//!     .quote()    -> history
//! Vnstock::trading(source).price_board(..)
//! Vnstock::listing().all_symbols()
//! ```
//!
//! ## 数据源
//! - TCBS：公司信息、财务报表、K线、实时报价
//! - VCI：上市代码列表、K线、实时报价、公司信息（不含内部人交易和分红）、财务报表

pub mod common;
mod tcbs;
mod vci;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::config::AppConfig;
use crate::models::{CompanySection, DataTable, Lang, Period, ReportKind, Source};

pub use common::{build_client, unsupported};
pub use tcbs::TcbsSource;
pub use vci::VciSource;

/// 股票代码格式（大写后）
static SYMBOL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{3,10}$").unwrap());

/// 上游数据源接口
///
/// 未实现的方法返回“数据源不支持”的错误。
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 数据源名称
    fn name(&self) -> Source;

    /// 是否支持指定语言的列名
    fn supports_lang(&self, lang: Lang) -> bool {
        lang == Lang::En
    }

    /// 公司信息
    async fn company(&self, symbol: &str, section: CompanySection) -> Result<DataTable> {
        let _ = symbol;
        Err(unsupported(self.name(), section.as_str()))
    }

    /// 财务报表，结果包含 `report_period` 列并按报告期倒序
    async fn financial_report(
        &self,
        symbol: &str,
        kind: ReportKind,
        period: Period,
    ) -> Result<DataTable> {
        let _ = (symbol, period);
        Err(unsupported(self.name(), kind.as_str()))
    }

    /// 日K线，列为 time/open/high/low/close/volume
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataTable> {
        let _ = (symbol, start, end);
        Err(unsupported(self.name(), "price_history"))
    }

    /// 实时报价
    async fn price_board(&self, symbols: &[String]) -> Result<DataTable> {
        let _ = symbols;
        Err(unsupported(self.name(), "price_board"))
    }

    /// 全部上市代码
    async fn all_symbols(&self) -> Result<DataTable> {
        Err(unsupported(self.name(), "all_symbols"))
    }
}

/// 数据客户端入口
#[derive(Clone)]
pub struct Vnstock {
    sources: HashMap<Source, Arc<dyn DataSource>>,
    default_source: Source,
}

impl Vnstock {
    /// 按配置创建 TCBS 与 VCI 数据源，共享一个 HTTP 客户端
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = build_client(&config.api, &config.provider)?;
        let tcbs = TcbsSource::new(client.clone(), &config.provider.tcbs_base_url);
        let vci = VciSource::new(client, &config.provider.vci_base_url);

        Ok(Self::empty(config.default_source()?)
            .with_source(Source::Tcbs, Arc::new(tcbs))
            .with_source(Source::Vci, Arc::new(vci)))
    }

    /// 不含任何数据源的客户端
    pub fn empty(default_source: Source) -> Self {
        Self {
            sources: HashMap::new(),
            default_source,
        }
    }

    /// 注册（或替换）一个数据源实现
    pub fn with_source(mut self, source: Source, imp: Arc<dyn DataSource>) -> Self {
        self.sources.insert(source, imp);
        self
    }

    pub fn default_source(&self) -> Source {
        self.default_source
    }

    fn source(&self, source: Source) -> Result<Arc<dyn DataSource>> {
        self.sources
            .get(&source)
            .cloned()
            .ok_or_else(|| anyhow!("数据源 {} 未配置", source))
    }

    /// 创建股票句柄
    pub fn stock(&self, symbol: &str, source: Source) -> Result<Stock> {
        let symbol = normalize_symbol(symbol)?;
        Ok(Stock {
            symbol,
            source: self.source(source)?,
        })
    }

    /// 实时报价
    pub fn trading(&self, source: Source) -> Result<Trading> {
        Ok(Trading {
            source: self.source(source)?,
        })
    }

    /// 上市代码列表（VCI）
    pub fn listing(&self) -> Result<Listing> {
        Ok(Listing {
            source: self.source(Source::Vci)?,
        })
    }
}

/// 校验并规范化股票代码
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if !SYMBOL_PATTERN.is_match(&symbol) {
        return Err(anyhow!("无效的股票代码: {}", symbol));
    }
    Ok(symbol)
}

/// 绑定到某只股票和某个数据源的句柄
pub struct Stock {
    symbol: String,
    source: Arc<dyn DataSource>,
}

impl Stock {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn source(&self) -> Source {
        self.source.name()
    }

    pub fn company(&self) -> Company<'_> {
        Company { stock: self }
    }

    pub fn finance(&self) -> Finance<'_> {
        Finance { stock: self }
    }

    pub fn quote(&self) -> Quote<'_> {
        Quote { stock: self }
    }
}

/// 公司信息访问
pub struct Company<'a> {
    stock: &'a Stock,
}

impl Company<'_> {
    /// 按分类获取
    pub async fn section(&self, section: CompanySection) -> Result<DataTable> {
        log::debug!(
            "获取 {} 的公司信息 [{}]，数据源 {}",
            self.stock.symbol,
            section,
            self.stock.source()
        );
        self.stock.source.company(&self.stock.symbol, section).await
    }

    pub async fn overview(&self) -> Result<DataTable> {
        self.section(CompanySection::Overview).await
    }

    pub async fn profile(&self) -> Result<DataTable> {
        self.section(CompanySection::Profile).await
    }

    pub async fn shareholders(&self) -> Result<DataTable> {
        self.section(CompanySection::Shareholders).await
    }

    pub async fn officers(&self) -> Result<DataTable> {
        self.section(CompanySection::Officers).await
    }

    pub async fn events(&self) -> Result<DataTable> {
        self.section(CompanySection::Events).await
    }

    pub async fn news(&self) -> Result<DataTable> {
        self.section(CompanySection::News).await
    }

    pub async fn insider_deals(&self) -> Result<DataTable> {
        self.section(CompanySection::InsiderDeals).await
    }

    pub async fn dividends(&self) -> Result<DataTable> {
        self.section(CompanySection::Dividends).await
    }
}

/// 财务报表访问
pub struct Finance<'a> {
    stock: &'a Stock,
}

impl Finance<'_> {
    /// 按报表类型获取
    ///
    /// 数据源不支持所请求的语言时只记录一条信息日志，返回数据源原生列名。
    /// `dropna` 为真时删除全为空值的列。
    pub async fn report(
        &self,
        kind: ReportKind,
        period: Period,
        lang: Lang,
        dropna: bool,
    ) -> Result<DataTable> {
        let source = &self.stock.source;
        if !source.supports_lang(lang) {
            log::info!(
                "数据源 {} 不支持 lang='{}'，返回英文列名",
                source.name(),
                lang
            );
        }

        let table = source
            .financial_report(&self.stock.symbol, kind, period)
            .await?;
        log::debug!(
            "{} {} ({}) 形状: {:?}",
            self.stock.symbol,
            kind,
            period,
            table.shape()
        );

        Ok(if dropna { table.drop_null_columns() } else { table })
    }

    pub async fn ratio(&self, period: Period, lang: Lang, dropna: bool) -> Result<DataTable> {
        self.report(ReportKind::Ratio, period, lang, dropna).await
    }

    pub async fn income_statement(
        &self,
        period: Period,
        lang: Lang,
        dropna: bool,
    ) -> Result<DataTable> {
        self.report(ReportKind::IncomeStatement, period, lang, dropna).await
    }

    pub async fn balance_sheet(
        &self,
        period: Period,
        lang: Lang,
        dropna: bool,
    ) -> Result<DataTable> {
        self.report(ReportKind::BalanceSheet, period, lang, dropna).await
    }

    pub async fn cash_flow(&self, period: Period, lang: Lang, dropna: bool) -> Result<DataTable> {
        self.report(ReportKind::CashFlow, period, lang, dropna).await
    }
}

/// 行情访问
pub struct Quote<'a> {
    stock: &'a Stock,
}

impl Quote<'_> {
    /// 日K线
    pub async fn history(&self, start: NaiveDate, end: NaiveDate) -> Result<DataTable> {
        if start > end {
            return Err(anyhow!("开始日期 {} 晚于结束日期 {}", start, end));
        }
        self.stock
            .source
            .price_history(&self.stock.symbol, start, end)
            .await
    }
}

/// 实时报价访问
pub struct Trading {
    source: Arc<dyn DataSource>,
}

impl Trading {
    pub async fn price_board(&self, symbols: &[String]) -> Result<DataTable> {
        let symbols = symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .collect::<Result<Vec<_>>>()?;
        if symbols.is_empty() {
            return Err(anyhow!("股票代码列表为空"));
        }
        self.source.price_board(&symbols).await
    }
}

/// 上市代码访问
pub struct Listing {
    source: Arc<dyn DataSource>,
}

impl Listing {
    pub async fn all_symbols(&self) -> Result<DataTable> {
        self.source.all_symbols().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 只实现财务报表的测试数据源
    struct RatioOnly;

    #[async_trait]
    impl DataSource for RatioOnly {
        fn name(&self) -> Source {
            Source::Tcbs
        }

        async fn financial_report(
            &self,
            _symbol: &str,
            _kind: ReportKind,
            _period: Period,
        ) -> Result<DataTable> {
            Ok(DataTable::from_values(vec![
                json!({"year": 2023, "roe": 0.12, "badDebtPercentage": null}),
                json!({"year": 2022, "roe": 0.10, "badDebtPercentage": null}),
            ]))
        }
    }

    fn client() -> Vnstock {
        Vnstock::empty(Source::Tcbs).with_source(Source::Tcbs, Arc::new(RatioOnly))
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" nvl ").unwrap(), "NVL");
        assert_eq!(normalize_symbol("VN30F1M").unwrap(), "VN30F1M");
        assert!(normalize_symbol("N").is_err());
        assert!(normalize_symbol("VC B").is_err());
        assert!(normalize_symbol("../etc").is_err());
    }

    #[test]
    fn test_symbol_pattern_compiled_once() {
        let first: *const Regex = LazyLock::force(&SYMBOL_PATTERN);
        for symbol in ["VCB", "fpt", "HPG", "VN30F1M"] {
            assert!(normalize_symbol(symbol).is_ok());
        }
        let second: *const Regex = LazyLock::force(&SYMBOL_PATTERN);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unconfigured_source() {
        let vnstock = client();
        assert!(vnstock.stock("NVL", Source::Vci).is_err());
        assert!(vnstock.listing().is_err());
        assert_eq!(vnstock.stock("nvl", Source::Tcbs).unwrap().symbol(), "NVL");
    }

    #[tokio::test]
    async fn test_finance_dropna() {
        let vnstock = client();
        let stock = vnstock.stock("NVL", Source::Tcbs).unwrap();

        let raw = stock.finance().ratio(Period::Year, Lang::Vi, false).await.unwrap();
        assert!(raw.has_column("bad_debt_percentage"));

        let dropped = stock.finance().ratio(Period::Year, Lang::En, true).await.unwrap();
        assert!(!dropped.has_column("bad_debt_percentage"));
        assert_eq!(dropped.shape(), (2, 2));
    }

    #[tokio::test]
    async fn test_unsupported_defaults() {
        let vnstock = client();
        let stock = vnstock.stock("NVL", Source::Tcbs).unwrap();
        let err = stock.company().overview().await.unwrap_err();
        assert!(err.to_string().contains("overview"));

        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(stock.quote().history(start, end).await.is_err());
    }
}
