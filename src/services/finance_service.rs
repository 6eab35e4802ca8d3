//! 财务数据服务
//!
//! 先查缓存，缓存没有（或按日期筛选后为空）再请求数据源，
//! 数据源返回的非空结果写回缓存。

use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;

use super::cache::FinancialCache;
use super::line_items::build_line_items;
use super::metrics::{build_financial_metrics, Statements};
use super::vnstock::common::normalize_date;
use super::vnstock::{normalize_symbol, Stock, Vnstock};
use crate::models::{
    CompanyNews, CompanySection, DataTable, FinancialMetrics, InsiderTrade, Lang, LineItem,
    Period, Price, ReportKind, Row, Source,
};

/// 内部人交易、新闻的默认条数上限
pub const DEFAULT_RECORD_LIMIT: usize = 1000;
/// 财务指标、报表科目的默认期数
pub const DEFAULT_PERIOD_LIMIT: usize = 10;

/// 财务数据服务
pub struct FinanceService {
    vnstock: Vnstock,
    cache: Arc<FinancialCache>,
    /// 是否读写缓存
    use_cache: bool,
}

impl FinanceService {
    pub fn new(vnstock: Vnstock, cache: Arc<FinancialCache>, use_cache: bool) -> Self {
        Self {
            vnstock,
            cache,
            use_cache,
        }
    }

    pub fn vnstock(&self) -> &Vnstock {
        &self.vnstock
    }

    pub fn cache(&self) -> &FinancialCache {
        &self.cache
    }

    /// 默认数据源
    pub fn source(&self) -> Source {
        self.vnstock.default_source()
    }

    fn stock(&self, ticker: &str, source: Option<Source>) -> Result<Stock> {
        self.vnstock
            .stock(ticker, source.unwrap_or_else(|| self.source()))
    }

    /// 写入内存缓存后在阻塞线程池落盘，失败只记录警告，不影响返回结果
    async fn store<F>(&self, what: &str, ticker: &str, write: F)
    where
        F: FnOnce(&FinancialCache) -> Result<()>,
    {
        if !self.use_cache {
            return;
        }
        let result = match write(&self.cache) {
            Ok(()) => self.cache.persist().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            log::warn!("⚠️ 写入 {} 缓存失败 ({}): {:#}", what, ticker, e);
        }
    }

    // ==================== 价格 ====================

    /// 日线价格，按日期升序
    pub async fn get_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Price>> {
        let ticker = normalize_symbol(ticker)?;
        let (start, end) = (fmt_date(start_date), fmt_date(end_date));

        if self.use_cache {
            if let Some(cached) = self.cache.get_prices(&ticker) {
                let mut prices: Vec<Price> = cached
                    .into_iter()
                    .filter(|p| start <= p.time && p.time <= end)
                    .collect();
                if !prices.is_empty() {
                    log::info!("使用缓存的价格数据 {} {} ~ {}", ticker, start, end);
                    prices.sort_by(|a, b| a.time.cmp(&b.time));
                    return Ok(prices);
                }
            }
        }

        log::info!("📡 获取价格数据 {} {} ~ {}", ticker, start, end);
        let table = self
            .stock(&ticker, None)?
            .quote()
            .history(start_date, end_date)
            .await?;

        let mut prices = table_to_prices(&table);
        if prices.is_empty() {
            log::info!("{} 在 {} ~ {} 没有价格数据", ticker, start, end);
            return Ok(prices);
        }
        prices.sort_by(|a, b| a.time.cmp(&b.time));

        self.store("价格", &ticker, |c| c.set_prices(&ticker, &prices)).await;
        Ok(prices)
    }

    /// 日线价格表（time/open/close/high/low/volume）
    pub async fn get_price_data(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataTable> {
        let prices = self.get_prices(ticker, start_date, end_date).await?;
        Ok(prices_to_table(&prices))
    }

    // ==================== 财务指标 ====================

    /// 拉取计算指标所需的全部报表；分红获取失败时按无分红处理
    async fn fetch_statements(&self, stock: &Stock, period: Period) -> Result<Statements> {
        let finance = stock.finance();
        let company = stock.company();

        let (ratio, income, balance, cash_flow, overview) = futures::try_join!(
            finance.ratio(period, Lang::En, true),
            finance.income_statement(period, Lang::En, true),
            finance.balance_sheet(period, Lang::En, true),
            finance.cash_flow(period, Lang::En, true),
            company.overview(),
        )?;

        let dividends = match company.dividends().await {
            Ok(table) => table,
            Err(e) => {
                log::warn!("⚠️ 获取 {} 分红数据失败: {:#}", stock.symbol(), e);
                DataTable::default()
            }
        };

        log::debug!(
            "{} 报表形状 ratio {:?} income {:?} balance {:?} cash_flow {:?}",
            stock.symbol(),
            ratio.shape(),
            income.shape(),
            balance.shape(),
            cash_flow.shape()
        );

        Ok(Statements {
            ratio,
            income,
            balance,
            cash_flow,
            overview,
            dividends,
        })
    }

    /// 财务指标，按报告期倒序，最多 `limit` 期（0 为不限）
    pub async fn get_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        period: Period,
        limit: usize,
    ) -> Result<Vec<FinancialMetrics>> {
        let ticker = normalize_symbol(ticker)?;
        let end = fmt_date(end_date);

        if self.use_cache {
            if let Some(cached) = self.cache.get_financial_metrics(&ticker) {
                let mut metrics: Vec<FinancialMetrics> = cached
                    .into_iter()
                    .filter(|m| m.report_period <= end && m.period == period.as_str())
                    .collect();
                if !metrics.is_empty() {
                    log::info!("使用缓存的财务指标 {}（截至 {}）", ticker, end);
                    metrics.sort_by(|a, b| b.report_period.cmp(&a.report_period));
                    return Ok(truncate(metrics, limit));
                }
            }
        }

        log::info!("📡 获取财务指标 {}，数据源 {}", ticker, self.source());
        let stock = self.stock(&ticker, None)?;
        let statements = self.fetch_statements(&stock, period).await?;
        let metrics = build_financial_metrics(&ticker, period, end_date, limit, &statements);

        if !metrics.is_empty() {
            self.store("财务指标", &ticker, |c| c.set_financial_metrics(&ticker, &metrics)).await;
        }
        Ok(metrics)
    }

    /// 截至某日最近一期的市值（十亿越南盾）
    pub async fn get_market_cap(&self, ticker: &str, end_date: NaiveDate) -> Result<Option<f64>> {
        let metrics = self
            .get_financial_metrics(ticker, end_date, Period::Year, DEFAULT_PERIOD_LIMIT)
            .await?;
        Ok(metrics.first().and_then(|m| m.market_cap))
    }

    // ==================== 报表科目 ====================

    /// 报表科目，按报告期倒序
    ///
    /// 只有当每个请求的科目都在至少一期缓存里有值时才使用缓存。
    pub async fn search_line_items(
        &self,
        ticker: &str,
        items: &[String],
        end_date: NaiveDate,
        period: Period,
        limit: usize,
    ) -> Result<Vec<LineItem>> {
        let ticker = normalize_symbol(ticker)?;
        let end = fmt_date(end_date);

        if self.use_cache {
            if let Some(cached) = self.cache.get_line_items(&ticker) {
                let mut cached: Vec<LineItem> = cached
                    .into_iter()
                    .filter(|i| i.report_period <= end && i.period == period.as_str())
                    .collect();
                cached.sort_by(|a, b| b.report_period.cmp(&a.report_period));
                let cached = truncate(cached, limit);

                if !cached.is_empty() {
                    match items
                        .iter()
                        .find(|item| !cached.iter().any(|row| row.has(item)))
                    {
                        None => {
                            log::info!("使用缓存的报表科目 {}", ticker);
                            return Ok(cached);
                        }
                        Some(missing) => {
                            log::info!("缓存中没有科目 '{}'，重新获取 {}", missing, ticker);
                        }
                    }
                }
            }
        }

        log::info!("📡 获取报表科目 {} {:?}", ticker, items);
        let stock = self.stock(&ticker, None)?;
        let statements = self.fetch_statements(&stock, period).await?;
        let line_items = build_line_items(&ticker, items, period, end_date, limit, &statements);

        if !line_items.is_empty() {
            self.store("报表科目", &ticker, |c| c.set_line_items(&ticker, &line_items)).await;
        }
        Ok(line_items)
    }

    // ==================== 内部人交易 ====================

    /// 内部人交易，按日期倒序
    pub async fn get_insider_trades(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<InsiderTrade>> {
        let ticker = normalize_symbol(ticker)?;
        let end = fmt_date(end_date);
        let start = start_date.map(fmt_date);
        let in_range = |date: &str| {
            date <= end.as_str() && start.as_deref().map_or(true, |s| date >= s)
        };

        if self.use_cache {
            if let Some(cached) = self.cache.get_insider_trades(&ticker) {
                let mut trades: Vec<InsiderTrade> = cached
                    .into_iter()
                    .filter(|t| in_range(t.effective_date()))
                    .collect();
                if !trades.is_empty() {
                    log::info!("使用缓存的内部人交易 {}", ticker);
                    trades.sort_by(|a, b| b.effective_date().cmp(a.effective_date()));
                    return Ok(truncate(trades, limit));
                }
            }
        }

        log::info!("📡 获取内部人交易 {}", ticker);
        let table = self.stock(&ticker, None)?.company().insider_deals().await?;

        let mut trades: Vec<InsiderTrade> = table
            .iter_rows()
            .filter_map(|row| row_to_insider_trade(&ticker, row))
            .filter(|t| in_range(t.effective_date()))
            .collect();
        trades.sort_by(|a, b| b.effective_date().cmp(a.effective_date()));
        let trades = truncate(trades, limit);

        if !trades.is_empty() {
            self.store("内部人交易", &ticker, |c| c.set_insider_trades(&ticker, &trades)).await;
        }
        Ok(trades)
    }

    // ==================== 新闻 ====================

    /// 公司新闻，按日期倒序
    pub async fn get_company_news(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<CompanyNews>> {
        let ticker = normalize_symbol(ticker)?;
        let end = fmt_date(end_date);
        let start = start_date.map(fmt_date);
        let in_range = |date: &str| {
            date <= end.as_str() && start.as_deref().map_or(true, |s| date >= s)
        };

        if self.use_cache {
            if let Some(cached) = self.cache.get_company_news(&ticker) {
                let mut news: Vec<CompanyNews> =
                    cached.into_iter().filter(|n| in_range(&n.date)).collect();
                if !news.is_empty() {
                    log::info!("使用缓存的公司新闻 {}", ticker);
                    news.sort_by(|a, b| b.date.cmp(&a.date));
                    return Ok(truncate(news, limit));
                }
            }
        }

        log::info!("📡 获取公司新闻 {}", ticker);
        let table = self.stock(&ticker, None)?.company().news().await?;

        let mut news: Vec<CompanyNews> = table
            .iter_rows()
            .filter_map(|row| row_to_news(&ticker, row))
            .filter(|n| in_range(&n.date))
            .collect();
        news.sort_by(|a, b| b.date.cmp(&a.date));
        let news = truncate(news, limit);

        if !news.is_empty() {
            self.store("公司新闻", &ticker, |c| c.set_company_news(&ticker, &news)).await;
        }
        Ok(news)
    }

    // ==================== 原始数据表 ====================

    /// 公司概览
    pub async fn get_company_info(&self, ticker: &str) -> Result<DataTable> {
        self.company_table(ticker, CompanySection::Overview, None).await
    }

    /// 公司信息表
    pub async fn company_table(
        &self,
        ticker: &str,
        section: CompanySection,
        source: Option<Source>,
    ) -> Result<DataTable> {
        self.stock(ticker, source)?.company().section(section).await
    }

    /// 财务报表
    pub async fn finance_table(
        &self,
        ticker: &str,
        kind: ReportKind,
        period: Period,
        lang: Lang,
        dropna: bool,
        source: Option<Source>,
    ) -> Result<DataTable> {
        self.stock(ticker, source)?
            .finance()
            .report(kind, period, lang, dropna)
            .await
    }

    /// 财务报表（英文列名，删除全空列）
    pub async fn get_financial_statements(
        &self,
        ticker: &str,
        kind: ReportKind,
        period: Period,
    ) -> Result<DataTable> {
        let table = self
            .finance_table(ticker, kind, period, Lang::En, true, None)
            .await?;
        log::debug!("{} {} 完整数据:\n{}", ticker, kind, table);
        Ok(table)
    }

    /// 实时报价
    pub async fn get_trading_data(
        &self,
        tickers: &[String],
        source: Option<Source>,
    ) -> Result<DataTable> {
        self.vnstock
            .trading(source.unwrap_or_else(|| self.source()))?
            .price_board(tickers)
            .await
    }

    /// 全部上市代码
    pub async fn get_listing(&self) -> Result<DataTable> {
        self.vnstock.listing()?.all_symbols().await
    }

    /// 清空缓存并落盘
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear();
        self.cache.persist().await
    }
}

// ==================== 转换 ====================

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// 截取前 `limit` 条，0 为不限
fn truncate<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    if limit > 0 {
        items.truncate(limit);
    }
    items
}

/// 价格列表转成表格，按日期升序
pub fn prices_to_table(prices: &[Price]) -> DataTable {
    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| a.time.cmp(&b.time));
    DataTable::from_records(sorted.iter().filter_map(|p| match serde_json::to_value(p) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }))
}

/// K线表转成价格列表，缺少任一字段的行被跳过
pub fn table_to_prices(table: &DataTable) -> Vec<Price> {
    table
        .iter_rows()
        .filter_map(|row| {
            Some(Price {
                open: row.f64("open")?,
                close: row.f64("close")?,
                high: row.f64("high")?,
                low: row.f64("low")?,
                volume: row.f64("volume")? as i64,
                time: row.get("time").and_then(normalize_date)?,
            })
        })
        .collect()
}

fn first_f64(row: Row<'_>, columns: &[&str]) -> Option<f64> {
    columns.iter().find_map(|c| row.f64(c))
}

fn first_text(row: Row<'_>, columns: &[&str]) -> Option<String> {
    columns.iter().find_map(|c| row.text(c))
}

fn first_date(row: Row<'_>, columns: &[&str]) -> Option<String> {
    columns
        .iter()
        .find_map(|c| row.get(c).and_then(normalize_date))
}

/// 内部人交易表的一行转成记录；没有日期的行被跳过
pub fn row_to_insider_trade(ticker: &str, row: Row<'_>) -> Option<InsiderTrade> {
    let date = first_date(row, &["transaction_date", "deal_announce_date", "an_date"])?;
    let shares = first_f64(row, &["volume_change", "deal_quantity", "quantity"]);
    let price = first_f64(row, &["price", "deal_price"]);
    let value = first_f64(row, &["value"]).or_else(|| Some(shares? * price?));

    Some(InsiderTrade {
        ticker: ticker.to_string(),
        issuer: None,
        name: first_text(row, &["owner_name", "name", "trader_name"]),
        title: first_text(row, &["position", "owner_position"]),
        is_board_director: None,
        transaction_date: Some(date.clone()),
        transaction_shares: shares,
        transaction_price_per_share: price,
        transaction_value: value,
        shares_owned_before_transaction: first_f64(row, &["volume_initial", "volume_before"]),
        shares_owned_after_transaction: first_f64(row, &["volume_final", "volume_after"]),
        security_title: None,
        filing_date: date,
    })
}

/// 新闻表的一行转成记录；没有日期的行被跳过
pub fn row_to_news(ticker: &str, row: Row<'_>) -> Option<CompanyNews> {
    Some(CompanyNews {
        ticker: ticker.to_string(),
        date: first_date(row, &["public_date", "publish_date", "date"])?,
        title: first_text(row, &["news_title", "title"]),
        content: first_text(row, &["news_short_content", "content", "description"]),
        source: first_text(row, &["source"]),
        url: first_text(row, &["news_source_link", "url", "link"]),
    })
}
