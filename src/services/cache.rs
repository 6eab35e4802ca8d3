//! 财务数据缓存
//!
//! 按股票代码缓存五类记录，写入只更新内存，由 [`FinancialCache::persist`]
//! 在阻塞线程池中落盘：
//! - prices：以 `time` 去重
//! - financial_metrics / line_items：以 `report_period` 去重
//! - insider_trades：以 `filing_date` 去重
//! - company_news：以 `date` 去重
//!
//! 落盘先写 `<path>.tmp` 再重命名，避免写到一半的文件覆盖旧缓存。

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{CompanyNews, FinancialMetrics, InsiderTrade, LineItem, Price};

type Record = Map<String, Value>;
type Bucket = BTreeMap<String, Vec<Record>>;

/// 缓存分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    Prices,
    FinancialMetrics,
    LineItems,
    InsiderTrades,
    CompanyNews,
}

impl CacheCategory {
    /// 去重使用的字段
    pub fn key_field(&self) -> &'static str {
        match self {
            CacheCategory::Prices => "time",
            CacheCategory::FinancialMetrics | CacheCategory::LineItems => "report_period",
            CacheCategory::InsiderTrades => "filing_date",
            CacheCategory::CompanyNews => "date",
        }
    }
}

/// 缓存文件内容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheData {
    #[serde(default)]
    prices: Bucket,
    #[serde(default)]
    financial_metrics: Bucket,
    #[serde(default)]
    line_items: Bucket,
    #[serde(default)]
    insider_trades: Bucket,
    #[serde(default)]
    company_news: Bucket,
}

impl CacheData {
    fn bucket(&self, category: CacheCategory) -> &Bucket {
        match category {
            CacheCategory::Prices => &self.prices,
            CacheCategory::FinancialMetrics => &self.financial_metrics,
            CacheCategory::LineItems => &self.line_items,
            CacheCategory::InsiderTrades => &self.insider_trades,
            CacheCategory::CompanyNews => &self.company_news,
        }
    }

    fn bucket_mut(&mut self, category: CacheCategory) -> &mut Bucket {
        match category {
            CacheCategory::Prices => &mut self.prices,
            CacheCategory::FinancialMetrics => &mut self.financial_metrics,
            CacheCategory::LineItems => &mut self.line_items,
            CacheCategory::InsiderTrades => &mut self.insider_trades,
            CacheCategory::CompanyNews => &mut self.company_news,
        }
    }
}

/// 各分类缓存的股票数量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub prices: usize,
    pub financial_metrics: usize,
    pub line_items: usize,
    pub insider_trades: usize,
    pub company_news: usize,
}

/// 合并新旧记录
///
/// 新记录在前：键已存在时在旧记录上覆盖新字段，否则原样加入；
/// 未被更新的旧记录按原顺序追加在后。
pub fn merge_records(existing: Option<&[Record]>, new: Vec<Record>, key_field: &str) -> Vec<Record> {
    let existing = match existing {
        Some(items) if !items.is_empty() => items,
        _ => return new,
    };

    let new_keys: Vec<Option<&Value>> = new.iter().map(|item| item.get(key_field)).collect();
    let find_existing = |key: Option<&Value>| -> Option<&Record> {
        let key = key?;
        existing.iter().find(|item| item.get(key_field) == Some(key))
    };

    let mut merged: Vec<Record> = new
        .iter()
        .zip(&new_keys)
        .map(|(item, key)| match find_existing(*key) {
            Some(old) => {
                let mut combined = old.clone();
                combined.extend(item.clone());
                combined
            }
            None => item.clone(),
        })
        .collect();

    merged.extend(
        existing
            .iter()
            .filter(|item| match item.get(key_field) {
                Some(key) => !new_keys.contains(&Some(key)),
                None => true,
            })
            .cloned(),
    );

    merged
}

/// 财务数据缓存
///
/// 内部用读写锁保护，可通过 `Arc<FinancialCache>` 在多个请求间共享。
pub struct FinancialCache {
    data: RwLock<CacheData>,
    /// 落盘路径；为 None 时只在内存中缓存
    path: Option<PathBuf>,
    /// 串行化落盘，避免多个写入者争用临时文件
    save_lock: Mutex<()>,
}

impl FinancialCache {
    /// 创建缓存，`path` 为 None 时不落盘
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            data: RwLock::new(CacheData::default()),
            path,
            save_lock: Mutex::new(()),
        }
    }

    /// 只在内存中缓存
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheData> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheData> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ==================== 通用读写 ====================

    /// 读取某只股票的原始记录
    pub fn get_records(&self, category: CacheCategory, ticker: &str) -> Option<Vec<Record>> {
        self.read().bucket(category).get(ticker).cloned()
    }

    /// 合并写入原始记录（只更新内存）
    pub fn set_records(&self, category: CacheCategory, ticker: &str, records: Vec<Record>) {
        let mut data = self.write();
        let bucket = data.bucket_mut(category);
        let merged = merge_records(
            bucket.get(ticker).map(|v| v.as_slice()),
            records,
            category.key_field(),
        );
        bucket.insert(ticker.to_string(), merged);
    }

    fn get_typed<T: DeserializeOwned>(&self, category: CacheCategory, ticker: &str) -> Option<Vec<T>> {
        let records = self.get_records(category, ticker)?;
        Some(
            records
                .into_iter()
                .filter_map(|r| match serde_json::from_value(Value::Object(r)) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        log::warn!("⚠️ 跳过无法解析的缓存记录 ({:?} {}): {}", category, ticker, e);
                        None
                    }
                })
                .collect(),
        )
    }

    fn set_typed<T: Serialize>(&self, category: CacheCategory, ticker: &str, items: &[T]) -> Result<()> {
        let records = items
            .iter()
            .map(|item| match serde_json::to_value(item)? {
                Value::Object(map) => Ok(map),
                other => Err(anyhow::anyhow!("缓存记录不是对象: {}", other)),
            })
            .collect::<Result<Vec<_>>>()?;
        self.set_records(category, ticker, records);
        Ok(())
    }

    // ==================== 分类读写 ====================

    pub fn get_prices(&self, ticker: &str) -> Option<Vec<Price>> {
        self.get_typed(CacheCategory::Prices, ticker)
    }

    pub fn set_prices(&self, ticker: &str, prices: &[Price]) -> Result<()> {
        self.set_typed(CacheCategory::Prices, ticker, prices)
    }

    pub fn get_financial_metrics(&self, ticker: &str) -> Option<Vec<FinancialMetrics>> {
        self.get_typed(CacheCategory::FinancialMetrics, ticker)
    }

    pub fn set_financial_metrics(&self, ticker: &str, metrics: &[FinancialMetrics]) -> Result<()> {
        self.set_typed(CacheCategory::FinancialMetrics, ticker, metrics)
    }

    pub fn get_line_items(&self, ticker: &str) -> Option<Vec<LineItem>> {
        self.get_typed(CacheCategory::LineItems, ticker)
    }

    pub fn set_line_items(&self, ticker: &str, items: &[LineItem]) -> Result<()> {
        self.set_typed(CacheCategory::LineItems, ticker, items)
    }

    pub fn get_insider_trades(&self, ticker: &str) -> Option<Vec<InsiderTrade>> {
        self.get_typed(CacheCategory::InsiderTrades, ticker)
    }

    pub fn set_insider_trades(&self, ticker: &str, trades: &[InsiderTrade]) -> Result<()> {
        self.set_typed(CacheCategory::InsiderTrades, ticker, trades)
    }

    pub fn get_company_news(&self, ticker: &str) -> Option<Vec<CompanyNews>> {
        self.get_typed(CacheCategory::CompanyNews, ticker)
    }

    pub fn set_company_news(&self, ticker: &str, news: &[CompanyNews]) -> Result<()> {
        self.set_typed(CacheCategory::CompanyNews, ticker, news)
    }

    // ==================== 持久化 ====================

    /// 同步写入配置的路径，没有路径时不做任何事
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to_disk(path),
            None => Ok(()),
        }
    }

    /// 在阻塞线程池中落盘，供异步请求处理使用
    ///
    /// 多个落盘任务按 `save_lock` 串行执行，每次都写入执行时的最新内容。
    pub async fn persist(self: &Arc<Self>) -> Result<()> {
        if self.path.is_none() {
            return Ok(());
        }
        let cache = Arc::clone(self);
        tokio::task::spawn_blocking(move || cache.save()).await?
    }

    /// 保存全部缓存到指定文件
    pub fn save_to_disk(&self, path: &Path) -> Result<()> {
        let _guard = self.save_lock.lock().unwrap_or_else(|p| p.into_inner());
        let content = serde_json::to_string_pretty(&*self.read())?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("无法创建缓存目录: {}", dir.display()))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content)
            .with_context(|| format!("无法写入缓存文件: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("无法替换缓存文件: {}", path.display()))?;

        log::debug!("💾 缓存已保存: {}", path.display());
        Ok(())
    }

    /// 从指定文件加载缓存，文件不存在时返回 false
    pub fn load_from_disk(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            log::info!("缓存文件不存在: {}", path.display());
            return Ok(false);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取缓存文件: {}", path.display()))?;
        let data: CacheData = serde_json::from_str(&content)
            .with_context(|| format!("缓存文件格式错误: {}", path.display()))?;

        *self.write() = data;
        log::info!("✅ 缓存已加载: {}", path.display());
        Ok(true)
    }

    /// 从配置的路径加载
    pub fn load(&self) -> Result<bool> {
        match &self.path {
            Some(path) => self.load_from_disk(path),
            None => Ok(false),
        }
    }

    /// 清空内存中的全部缓存
    pub fn clear(&self) {
        *self.write() = CacheData::default();
        log::info!("🗑️ 缓存已清空");
    }

    pub fn stats(&self) -> CacheStats {
        let data = self.read();
        CacheStats {
            prices: data.prices.len(),
            financial_metrics: data.financial_metrics.len(),
            line_items: data.line_items.len(),
            insider_trades: data.insider_trades.len(),
            company_news: data.company_news.len(),
        }
    }
}

impl Default for FinancialCache {
    fn default() -> Self {
        Self::in_memory()
    }
}
