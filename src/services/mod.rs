//! 业务逻辑服务模块
//!
//! 封装数据获取、缓存和指标计算逻辑

pub mod vnstock;          // 越南股票数据客户端
pub mod cache;            // 财务数据缓存
pub mod metrics;          // 财务指标计算
pub mod line_items;       // 报表科目提取
pub mod finance_service;  // 缓存优先的数据服务

pub use cache::{CacheCategory, CacheStats, FinancialCache};
pub use finance_service::FinanceService;
pub use metrics::Statements;
pub use vnstock::{DataSource, Vnstock};
