//! 越南股票数据后端
//!
//! 对接 TCBS、VCI 等越南券商的公开接口，提供：
//! - 公司信息、财务报表、K线、实时报价的原始数据表
//! - 带磁盘缓存的价格、财务指标、报表科目、内部人交易和新闻
//! - RESTful API 与表格检查命令行

pub mod config;     // 配置
pub mod guide;      // 指南命令行
pub mod handlers;   // HTTP 请求处理器
pub mod middleware; // 中间件
pub mod models;     // 数据模型定义
pub mod services;   // 业务逻辑服务
