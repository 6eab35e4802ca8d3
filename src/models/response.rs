//! 越南股票数据接口的响应信封
//!
//! 公司信息、财务报表、估值指标、行情和缓存管理接口都用同一个信封返回，
//! 失败时 `data` 为空、`message` 为错误原因（含上游数据源的报错）。

use serde::{Deserialize, Serialize};
use chrono::Utc;
use chrono_tz::Asia::Ho_Chi_Minh;

/// 获取越南时间（UTC+7）
pub fn get_vietnam_time() -> chrono::DateTime<chrono_tz::Tz> {
    Utc::now().with_timezone(&Ho_Chi_Minh)
}

/// 响应信封
///
/// - success: 数据是否取回
/// - data: 记录表、指标列表或缓存统计
/// - message: 成功为 "Success"，失败为错误原因
/// - timestamp: 越南交易所时区（Asia/Ho_Chi_Minh）的响应时间
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    /// 响应时间戳（ISO 8601 格式，+07:00）
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// 包装取回的数据
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
            timestamp: get_vietnam_time().to_rfc3339(),
        }
    }

    /// 参数错误、认证失败或数据源报错
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            timestamp: get_vietnam_time().to_rfc3339(),
        }
    }
}
