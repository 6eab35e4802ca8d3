//! 越南股票数据后端服务
//!
//! 提供公司信息、财务报表、财务指标和行情数据的 RESTful API 服务
//! 数据来源：TCBS、VCI

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::sync::Arc;

use vnstock_backend::config::AppConfig;
use vnstock_backend::handlers;
use vnstock_backend::middleware::ApiKeyMiddleware;
use vnstock_backend::services::{FinanceService, FinancialCache, Vnstock};

/// 应用程序入口
///
/// 加载配置和缓存后启动 HTTP 服务器
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load();

    // 初始化日志系统，RUST_LOG 优先于配置中的级别
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    if let Err(e) = config.validate() {
        log::error!("❌ 配置无效: {:#}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }

    let vnstock = Vnstock::new(&config).map_err(|e| {
        log::error!("❌ 创建数据客户端失败: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let cache = Arc::new(FinancialCache::new(config.cache_path()));
    if let Err(e) = cache.load() {
        log::warn!("⚠️ 加载缓存失败，使用空缓存: {:#}", e);
    }

    let service = web::Data::new(FinanceService::new(vnstock, cache, config.cache.enabled));

    if config.api.api_key.is_empty() {
        log::warn!("未设置 API_KEY，接口不做认证");
    }

    let api_key = config.api.api_key.clone();
    let bind_addr = config.bind_addr();
    log::info!(
        "启动越南股票数据后端服务 {}，默认数据源 {}",
        bind_addr,
        config.provider.source
    );

    // 创建并启动 HTTP 服务器
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(ApiKeyMiddleware::new(api_key.clone()))  // API Key 认证
            .wrap(Logger::default())  // 添加请求日志中间件
            .configure(handlers::config)  // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(bind_addr)?.run().await
}
