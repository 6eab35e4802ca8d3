//! 越南股票数据表检查工具

use clap::Parser;
use env_logger::Env;

use vnstock_backend::guide::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    guide::run(Cli::parse()).await
}
