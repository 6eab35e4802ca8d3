//! 数据表检查指南
//!
//! `vnstock-guide` 命令行：
//! - `info`：拉取一张表，打印行列数、空值数、列类型和前几行
//! - `derive`：由利润表、现金流量表和分红历史推导资本开支、折旧摊销、净利润率和年度分红

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::AppConfig;
use crate::models::{CompanySection, DataTable, Lang, Period, ReportKind, Source};
use crate::services::line_items::combine_statements;
use crate::services::metrics::safe_div;
use crate::services::vnstock::Stock;
use crate::services::Vnstock;

/// 越南股票数据表检查工具
#[derive(Debug, Parser)]
#[command(name = "vnstock-guide", version, about = "检查越南股票数据表并推导常用财务指标")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 打印一张表的概要和前几行
    Info {
        /// 股票代码
        #[arg(long, default_value = "VCB")]
        symbol: String,
        /// 数据源（默认取配置）
        #[arg(long)]
        source: Option<Source>,
        /// 表名：公司信息分类或报表类型
        #[arg(long, default_value = "overview")]
        table: GuideTable,
        /// 报告期：year / quarter
        #[arg(long, default_value = "year", value_parser = parse_period)]
        period: Period,
        /// 列名语言：en / vi
        #[arg(long, default_value = "en")]
        lang: Lang,
        /// 打印的行数
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// 推导资本开支、折旧摊销、净利润率和年度分红
    Derive {
        #[arg(long, default_value = "VCB")]
        symbol: String,
        #[arg(long)]
        source: Option<Source>,
        #[arg(long, default_value = "year", value_parser = parse_period)]
        period: Period,
    },
}

fn parse_period(s: &str) -> Result<Period> {
    match s.trim().to_lowercase().as_str() {
        "year" => Ok(Period::Year),
        "quarter" => Ok(Period::Quarter),
        other => Err(anyhow!("未知的报告期: {}（可选 year, quarter）", other)),
    }
}

/// 可检查的表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideTable {
    Company(CompanySection),
    Report(ReportKind),
}

impl FromStr for GuideTable {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(kind) = s.parse::<ReportKind>() {
            return Ok(GuideTable::Report(kind));
        }
        s.parse::<CompanySection>()
            .map(GuideTable::Company)
            .map_err(|_| anyhow!("未知的表: {}", s.trim()))
    }
}

// ==================== 推导 ====================

/// 资本开支 = −投资支出
pub fn capital_expenditure(cash_flow: &DataTable) -> DataTable {
    cash_flow
        .with_column("capital_expenditure", |row| row.f64("invest_cost").map(|v| -v))
        .select(&["report_period", "invest_cost", "capital_expenditure"])
}

/// 折旧摊销 = EBITDA − 营业利润
pub fn depreciation_and_amortization(income: &DataTable) -> DataTable {
    income
        .with_column("depreciation_and_amortization", |row| {
            Some(row.f64("ebitda")? - row.f64("operation_profit")?)
        })
        .select(&[
            "report_period",
            "ebitda",
            "operation_profit",
            "depreciation_and_amortization",
        ])
}

/// 净利润与净利润率
pub fn net_income(income: &DataTable) -> DataTable {
    income
        .with_column("net_income", |row| row.f64("post_tax_profit"))
        .with_column("net_margin", |row| {
            safe_div(row.f64("post_tax_profit"), row.f64("revenue"))
        })
        .select(&["report_period", "revenue", "net_income", "net_margin"])
}

/// 按 `cash_year` 汇总现金分红比例
pub fn dividends_per_year(dividends: &DataTable) -> BTreeMap<i64, f64> {
    dividends.group_sum("cash_year", "cash_dividend_percentage")
}

/// 汇总推导结果，按报告期倒序
pub fn derive_table(income: &DataTable, cash_flow: &DataTable) -> DataTable {
    combine_statements(&[
        &net_income(income),
        &depreciation_and_amortization(income),
        &capital_expenditure(cash_flow),
    ])
}

// ==================== 命令执行 ====================

fn print_table(title: &str, table: &DataTable, rows: usize) {
    println!("\n========== {} ==========", title);
    println!("{}", table.info());
    println!("\n{}", table.head(rows));
}

/// 拉取一张表；报表删除全为空值的列
pub async fn fetch_table(stock: &Stock, table: GuideTable, period: Period, lang: Lang) -> Result<DataTable> {
    match table {
        GuideTable::Company(section) => stock.company().section(section).await,
        GuideTable::Report(kind) => stock.finance().report(kind, period, lang, true).await,
    }
}

/// 按配置创建客户端并执行命令
pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load();
    let vnstock = Vnstock::new(&config)?;
    run_with(&vnstock, cli.command).await
}

/// 用给定的客户端执行命令
pub async fn run_with(vnstock: &Vnstock, command: Command) -> Result<()> {
    match command {
        Command::Info {
            symbol,
            source,
            table,
            period,
            lang,
            rows,
        } => {
            let stock = vnstock.stock(&symbol, source.unwrap_or(vnstock.default_source()))?;
            let data = fetch_table(&stock, table, period, lang).await?;
            let title = match table {
                GuideTable::Company(section) => format!("{} {}", stock.symbol(), section),
                GuideTable::Report(kind) => format!("{} {} ({})", stock.symbol(), kind, period),
            };
            print_table(&title, &data, rows);
        }
        Command::Derive {
            symbol,
            source,
            period,
        } => {
            let stock = vnstock.stock(&symbol, source.unwrap_or(vnstock.default_source()))?;
            let finance = stock.finance();
            let company = stock.company();
            let (income, cash_flow) = futures::try_join!(
                finance.income_statement(period, Lang::En, false),
                finance.cash_flow(period, Lang::En, false),
            )?;
            // VCI 不提供分红历史
            let dividends = company.dividends().await.unwrap_or_else(|e| {
                log::warn!("⚠️ 获取 {} 分红历史失败: {:#}", stock.symbol(), e);
                DataTable::default()
            });

            let derived = derive_table(&income, &cash_flow);
            print_table(
                &format!("{} 推导指标 ({})", stock.symbol(), period),
                &derived,
                derived.len(),
            );

            println!("\n========== {} 年度现金分红比例 ==========", stock.symbol());
            for (year, pct) in dividends_per_year(&dividends) {
                println!("{}: {:.4}", year, pct);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn income() -> DataTable {
        DataTable::from_values(vec![
            json!({"report_period": "2023-12-31", "revenue": 200.0, "post_tax_profit": 30.0, "ebitda": 60.0, "operation_profit": 45.0}),
            json!({"report_period": "2022-12-31", "revenue": 0.0, "post_tax_profit": 10.0, "ebitda": null, "operation_profit": 20.0}),
        ])
    }

    fn cash_flow() -> DataTable {
        DataTable::from_values(vec![
            json!({"report_period": "2023-12-31", "invest_cost": -12.5}),
            json!({"report_period": "2022-12-31", "invest_cost": -8.0}),
        ])
    }

    #[test]
    fn test_capital_expenditure() {
        println!("\n========== 测试资本开支推导 ==========");
        let table = capital_expenditure(&cash_flow());
        println!("{}", table);
        assert_eq!(table.f64_at(0, "capital_expenditure"), Some(12.5));
        assert_eq!(table.f64_at(1, "capital_expenditure"), Some(8.0));
    }

    #[test]
    fn test_depreciation_and_amortization() {
        let table = depreciation_and_amortization(&income());
        assert_eq!(table.f64_at(0, "depreciation_and_amortization"), Some(15.0));
        assert_eq!(table.f64_at(1, "depreciation_and_amortization"), None);
    }

    #[test]
    fn test_net_income_margin() {
        let table = net_income(&income());
        assert_eq!(table.f64_at(0, "net_income"), Some(30.0));
        assert_eq!(table.f64_at(0, "net_margin"), Some(0.15));
        // 营收为 0 时净利润率为空
        assert_eq!(table.f64_at(1, "net_margin"), None);
    }

    #[test]
    fn test_derive_table_combines_periods() {
        println!("\n========== 测试推导汇总表 ==========");
        let table = derive_table(&income(), &cash_flow());
        println!("{}", table);
        assert_eq!(table.len(), 2);
        assert_eq!(table.str_at(0, "report_period"), Some("2023-12-31"));
        assert_eq!(table.f64_at(0, "capital_expenditure"), Some(12.5));
        assert_eq!(table.f64_at(0, "depreciation_and_amortization"), Some(15.0));
    }

    #[test]
    fn test_dividends_per_year() {
        let dividends = DataTable::from_values(vec![
            json!({"cash_year": 2023, "cash_dividend_percentage": 0.08}),
            json!({"cash_year": 2023, "cash_dividend_percentage": 0.04}),
            json!({"cash_year": 2022, "cash_dividend_percentage": 0.1}),
        ]);
        let grouped = dividends_per_year(&dividends);
        assert_eq!(grouped.len(), 2);
        assert!((grouped[&2023] - 0.12).abs() < 1e-9);
        assert!((grouped[&2022] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_guide_table() {
        assert_eq!(
            "balance_sheet".parse::<GuideTable>().unwrap(),
            GuideTable::Report(ReportKind::BalanceSheet)
        );
        assert_eq!(
            "insider_deals".parse::<GuideTable>().unwrap(),
            GuideTable::Company(CompanySection::InsiderDeals)
        );
        assert!("unknown".parse::<GuideTable>().is_err());
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from([
            "vnstock-guide", "info", "--symbol", "NVL", "--table", "ratio", "--period", "quarter",
        ]);
        match cli.command {
            Command::Info { symbol, table, period, rows, .. } => {
                assert_eq!(symbol, "NVL");
                assert_eq!(table, GuideTable::Report(ReportKind::Ratio));
                assert_eq!(period, Period::Quarter);
                assert_eq!(rows, 5);
            }
            _ => panic!("应解析为 info 命令"),
        }
    }
}
