//! 指南命令行集成测试（`--source VCI` 路径，模拟数据源）

mod common;

use clap::Parser;
use std::sync::Arc;

use common::MockSource;
use vnstock_backend::guide::{fetch_table, run_with, Cli, GuideTable};
use vnstock_backend::models::{CompanySection, Lang, Period, ReportKind, Source};
use vnstock_backend::services::{FinanceService, FinancialCache, Vnstock};

/// 只注册 VCI 的客户端，默认数据源仍为 TCBS
fn vci_client(mock: MockSource) -> (Vnstock, Arc<MockSource>) {
    let mock = Arc::new(mock);
    let vnstock = Vnstock::empty(Source::Tcbs).with_source(Source::Vci, mock.clone());
    (vnstock, mock)
}

#[tokio::test]
async fn test_guide_info_with_vci_source() {
    println!("\n========== 测试指南 info --source VCI ==========");
    let (vnstock, mock) = vci_client(MockSource::named(Source::Vci));

    let cli = Cli::parse_from([
        "vnstock-guide", "info", "--symbol", "vci", "--source", "VCI", "--table", "ratio",
    ]);
    run_with(&vnstock, cli.command).await.unwrap();
    assert_eq!(mock.report_calls(), 1);

    let cli = Cli::parse_from([
        "vnstock-guide", "info", "--symbol", "VCI", "--source", "vci", "--table", "news",
    ]);
    run_with(&vnstock, cli.command).await.unwrap();
    assert_eq!(mock.company_calls(), 1);

    // 未指定数据源时走默认的 TCBS，客户端中没有注册
    let cli = Cli::parse_from(["vnstock-guide", "info", "--symbol", "VCI"]);
    assert!(run_with(&vnstock, cli.command).await.is_err());
}

#[tokio::test]
async fn test_fetch_table_through_vci() {
    let (vnstock, _) = vci_client(MockSource::named(Source::Vci));
    let stock = vnstock.stock("VCI", Source::Vci).unwrap();
    assert_eq!(stock.source(), Source::Vci);

    let ratio = fetch_table(&stock, GuideTable::Report(ReportKind::Ratio), Period::Year, Lang::En)
        .await
        .unwrap();
    println!("{}", ratio);
    assert!(ratio.has_column("price_to_earning"));
    assert!(!ratio.has_column("empty"));

    let overview = fetch_table(
        &stock,
        GuideTable::Company(CompanySection::Overview),
        Period::Year,
        Lang::En,
    )
    .await
    .unwrap();
    assert_eq!(overview.f64_at(0, "outstanding_share"), Some(100.0));
}

#[tokio::test]
async fn test_guide_derive_without_dividends() {
    println!("\n========== 测试指南 derive --source VCI ==========");
    let mock = MockSource {
        fail_dividends: true,
        ..MockSource::named(Source::Vci)
    };
    let (vnstock, mock) = vci_client(mock);

    let cli = Cli::parse_from([
        "vnstock-guide", "derive", "--symbol", "VCI", "--source", "VCI", "--period", "year",
    ]);
    run_with(&vnstock, cli.command).await.unwrap();
    assert_eq!(mock.report_calls(), 2);
    assert_eq!(mock.company_calls(), 1);
}

#[tokio::test]
async fn test_service_finance_table_with_vci() {
    let (vnstock, mock) = vci_client(MockSource::named(Source::Vci));
    let service = FinanceService::new(vnstock, Arc::new(FinancialCache::in_memory()), true);

    let table = service
        .finance_table("vci", ReportKind::BalanceSheet, Period::Quarter, Lang::Vi, true, Some(Source::Vci))
        .await
        .unwrap();
    assert!(table.has_column("debt"));
    assert_eq!(mock.last_period(), Some(Period::Quarter));

    assert!(service
        .finance_table("VCI", ReportKind::Ratio, Period::Year, Lang::En, true, None)
        .await
        .is_err());
}
