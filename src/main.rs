use std::{env, path::Path, sync::Arc};

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio_cron_scheduler::JobScheduler;

use crate::{
    broker::{futu::FutuGateway, Gateway},
    collector::{kline, order, snapshot::MarketSnapshotCollector},
    declare::StockCode,
};

pub mod broker;
pub mod collector;
pub mod config;
pub mod declare;
pub mod logging;
pub mod prompt;
pub mod scheduler;
pub mod storage;
pub mod util;

/// 從富途 OpenD 收集行情與訂單，並組成提示語
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// 以逗號分隔的股票代號，覆蓋設定檔，例︰HK.00700,HK.09988
    #[arg(long, global = true, value_delimiter = ',')]
    codes: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 市場快照
    Snapshot {
        /// 檔名(不含副檔名)，預設 market_snapshot
        #[arg(long)]
        name: Option<String>,
    },
    /// 即時報價
    Quote {
        /// 檔名(不含副檔名)，預設 futu_stock_quote
        #[arg(long)]
        name: Option<String>,
    },
    /// 日 K 線
    Kline,
    /// 歷史訂單
    Order,
    /// 提示語
    Prompt,
    /// 依序執行 kline、order、prompt
    Run,
    /// 依設定檔中的 cron 表達式常駐執行
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    logging::info_file_async(format!(
        "market_collector {} 已啟動 OS/Arch: {}/{} command: {:?}",
        env!("CARGO_PKG_VERSION"),
        env::consts::OS,
        env::consts::ARCH,
        cli.command
    ));

    let codes = if cli.codes.is_empty() {
        None
    } else {
        Some(&cli.codes[..])
    };
    let gateway: Arc<dyn Gateway> = Arc::new(FutuGateway::from_settings(&config::SETTINGS));

    match cli.command {
        Command::Snapshot { name } => {
            let snapshots = snapshot_collector(gateway.as_ref())?;
            let codes = configured_or(codes)?;
            let rows = snapshots
                .get_market_snapshot(Some(&codes), name.as_deref(), Local::now())
                .await
                .ok_or_else(|| anyhow!("獲取市場快照數據失敗"))?;

            logging::info_console(format!("市場快照數據獲取成功，共{}條記錄", rows.len()));
            if !rows.is_empty() {
                println!("\n關鍵數據預覽:\n{}", collector::snapshot::preview(&rows));
            }
        }
        Command::Quote { name } => {
            let quotes = snapshot_collector(gateway.as_ref())?;
            let codes = configured_or(codes)?;
            let rows = quotes
                .get_stock_quotes(Some(&codes), name.as_deref(), Local::now())
                .await
                .ok_or_else(|| anyhow!("獲取實時報價數據失敗"))?;

            logging::info_console(format!("實時報價數據獲取成功，共{}條記錄", rows.len()));
        }
        Command::Kline => kline::execute(gateway.as_ref(), codes).await?,
        Command::Order => order::execute(gateway.as_ref(), codes).await?,
        Command::Prompt => prompt::execute(codes)?,
        Command::Run => run_once(gateway.as_ref(), codes).await?,
        Command::Schedule => {
            let mut sched = JobScheduler::new().await?;
            scheduler::start(&sched, gateway).await?;

            tokio::signal::ctrl_c().await?;
            logging::info_console("收到中斷訊號，停止排程".to_string());
            sched.shutdown().await?;
        }
    }

    Ok(())
}

fn snapshot_collector(gateway: &dyn Gateway) -> Result<MarketSnapshotCollector<'_>> {
    MarketSnapshotCollector::new(gateway, Path::new(&config::SETTINGS.collector.data_dir))
}

/// 快照與報價一次查詢全部代號，任一代號有誤就不送出
fn configured_or(codes: Option<&[String]>) -> Result<Vec<StockCode>> {
    let codes = collector::resolve_codes(codes, &config::SETTINGS.collector.stock_codes);
    StockCode::parse_list(&codes[..])
}

/// K 線與訂單有失敗時仍繼續，最後再回報
async fn run_once(gateway: &dyn Gateway, codes: Option<&[String]>) -> Result<()> {
    let kline = kline::execute(gateway, codes).await;
    let order = order::execute(gateway, codes).await;
    let prompt = prompt::execute(codes);

    kline.and(order).and(prompt)
}
