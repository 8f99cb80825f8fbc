use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    broker::{
        model::{QuoteRow, SnapshotRow},
        Gateway,
    },
    config,
    declare::{StockCode, SubType},
    logging, storage,
};

const SNAPSHOT_FILE: &str = "market_snapshot";
const QUOTE_FILE: &str = "futu_stock_quote";

/// 市場快照與即時報價收集器，檔案寫在 `output_dir` 下
pub struct MarketSnapshotCollector<'a> {
    gateway: &'a dyn Gateway,
    output_dir: PathBuf,
}

impl<'a> MarketSnapshotCollector<'a> {
    pub fn new(gateway: &'a dyn Gateway, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
            logging::info_file_async(format!("建立輸出目錄: {}", output_dir.display()));
        }

        Ok(MarketSnapshotCollector {
            gateway,
            output_dir,
        })
    }

    /// 取得快照並存檔，任何失敗都記錄後回傳 None
    pub async fn get_market_snapshot(
        &self,
        codes: Option<&[StockCode]>,
        custom_name: Option<&str>,
        now: DateTime<Local>,
    ) -> Option<Vec<SnapshotRow>> {
        let codes = resolve_codes(codes)?;
        logging::info_file_async(format!("開始獲取市場快照數據，股票數量: {}", codes.len()));

        let mut quote = match self.gateway.open_quote().await {
            Ok(quote) => quote,
            Err(why) => {
                logging::error_file_async(format!("連接 FuTu OpenD 失敗: {:?}", why));
                return None;
            }
        };

        let result = quote.get_market_snapshot(&codes).await;
        quote.close().await;

        let rows = match result {
            Ok(rows) => rows,
            Err(why) => {
                logging::error_file_async(format!("獲取市場快照失敗: {:?}", why));
                return None;
            }
        };
        logging::info_file_async(format!("成功獲取{}只股票的快照數據", rows.len()));

        let path = storage::timestamped_path(
            &self.output_dir,
            custom_name.unwrap_or(SNAPSHOT_FILE),
            now,
        );
        self.save(&path, &rows).then_some(rows)
    }

    /// 訂閱 QUOTE(不推送)後取得報價並存檔
    pub async fn get_stock_quotes(
        &self,
        codes: Option<&[StockCode]>,
        custom_name: Option<&str>,
        now: DateTime<Local>,
    ) -> Option<Vec<QuoteRow>> {
        let codes = resolve_codes(codes)?;
        logging::info_file_async(format!("開始獲取股票報價數據，股票數量: {}", codes.len()));

        let mut quote = match self.gateway.open_quote().await {
            Ok(quote) => quote,
            Err(why) => {
                logging::error_file_async(format!("連接 FuTu OpenD 失敗: {:?}", why));
                return None;
            }
        };

        let result = match quote.subscribe(&codes, &[SubType::Quote], false, None).await {
            Ok(_) => quote.get_stock_quote(&codes).await.map_err(|why| {
                logging::error_file_async(format!("獲取股票報價失敗: {:?}", why));
            }),
            Err(why) => {
                logging::error_file_async(format!("訂閱失敗: {:?}", why));
                Err(())
            }
        };
        quote.close().await;

        let rows = result.ok()?;
        logging::info_file_async(format!("成功獲取{}只股票的報價數據", rows.len()));

        let path =
            storage::timestamped_path(&self.output_dir, custom_name.unwrap_or(QUOTE_FILE), now);
        self.save(&path, &rows).then_some(rows)
    }

    fn save<T: Serialize>(&self, path: &Path, rows: &[T]) -> bool {
        match storage::write_jsonl(path, rows) {
            Ok(count) => {
                logging::info_file_async(format!(
                    "數據已保存到: {} (共{}條記錄)",
                    path.display(),
                    count
                ));
                true
            }
            Err(why) => {
                logging::error_file_async(format!(
                    "保存文件失敗 {}: {:?}",
                    path.display(),
                    why
                ));
                false
            }
        }
    }
}

/// 沒有指定時使用設定檔中的股票清單
fn resolve_codes(codes: Option<&[StockCode]>) -> Option<Vec<StockCode>> {
    if let Some(codes) = codes {
        return Some(codes.to_vec());
    }

    let configured = super::resolve_codes(None, &config::SETTINGS.collector.stock_codes);
    StockCode::parse_list(&configured[..])
        .map_err(|why| logging::error_file_async(format!("設定檔中的股票代號有誤: {:?}", why)))
        .ok()
}

fn cell(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// 關鍵欄位的預覽表格
pub fn preview(rows: &[SnapshotRow]) -> String {
    let header = ["code", "name", "last_price", "volume", "turnover"];
    let mut table: Vec<[String; 5]> = vec![header.map(str::to_string)];

    for row in rows {
        table.push([
            row.code.clone(),
            row.name.clone(),
            cell(row.last_price),
            row.volume
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            cell(row.turnover),
        ]);
    }

    let mut widths = [0usize; 5];
    for line in &table {
        for (w, text) in widths.iter_mut().zip(line.iter()) {
            *w = (*w).max(text.chars().count());
        }
    }

    table
        .iter()
        .map(|line| {
            line.iter()
                .zip(widths.iter())
                .map(|(text, w)| format!("{:>width$}", text, width = w))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::collector::fakes::FakeGateway;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 10, 17, 16, 10, 0).unwrap()
    }

    fn snapshot(code: &str, price: Decimal) -> SnapshotRow {
        SnapshotRow {
            code: code.to_string(),
            name: "TENCENT".to_string(),
            last_price: Some(price),
            volume: Some(21_345_000),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_market_snapshot_writes_hourly_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("data");
        let gw = FakeGateway {
            snapshots: vec![snapshot("HK.00700", dec!(512.5))],
            ..Default::default()
        };

        let collector = MarketSnapshotCollector::new(&gw, &out).unwrap();
        assert!(out.is_dir());

        let rows = collector.get_market_snapshot(None, None, now()).await.unwrap();
        assert_eq!(rows.len(), 1);
        let configured = config::SETTINGS.collector.stock_codes.len();
        assert_eq!(
            gw.calls(),
            vec![
                "open_quote".to_string(),
                format!("snapshot {}", configured),
                "close".to_string()
            ]
        );

        let content = fs::read_to_string(out.join("market_snapshot_2025101716.jsonl")).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(line["code"], "HK.00700");
        assert_eq!(line["last_price"], 512.5);
        assert!(line["turnover"].is_null());
    }

    #[tokio::test]
    async fn test_get_stock_quotes_custom_name() {
        let dir = tempfile::tempdir().unwrap();
        let gw = FakeGateway {
            quotes: vec![QuoteRow {
                code: "US.AAPL".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let codes = StockCode::parse_list(&["US.AAPL"]).unwrap();
        let collector = MarketSnapshotCollector::new(&gw, dir.path()).unwrap();
        let rows = collector
            .get_stock_quotes(Some(&codes), Some("us_quote"), now())
            .await
            .unwrap();

        assert_eq!(rows[0].code, "US.AAPL");
        assert_eq!(gw.calls()[1], "subscribe US.AAPL QUOTE push=false session=None");
        assert!(dir.path().join("us_quote_2025101716.jsonl").exists());
    }

    #[tokio::test]
    async fn test_failures_return_none() {
        let dir = tempfile::tempdir().unwrap();

        let gw = FakeGateway {
            fail_subscribe: true,
            ..Default::default()
        };
        let collector = MarketSnapshotCollector::new(&gw, dir.path()).unwrap();
        assert!(collector.get_stock_quotes(None, None, now()).await.is_none());
        assert_eq!(gw.calls().last().map(String::as_str), Some("close"));

        let gw = FakeGateway {
            fail_open: true,
            ..Default::default()
        };
        let collector = MarketSnapshotCollector::new(&gw, dir.path()).unwrap();
        assert!(collector.get_market_snapshot(None, None, now()).await.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_preview() {
        let rows = vec![
            snapshot("HK.00700", dec!(512.5)),
            SnapshotRow {
                code: "HK.09988".to_string(),
                name: "BABA-W".to_string(),
                ..Default::default()
            },
        ];

        let table = preview(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "    code     name  last_price    volume  turnover"
        );
        assert_eq!(
            lines[1],
            "HK.00700  TENCENT       512.5  21345000         -"
        );
        assert_eq!(
            lines[2],
            "HK.09988   BABA-W           -         -         -"
        );
    }
}
