use std::{
    path::{Path, PathBuf},
    slice,
    time::Duration,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};

use super::{configured_delay, pause, progress, resolve_codes, BatchSummary};
use crate::{
    broker::{model::KLineRow, Gateway, QuoteApi},
    config,
    declare::{KLineType, RehabType, Session, StockCode},
    logging, storage,
};

/// 依設定檔取得 K 線，`codes` 為 None 時使用設定檔中的股票
pub async fn execute(gateway: &dyn Gateway, codes: Option<&[String]>) -> Result<()> {
    let settings = &config::SETTINGS.collector;
    let codes = resolve_codes(codes, &settings.stock_codes);

    get_all_stocks_kline(
        gateway,
        &codes,
        settings.kline_num,
        configured_delay(),
        Path::new(&settings.data_dir),
        Local::now(),
    )
    .await
    .into_result()
}

/// 取得單一股票最近 `num` 根 K 線，每次都開新的行情連線並在結束時關閉
pub async fn get_stock_kline(
    gateway: &dyn Gateway,
    code: &StockCode,
    num: u32,
    kl_type: KLineType,
    rehab: RehabType,
) -> Result<Vec<KLineRow>> {
    let mut quote = gateway
        .open_quote()
        .await
        .map_err(|why| anyhow!("請求異常: {}", why))?;

    let result = fetch(quote.as_mut(), code, num, kl_type, rehab).await;
    quote.close().await;

    result
}

async fn fetch(
    quote: &mut dyn QuoteApi,
    code: &StockCode,
    num: u32,
    kl_type: KLineType,
    rehab: RehabType,
) -> Result<Vec<KLineRow>> {
    quote
        .subscribe(
            slice::from_ref(code),
            &[kl_type.sub_type()],
            false,
            Some(Session::All),
        )
        .await
        .map_err(|why| anyhow!("訂閱失敗: {}", why))?;

    quote
        .get_cur_kline(code, num, kl_type, rehab)
        .await
        .map_err(|why| anyhow!("獲取K線數據失敗: {}", why))
}

/// 寫入 `data_dir/<市場>/<年月>/<代號>_<yymmdd>.jsonl`
pub fn save_kline_data(
    code: &StockCode,
    rows: &[KLineRow],
    data_dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let path = storage::kline_path(data_dir, code, now);
    let count = storage::write_jsonl(&path, rows)?;

    logging::info_console(format!("✓ {} K線數據已保存到: {}", code, path.display()));
    logging::info_file_async(format!(
        "{} saved {} klines to {}",
        code,
        count,
        path.display()
    ));

    Ok(path)
}

/// 依序取得所有股票的日 K(前復權)並存檔，代號格式錯誤的記為失敗後繼續
pub async fn get_all_stocks_kline(
    gateway: &dyn Gateway,
    codes: &[String],
    num: u32,
    delay: Duration,
    data_dir: &Path,
    now: DateTime<Local>,
) -> BatchSummary {
    let total = codes.len();
    let mut summary = BatchSummary::new(total);

    logging::info_console(format!("開始獲取 {} 只股票的K線數據...", total));
    logging::info_console("=".repeat(50));

    for (i, code) in codes.iter().enumerate() {
        progress(i, total, code);

        let saved = match code.parse::<StockCode>() {
            Ok(code) => collect_one(gateway, &code, num, data_dir, now).await,
            Err(why) => Err(why),
        };

        match saved {
            Ok(_) => summary.success(),
            Err(why) => summary.failure(code, why.to_string()),
        }

        pause(i, total, delay).await;
    }

    summary.print();
    summary
}

async fn collect_one(
    gateway: &dyn Gateway,
    code: &StockCode,
    num: u32,
    data_dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let rows = get_stock_kline(gateway, code, num, KLineType::KDay, RehabType::Qfq).await?;
    save_kline_data(code, &rows, data_dir, now)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::collector::fakes::FakeGateway;

    fn row(code: &str, time_key: &str) -> KLineRow {
        KLineRow {
            code: code.to_string(),
            name: "騰訊控股".to_string(),
            time_key: time_key.to_string(),
            close: Some(dec!(512.5)),
            volume: Some(1200),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 10, 19, 9, 0, 0).unwrap()
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_stock_kline_subscribes_then_closes() {
        let mut gw = FakeGateway::default();
        gw.klines
            .insert("HK.00700".to_string(), vec![row("HK.00700", "2025-10-17 00:00:00")]);

        let code: StockCode = "HK.00700".parse().unwrap();
        let rows = get_stock_kline(&gw, &code, 64, KLineType::K15m, RehabType::Qfq)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            gw.calls(),
            vec![
                "open_quote".to_string(),
                "subscribe HK.00700 K_15M push=false session=Some(All)".to_string(),
                "kline HK.00700 64 K_15M QFQ".to_string(),
                "close".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_stock_kline_failures_are_labelled() {
        let code: StockCode = "HK.00700".parse().unwrap();

        let gw = FakeGateway {
            fail_subscribe: true,
            ..Default::default()
        };
        let err = get_stock_kline(&gw, &code, 64, KLineType::KDay, RehabType::Qfq)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("訂閱失敗"), "{}", err);
        assert_eq!(gw.calls().last().map(String::as_str), Some("close"));

        let gw = FakeGateway::default();
        let err = get_stock_kline(&gw, &code, 64, KLineType::KDay, RehabType::Qfq)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("獲取K線數據失敗"), "{}", err);
        assert_eq!(gw.calls().last().map(String::as_str), Some("close"));

        let gw = FakeGateway {
            fail_open: true,
            ..Default::default()
        };
        let err = get_stock_kline(&gw, &code, 64, KLineType::KDay, RehabType::Qfq)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("請求異常"), "{}", err);
    }

    #[tokio::test]
    async fn test_get_all_stocks_kline_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut gw = FakeGateway::default();
        gw.klines.insert(
            "HK.00700".to_string(),
            vec![
                row("HK.00700", "2025-10-16 00:00:00"),
                row("HK.00700", "2025-10-17 00:00:00"),
            ],
        );
        gw.klines
            .insert("US.AAPL".to_string(), vec![row("US.AAPL", "2025-10-17 00:00:00")]);

        let codes = codes(&["HK.00700", "HK.09988", "US.AAPL"]);
        let summary =
            get_all_stocks_kline(&gw, &codes, 64, Duration::ZERO, dir.path(), now()).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "HK.09988");

        let hk = fs::read_to_string(dir.path().join("HK/202510/HK.00700_251019.jsonl")).unwrap();
        assert_eq!(hk.lines().count(), 2);
        assert!(hk.starts_with("{\"code\":\"HK.00700\",\"name\":\"騰訊控股\",\"time_key\":\"2025-10-16 00:00:00\""));
        assert!(dir.path().join("US/202510/US.AAPL_251019.jsonl").exists());
        assert!(!dir.path().join("HK/202510/HK.09988_251019.jsonl").exists());
    }

    #[tokio::test]
    async fn test_malformed_code_only_fails_itself() {
        let dir = tempfile::tempdir().unwrap();
        let mut gw = FakeGateway::default();
        gw.klines
            .insert("HK.00700".to_string(), vec![row("HK.00700", "2025-10-17 00:00:00")]);
        gw.klines
            .insert("HK.09988".to_string(), vec![row("HK.09988", "2025-10-17 00:00:00")]);

        let codes = codes(&["HK.00700", "HK00700X", "HK.09988"]);
        let summary =
            get_all_stocks_kline(&gw, &codes, 64, Duration::ZERO, dir.path(), now()).await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "HK00700X");
        assert!(summary.failed[0].1.contains("MARKET.CODE"), "{}", summary.failed[0].1);
        assert!(dir.path().join("HK/202510/HK.00700_251019.jsonl").exists());
        assert!(dir.path().join("HK/202510/HK.09988_251019.jsonl").exists());
        assert_eq!(
            gw.calls().iter().filter(|c| c.as_str() == "open_quote").count(),
            2
        );
    }
}
