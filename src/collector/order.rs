use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};

use super::{configured_delay, pause, progress, resolve_codes, BatchSummary};
use crate::{
    broker::{
        model::{Order, OrderRow},
        Gateway,
    },
    config,
    declare::StockCode,
    logging, storage,
    util::datetime,
};

/// 依設定檔取得歷史訂單，`codes` 為 None 時使用設定檔中的股票
pub async fn execute(gateway: &dyn Gateway, codes: Option<&[String]>) -> Result<()> {
    let settings = &config::SETTINGS;
    let codes = resolve_codes(codes, &settings.order.stock_codes);

    get_all_orders(
        gateway,
        &codes,
        settings.order.days,
        configured_delay(),
        Path::new(&settings.collector.data_dir),
        Local::now(),
    )
    .await
    .into_result()
}

/// 查詢最近 `days` 天的歷史訂單並寫入訂單檔
pub async fn get_order_data(
    gateway: &dyn Gateway,
    code: &StockCode,
    days: i64,
    data_dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let (start, end) = datetime::lookback_window(now.date_naive(), days);
    let mut trade = gateway.open_trade(code.market.trade_market()).await?;

    let result = trade.history_order_list_query(code, start, end).await;
    trade.close().await;

    let orders = result.map_err(|why| anyhow!("history_order_list_query error: {}", why))?;
    save_order_data(code, &orders, data_dir, now)
}

/// 只保留 create_time, code, trd_side, price, qty, order_status
pub fn save_order_data(
    code: &StockCode,
    orders: &[Order],
    data_dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let rows: Vec<OrderRow> = orders.iter().map(OrderRow::kept).collect();
    let path = storage::order_path(data_dir, code, now);
    storage::write_jsonl(&path, &rows)?;

    logging::info_console(format!("✓ {} 訂單數據已保存到: {}", code, path.display()));

    Ok(path)
}

/// 讀回訂單檔的原始內容，檔案不存在時回傳 None
pub fn load_order_data(code: &StockCode, data_dir: &Path, now: DateTime<Local>) -> Option<String> {
    let path = storage::order_path(data_dir, code, now);
    logging::info_console(format!("加載訂單數據文件: {}", path.display()));

    match fs::read_to_string(&path) {
        Ok(content) => Some(content),
        Err(why) => {
            logging::info_console(format!(
                "訂單數據文件不存在: {} ({})",
                path.display(),
                why
            ));
            None
        }
    }
}

/// 依序查詢每檔的歷史訂單，代號格式錯誤的記為失敗後繼續
pub async fn get_all_orders(
    gateway: &dyn Gateway,
    codes: &[String],
    days: i64,
    delay: Duration,
    data_dir: &Path,
    now: DateTime<Local>,
) -> BatchSummary {
    let total = codes.len();
    let mut summary = BatchSummary::new(total);

    logging::info_console(format!("開始獲取 {} 只股票 {} 天的訂單數據...", total, days));

    for (i, code) in codes.iter().enumerate() {
        progress(i, total, code);

        let saved = match code.parse::<StockCode>() {
            Ok(code) => get_order_data(gateway, &code, days, data_dir, now).await,
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

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        collector::fakes::FakeGateway,
        declare::{OrderStatus, TrdSide},
    };

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 10, 17, 20, 0, 0).unwrap()
    }

    fn order(code: &str, create_time: &str, side: TrdSide) -> Order {
        Order {
            code: code.to_string(),
            name: "騰訊控股".to_string(),
            order_id: "1".to_string(),
            order_type: 1,
            trd_side: side,
            order_status: OrderStatus::FilledAll,
            qty: dec!(100),
            price: dec!(512.5),
            create_time: create_time.to_string(),
            updated_time: create_time.to_string(),
            dealt_qty: Some(dec!(100)),
            dealt_avg_price: Some(dec!(512.5)),
            last_err_msg: None,
        }
    }

    #[tokio::test]
    async fn test_get_order_data_writes_kept_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut gw = FakeGateway::default();
        gw.orders.insert(
            "HK.00700".to_string(),
            vec![
                order("HK.00700", "2025-10-16 09:31:00.120", TrdSide::Buy),
                order("HK.00700", "2025-10-17 15:59:58", TrdSide::Sell),
            ],
        );

        let code: StockCode = "HK.00700".parse().unwrap();
        let path = get_order_data(&gw, &code, 60, dir.path(), now())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("HK/202510/HK.00700_order.jsonl"));
        assert_eq!(
            gw.calls(),
            vec![
                "open_trade HK".to_string(),
                "orders HK.00700 2025-08-18 2025-10-17".to_string(),
                "close".to_string(),
            ]
        );

        let content = load_order_data(&code, dir.path(), now()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"create_time":"2025-10-16","code":"HK.00700","trd_side":"BUY","price":512.5,"qty":100.0,"order_status":"FILLED_ALL"}"#,
                r#"{"create_time":"2025-10-17","code":"HK.00700","trd_side":"SELL","price":512.5,"qty":100.0,"order_status":"FILLED_ALL"}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_cn_codes_use_cn_trade_market() {
        let dir = tempfile::tempdir().unwrap();
        let mut gw = FakeGateway::default();
        gw.orders.insert("SH.600519".to_string(), vec![]);

        let code: StockCode = "SH.600519".parse().unwrap();
        get_order_data(&gw, &code, 1, dir.path(), now())
            .await
            .unwrap();

        assert_eq!(gw.calls()[0], "open_trade CN");
        let content = load_order_data(&code, dir.path(), now()).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_load_order_data_missing() {
        let dir = tempfile::tempdir().unwrap();
        let code: StockCode = "HK.09988".parse().unwrap();
        assert!(load_order_data(&code, dir.path(), now()).is_none());
    }

    #[tokio::test]
    async fn test_get_all_orders_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut gw = FakeGateway::default();
        gw.orders.insert(
            "HK.00700".to_string(),
            vec![order("HK.00700", "2025-10-16 09:31:00", TrdSide::Buy)],
        );

        let codes: Vec<String> = ["HK.00700", "00700", "HK.09988"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let summary = get_all_orders(&gw, &codes, 60, Duration::ZERO, dir.path(), now()).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.failed[0].0, "00700");
        assert_eq!(summary.failed[1].0, "HK.09988");
        assert!(summary.failed[1].1.contains("沒有權限"));
        assert_eq!(
            gw.calls().iter().filter(|c| c.as_str() == "close").count(),
            2
        );
    }
}
