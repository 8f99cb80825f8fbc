use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::{Deserialize, Serialize};

use crate::{
    declare::{OrderStatus, TrdSide},
    util::datetime,
};

/// 把 OpenD 回傳的浮點數轉成 Decimal，NaN/Inf 視為沒有值
pub fn to_decimal(v: f64) -> Option<Decimal> {
    Decimal::from_f64(v).map(|d| d.normalize())
}

pub fn opt_decimal(v: Option<f64>) -> Option<Decimal> {
    v.and_then(to_decimal)
}

/// 市場快照
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SnapshotRow {
    pub code: String,
    pub name: String,
    pub update_time: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub last_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub open_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub high_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub low_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub prev_close_price: Option<Decimal>,
    pub volume: Option<i64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub turnover: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub turnover_rate: Option<Decimal>,
    pub suspension: Option<bool>,
    pub listing_date: Option<String>,
    pub lot_size: Option<i32>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price_spread: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub ask_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub bid_price: Option<Decimal>,
    pub ask_vol: Option<i64>,
    pub bid_vol: Option<i64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amplitude: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub avg_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub bid_ask_ratio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub volume_ratio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub highest52weeks_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub lowest52weeks_price: Option<Decimal>,
    pub issued_shares: Option<i64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_market_val: Option<Decimal>,
    pub outstanding_shares: Option<i64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub circular_market_val: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub net_asset_per_share: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub earning_per_share: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub pe_ratio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub pe_ttm_ratio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub pb_ratio: Option<Decimal>,
}

/// 即時報價
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct QuoteRow {
    pub code: String,
    pub name: String,
    pub data_date: Option<String>,
    pub data_time: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub last_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub open_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub high_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub low_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub prev_close_price: Option<Decimal>,
    pub volume: Option<i64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub turnover: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub turnover_rate: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amplitude: Option<Decimal>,
    pub suspension: Option<bool>,
    pub listing_date: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price_spread: Option<Decimal>,
}

/// K 線
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct KLineRow {
    pub code: String,
    pub name: String,
    pub time_key: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub open: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub close: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub high: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub low: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub pe_ratio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub turnover_rate: Option<Decimal>,
    pub volume: Option<i64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub turnover: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub change_rate: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub last_close: Option<Decimal>,
}

/// 歷史訂單，OpenD 回傳的完整欄位
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub code: String,
    pub name: String,
    pub order_id: String,
    pub order_type: i32,
    pub trd_side: TrdSide,
    pub order_status: OrderStatus,
    pub qty: Decimal,
    pub price: Decimal,
    pub create_time: String,
    pub updated_time: String,
    pub dealt_qty: Option<Decimal>,
    pub dealt_avg_price: Option<Decimal>,
    pub last_err_msg: Option<String>,
}

/// 寫入檔案時保留的訂單欄位
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderRow {
    /// YYYY-MM-DD
    pub create_time: String,
    pub code: String,
    pub trd_side: TrdSide,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub qty: Decimal,
    pub order_status: OrderStatus,
}

impl OrderRow {
    pub fn kept(order: &Order) -> Self {
        let create_time = datetime::parse_leading_date(&order.create_time)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| order.create_time.clone());

        OrderRow {
            create_time,
            code: order.code.clone(),
            trd_side: order.trd_side,
            price: order.price,
            qty: order.qty,
            order_status: order.order_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn order() -> Order {
        Order {
            code: "HK.00700".to_string(),
            name: "騰訊控股".to_string(),
            order_id: "1234".to_string(),
            order_type: 1,
            trd_side: TrdSide::Buy,
            order_status: OrderStatus::FilledAll,
            qty: dec!(100),
            price: dec!(512.5),
            create_time: "2025-10-17 09:30:01.123".to_string(),
            updated_time: "2025-10-17 09:30:02".to_string(),
            dealt_qty: Some(dec!(100)),
            dealt_avg_price: Some(dec!(512.5)),
            last_err_msg: None,
        }
    }

    #[test]
    fn test_order_row_keeps_documented_columns() {
        let row = OrderRow::kept(&order());
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"{"create_time":"2025-10-17","code":"HK.00700","trd_side":"BUY","price":512.5,"qty":100.0,"order_status":"FILLED_ALL"}"#
        );
    }

    #[test]
    fn test_kline_row_writes_null_for_missing_values() {
        let row = KLineRow {
            code: "HK.00700".to_string(),
            name: "騰訊控股".to_string(),
            time_key: "2025-10-17 00:00:00".to_string(),
            close: to_decimal(512.5),
            ..Default::default()
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["close"], serde_json::json!(512.5));
        assert!(value["pe_ratio"].is_null());
        assert_eq!(value["name"], "騰訊控股");
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal(0.1), Some(dec!(0.1)));
        assert_eq!(to_decimal(f64::NAN), None);
        assert_eq!(opt_decimal(None), None);
    }
}
