use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::declare::{KLineType, RehabType, Session, StockCode, SubType, TrdMarket};

/// 富途 OpenD
pub mod futu;
/// 寫入檔案的資料列
pub mod model;

use model::{KLineRow, Order, QuoteRow, SnapshotRow};

/// 行情連線
#[async_trait]
pub trait QuoteApi: Send {
    /// 訂閱行情，`push` 為 false 時 OpenD 不會推送給本程式
    async fn subscribe(
        &mut self,
        codes: &[StockCode],
        sub_types: &[SubType],
        push: bool,
        session: Option<Session>,
    ) -> Result<()>;

    async fn get_market_snapshot(&mut self, codes: &[StockCode]) -> Result<Vec<SnapshotRow>>;

    /// 需先訂閱 QUOTE
    async fn get_stock_quote(&mut self, codes: &[StockCode]) -> Result<Vec<QuoteRow>>;

    /// 取得最近 `num` 根 K 線，需先訂閱對應的 K 線類型
    async fn get_cur_kline(
        &mut self,
        code: &StockCode,
        num: u32,
        kl_type: KLineType,
        rehab: RehabType,
    ) -> Result<Vec<KLineRow>>;

    async fn close(&mut self);
}

/// 交易連線
#[async_trait]
pub trait TradeApi: Send {
    /// 查詢 `start`~`end`(含)之間的歷史訂單
    async fn history_order_list_query(
        &mut self,
        code: &StockCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>>;

    async fn close(&mut self);
}

/// 開啟行情與交易連線的入口
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn open_quote(&self) -> Result<Box<dyn QuoteApi>>;

    async fn open_trade(&self, market: TrdMarket) -> Result<Box<dyn TradeApi>>;
}
