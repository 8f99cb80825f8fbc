use anyhow::Result;
use async_trait::async_trait;

use super::{
    connection::Connection,
    proto::{
        self, BasicQot, GetBasicQotS2C, GetKLC2S, GetKLS2C, GetSecuritySnapshotS2C, KLine,
        QotSubC2S, Security, SecurityListC2S, Snapshot,
    },
};
use crate::{
    broker::{
        model::{opt_decimal, KLineRow, QuoteRow, SnapshotRow},
        QuoteApi,
    },
    declare::{KLineType, RehabType, Session, StockCode, SubType},
};

/// OpenD 行情連線
pub struct FutuQuote {
    conn: Connection,
}

impl FutuQuote {
    pub fn new(conn: Connection) -> Self {
        FutuQuote { conn }
    }
}

fn security_list(codes: &[StockCode]) -> Vec<Security> {
    codes.iter().map(Security::from).collect()
}

#[async_trait]
impl QuoteApi for FutuQuote {
    async fn subscribe(
        &mut self,
        codes: &[StockCode],
        sub_types: &[SubType],
        push: bool,
        session: Option<Session>,
    ) -> Result<()> {
        let c2s = QotSubC2S {
            security_list: security_list(codes),
            sub_type_list: sub_types.iter().map(SubType::serial).collect(),
            is_sub_or_un_sub: true,
            is_reg_or_un_reg_push: push,
            session: session.map(|s| s.serial()),
        };

        self.conn.send(proto::QOT_SUB, &c2s).await?;
        Ok(())
    }

    async fn get_market_snapshot(&mut self, codes: &[StockCode]) -> Result<Vec<SnapshotRow>> {
        let mut rows = Vec::with_capacity(codes.len());

        for chunk in codes.chunks(proto::SNAPSHOT_MAX_CODES) {
            let c2s = SecurityListC2S {
                security_list: security_list(chunk),
            };
            let s2c: GetSecuritySnapshotS2C = self
                .conn
                .request(proto::QOT_GET_SECURITY_SNAPSHOT, &c2s)
                .await?;
            rows.extend(s2c.snapshot_list.iter().map(snapshot_row));
        }

        Ok(rows)
    }

    async fn get_stock_quote(&mut self, codes: &[StockCode]) -> Result<Vec<QuoteRow>> {
        let c2s = SecurityListC2S {
            security_list: security_list(codes),
        };
        let s2c: GetBasicQotS2C = self.conn.request(proto::QOT_GET_BASIC_QOT, &c2s).await?;

        Ok(s2c.basic_qot_list.iter().map(quote_row).collect())
    }

    async fn get_cur_kline(
        &mut self,
        code: &StockCode,
        num: u32,
        kl_type: KLineType,
        rehab: RehabType,
    ) -> Result<Vec<KLineRow>> {
        let c2s = GetKLC2S {
            rehab_type: rehab.serial(),
            kl_type: kl_type.serial(),
            security: Security::from(code),
            req_num: num.min(i32::MAX as u32) as i32,
        };
        let s2c: GetKLS2C = self.conn.request(proto::QOT_GET_KL, &c2s).await?;
        let code = s2c.security.display_code();
        let name = s2c.name.clone().unwrap_or_default();

        Ok(s2c
            .kl_list
            .iter()
            .map(|kl| kline_row(&code, &name, kl))
            .collect())
    }

    async fn close(&mut self) {
        self.conn.close().await;
    }
}

fn snapshot_row(snapshot: &Snapshot) -> SnapshotRow {
    let basic = &snapshot.basic;
    let mut row = SnapshotRow {
        code: basic.security.display_code(),
        name: basic.name.clone().unwrap_or_default(),
        update_time: basic.update_time.clone(),
        last_price: opt_decimal(basic.cur_price),
        open_price: opt_decimal(basic.open_price),
        high_price: opt_decimal(basic.high_price),
        low_price: opt_decimal(basic.low_price),
        prev_close_price: opt_decimal(basic.last_close_price),
        volume: basic.volume,
        turnover: opt_decimal(basic.turnover),
        turnover_rate: opt_decimal(basic.turnover_rate),
        suspension: basic.is_suspend,
        listing_date: basic.list_time.clone(),
        lot_size: basic.lot_size,
        price_spread: opt_decimal(basic.price_spread),
        ask_price: opt_decimal(basic.ask_price),
        bid_price: opt_decimal(basic.bid_price),
        ask_vol: basic.ask_vol,
        bid_vol: basic.bid_vol,
        amplitude: opt_decimal(basic.amplitude),
        avg_price: opt_decimal(basic.avg_price),
        bid_ask_ratio: opt_decimal(basic.bid_ask_ratio),
        volume_ratio: opt_decimal(basic.volume_ratio),
        highest52weeks_price: opt_decimal(basic.highest52_weeks_price),
        lowest52weeks_price: opt_decimal(basic.lowest52_weeks_price),
        ..Default::default()
    };

    if let Some(equity) = &snapshot.equity_ex_data {
        row.issued_shares = equity.issued_shares;
        row.total_market_val = opt_decimal(equity.issued_market_val);
        row.outstanding_shares = equity.outstanding_shares;
        row.circular_market_val = opt_decimal(equity.outstanding_market_val);
        row.net_asset_per_share = opt_decimal(equity.net_asset_pershare);
        row.earning_per_share = opt_decimal(equity.earnings_pershare);
        row.pe_ratio = opt_decimal(equity.pe_rate);
        row.pe_ttm_ratio = opt_decimal(equity.pe_ttm_rate);
        row.pb_ratio = opt_decimal(equity.pb_rate);
    }

    row
}

fn quote_row(qot: &BasicQot) -> QuoteRow {
    let (data_date, data_time) = match qot.update_time.as_deref() {
        Some(t) => match t.split_once(' ') {
            Some((d, tm)) => (Some(d.to_string()), Some(tm.to_string())),
            None => (Some(t.to_string()), None),
        },
        None => (None, None),
    };

    QuoteRow {
        code: qot.security.display_code(),
        name: qot.name.clone().unwrap_or_default(),
        data_date,
        data_time,
        last_price: opt_decimal(qot.cur_price),
        open_price: opt_decimal(qot.open_price),
        high_price: opt_decimal(qot.high_price),
        low_price: opt_decimal(qot.low_price),
        prev_close_price: opt_decimal(qot.last_close_price),
        volume: qot.volume,
        turnover: opt_decimal(qot.turnover),
        turnover_rate: opt_decimal(qot.turnover_rate),
        amplitude: opt_decimal(qot.amplitude),
        suspension: qot.is_suspended,
        listing_date: qot.list_time.clone(),
        price_spread: opt_decimal(qot.price_spread),
    }
}

fn kline_row(code: &str, name: &str, kl: &KLine) -> KLineRow {
    KLineRow {
        code: code.to_string(),
        name: name.to_string(),
        time_key: kl.time.clone(),
        open: opt_decimal(kl.open_price),
        close: opt_decimal(kl.close_price),
        high: opt_decimal(kl.high_price),
        low: opt_decimal(kl.low_price),
        pe_ratio: opt_decimal(kl.pe),
        turnover_rate: opt_decimal(kl.turnover_rate),
        volume: kl.volume,
        turnover: opt_decimal(kl.turnover),
        change_rate: opt_decimal(kl.change_rate),
        last_close: opt_decimal(kl.last_close_price),
    }
}
