use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    connection::Connection,
    error::{FutuError, FutuResult},
    proto::{
        self, GetAccListC2S, GetAccListS2C, GetHistoryOrderListC2S, GetHistoryOrderListS2C,
        TrdAcc, TrdFilterConditions, TrdHeader, WireOrder,
    },
};
use crate::{
    broker::{
        model::{opt_decimal, to_decimal, Order},
        TradeApi,
    },
    declare::{OrderStatus, SecurityFirm, StockCode, TrdEnv, TrdMarket, TrdSide},
    logging,
    util::datetime,
};

/// OpenD 交易連線，綁定單一帳戶
pub struct FutuTrade {
    conn: Connection,
    header: TrdHeader,
}

impl FutuTrade {
    /// 取回帳戶列表並挑出要使用的帳戶
    pub async fn open(
        conn: Connection,
        market: TrdMarket,
        env: TrdEnv,
        firm: SecurityFirm,
        acc_id: u64,
    ) -> FutuResult<Self> {
        let c2s = GetAccListC2S {
            user_id: conn.login_user_id,
        };
        let s2c: GetAccListS2C = conn.request(proto::TRD_GET_ACC_LIST, &c2s).await?;
        let header = select_account(&s2c.acc_list, market, env, firm, acc_id)?;

        logging::info_file_async(format!(
            "使用交易帳戶 accID={} market={} trdEnv={}",
            header.acc_id, market, header.trd_env
        ));

        Ok(FutuTrade { conn, header })
    }
}

/// `acc_id` 不為 0 時必須完全相符，否則取第一個環境、市場權限與券商都相符的帳戶
pub fn select_account(
    accounts: &[TrdAcc],
    market: TrdMarket,
    env: TrdEnv,
    firm: SecurityFirm,
    acc_id: u64,
) -> FutuResult<TrdHeader> {
    let found = accounts.iter().find(|acc| {
        if acc_id != 0 {
            return acc.acc_id == Some(acc_id);
        }

        acc.acc_id.is_some()
            && acc.trd_env == env.serial()
            && acc.trd_market_auth_list.contains(&market.serial())
            && acc.security_firm.map_or(true, |f| f == firm.serial())
    });

    // 指定帳戶時以帳戶本身的環境為準
    match found.and_then(|acc| acc.acc_id.map(|id| (id, acc.trd_env))) {
        Some((id, trd_env)) => Ok(TrdHeader {
            trd_env,
            acc_id: id,
            trd_market: market.serial(),
        }),
        None => Err(FutuError::NoAccount(format!(
            "market={} env={} firm={} accID={}",
            market, env, firm, acc_id
        ))),
    }
}

fn to_order(code: &StockCode, w: &WireOrder) -> Order {
    Order {
        code: format!("{}.{}", code.market, w.code),
        name: w.name.clone().unwrap_or_default(),
        order_id: w.order_id.map(|id| id.to_string()).unwrap_or_default(),
        order_type: w.order_type,
        trd_side: TrdSide::from_serial(w.trd_side),
        order_status: OrderStatus::from_serial(w.order_status),
        qty: to_decimal(w.qty).unwrap_or_default(),
        price: opt_decimal(w.price).unwrap_or_default(),
        create_time: w.create_time.clone(),
        updated_time: w.update_time.clone(),
        dealt_qty: opt_decimal(w.fill_qty),
        dealt_avg_price: opt_decimal(w.fill_avg_price),
        last_err_msg: w.last_err_msg.clone().filter(|m| !m.is_empty()),
    }
}

#[async_trait]
impl TradeApi for FutuTrade {
    async fn history_order_list_query(
        &mut self,
        code: &StockCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>> {
        let c2s = GetHistoryOrderListC2S {
            header: self.header.clone(),
            filter_conditions: TrdFilterConditions {
                code_list: vec![code.code.clone()],
                begin_time: datetime::begin_of_day(start),
                end_time: datetime::end_of_day(end),
            },
        };
        let s2c: GetHistoryOrderListS2C = self
            .conn
            .request(proto::TRD_GET_HISTORY_ORDER_LIST, &c2s)
            .await?;

        Ok(s2c.order_list.iter().map(|w| to_order(code, w)).collect())
    }

    async fn close(&mut self) {
        self.conn.close().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::{broker::futu::fake_opend::FakeOpenD, declare::Market};

    fn acc(id: u64, env: i32, markets: Vec<i32>, firm: Option<i32>) -> TrdAcc {
        TrdAcc {
            trd_env: env,
            acc_id: Some(id),
            trd_market_auth_list: markets,
            security_firm: firm,
        }
    }

    #[test]
    fn test_select_account_by_market_and_env() {
        let accounts = vec![
            acc(1, 0, vec![1], None),
            acc(2, 1, vec![2], Some(1)),
            acc(3, 1, vec![1, 2], Some(2)),
            acc(4, 1, vec![1], Some(1)),
        ];

        let header = select_account(
            &accounts,
            TrdMarket::HK,
            TrdEnv::Real,
            SecurityFirm::FutuSecurities,
            0,
        )
        .unwrap();
        assert_eq!(header.acc_id, 4);
        assert_eq!(header.trd_env, 1);
        assert_eq!(header.trd_market, 1);

        let header = select_account(
            &accounts,
            TrdMarket::HK,
            TrdEnv::Simulate,
            SecurityFirm::FutuSecurities,
            0,
        )
        .unwrap();
        assert_eq!(header.acc_id, 1);
    }

    #[test]
    fn test_select_account_explicit_id() {
        let accounts = vec![acc(7, 1, vec![1], Some(1)), acc(8, 1, vec![1], Some(1))];

        let header = select_account(
            &accounts,
            TrdMarket::HK,
            TrdEnv::Real,
            SecurityFirm::FutuSecurities,
            8,
        )
        .unwrap();
        assert_eq!(header.acc_id, 8);

        let missing = select_account(
            &accounts,
            TrdMarket::HK,
            TrdEnv::Real,
            SecurityFirm::FutuSecurities,
            9,
        );
        assert!(matches!(missing, Err(FutuError::NoAccount(_))));
    }

    #[test]
    fn test_explicit_simulate_account_keeps_its_env() {
        let accounts = vec![acc(7, 1, vec![1], Some(1)), acc(9, 0, vec![1], None)];

        let header = select_account(
            &accounts,
            TrdMarket::HK,
            TrdEnv::Real,
            SecurityFirm::FutuSecurities,
            9,
        )
        .unwrap();
        assert_eq!(header.acc_id, 9);
        assert_eq!(header.trd_env, TrdEnv::Simulate.serial());
    }

    #[test]
    fn test_select_account_none_matches() {
        let accounts = vec![acc(1, 1, vec![2], Some(1))];
        let result = select_account(
            &accounts,
            TrdMarket::CN,
            TrdEnv::Real,
            SecurityFirm::FutuSecurities,
            0,
        );
        assert!(matches!(result, Err(FutuError::NoAccount(_))));
    }

    #[tokio::test]
    async fn test_history_order_list_query() {
        let server = FakeOpenD::start(|proto_id, req| match proto_id {
            proto::TRD_GET_ACC_LIST => json!({"retType": 0, "s2c": {"accList": [
                {"trdEnv": 1, "accID": "281756479345015383", "trdMarketAuthList": [1], "securityFirm": 1}
            ]}}),
            proto::TRD_GET_HISTORY_ORDER_LIST => {
                let c2s = &req["c2s"];
                assert_eq!(c2s["header"]["accID"], json!(281756479345015383u64));
                assert_eq!(c2s["filterConditions"]["codeList"], json!(["00700"]));
                assert_eq!(c2s["filterConditions"]["beginTime"], json!("2025-08-18 00:00:00"));
                assert_eq!(c2s["filterConditions"]["endTime"], json!("2025-10-17 23:59:59"));
                json!({"retType": 0, "s2c": {"header": c2s["header"].clone(), "orderList": [
                    {"trdSide": 1, "orderType": 1, "orderStatus": 11, "orderID": "6644468615272262086",
                     "code": "00700", "name": "騰訊控股", "qty": 100.0, "price": 512.5,
                     "createTime": "2025-10-17 10:01:02.345", "updateTime": "2025-10-17 10:01:03",
                     "fillQty": 100.0, "fillAvgPrice": 512.5, "lastErrMsg": ""}
                ]}})
            }
            _ => json!({"retType": -1, "retMsg": "unexpected"}),
        })
        .await;

        let conn = Connection::connect("127.0.0.1", server.port, "test", Duration::from_secs(3))
            .await
            .unwrap();
        let mut trade = FutuTrade::open(
            conn,
            TrdMarket::HK,
            TrdEnv::Real,
            SecurityFirm::FutuSecurities,
            0,
        )
        .await
        .unwrap();

        let code = StockCode::new(Market::HK, "00700");
        let start = NaiveDate::from_ymd_opt(2025, 8, 18).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 10, 17).unwrap();
        let orders = trade
            .history_order_list_query(&code, start, end)
            .await
            .unwrap();
        trade.close().await;

        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.code, "HK.00700");
        assert_eq!(order.order_id, "6644468615272262086");
        assert_eq!(order.trd_side, TrdSide::Buy);
        assert_eq!(order.order_status, OrderStatus::FilledAll);
        assert_eq!(order.price, dec!(512.5));
        assert_eq!(order.qty, dec!(100));
        assert_eq!(order.last_err_msg, None);
    }
}
