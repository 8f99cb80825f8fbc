//! OpenD JSON 協議的請求與回應結構
//!
//! 欄位名稱與 OpenD 的 proto 定義一致；proto2 的欄位都可能缺席，所以回應一律用 Option。

use serde::{Deserialize, Serialize};

use crate::declare::StockCode;

pub const INIT_CONNECT: u32 = 1001;
pub const KEEP_ALIVE: u32 = 1004;
pub const TRD_GET_ACC_LIST: u32 = 2001;
pub const TRD_GET_HISTORY_ORDER_LIST: u32 = 2221;
pub const QOT_SUB: u32 = 3001;
pub const QOT_GET_BASIC_QOT: u32 = 3004;
pub const QOT_GET_KL: u32 = 3006;
pub const QOT_GET_SECURITY_SNAPSHOT: u32 = 3203;

/// 單次快照請求最多的股票數
pub const SNAPSHOT_MAX_CODES: usize = 400;

#[derive(Serialize, Debug)]
pub struct Request<'a, T: Serialize> {
    pub c2s: &'a T,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    pub ret_type: i32,
    #[serde(default)]
    pub ret_msg: Option<String>,
    #[serde(default)]
    pub err_code: Option<i32>,
    pub s2c: Option<T>,
}

/// 沒有內容的 s2c
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Empty {}

/// 64 位元整數在 JSON 中可能是字串
pub(crate) mod lenient {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Int(i64),
        UInt(u64),
        Float(f64),
        Text(String),
    }

    pub fn i64_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<NumOrText>::deserialize(d)? {
            None => Ok(None),
            Some(NumOrText::Int(v)) => Ok(Some(v)),
            Some(NumOrText::UInt(v)) => i64::try_from(v).map(Some).map_err(de::Error::custom),
            Some(NumOrText::Float(v)) => Ok(Some(v as i64)),
            Some(NumOrText::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
        }
    }

    pub fn u64_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<NumOrText>::deserialize(d)? {
            None => Ok(None),
            Some(NumOrText::Int(v)) => u64::try_from(v).map(Some).map_err(de::Error::custom),
            Some(NumOrText::UInt(v)) => Ok(Some(v)),
            Some(NumOrText::Float(v)) => Ok(Some(v as u64)),
            Some(NumOrText::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Security {
    pub market: i32,
    pub code: String,
}

impl From<&StockCode> for Security {
    fn from(sc: &StockCode) -> Self {
        Security {
            market: sc.market.serial(),
            code: sc.code.clone(),
        }
    }
}

impl Security {
    /// 轉回 "HK.00700" 格式，不認得的市場保留數字
    pub fn display_code(&self) -> String {
        match crate::declare::Market::from_serial(self.market) {
            Some(market) => StockCode::new(market, self.code.clone()).to_string(),
            None => format!("{}.{}", self.market, self.code),
        }
    }
}

// ---- InitConnect / KeepAlive ----

#[derive(Serialize, Debug)]
pub struct InitConnectC2S {
    #[serde(rename = "clientVer")]
    pub client_ver: i32,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "recvNotify")]
    pub recv_notify: bool,
    /// -1: 不加密
    #[serde(rename = "packetEncAlgo")]
    pub packet_enc_algo: i32,
    /// 1: 推送也使用 JSON
    #[serde(rename = "pushProtoFmt")]
    pub push_proto_fmt: i32,
    #[serde(rename = "programmingLanguage")]
    pub programming_language: String,
}

impl InitConnectC2S {
    pub fn new(client_id: &str) -> Self {
        InitConnectC2S {
            client_ver: 100,
            client_id: client_id.to_string(),
            recv_notify: false,
            packet_enc_algo: -1,
            push_proto_fmt: 1,
            programming_language: "Rust".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct InitConnectS2C {
    #[serde(rename = "serverVer", default)]
    pub server_ver: Option<i32>,
    #[serde(rename = "loginUserID", default, deserialize_with = "lenient::u64_opt")]
    pub login_user_id: Option<u64>,
    #[serde(rename = "connID", default, deserialize_with = "lenient::u64_opt")]
    pub conn_id: Option<u64>,
    #[serde(rename = "keepAliveInterval", default)]
    pub keep_alive_interval: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct KeepAlive {
    pub time: i64,
}

// ---- 行情 ----

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QotSubC2S {
    pub security_list: Vec<Security>,
    pub sub_type_list: Vec<i32>,
    pub is_sub_or_un_sub: bool,
    pub is_reg_or_un_reg_push: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<i32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SecurityListC2S {
    pub security_list: Vec<Security>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetBasicQotS2C {
    #[serde(default)]
    pub basic_qot_list: Vec<BasicQot>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BasicQot {
    pub security: Security,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_suspended: Option<bool>,
    #[serde(default)]
    pub list_time: Option<String>,
    #[serde(default)]
    pub price_spread: Option<f64>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub high_price: Option<f64>,
    #[serde(default)]
    pub open_price: Option<f64>,
    #[serde(default)]
    pub low_price: Option<f64>,
    #[serde(default)]
    pub cur_price: Option<f64>,
    #[serde(default)]
    pub last_close_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub volume: Option<i64>,
    #[serde(default)]
    pub turnover: Option<f64>,
    #[serde(default)]
    pub turnover_rate: Option<f64>,
    #[serde(default)]
    pub amplitude: Option<f64>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetKLC2S {
    pub rehab_type: i32,
    pub kl_type: i32,
    pub security: Security,
    pub req_num: i32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetKLS2C {
    pub security: Security,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kl_list: Vec<KLine>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct KLine {
    pub time: String,
    #[serde(default)]
    pub high_price: Option<f64>,
    #[serde(default)]
    pub open_price: Option<f64>,
    #[serde(default)]
    pub low_price: Option<f64>,
    #[serde(default)]
    pub close_price: Option<f64>,
    #[serde(default)]
    pub last_close_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub volume: Option<i64>,
    #[serde(default)]
    pub turnover: Option<f64>,
    #[serde(default)]
    pub turnover_rate: Option<f64>,
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub change_rate: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetSecuritySnapshotS2C {
    #[serde(default)]
    pub snapshot_list: Vec<Snapshot>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub basic: SnapshotBasicData,
    #[serde(default)]
    pub equity_ex_data: Option<EquitySnapshotExData>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBasicData {
    pub security: Security,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_suspend: Option<bool>,
    #[serde(default)]
    pub list_time: Option<String>,
    #[serde(default)]
    pub lot_size: Option<i32>,
    #[serde(default)]
    pub price_spread: Option<f64>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub high_price: Option<f64>,
    #[serde(default)]
    pub open_price: Option<f64>,
    #[serde(default)]
    pub low_price: Option<f64>,
    #[serde(default)]
    pub last_close_price: Option<f64>,
    #[serde(default)]
    pub cur_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub volume: Option<i64>,
    #[serde(default)]
    pub turnover: Option<f64>,
    #[serde(default)]
    pub turnover_rate: Option<f64>,
    #[serde(default)]
    pub ask_price: Option<f64>,
    #[serde(default)]
    pub bid_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub ask_vol: Option<i64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub bid_vol: Option<i64>,
    #[serde(default)]
    pub amplitude: Option<f64>,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub bid_ask_ratio: Option<f64>,
    #[serde(default)]
    pub volume_ratio: Option<f64>,
    #[serde(default, rename = "highest52WeeksPrice")]
    pub highest52_weeks_price: Option<f64>,
    #[serde(default, rename = "lowest52WeeksPrice")]
    pub lowest52_weeks_price: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EquitySnapshotExData {
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub issued_shares: Option<i64>,
    #[serde(default)]
    pub issued_market_val: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub outstanding_shares: Option<i64>,
    #[serde(default)]
    pub outstanding_market_val: Option<f64>,
    #[serde(default)]
    pub net_asset_pershare: Option<f64>,
    #[serde(default)]
    pub earnings_pershare: Option<f64>,
    #[serde(default)]
    pub pe_rate: Option<f64>,
    #[serde(default)]
    pub pb_rate: Option<f64>,
    #[serde(default, rename = "peTTMRate")]
    pub pe_ttm_rate: Option<f64>,
}

// ---- 交易 ----

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrdHeader {
    #[serde(rename = "trdEnv")]
    pub trd_env: i32,
    #[serde(rename = "accID")]
    pub acc_id: u64,
    #[serde(rename = "trdMarket")]
    pub trd_market: i32,
}

#[derive(Serialize, Debug)]
pub struct GetAccListC2S {
    #[serde(rename = "userID")]
    pub user_id: u64,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetAccListS2C {
    #[serde(default)]
    pub acc_list: Vec<TrdAcc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TrdAcc {
    #[serde(rename = "trdEnv")]
    pub trd_env: i32,
    #[serde(rename = "accID", default, deserialize_with = "lenient::u64_opt")]
    pub acc_id: Option<u64>,
    #[serde(rename = "trdMarketAuthList", default)]
    pub trd_market_auth_list: Vec<i32>,
    #[serde(rename = "securityFirm", default)]
    pub security_firm: Option<i32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrdFilterConditions {
    pub code_list: Vec<String>,
    pub begin_time: String,
    pub end_time: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetHistoryOrderListC2S {
    pub header: TrdHeader,
    pub filter_conditions: TrdFilterConditions,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetHistoryOrderListS2C {
    #[serde(default)]
    pub order_list: Vec<WireOrder>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WireOrder {
    #[serde(rename = "trdSide")]
    pub trd_side: i32,
    #[serde(rename = "orderType", default)]
    pub order_type: i32,
    #[serde(rename = "orderStatus")]
    pub order_status: i32,
    #[serde(rename = "orderID", default, deserialize_with = "lenient::u64_opt")]
    pub order_id: Option<u64>,
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub qty: f64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "createTime", default)]
    pub create_time: String,
    #[serde(rename = "updateTime", default)]
    pub update_time: String,
    #[serde(rename = "fillQty", default)]
    pub fill_qty: Option<f64>,
    #[serde(rename = "fillAvgPrice", default)]
    pub fill_avg_price: Option<f64>,
    #[serde(rename = "lastErrMsg", default)]
    pub last_err_msg: Option<String>,
}
