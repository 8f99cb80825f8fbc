use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 行情市場
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum Market {
    /// 港股 1
    HK,
    /// 美股 11
    US,
    /// 滬股 21
    SH,
    /// 深股 22
    SZ,
}

impl Market {
    /// OpenD 的 QotMarket 編號
    pub fn serial(&self) -> i32 {
        match self {
            Market::HK => 1,
            Market::US => 11,
            Market::SH => 21,
            Market::SZ => 22,
        }
    }

    pub fn from_serial(serial: i32) -> Option<Market> {
        match serial {
            1 => Some(Market::HK),
            11 => Some(Market::US),
            21 => Some(Market::SH),
            22 => Some(Market::SZ),
            _ => None,
        }
    }

    /// 下單/查單所屬的交易市場
    pub fn trade_market(&self) -> TrdMarket {
        match self {
            Market::HK => TrdMarket::HK,
            Market::US => TrdMarket::US,
            Market::SH | Market::SZ => TrdMarket::CN,
        }
    }
}

/// 股票代碼，例︰HK.00700
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockCode {
    pub market: Market,
    pub code: String,
}

impl StockCode {
    pub fn new(market: Market, code: impl Into<String>) -> Self {
        StockCode {
            market,
            code: code.into(),
        }
    }

    /// 解析多筆代碼，忽略空白項目
    pub fn parse_list<S: AsRef<str>>(codes: &[S]) -> Result<Vec<StockCode>> {
        codes
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .map(StockCode::from_str)
            .collect()
    }
}

impl FromStr for StockCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, code) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| anyhow!("Invalid stock code '{}', expected MARKET.CODE", s))?;

        if code.is_empty() {
            return Err(anyhow!("Invalid stock code '{}', code part is empty", s));
        }

        let market = Market::from_str(prefix)
            .map_err(|_| anyhow!("Unknown market '{}' in stock code '{}'", prefix, s))?;

        Ok(StockCode::new(market, code))
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.market, self.code)
    }
}

/// 訂閱類型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SubType {
    Quote = 1,
    OrderBook = 2,
    Ticker = 4,
    Rt = 5,
    KDay = 6,
    #[strum(serialize = "K_5M")]
    K5m = 7,
    #[strum(serialize = "K_15M")]
    K15m = 8,
    #[strum(serialize = "K_30M")]
    K30m = 9,
    #[strum(serialize = "K_60M")]
    K60m = 10,
    #[strum(serialize = "K_1M")]
    K1m = 11,
    KWeek = 12,
    KMon = 13,
}

impl SubType {
    pub fn serial(&self) -> i32 {
        *self as i32
    }
}

/// K 線類型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KLineType {
    #[strum(serialize = "K_1M")]
    #[serde(rename = "K_1M")]
    K1m,
    #[strum(serialize = "K_5M")]
    #[serde(rename = "K_5M")]
    K5m,
    #[strum(serialize = "K_15M")]
    #[serde(rename = "K_15M")]
    K15m,
    #[strum(serialize = "K_30M")]
    #[serde(rename = "K_30M")]
    K30m,
    #[strum(serialize = "K_60M")]
    #[serde(rename = "K_60M")]
    K60m,
    KDay,
    KWeek,
    KMon,
}

impl KLineType {
    pub fn serial(&self) -> i32 {
        match self {
            KLineType::K1m => 1,
            KLineType::KDay => 2,
            KLineType::KWeek => 3,
            KLineType::KMon => 4,
            KLineType::K5m => 6,
            KLineType::K15m => 7,
            KLineType::K30m => 8,
            KLineType::K60m => 9,
        }
    }

    /// 取得目前 K 線前必須先訂閱的類型
    pub fn sub_type(&self) -> SubType {
        match self {
            KLineType::K1m => SubType::K1m,
            KLineType::K5m => SubType::K5m,
            KLineType::K15m => SubType::K15m,
            KLineType::K30m => SubType::K30m,
            KLineType::K60m => SubType::K60m,
            KLineType::KDay => SubType::KDay,
            KLineType::KWeek => SubType::KWeek,
            KLineType::KMon => SubType::KMon,
        }
    }
}

/// 復權類型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum RehabType {
    /// 不復權 0
    None = 0,
    /// 前復權 1
    Qfq = 1,
    /// 後復權 2
    Hfq = 2,
}

impl RehabType {
    pub fn serial(&self) -> i32 {
        *self as i32
    }
}

/// 行情時段，僅對美股有意義
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Session {
    None = 0,
    Rth = 1,
    Eth = 2,
    All = 3,
}

impl Session {
    pub fn serial(&self) -> i32 {
        *self as i32
    }
}

/// 交易方向
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrdSide {
    Unknown,
    Buy,
    Sell,
    SellShort,
    BuyBack,
}

impl TrdSide {
    pub fn from_serial(serial: i32) -> TrdSide {
        match serial {
            1 => TrdSide::Buy,
            2 => TrdSide::Sell,
            3 => TrdSide::SellShort,
            4 => TrdSide::BuyBack,
            _ => TrdSide::Unknown,
        }
    }
}

/// 訂單狀態
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unknown,
    Unsubmitted,
    WaitingSubmit,
    Submitting,
    SubmitFailed,
    Timeout,
    Submitted,
    FilledPart,
    FilledAll,
    CancellingPart,
    CancellingAll,
    CancelledPart,
    CancelledAll,
    Failed,
    Disabled,
    Deleted,
    FillCancelled,
}

impl OrderStatus {
    pub fn from_serial(serial: i32) -> OrderStatus {
        match serial {
            0 => OrderStatus::Unsubmitted,
            1 => OrderStatus::WaitingSubmit,
            2 => OrderStatus::Submitting,
            3 => OrderStatus::SubmitFailed,
            4 => OrderStatus::Timeout,
            5 => OrderStatus::Submitted,
            10 => OrderStatus::FilledPart,
            11 => OrderStatus::FilledAll,
            12 => OrderStatus::CancellingPart,
            13 => OrderStatus::CancellingAll,
            14 => OrderStatus::CancelledPart,
            15 => OrderStatus::CancelledAll,
            21 => OrderStatus::Failed,
            22 => OrderStatus::Disabled,
            23 => OrderStatus::Deleted,
            24 => OrderStatus::FillCancelled,
            _ => OrderStatus::Unknown,
        }
    }
}

/// 交易市場
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TrdMarket {
    HK = 1,
    US = 2,
    CN = 3,
}

impl TrdMarket {
    pub fn serial(&self) -> i32 {
        *self as i32
    }
}

/// 交易環境
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrdEnv {
    /// 模擬 0
    Simulate = 0,
    /// 真實 1
    Real = 1,
}

impl TrdEnv {
    pub fn serial(&self) -> i32 {
        *self as i32
    }
}

/// 券商
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityFirm {
    /// 富途證券(香港) 1
    FutuSecurities = 1,
    /// 富途證券(美國) 2
    FutuInc = 2,
    /// 富途證券(新加坡) 3
    FutuSg = 3,
}

impl SecurityFirm {
    pub fn serial(&self) -> i32 {
        *self as i32
    }
}
