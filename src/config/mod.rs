use std::{env, path::PathBuf, str::FromStr};

use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{
    declare::{SecurityFirm, TrdEnv},
    logging,
};

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub futu: Futu,
    #[serde(default)]
    pub collector: Collector,
    #[serde(default)]
    pub order: Order,
    #[serde(default)]
    pub prompt: Prompt,
    #[serde(default)]
    pub schedule: Schedule,
}

const FUTU_OPEND_HOST: &str = "FUTU_OPEND_HOST";
const FUTU_OPEND_PORT: &str = "FUTU_OPEND_PORT";
const FUTU_CLIENT_ID: &str = "FUTU_CLIENT_ID";

/// OpenD 連線設定
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Futu {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// 單次請求逾時秒數
    pub timeout_secs: u64,
}

impl Default for Futu {
    fn default() -> Self {
        Futu {
            host: "127.0.0.1".to_string(),
            port: 11111,
            client_id: "market_collector".to_string(),
            timeout_secs: 12,
        }
    }
}

const COLLECTOR_DATA_DIR: &str = "COLLECTOR_DATA_DIR";
const COLLECTOR_STOCK_CODES: &str = "COLLECTOR_STOCK_CODES";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Collector {
    pub stock_codes: Vec<String>,
    pub data_dir: String,
    /// 每檔股票之間的間隔秒數
    pub delay_secs: u64,
    /// 取回的 K 線根數
    pub kline_num: u32,
}

impl Default for Collector {
    fn default() -> Self {
        Collector {
            stock_codes: vec![
                "HK.00700".to_string(), // 騰訊控股
                "HK.01024".to_string(), // 快手-W
                "HK.03690".to_string(), // 美團-W
                "HK.09988".to_string(), // 阿里巴巴-W
                "HK.01810".to_string(), // 小米集團-W
            ],
            data_dir: "./data".to_string(),
            delay_secs: 1,
            kline_num: 64,
        }
    }
}

const ORDER_ACC_ID: &str = "ORDER_ACC_ID";
const ORDER_TRD_ENV: &str = "ORDER_TRD_ENV";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Order {
    pub stock_codes: Vec<String>,
    /// 往回查詢的天數
    pub days: i64,
    pub trd_env: TrdEnv,
    pub security_firm: SecurityFirm,
    /// 0 代表使用第一個符合條件的帳戶
    pub acc_id: u64,
}

impl Default for Order {
    fn default() -> Self {
        Order {
            stock_codes: vec!["HK.00700".to_string(), "HK.09988".to_string()],
            days: 60,
            trd_env: TrdEnv::Real,
            security_firm: SecurityFirm::FutuSecurities,
            acc_id: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Prompt {
    pub stock_codes: Vec<String>,
    pub template_path: String,
    pub output_dir: String,
}

impl Default for Prompt {
    fn default() -> Self {
        Prompt {
            stock_codes: vec!["HK.00700".to_string(), "HK.09988".to_string()],
            template_path: "prompt/prompt.template".to_string(),
            output_dir: "prompt".to_string(),
        }
    }
}

/// 排程的 cron 表達式(sec min hour day month weekday)，空字串代表不執行
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Schedule {
    pub kline: String,
    pub order: String,
    pub prompt: String,
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| match App::get() {
    Ok(app) => app,
    Err(why) => {
        logging::error_console(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::default().override_with_env()
    }
});

impl App {
    fn get() -> Result<Self, config::ConfigError> {
        Self::load(config_path())
    }

    /// 讀取指定的設定檔，檔案不存在時使用預設值，最後都以 env 覆蓋
    pub fn load(path: PathBuf) -> Result<Self, config::ConfigError> {
        if path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(host) = env::var(FUTU_OPEND_HOST) {
            self.futu.host = host;
        }

        if let Ok(port) = env::var(FUTU_OPEND_PORT) {
            self.futu.port = u16::from_str(&port).unwrap_or(self.futu.port);
        }

        if let Ok(client_id) = env::var(FUTU_CLIENT_ID) {
            self.futu.client_id = client_id;
        }

        if let Ok(data_dir) = env::var(COLLECTOR_DATA_DIR) {
            self.collector.data_dir = data_dir;
        }

        if let Ok(codes) = env::var(COLLECTOR_STOCK_CODES) {
            let codes: Vec<String> = codes
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            if !codes.is_empty() {
                self.collector.stock_codes = codes;
            }
        }

        if let Ok(acc_id) = env::var(ORDER_ACC_ID) {
            self.order.acc_id = u64::from_str(&acc_id).unwrap_or(self.order.acc_id);
        }

        if let Ok(trd_env) = env::var(ORDER_TRD_ENV) {
            match TrdEnv::from_str(&trd_env) {
                Ok(trd_env) => self.order.trd_env = trd_env,
                Err(why) => logging::error_console(format!(
                    "Failed to parse {}={} because {:?}",
                    ORDER_TRD_ENV, trd_env, why
                )),
            }
        }

        self
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
