use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::{config, logging};

/// K 線
pub mod kline;
/// 歷史訂單
pub mod order;
/// 市場快照與即時報價
pub mod snapshot;

/// 逐檔處理的結果統計
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    /// (代號, 失敗原因)
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        BatchSummary {
            total,
            ..Default::default()
        }
    }

    pub fn success(&mut self) {
        self.succeeded += 1;
    }

    pub fn failure(&mut self, code: &str, reason: String) {
        logging::error_console(format!("✗ {} 失敗: {}", code, reason));
        logging::error_file_async(format!("{} failed because {}", code, reason));
        self.failed.push((code.to_string(), reason));
    }

    /// 有任何一檔失敗就回傳錯誤
    pub fn into_result(self) -> Result<()> {
        if self.failed.is_empty() {
            return Ok(());
        }

        let codes: Vec<&str> = self.failed.iter().map(|(code, _)| code.as_str()).collect();
        Err(anyhow!(
            "{} of {} stocks failed: {}",
            self.failed.len(),
            self.total,
            codes.join(", ")
        ))
    }

    pub fn print(&self) {
        logging::info_console("=".repeat(50));
        logging::info_console(format!(
            "處理完成！成功: {}/{}",
            self.succeeded, self.total
        ));

        if !self.failed.is_empty() {
            logging::info_console(format!("失敗的股票 ({}):", self.failed.len()));
            for (code, reason) in &self.failed {
                logging::info_console(format!("  - {}: {}", code, reason));
            }
        }
    }
}

/// 指定了代號就使用，否則使用設定檔中的清單，略過空白項目。
/// 代號在逐檔處理時才解析，格式錯誤只讓那一檔失敗
pub fn resolve_codes(codes: Option<&[String]>, configured: &[String]) -> Vec<String> {
    codes
        .unwrap_or(configured)
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// 設定檔中的間隔秒數
pub fn configured_delay() -> Duration {
    Duration::from_secs(config::SETTINGS.collector.delay_secs)
}

/// 印出 `[i/n]` 進度，`index` 從 0 開始
fn progress(index: usize, total: usize, code: &str) {
    logging::info_console(format!("[{}/{}] 正在處理: {}", index + 1, total, code));
}

/// 兩檔之間暫停，最後一檔之後不暫停
async fn pause(index: usize, total: usize, delay: Duration) {
    if index + 1 < total && !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
