//! 資料檔的路徑規則與 JSON Lines 讀寫
//!
//! 個股資料放在 `data_dir/<市場>/<年月>/` 下，檔名以完整代號開頭，例︰
//! `./data/HK/202510/HK.00700_251019.jsonl`

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{declare::StockCode, util::datetime};

/// `data_dir/<MARKET>/<YYYYMM>`
pub fn stock_dir(data_dir: &Path, code: &StockCode, now: DateTime<Local>) -> PathBuf {
    data_dir
        .join(code.market.to_string())
        .join(datetime::month_dir(now))
}

/// 當日的 K 線檔
pub fn kline_path(data_dir: &Path, code: &StockCode, now: DateTime<Local>) -> PathBuf {
    stock_dir(data_dir, code, now).join(format!("{}_{}.jsonl", code, datetime::day_stamp(now)))
}

pub fn order_path(data_dir: &Path, code: &StockCode, now: DateTime<Local>) -> PathBuf {
    stock_dir(data_dir, code, now).join(format!("{}_order.jsonl", code))
}

/// 實際交易結果，由外部放入
pub fn gt_path(data_dir: &Path, code: &StockCode, now: DateTime<Local>) -> PathBuf {
    stock_dir(data_dir, code, now).join(format!("{}_gt.jsonl", code))
}

/// `dir/<base>_<YYYYMMDDHH>.jsonl`
pub fn timestamped_path(dir: &Path, base: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.jsonl", base, datetime::hour_stamp(now)))
}

/// 覆寫 `path`，每筆資料一行 JSON，回傳寫入的筆數
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let file =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(rows.len())
}

/// 讀取整個檔案並去掉前後空白
pub fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(anyhow!("檔案不存在: {}", path.display()));
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(content.trim().to_string())
}
