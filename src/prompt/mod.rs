use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::{
    collector::{self, BatchSummary},
    config,
    declare::StockCode,
    logging, storage,
    util::text,
};

/// 依設定檔產生提示語，`codes` 為 None 時使用設定檔中的股票
pub fn execute(codes: Option<&[String]>) -> Result<()> {
    let settings = &config::SETTINGS;
    let codes = collector::resolve_codes(codes, &settings.prompt.stock_codes);

    build_all_prompts(
        &codes,
        Path::new(&settings.collector.data_dir),
        Path::new(&settings.prompt.template_path),
        Path::new(&settings.prompt.output_dir),
        Local::now(),
    )
    .into_result()
}

/// 依序取代的佔位符號
const STOCK_CODE: &str = "STOCK_CODE";
const KLINE_DATA: &str = "KLINE_DATA";
const ORDER_DATA: &str = "ORDER_DATA";
const GT_DATA: &str = "GT_DATA";

/// 用當日的 K 線、訂單與實際交易檔填入模板，寫成 `output_dir/<代號>_prompt.txt`
pub fn build_stock_prompt(
    code: &StockCode,
    data_dir: &Path,
    template_path: &Path,
    output_dir: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let kline = storage::read_text(&storage::kline_path(data_dir, code, now))?;
    let order = storage::read_text(&storage::order_path(data_dir, code, now))?;
    let gt = storage::read_text(&storage::gt_path(data_dir, code, now))?;
    let template = storage::read_text(template_path)?;

    let stock_code = code.to_string();
    let prompt = text::fill_placeholders(
        &template,
        &[
            (STOCK_CODE, stock_code.as_str()),
            (KLINE_DATA, kline.as_str()),
            (ORDER_DATA, order.as_str()),
            (GT_DATA, gt.as_str()),
        ],
    );

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(format!("{}_prompt.txt", stock_code));
    fs::write(&path, prompt).with_context(|| format!("寫入文件時出錯: {}", path.display()))?;

    logging::info_console(format!("✓ {} 提示語已保存到: {}", code, path.display()));

    Ok(path)
}

/// 為每檔股票產生提示語，缺檔或代號有誤的股票記入失敗清單
pub fn build_all_prompts(
    codes: &[String],
    data_dir: &Path,
    template_path: &Path,
    output_dir: &Path,
    now: DateTime<Local>,
) -> BatchSummary {
    let mut summary = BatchSummary::new(codes.len());

    for code in codes {
        let built = code
            .parse::<StockCode>()
            .and_then(|code| build_stock_prompt(&code, data_dir, template_path, output_dir, now));

        match built {
            Ok(_) => summary.success(),
            Err(why) => summary.failure(code, format!("{:#}", why)),
        }
    }

    summary.print();
    summary
}
