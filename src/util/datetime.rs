use chrono::{DateTime, Duration, Local, NaiveDate};

/// 月份目錄名稱，例︰202510
pub fn month_dir(now: DateTime<Local>) -> String {
    now.format("%Y%m").to_string()
}

/// K 線檔名使用的日期，例︰251019
pub fn day_stamp(now: DateTime<Local>) -> String {
    now.format("%y%m%d").to_string()
}

/// 快照檔名使用的時間，精確到小時，例︰2025101914
pub fn hour_stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H").to_string()
}

/// 回傳往回 `days` 天到 `today` 的查詢區間
pub fn lookback_window(today: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_signed(Duration::days(days.max(0)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

/// 區間起點，OpenD 需要完整的時間字串
pub fn begin_of_day(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format("%Y-%m-%d"))
}

/// 區間終點，含當日所有時間
pub fn end_of_day(date: NaiveDate) -> String {
    format!("{} 23:59:59", date.format("%Y-%m-%d"))
}

/// 取出 "2025-10-17 09:30:01.123" 這類時間字串中的日期
pub fn parse_leading_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
