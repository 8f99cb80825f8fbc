/// 依序將模板中的 `{KEY}` 換成對應的內容
///
/// 取代是逐一進行的，前面填入的內容若含有後面的佔位符號也會被取代。
pub fn fill_placeholders(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut filled = template.to_string();
    for (key, value) in pairs {
        let placeholder = format!("{{{}}}", key);
        filled = filled.replace(&placeholder, value);
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_placeholders() {
        let template = "股票 {STOCK_CODE}\n{KLINE_DATA}\n{STOCK_CODE}";
        let filled = fill_placeholders(
            template,
            &[("STOCK_CODE", "HK.00700"), ("KLINE_DATA", "{}")],
        );
        assert_eq!(filled, "股票 HK.00700\n{}\nHK.00700");
    }

    #[test]
    fn test_fill_is_sequential() {
        let filled = fill_placeholders("{A}", &[("A", "{B}"), ("B", "b")]);
        assert_eq!(filled, "b");
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        let filled = fill_placeholders("{GT_DATA}", &[("STOCK_CODE", "x")]);
        assert_eq!(filled, "{GT_DATA}");
    }
}
