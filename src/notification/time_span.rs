//! 时长格式化（"1 min 5 sec"、"3.2 sec"、"42 ms"）

const ONE_SECOND_MS: u64 = 1000;
const ONE_MINUTE_MS: u64 = 60 * ONE_SECOND_MS;
const ONE_HOUR_MS: u64 = 60 * ONE_MINUTE_MS;
const ONE_DAY_MS: u64 = 24 * ONE_HOUR_MS;
const ONE_MONTH_MS: u64 = 30 * ONE_DAY_MS;
const ONE_YEAR_MS: u64 = 365 * ONE_DAY_MS;

fn days(n: u64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}

/// 两级单位；较大单位达到 10 时省略较小单位
fn two_units(big: u64, big_text: String, small_text: String) -> String {
    if big < 10 {
        format!("{} {}", big_text, small_text)
    } else {
        big_text
    }
}

pub fn format_time_span(duration_millis: u64) -> String {
    let mut rest = duration_millis;
    let years = rest / ONE_YEAR_MS;
    rest %= ONE_YEAR_MS;
    let months = rest / ONE_MONTH_MS;
    rest %= ONE_MONTH_MS;
    let day_count = rest / ONE_DAY_MS;
    rest %= ONE_DAY_MS;
    let hours = rest / ONE_HOUR_MS;
    rest %= ONE_HOUR_MS;
    let minutes = rest / ONE_MINUTE_MS;
    rest %= ONE_MINUTE_MS;
    let seconds = rest / ONE_SECOND_MS;
    let millis = rest % ONE_SECOND_MS;

    if years > 0 {
        two_units(years, format!("{} yr", years), format!("{} mo", months))
    } else if months > 0 {
        two_units(months, format!("{} mo", months), days(day_count))
    } else if day_count > 0 {
        two_units(day_count, days(day_count), format!("{} hr", hours))
    } else if hours > 0 {
        two_units(hours, format!("{} hr", hours), format!("{} min", minutes))
    } else if minutes > 0 {
        two_units(minutes, format!("{} min", minutes), format!("{} sec", seconds))
    } else if seconds >= 10 {
        format!("{} sec", seconds)
    } else if seconds >= 1 {
        format!("{}.{} sec", seconds, millis / 100)
    } else if millis >= 100 {
        format!("0.{:02} sec", millis / 10)
    } else {
        format!("{} ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_second() {
        assert_eq!(format_time_span(0), "0 ms");
        assert_eq!(format_time_span(42), "42 ms");
        assert_eq!(format_time_span(120), "0.12 sec");
    }

    #[test]
    fn test_seconds() {
        assert_eq!(format_time_span(3_250), "3.2 sec");
        assert_eq!(format_time_span(12_900), "12 sec");
    }

    #[test]
    fn test_compound_units() {
        assert_eq!(format_time_span(65_000), "1 min 5 sec");
        assert_eq!(format_time_span(12 * ONE_MINUTE_MS + 5_000), "12 min");
        assert_eq!(format_time_span(2 * ONE_HOUR_MS + 5 * ONE_MINUTE_MS), "2 hr 5 min");
        assert_eq!(format_time_span(ONE_DAY_MS + 3 * ONE_HOUR_MS), "1 day 3 hr");
        assert_eq!(format_time_span(2 * ONE_MONTH_MS + ONE_DAY_MS), "2 mo 1 day");
        assert_eq!(format_time_span(ONE_YEAR_MS + ONE_MONTH_MS), "1 yr 1 mo");
    }
}
