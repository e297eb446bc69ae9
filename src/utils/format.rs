//! Text formatting for HTML replies.

use std::time::Duration;

/// Escape text for Telegram's HTML parse mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Clickable user mention.
pub fn mention(user_id: u64, name: &str) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user_id,
        html_escape(name)
    )
}

/// Human-readable duration, truncated to whole seconds.
///
/// Shows at most the two largest units: `"1h 5m"`, `"25m 0s"`, `"42s"`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Coin amount with thousands separators.
pub fn format_coins(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(42_900)), "42s");
        assert_eq!(format_duration(Duration::from_secs(25 * 60)), "25m 0s");
        assert_eq!(format_duration(Duration::from_secs(3900)), "1h 5m");
        assert_eq!(format_duration(Duration::from_secs(90_000)), "1d 1h");
    }

    #[test]
    fn test_format_coins() {
        assert_eq!(format_coins(0), "0");
        assert_eq!(format_coins(999), "999");
        assert_eq!(format_coins(1000), "1,000");
        assert_eq!(format_coins(-1234567), "-1,234,567");
    }

    #[test]
    fn test_mention_escapes_name() {
        assert_eq!(mention(7, "a<b"), "<a href=\"tg://user?id=7\">a&lt;b</a>");
    }
}
