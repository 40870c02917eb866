// Display helpers for raw extractor numbers and strings

use time::macros::format_description;
use time::Date;

/// Bitrate given in kbps
pub fn format_bitrate(kbps: f64) -> String {
    if kbps >= 1000.0 {
        format!("{:.1} Mbps", kbps / 1000.0)
    } else {
        format!("{:.0} Kbps", kbps)
    }
}

/// Byte count in binary units with at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{} {}", trim_decimals(&format!("{:.2}", value)), UNITS[unit])
}

/// Duration in seconds as "1h 2m 3s"
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);

    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// yt-dlp's `duration_string` ("1:02:03", "4:13", "45")
pub fn format_duration_string(value: &str) -> String {
    let parts: Option<Vec<u64>> = value
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect();

    match parts.as_deref() {
        Some([s]) => format_duration(*s as f64),
        Some([m, s]) => format_duration((m * 60 + s) as f64),
        Some([h, m, s]) => format_duration((h * 3600 + m * 60 + s) as f64),
        _ => value.to_string(),
    }
}

/// `YYYYMMDD` as "Jan 15, 2024"; anything else passes through
pub fn format_release_date(value: &str) -> String {
    let input = format_description!("[year][month][day]");
    let output = format_description!("[month repr:short] [day padding:none], [year]");

    Date::parse(value.trim(), input)
        .ok()
        .and_then(|date| date.format(output).ok())
        .unwrap_or_else(|| value.to_string())
}

/// Compact count in the style of view counters ("1.2K", "12K", "3.4M")
pub fn format_compact_count(count: u64) -> String {
    const UNITS: [(u64, &str); 3] = [
        (1_000_000_000, "B"),
        (1_000_000, "M"),
        (1_000, "K"),
    ];

    if count < 1_000 {
        return count.to_string();
    }

    for (i, (size, suffix)) in UNITS.iter().enumerate() {
        if count < *size {
            continue;
        }

        let value = count as f64 / *size as f64;
        let rendered = if value < 10.0 {
            trim_decimals(&format!("{:.1}", value))
        } else {
            format!("{:.0}", value)
        };

        // 999_999 rounds to "1000K", show it as the next unit instead
        if rendered == "1000" && i > 0 {
            let (_, bigger) = UNITS[i - 1];
            return format!("1{}", bigger);
        }
        return format!("{}{}", rendered, suffix);
    }

    count.to_string()
}

fn trim_decimals(value: &str) -> String {
    if value.contains('.') {
        value.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate() {
        assert_eq!(format_bitrate(128.4), "128 Kbps");
        assert_eq!(format_bitrate(1500.0), "1.5 Mbps");
    }

    #[test]
    fn test_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(12_950_000), "12.35 MB");
    }

    #[test]
    fn test_duration() {
        assert_eq!(format_duration(3723.0), "1h 2m 3s");
        assert_eq!(format_duration(253.0), "4m 13s");
        assert_eq!(format_duration(45.0), "45s");
        assert_eq!(format_duration_string("1:02:03"), "1h 2m 3s");
        assert_eq!(format_duration_string("4:13"), "4m 13s");
        assert_eq!(format_duration_string("live"), "live");
    }

    #[test]
    fn test_release_date() {
        assert_eq!(format_release_date("20240115"), "Jan 15, 2024");
        assert_eq!(format_release_date("2024"), "2024");
    }

    #[test]
    fn test_compact_count() {
        assert_eq!(format_compact_count(999), "999");
        assert_eq!(format_compact_count(1_234), "1.2K");
        assert_eq!(format_compact_count(12_345), "12K");
        assert_eq!(format_compact_count(1_500_000), "1.5M");
        assert_eq!(format_compact_count(999_999), "1M");
        assert_eq!(format_compact_count(2_000_000_000), "2B");
    }
}
