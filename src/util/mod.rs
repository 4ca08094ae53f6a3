use chrono::{DateTime, Local, TimeZone, Utc};

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// `dd/mm/yyyy hh:mm` in the user's local timezone (browser runtime on wasm).
pub(crate) fn display_date(timestamp_ms: i64) -> String {
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(utc) => Local
            .from_utc_datetime(&utc.naive_utc())
            .format("%d/%m/%Y %H:%M")
            .to_string(),
        None => String::new(),
    }
}

pub(crate) fn random_u32() -> u32 {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_err() {
        // Fall back to clock bits; ids stay unique through the timestamp prefix.
        return (now_ms() & 0xffff_ffff) as u32;
    }
    u32::from_le_bytes(buf)
}

pub(crate) fn make_snapshot_id(now_ms: i64, rand: u32) -> String {
    format!("snap-{now_ms}-{rand:08x}")
}

/// Truncate to at most `max` characters (not bytes).
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Lowercase ASCII slug for download file names.
pub(crate) fn slugify(s: &str) -> String {
    let mut out = String::new();
    let mut dash = false;
    for ch in s.chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' => Some(ch),
            'A'..='Z' => Some(ch.to_ascii_lowercase()),
            'à' | 'â' | 'ä' | 'á' => Some('a'),
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' => Some('e'),
            'î' | 'ï' => Some('i'),
            'ô' | 'ö' => Some('o'),
            'ù' | 'û' | 'ü' => Some('u'),
            'ç' => Some('c'),
            _ => None,
        };
        match mapped {
            Some(c) => {
                out.push(c);
                dash = false;
            }
            None => {
                if !dash && !out.is_empty() {
                    out.push('-');
                    dash = true;
                }
            }
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "newsletter".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_snapshot_id_format() {
        assert_eq!(make_snapshot_id(1700, 255), "snap-1700-000000ff");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("Été chaud", 3), "Été");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Promo Été 2024 !"), "promo-ete-2024");
        assert_eq!(slugify("***"), "newsletter");
    }

    #[test]
    fn test_display_date_shape() {
        let s = display_date(0);
        assert_eq!(s.len(), "01/01/1970 00:00".len());
        assert_eq!(&s[2..3], "/");
    }
}
