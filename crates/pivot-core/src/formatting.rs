/// Format an enrollment count with thousands separators.
///
/// # Examples
///
/// ```
/// use pivot_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234), "1,234");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Format a byte size as kilobytes with one decimal place.
///
/// # Examples
///
/// ```
/// use pivot_core::formatting::format_kilobytes;
///
/// assert_eq!(format_kilobytes(0), "0.0 KB");
/// assert_eq!(format_kilobytes(1536), "1.5 KB");
/// ```
pub fn format_kilobytes(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Insert a comma every three digits, counting from the right.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
