/// Fixed-decimal rendering with thousands separators, used for percentages
/// and per-bucket averages.
///
/// ```
/// use activity_core::formatting::format_number;
///
/// assert_eq!(format_number(28.6, 1), "28.6");
/// assert_eq!(format_number(1520.0, 2), "1,520.00");
/// assert_eq!(format_number(-3.25, 1), "-3.3");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    // Half-way cases such as 0.125 sit just below the midpoint in binary.
    let nudge = f64::EPSILON * value.abs() * 10_f64.powi(decimals as i32);
    let rounded = round_to(value.abs() + nudge, decimals);
    let fixed = format!("{:.*}", decimals as usize, rounded);

    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let sign = if value < 0.0 && rounded != 0.0 { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, group_thousands(int_part), f),
        None => format!("{}{}", sign, group_thousands(int_part)),
    }
}

/// Format an event count with thousands separators.
///
/// ```
/// use activity_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(12_345), "12,345");
/// ```
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

/// Round `value` to `decimal_places`.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10_f64.powi(decimal_places as i32);
    (value * factor).round() / factor
}

/// `part / whole`, or `0.0` when `whole` is zero.
///
/// ```
/// use activity_core::formatting::ratio;
///
/// assert_eq!(ratio(3, 4), 0.75);
/// assert_eq!(ratio(0, 0), 0.0);
/// ```
pub fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use activity_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    round_to((part / whole) * 100.0, decimal_places)
}

/// First `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

/// Like [`truncate_chars`] but appends `"..."` when anything was cut.
///
/// ```
/// use activity_core::formatting::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
/// assert_eq!(truncate_with_ellipsis("hi", 5), "hi");
/// ```
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let cut = truncate_chars(s, max_chars);
    if cut.len() < s.len() {
        format!("{}...", cut)
    } else {
        cut
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(digits: &str) -> String {
    let len = digits.chars().count();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
