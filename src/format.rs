//! Display formatting for XP amounts, ratios and activity labels

// Digits past the requested precision inspected for an exact tie
const TIE_DIGITS: usize = 24;

/// Format `value` with a fixed number of decimals, `toFixed` style.
///
/// Rounds the exact binary value to nearest; exact ties go away from zero,
/// so `1.25` gives `"1.3"` while `1.45` (stored just below) gives `"1.4"`.
/// Negative values that round to zero print without a sign.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let mut magnitude = value.abs();
    let expanded = format!("{:.*}", decimals + TIE_DIGITS, magnitude);
    let tail = &expanded[expanded.len() - TIE_DIGITS..];
    if tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0') {
        // std formatting breaks exact ties to even
        magnitude = f64::from_bits(magnitude.to_bits() + 1);
    }

    let digits = format!("{:.*}", decimals, magnitude);
    if value < 0.0 && digits.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        format!("-{}", digits)
    } else {
        digits
    }
}

/// Format an XP-style amount as bytes, kilobytes or megabytes.
///
/// Missing or NaN input formats as `"0 B"`.
pub fn format_magnitude(amount: Option<f64>) -> String {
    let amount = match amount {
        Some(a) if !a.is_nan() => a,
        _ => return "0 B".to_string(),
    };

    if amount < 1_000.0 {
        format!("{} B", amount)
    } else if amount < 1_000_000.0 {
        format!("{} kB", format_fixed(amount / 1_000.0, 1))
    } else {
        format!("{} MB", format_fixed(amount / 1_000_000.0, 2))
    }
}

/// Audit ratio to one decimal place.
///
/// A precomputed ratio wins; otherwise it is derived from the up/down
/// totals, with `"Infinity"` when only `up` is non-zero.
pub fn format_audit_ratio(ratio: Option<f64>, total_up: f64, total_down: f64) -> String {
    if let Some(ratio) = ratio.filter(|r| r.is_finite()) {
        return format_fixed(ratio, 1);
    }

    if total_down > 0.0 {
        format_fixed(total_up / total_down, 1)
    } else if total_up > 0.0 {
        "Infinity".to_string()
    } else {
        "0.0".to_string()
    }
}

/// `"Ratio: 1.5 (Done: 1.5 kB / Received: 1.0 kB)"`
pub fn format_audit_summary(ratio: Option<f64>, total_up: f64, total_down: f64) -> String {
    format!(
        "Ratio: {} (Done: {} / Received: {})",
        format_audit_ratio(ratio, total_up, total_down),
        format_magnitude(Some(total_up)),
        format_magnitude(Some(total_down))
    )
}

/// `"piscine_js"` + `"quest-01"` → `"Piscine Js: quest-01"`
pub fn format_activity_label(kind: &str, name: &str) -> String {
    let kind = kind
        .replace('_', " ")
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    if kind.is_empty() {
        name.to_string()
    } else {
        format!("{}: {}", kind, name)
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
