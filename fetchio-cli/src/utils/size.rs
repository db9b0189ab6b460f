use crate::error::AppError;

/// Parse a size with an optional unit, e.g. "500MB", "1.5gb", "2048".
/// A bare number is taken as bytes.
pub fn parse_size(input: &str) -> Result<u64, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::ParseError("empty size".to_string()));
    }

    let unit_start = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(unit_start);

    let value: f64 = number
        .parse()
        .map_err(|_| AppError::ParseError(format!("invalid size: '{input}'")))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        "tb" => 1024u64.pow(4),
        other => return Err(AppError::ParseError(format!("unknown size unit: '{other}'"))),
    };

    Ok((value * multiplier as f64) as u64)
}

/// Convert bytes to a human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];

    for (scale, unit) in UNITS {
        if bytes >= scale {
            return format!("{:.2} {unit}", bytes as f64 / scale as f64);
        }
    }
    format!("{bytes} B")
}
