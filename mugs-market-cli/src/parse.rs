//! Value parsing from CLI strings.

use solana_pubkey::Pubkey;

use crate::hex::decode_pubkey;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Parse an amount in SOL ("1.5") or lamports ("1500000000lamports").
pub fn parse_sol_amount(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    if let Some(lamports) = raw.strip_suffix("lamports") {
        return lamports.trim().parse::<u64>().map_err(|e| format!("Invalid lamports '{}': {}", raw, e));
    }

    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err("Empty amount".to_string());
    }
    if frac.len() > 9 {
        return Err(format!("Amount '{}' has more than 9 decimal places", raw));
    }
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|e| format!("Invalid amount '{}': {}", raw, e))?
    };
    let frac_lamports: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<9}", frac);
        padded.parse().map_err(|e| format!("Invalid amount '{}': {}", raw, e))?
    };
    whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|l| l.checked_add(frac_lamports))
        .ok_or_else(|| format!("Amount '{}' overflows u64 lamports", raw))
}

pub fn parse_u64(raw: &str) -> Result<u64, String> {
    raw.trim().parse::<u64>().map_err(|e| format!("Invalid u64 '{}': {}", raw, e))
}

/// Parse a duration: plain seconds, or a number with an `s`, `m`, `h` or `d` suffix.
pub fn parse_duration_secs(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&raw[..i], c),
        _ => (raw, 's'),
    };
    let value: i64 = digits.parse().map_err(|e| format!("Invalid duration '{}': {}", raw, e))?;
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        other => return Err(format!("Unknown duration unit '{}' in '{}'", other, raw)),
    };
    if value < 0 {
        return Err(format!("Duration '{}' is negative", raw));
    }
    value.checked_mul(scale).ok_or_else(|| format!("Duration '{}' overflows", raw))
}

pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(format!("Invalid bool '{}': expected true/false", raw)),
    }
}

pub fn parse_pubkey(raw: &str) -> Result<Pubkey, String> {
    decode_pubkey(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sol_amounts() {
        assert_eq!(parse_sol_amount("1").unwrap(), LAMPORTS_PER_SOL);
        assert_eq!(parse_sol_amount("1.5").unwrap(), 1_500_000_000);
        assert_eq!(parse_sol_amount("0.000000001").unwrap(), 1);
        assert_eq!(parse_sol_amount(".25").unwrap(), 250_000_000);
        assert_eq!(parse_sol_amount("42lamports").unwrap(), 42);
        assert!(parse_sol_amount("1.0000000001").is_err());
        assert!(parse_sol_amount("abc").is_err());
        assert!(parse_sol_amount("").is_err());
        assert!(parse_sol_amount("18446744074").is_err());
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration_secs("90").unwrap(), 90);
        assert_eq!(parse_duration_secs("2m").unwrap(), 120);
        assert_eq!(parse_duration_secs("1d").unwrap(), 86_400);
        assert!(parse_duration_secs("3w").is_err());
        assert!(parse_duration_secs("-5").is_err());
    }

    #[test]
    fn test_bools() {
        assert!(parse_bool("yes").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
