//! Display helpers shared by the session layer and the CLI.

use crate::types::Balance;

/// Format a planck amount with the network's decimals.
///
/// The fractional part keeps every significant digit and drops trailing
/// zeros, so `format_balance(12_300_000_000, 10)` gives `"1.23"`.
///
/// Past 38 decimals one whole unit no longer fits a `u128`, so every
/// amount is a pure fraction.
pub fn format_balance(amount: Balance, decimals: u8) -> String {
    let (whole, frac) = match 10u128.checked_pow(decimals.into()) {
        Some(divisor) => (amount / divisor, amount % divisor),
        None => (0, amount),
    };

    if frac == 0 {
        return whole.to_string();
    }

    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Shorten an address for logs and labels: first six and last four characters.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
