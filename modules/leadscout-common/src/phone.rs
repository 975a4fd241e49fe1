/// Length of the local subscriber part checked separately for fake patterns.
/// Covers `99999-9999` style fillers behind a real country/area prefix.
pub const SUBSCRIBER_DIGITS: usize = 8;

/// Canonical form of a phone number: its ASCII digits, order preserved.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when a digits-only number looks fabricated.
///
/// Degenerate means every digit is the same (`9999999999`) or the digits form
/// a strictly sequential run up or down, wrapping 9↔0 (`1234567890`,
/// `9876543210`). The whole number and its trailing subscriber part are both
/// checked.
pub fn is_degenerate(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    if bytes.len() < 2 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    if degenerate_run(bytes) {
        return true;
    }
    bytes.len() > SUBSCRIBER_DIGITS && degenerate_run(&bytes[bytes.len() - SUBSCRIBER_DIGITS..])
}

fn degenerate_run(digits: &[u8]) -> bool {
    let steps: Vec<u8> = digits
        .windows(2)
        .map(|pair| (pair[1] + 10 - pair[0]) % 10)
        .collect();

    let Some(&first) = steps.first() else {
        return false;
    };
    // 0 = repeated digit, 1 = ascending, 9 = descending.
    matches!(first, 0 | 1 | 9) && steps.iter().all(|&s| s == first)
}
