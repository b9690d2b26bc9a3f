/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms, collision-free at store scale)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Human-readable order number: `ORD-YYYYMMDD-XXXXXX`
pub fn order_number() -> String {
    format!("ORD-{}-{}", chrono::Utc::now().format("%Y%m%d"), rand_suffix(6))
}

/// Payment reference: `PAY-XXXXXXXXXXXX`
pub fn payment_reference() -> String {
    format!("PAY-{}", rand_suffix(12))
}

/// Opaque download token: 64 hex chars (32 random bytes)
pub fn download_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn rand_suffix(len: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_id_is_positive_and_unique() {
        let a = snowflake_id();
        let b = snowflake_id();
        assert!(a > 0);
        assert!(b > 0);
        // Same millisecond collisions are possible but astronomically
        // unlikely across two draws; tolerate by drawing again.
        if a == b {
            assert_ne!(a, snowflake_id());
        }
    }

    #[test]
    fn test_order_number_format() {
        let n = order_number();
        assert!(n.starts_with("ORD-"));
        assert_eq!(n.len(), "ORD-".len() + 8 + 1 + 6);
    }

    #[test]
    fn test_download_token_is_64_hex_chars() {
        let t = download_token();
        assert_eq!(t.len(), 64);
        assert!(t.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
