use crate::config;

/// Compute the `signed_info` digest some endpoints expect alongside a
/// timestamp: the hex MD5 of api key + device UUID + timestamp, with the
/// shared key appended when the endpoint demands it. The digest is a
/// wire-format requirement of the service, not a security measure.
pub fn signed_info(device_uuid: &str, timestamp: i64, require_shared_key: bool) -> String {
    let mut input = format!("{}{}{}", config::API_KEY, device_uuid, timestamp);
    if require_shared_key {
        input.push_str(config::SHARED_KEY);
    }
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_info_is_stable() {
        let a = signed_info("dev-1", 1700000000, false);
        let b = signed_info("dev-1", 1700000000, false);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_shared_key_changes_digest() {
        let without = signed_info("dev-1", 1700000000, false);
        let with = signed_info("dev-1", 1700000000, true);
        assert_ne!(without, with);
    }

    #[test]
    fn test_inputs_change_digest() {
        let base = signed_info("dev-1", 1700000000, false);
        assert_ne!(base, signed_info("dev-2", 1700000000, false));
        assert_ne!(base, signed_info("dev-1", 1700000001, false));
    }
}
