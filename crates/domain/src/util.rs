use sha2::{Digest, Sha256};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

pub fn uuid_v7_without_dashes() -> String {
    Uuid::now_v7().simple().to_string()
}

pub fn new_edit_token() -> String {
    Uuid::new_v4().to_string()
}

pub fn format_ms_rfc3339(epoch_ms: i64) -> String {
    let fallback = OffsetDateTime::from_unix_timestamp(0).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let value =
        OffsetDateTime::from_unix_timestamp_nanos(epoch_ms as i128 * 1_000_000).unwrap_or(fallback);
    value
        .format(&Rfc3339)
        .unwrap_or("1970-01-01T00:00:00Z".to_string())
}

/// Salted SHA-256 of a client address. Raw addresses are never stored.
pub fn hash_client_ip(salt: &str, ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_ip_depends_on_salt_and_address() {
        let first = hash_client_ip("salt-a", "203.0.113.7");
        assert_eq!(first.len(), 64);
        assert_eq!(first, hash_client_ip("salt-a", "203.0.113.7"));
        assert_ne!(first, hash_client_ip("salt-b", "203.0.113.7"));
        assert_ne!(first, hash_client_ip("salt-a", "203.0.113.8"));
    }

    #[test]
    fn hashed_ip_matches_salt_prefixed_digest() {
        assert_eq!(
            hash_client_ip("", "abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn rfc3339_formats_epoch_millis() {
        assert_eq!(format_ms_rfc3339(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_ms_rfc3339(86_400_000), "1970-01-02T00:00:00Z");
    }

    #[test]
    fn prompt_ids_are_compact_and_unique() {
        let first = uuid_v7_without_dashes();
        assert_eq!(first.len(), 32);
        assert!(!first.contains('-'));
        assert_ne!(first, uuid_v7_without_dashes());
    }
}
