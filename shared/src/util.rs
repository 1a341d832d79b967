use rand::Rng;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a local order id (assigned by the local hub).
pub fn new_order_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a cloud order id: `CLOUD-<epoch ms>-<9 base36 chars>`.
///
/// Unique with overwhelming probability within the relay's lifetime, not
/// guaranteed. The relay only keeps these in memory, so that is enough.
pub fn cloud_order_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("CLOUD-{}-{}", now_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_order_id_format() {
        let id = cloud_order_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "CLOUD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn test_cloud_order_ids_differ() {
        let a = cloud_order_id();
        let b = cloud_order_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_order_id_is_uuid() {
        let id = new_order_id();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }
}
