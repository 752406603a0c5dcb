use chrono::Utc;
use rand::Rng;

const TAG_LENGTH: usize = 8;
const TAG_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates `<prefix->component-YYYYMMDDHHMMSS-xxxxxxxx`.
///
/// Uniqueness rests on the random tag only; a collision is rejected by the
/// API server when the resource is created.
pub fn generate_name(prefix: Option<&str>, component_name: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let tag = random_tag(TAG_LENGTH);
    match prefix {
        Some(prefix) => format!("{prefix}-{component_name}-{timestamp}-{tag}"),
        None => format!("{component_name}-{timestamp}-{tag}"),
    }
}

fn random_tag(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| TAG_CHARSET[rng.random_range(0..TAG_CHARSET.len())] as char)
        .collect()
}
