use chrono::Utc;
use rand::Rng;

const PREFIX: &str = "BK";

/// `BK` + unix millis + a random suffix in `0..1000`. Not collision-free on
/// its own; the store retries on a uniqueness violation.
pub fn generate() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{PREFIX}{millis}{suffix}")
}

pub fn is_well_formed(id: &str) -> bool {
    match id.strip_prefix(PREFIX) {
        Some(digits) => {
            (14..=16).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
