pub mod url_validator;

pub use url_validator::{DestinationError, validate_destination};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// 生成指定长度的字母数字短码
pub fn generate_random_code(length: usize) -> String {
    std::iter::repeat_with(|| CODE_ALPHABET[rand::random_range(0..CODE_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// 短码只允许 ASCII 字母与数字，长度 1..=max_len
pub fn is_valid_short_code(code: &str, max_len: usize) -> bool {
    !code.is_empty() && code.len() <= max_len && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
