use sha2::{Digest, Sha256};

/// 带盐的确定性哈希，用于用户密码与笔记密码
#[derive(Clone)]
pub struct Sha256Hasher {
    salt: String,
}

impl Sha256Hasher {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn hash(&self, input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// 空哈希永远不匹配
    pub fn compare(&self, hash: &str, input: &str) -> bool {
        if hash.is_empty() {
            return false;
        }
        constant_time_eq(self.hash(input).as_bytes(), hash.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_salted() {
        let hasher = Sha256Hasher::new("pepper");
        assert_eq!(hasher.hash("secret"), hasher.hash("secret"));
        assert_eq!(hasher.hash("secret").len(), 64);
        assert_ne!(hasher.hash("secret"), Sha256Hasher::new("salt").hash("secret"));
    }

    #[test]
    fn compare_matches_only_the_hashed_input() {
        let hasher = Sha256Hasher::new("pepper");
        let hash = hasher.hash("secret");
        assert!(hasher.compare(&hash, "secret"));
        assert!(!hasher.compare(&hash, "Secret"));
        assert!(!hasher.compare(&hash, ""));
        assert!(!hasher.compare("", ""));
    }
}
