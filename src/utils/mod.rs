pub mod hasher;
pub mod jwt;

use rand::RngCore;

pub use hasher::Sha256Hasher;
pub use jwt::{Claims, JwtTokenizer};

/// 生成 32 字节随机数并编码为 64 位十六进制字符串
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
