pub mod hash;
pub mod hgd;
pub mod kdf;
pub mod prng;

pub type AesBlock = [u8; 16];

pub const PRNG_KEY_SIZE: usize = 16;
pub const MAC_KEY_SIZE: usize = 32;
