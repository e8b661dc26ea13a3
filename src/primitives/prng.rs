use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use zeroize::ZeroizeOnDrop;

use crate::primitives::{AesBlock, PRNG_KEY_SIZE};

/// AES-128 in counter mode, driven one block at a time.
///
/// The counter is a 128-bit big-endian integer incremented once per block.
/// `set_ctr` replaces it wholesale, which is how each partition node
/// re-seeds the stream independently of traversal history.
#[derive(ZeroizeOnDrop)]
pub struct BlockRng {
    cipher: Aes128,
    ctr: u128,
}

impl BlockRng {
    pub fn new(key: &[u8; PRNG_KEY_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(key.into()),
            ctr: 0,
        }
    }

    pub fn set_ctr(&mut self, ctr: AesBlock) {
        self.ctr = u128::from_be_bytes(ctr);
    }

    pub fn next_block(&mut self) -> AesBlock {
        let mut block = self.ctr.to_be_bytes();
        self.cipher.encrypt_block((&mut block).into());
        self.ctr = self.ctr.wrapping_add(1);
        block
    }

    /// Uniform in `[0, 1)` with 53 bits of precision, from one keystream
    /// block.
    pub fn next_f64(&mut self) -> f64 {
        let block = self.next_block();
        let mut hi = [0u8; 8];
        hi.copy_from_slice(&block[..8]);
        (u64::from_be_bytes(hi) >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform in `[0, n)` by rejection: draw `ceil(log2(n)/128)` blocks,
    /// redraw while the value falls in the tail above the largest multiple
    /// of `n`. Rejects with probability < 1/2 per attempt.
    pub fn rand_mod(&mut self, n: &BigUint) -> BigUint {
        assert!(!n.is_zero(), "rand_mod: modulus must be positive");
        let blocks = ((n - 1u32).bits() + 127) / 128;
        let limit = ((BigUint::one() << (128 * blocks)) / n) * n;
        loop {
            let mut buf = Vec::with_capacity(16 * blocks as usize);
            for _ in 0..blocks {
                buf.extend_from_slice(&self.next_block());
            }
            let draw = BigUint::from_bytes_be(&buf);
            if draw < limit {
                return draw % n;
            }
        }
    }
}
