use crate::primitives::hash::sha256;
use crate::primitives::{MAC_KEY_SIZE, PRNG_KEY_SIZE};
use zeroize::ZeroizeOnDrop;

/// Key material derived from a passphrase.
///
/// The PRNG key seeds the AES-CTR keystream used for gap sampling and the
/// in-bucket draw; the MAC key turns node identities into PRNG counters.
/// The two are domain-separated so neither can stand in for the other.
#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct OpeKey {
    prng: [u8; PRNG_KEY_SIZE],
    mac: [u8; MAC_KEY_SIZE],
}

impl OpeKey {
    pub fn derive(passphrase: &[u8]) -> Self {
        let digest = sha256(passphrase);
        let mut prng = [0u8; PRNG_KEY_SIZE];
        prng.copy_from_slice(&digest[..PRNG_KEY_SIZE]);

        let mut salted = Vec::with_capacity(passphrase.len() + 1);
        salted.extend_from_slice(passphrase);
        salted.push(0x01);
        let mac = sha256(&salted);

        Self { prng, mac }
    }

    pub fn prng_key(&self) -> &[u8; PRNG_KEY_SIZE] {
        &self.prng
    }

    pub fn mac_key(&self) -> &[u8; MAC_KEY_SIZE] {
        &self.mac
    }
}
