//! Order-preserving encryption after Boldyreva, Chenette, Lee and O'Neill:
//! a deterministic keyed map from `[0, 2^pbits)` into `[0, 2^cbits)` that
//! keeps numeric order, so an untrusted store can answer range and sort
//! queries over ciphertexts. Order is leaked by design; nothing stronger
//! is claimed.

mod convert;
mod encrypt;
mod ope;
pub mod primitives;
mod text;

pub use crate::convert::{parse_dec, to_be_bytes_padded, to_dec};
pub use crate::encrypt::OpeEncrypt;
pub use crate::ope::{Ope, MAX_CBITS};
pub use crate::text::{StringOpe, CHARSET};

use num_bigint::BigUint;
use rand::RngCore;
use thiserror::Error;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

#[derive(Debug, Error)]
pub enum OpeError {
    /// A decimal string failed to parse.
    #[error("parse error: {0}")]
    Parse(String),
    /// Input outside the configured plaintext or ciphertext space.
    #[error("domain error: {0}")]
    Domain(String),
    /// An invariant broke; indicates a bug, not bad input.
    #[error("internal error: {0}")]
    Internal(String),
}

/// String-bridged encryption: parse a decimal plaintext, encrypt it under
/// a cipher derived from `passphrase`, and hand the ciphertext back as
/// decimal. Callers across runtime boundaries exchange decimal strings to
/// keep binary formats out of the contract.
pub fn encrypt_decimal(
    passphrase: &[u8],
    plaintext: &str,
    pbits: u32,
    cbits: u32,
) -> Result<String, OpeError> {
    let pt = parse_dec(plaintext)?;
    let ope = Ope::new(passphrase, pbits, cbits)?;
    Ok(to_dec(&ope.encrypt(&pt)?))
}

pub fn decrypt_decimal(
    passphrase: &[u8],
    ciphertext: &str,
    pbits: u32,
    cbits: u32,
) -> Result<String, OpeError> {
    let ct = parse_dec(ciphertext)?;
    let ope = Ope::new(passphrase, pbits, cbits)?;
    Ok(to_dec(&ope.decrypt(&ct)?))
}

/// Round-trip `iters` random plaintexts and report the worst relative
/// error of the naive scale-down guess `ct / 2^(cbits-pbits)` — a crude
/// leakage proxy, not a security measure. Zero plaintexts are skipped in
/// the maximum (the guess ratio is undefined there). A failed round trip
/// is reported as an internal error.
pub fn self_test<R: RngCore>(
    rng: &mut R,
    passphrase: &[u8],
    pbits: u32,
    cbits: u32,
    iters: u32,
) -> Result<f64, OpeError> {
    use num_traits::ToPrimitive;

    let ope = Ope::new(passphrase, pbits, cbits)?;
    let mut max_err = 0.0f64;
    for _ in 0..iters {
        let mut bytes = vec![0u8; (pbits as usize + 7) / 8];
        rng.fill_bytes(&mut bytes);
        let excess = bytes.len() as u32 * 8 - pbits;
        bytes[0] &= 0xff >> excess;
        let pt = BigUint::from_bytes_be(&bytes);

        let ct = ope.encrypt(&pt)?;
        let back = ope.decrypt(&ct)?;
        if back != pt {
            return Err(OpeError::Internal(format!(
                "round trip failed: {} -> {} -> {}",
                pt, ct, back
            )));
        }

        if pt.bits() == 0 {
            continue;
        }
        let guess = (&ct >> (cbits - pbits)).to_f64().unwrap_or(f64::INFINITY);
        let err = (guess / pt.to_f64().unwrap_or(f64::INFINITY) - 1.0).abs();
        max_err = max_err.max(err);
    }
    Ok(max_err)
}
