/*
 * Conversions at the crate boundary.
 *
 * Callers on the far side of a runtime bridge exchange decimal strings
 * (the one integer format every environment agrees on), and stores that
 * index ciphertexts usually want fixed-width big-endian buffers so that
 * byte order matches numeric order. Both directions live here.
 */

use num_bigint::BigUint;

use crate::OpeError;

pub fn parse_dec(s: &str) -> Result<BigUint, OpeError> {
    s.parse()
        .map_err(|_| OpeError::Parse(format!("not an unsigned decimal integer: {:?}", s)))
}

pub fn to_dec(n: &BigUint) -> String {
    n.to_str_radix(10)
}

/// Big-endian bytes left-padded to exactly `len`.
pub fn to_be_bytes_padded(n: &BigUint, len: usize) -> Result<Vec<u8>, OpeError> {
    let raw = n.to_bytes_be();
    let raw = if n.bits() == 0 { &[][..] } else { &raw[..] };
    if raw.len() > len {
        return Err(OpeError::Domain(format!(
            "value {} does not fit in {} bytes",
            n, len
        )));
    }
    let mut out = vec![0u8; len];
    out[len - raw.len()..].copy_from_slice(raw);
    Ok(out)
}
