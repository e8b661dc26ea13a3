use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::ope::Ope;
use crate::OpeError;

/// Characters a `StringOpe` plaintext may contain, in ASCII order so that
/// character order and digit order agree. Digit 0 of the encoding is
/// reserved for "no character", which makes every string sort before its
/// extensions ("AB" < "ABA").
pub const CHARSET: &str = " 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Wide enough for the 38-symbol base.
const BITS_PER_CHAR: u32 = 6;

/// Order-preserving encryption for short strings: plaintexts are encoded
/// as left-aligned base-38 integers and run through the numeric cipher, so
/// ciphertext order equals lexicographic order over [`CHARSET`]
/// (case-insensitive; input is uppercased first).
pub struct StringOpe {
    ope: Ope,
    max_len: usize,
}

impl StringOpe {
    pub fn new(passphrase: &[u8], max_len: usize) -> Result<Self, OpeError> {
        if max_len == 0 {
            return Err(OpeError::Domain(
                "maximum string length must be at least 1".into(),
            ));
        }
        let pbits = max_len as u32 * BITS_PER_CHAR;
        let cbits = pbits + 16;
        Ok(Self {
            ope: Ope::new(passphrase, pbits, cbits)?,
            max_len,
        })
    }

    pub fn encrypt_str(&self, s: &str) -> Result<BigUint, OpeError> {
        self.ope.encrypt(&self.encode(s)?)
    }

    pub fn decrypt_str(&self, ct: &BigUint) -> Result<String, OpeError> {
        let pt = self.ope.decrypt(ct)?;
        Ok(self.decode(&pt))
    }

    fn encode(&self, s: &str) -> Result<BigUint, OpeError> {
        let s = s.to_uppercase();
        let len = s.chars().count();
        if len > self.max_len {
            return Err(OpeError::Domain(format!(
                "string of {} characters exceeds the configured maximum {}",
                len, self.max_len
            )));
        }
        let base = BigUint::from(CHARSET.len() as u32 + 1);
        let mut acc = BigUint::zero();
        for ch in s.chars() {
            let idx = CHARSET.find(ch).ok_or_else(|| {
                OpeError::Domain(format!("character {:?} cannot be order-encoded", ch))
            })?;
            acc = acc * &base + (idx as u32 + 1);
        }
        // left-align so shorter strings pad with the empty digit
        for _ in len..self.max_len {
            acc *= &base;
        }
        Ok(acc)
    }

    fn decode(&self, v: &BigUint) -> String {
        let base = BigUint::from(CHARSET.len() as u32 + 1);
        let mut digits = Vec::with_capacity(self.max_len);
        let mut v = v.clone();
        for _ in 0..self.max_len {
            let digit = (&v % &base).to_u32().expect("digit below base");
            digits.push(digit);
            v /= &base;
        }
        digits.reverse();

        let bytes = CHARSET.as_bytes();
        let mut out = String::with_capacity(self.max_len);
        for digit in digits {
            if digit == 0 {
                break;
            }
            out.push(bytes[(digit - 1) as usize] as char);
        }
        out
    }
}
