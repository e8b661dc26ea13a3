use num_bigint::BigUint;

use crate::ope::Ope;
use crate::OpeError;

/// Convenience sugar so callers holding machine integers don't have to
/// spell out the `BigUint` conversions.
pub trait OpeEncrypt {
    fn encrypt_with(&self, cipher: &Ope) -> Result<BigUint, OpeError>;
}

impl OpeEncrypt for u64 {
    fn encrypt_with(&self, cipher: &Ope) -> Result<BigUint, OpeError> {
        cipher.encrypt(&BigUint::from(*self))
    }
}

impl OpeEncrypt for u32 {
    fn encrypt_with(&self, cipher: &Ope) -> Result<BigUint, OpeError> {
        cipher.encrypt(&BigUint::from(*self))
    }
}

impl OpeEncrypt for BigUint {
    fn encrypt_with(&self, cipher: &Ope) -> Result<BigUint, OpeError> {
        cipher.encrypt(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_agree() {
        let ope = Ope::new(b"hello world", 32, 64).unwrap();
        let a = 1234u32.encrypt_with(&ope).unwrap();
        let b = 1234u64.encrypt_with(&ope).unwrap();
        let c = BigUint::from(1234u32).encrypt_with(&ope).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn width_check_still_applies() {
        let ope = Ope::new(b"hello world", 8, 16).unwrap();
        assert!(300u32.encrypt_with(&ope).is_err());
    }
}
