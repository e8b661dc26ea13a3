use std::cell::RefCell;
use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::convert::to_dec;
use crate::primitives::hash::{hmac_sha256, sha256};
use crate::primitives::hgd::hgd;
use crate::primitives::kdf::OpeKey;
use crate::primitives::prng::BlockRng;
use crate::OpeError;

/// Implementation-defined ceiling on the ciphertext width. The sampler
/// tolerates populations this wide; nothing above it has been exercised.
pub const MAX_CBITS: u32 = 4096;

/// A resolved leaf of the partition: plaintext `d` owns the ciphertext
/// bucket `[r_lo, r_hi]`.
pub(crate) struct OpeDomainRange {
    pub(crate) d: BigUint,
    pub(crate) r_lo: BigUint,
    pub(crate) r_hi: BigUint,
}

/// Order-preserving cipher over `[0, 2^pbits)` into `[0, 2^cbits)`.
///
/// Deterministic on (passphrase, pbits, cbits, plaintext): for `a < b`,
/// `encrypt(a) < encrypt(b)`, and two instances built from the same
/// passphrase produce identical ciphertexts. The gap cache gives an
/// instance interior mutability, so it is deliberately not `Sync`; build
/// one instance per thread (they agree bit-for-bit) or serialise access
/// externally.
pub struct Ope {
    key: OpeKey,
    pbits: u32,
    cbits: u32,
    dgap_cache: RefCell<HashMap<BigUint, BigUint>>,
}

impl Ope {
    pub fn new(passphrase: &[u8], pbits: u32, cbits: u32) -> Result<Self, OpeError> {
        if pbits == 0 {
            return Err(OpeError::Domain(
                "plaintext width must be at least 1 bit".into(),
            ));
        }
        if cbits < pbits {
            return Err(OpeError::Domain(format!(
                "ciphertext width {} is narrower than plaintext width {}",
                cbits, pbits
            )));
        }
        if cbits > MAX_CBITS {
            return Err(OpeError::Domain(format!(
                "ciphertext width {} exceeds the supported maximum {}",
                cbits, MAX_CBITS
            )));
        }
        Ok(Self {
            key: OpeKey::derive(passphrase),
            pbits,
            cbits,
            dgap_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn pbits(&self) -> u32 {
        self.pbits
    }

    pub fn cbits(&self) -> u32 {
        self.cbits
    }

    pub fn encrypt(&self, pt: &BigUint) -> Result<BigUint, OpeError> {
        if pt.bits() > self.pbits as u64 {
            return Err(OpeError::Domain(format!(
                "plaintext {} does not fit in {} bits",
                pt, self.pbits
            )));
        }
        let dr = self.search(|d, _| pt < d)?;

        /* A fresh stream for the in-bucket draw, counter bound to the
         * plaintext alone so the pick cannot depend on search state. */
        let digest = sha256(to_dec(pt).as_bytes());
        let mut ctr = [0u8; 16];
        ctr.copy_from_slice(&digest[..16]);
        let mut prng = BlockRng::new(self.key.prng_key());
        prng.set_ctr(ctr);

        let width = &dr.r_hi - &dr.r_lo + 1u32;
        Ok(&dr.r_lo + prng.rand_mod(&width))
    }

    pub fn decrypt(&self, ct: &BigUint) -> Result<BigUint, OpeError> {
        if ct.bits() > self.cbits as u64 {
            return Err(OpeError::Domain(format!(
                "ciphertext {} does not fit in {} bits",
                ct, self.cbits
            )));
        }
        let dr = self.search(|_, r| ct < r)?;
        Ok(dr.d)
    }

    pub(crate) fn search<F>(&self, go_low: F) -> Result<OpeDomainRange, OpeError>
    where
        F: Fn(&BigUint, &BigUint) -> bool,
    {
        let mut prng = BlockRng::new(self.key.prng_key());
        self.lazy_sample(
            BigUint::zero(),
            (BigUint::one() << self.pbits) - 1u32,
            BigUint::zero(),
            (BigUint::one() << self.cbits) - 1u32,
            go_low,
            &mut prng,
        )
    }

    fn lazy_sample<F>(
        &self,
        mut d_lo: BigUint,
        mut d_hi: BigUint,
        mut r_lo: BigUint,
        mut r_hi: BigUint,
        go_low: F,
        prng: &mut BlockRng,
    ) -> Result<OpeDomainRange, OpeError>
    where
        F: Fn(&BigUint, &BigUint) -> bool,
    {
        loop {
            let ndomain = &d_hi - &d_lo + 1u32;
            let nrange = &r_hi - &r_lo + 1u32;
            if nrange < ndomain {
                return Err(OpeError::Internal(format!(
                    "partition node [{}..{}] -> [{}..{}] holds more plaintexts than slots",
                    d_lo, d_hi, r_lo, r_hi
                )));
            }
            if ndomain.is_one() {
                return Ok(OpeDomainRange { d: d_lo, r_lo, r_hi });
            }

            /* Re-seed deterministically at every node, whether or not the
             * previous round consumed keystream for its gap draw. */
            let tag = hmac_sha256(
                self.key.mac_key(),
                format!("{}/{}/{}/{}", d_lo, d_hi, r_lo, r_hi).as_bytes(),
            );
            let mut ctr = [0u8; 16];
            ctr.copy_from_slice(&tag[..16]);
            prng.set_ctr(ctr);

            let rgap = &nrange / 2u32;
            let r_mid = &r_lo + &rgap;

            let cached = self.dgap_cache.borrow().get(&r_mid).cloned();
            let dgap = match cached {
                Some(gap) => gap,
                None => {
                    let gap = domain_gap(&ndomain, &nrange, &rgap, prng)?;
                    self.dgap_cache.borrow_mut().insert(r_mid.clone(), gap.clone());
                    gap
                }
            };
            let d_mid = &d_lo + &dgap;

            /* A zero or full gap leaves one child without plaintexts; the
             * walk must follow the populated side or ciphertext slots in
             * the orphaned child would never resolve. For encryption the
             * predicate already agrees. */
            let low = if dgap.is_zero() {
                false
            } else if dgap == ndomain {
                true
            } else {
                go_low(&d_mid, &r_mid)
            };

            if low {
                d_hi = &d_mid - 1u32;
                r_hi = &r_mid - 1u32;
            } else {
                d_lo = d_mid;
                r_lo = r_mid;
            }
        }
    }
}

/// A gap is the count of plaintexts that fall left of a range midpoint,
/// hypergeometric over the node's population.
fn domain_gap(
    ndomain: &BigUint,
    nrange: &BigUint,
    rgap: &BigUint,
    prng: &mut BlockRng,
) -> Result<BigUint, OpeError> {
    hgd(rgap, ndomain, &(nrange - ndomain), prng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;

    fn ope(pbits: u32, cbits: u32) -> Ope {
        Ope::new(b"hello world", pbits, cbits).unwrap()
    }

    quickcheck! {
        fn round_trip_u32(x: u32) -> bool {
            let o = ope(32, 64);
            let pt = BigUint::from(x);
            o.decrypt(&o.encrypt(&pt).unwrap()).unwrap() == pt
        }

        fn order_is_preserved(x: u32, y: u32) -> TestResult {
            if x == y {
                return TestResult::discard();
            }
            let o = ope(32, 64);
            let a = o.encrypt(&BigUint::from(x)).unwrap();
            let b = o.encrypt(&BigUint::from(y)).unwrap();
            TestResult::from_bool((x < y) == (a < b))
        }

        fn ciphertext_stays_in_range(x: u16) -> bool {
            let o = ope(16, 48);
            o.encrypt(&BigUint::from(x)).unwrap().bits() <= 48
        }

        fn instances_agree(x: u32) -> bool {
            let a = ope(32, 64);
            let b = ope(32, 64);
            a.encrypt(&BigUint::from(x)).unwrap() == b.encrypt(&BigUint::from(x)).unwrap()
        }
    }

    #[test]
    fn bucket_ranges_are_disjoint_and_ordered() {
        let o = ope(8, 20);
        let mut prev_hi: Option<BigUint> = None;
        for pt in 0u32..64 {
            let pt = BigUint::from(pt);
            let dr = o.search(|d, _| &pt < d).unwrap();
            assert_eq!(dr.d, pt);
            assert!(dr.r_lo <= dr.r_hi);
            if let Some(hi) = prev_hi {
                assert!(hi < dr.r_lo);
            }
            prev_hi = Some(dr.r_hi);
        }
    }

    #[test]
    fn cache_contents_do_not_depend_on_order() {
        let a = ope(16, 40);
        let b = ope(16, 40);
        for pt in [7u32, 3, 9, 1, 5] {
            a.encrypt(&BigUint::from(pt)).unwrap();
        }
        for pt in [5u32, 1, 9, 3, 7] {
            b.encrypt(&BigUint::from(pt)).unwrap();
        }
        assert_eq!(*a.dgap_cache.borrow(), *b.dgap_cache.borrow());
    }

    #[test]
    fn decrypt_is_total_and_monotone() {
        let o = ope(4, 16);
        let mut prev = BigUint::zero();
        let mut ct = 0u32;
        while ct < 1 << 16 {
            let pt = o.decrypt(&BigUint::from(ct)).unwrap();
            assert!(pt.bits() <= 4);
            assert!(pt >= prev, "decrypt went backwards at ct={}", ct);
            prev = pt;
            ct += 97;
        }
    }

    #[test]
    fn identity_when_widths_match() {
        let o = ope(4, 4);
        for x in 0u32..16 {
            assert_eq!(o.encrypt(&BigUint::from(x)).unwrap(), BigUint::from(x));
        }
    }

    #[test]
    fn rejects_bad_widths() {
        assert!(matches!(Ope::new(b"pw", 0, 4), Err(OpeError::Domain(_))));
        assert!(matches!(Ope::new(b"pw", 8, 4), Err(OpeError::Domain(_))));
        assert!(matches!(
            Ope::new(b"pw", 8, MAX_CBITS + 1),
            Err(OpeError::Domain(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let o = ope(8, 16);
        assert!(matches!(
            o.encrypt(&BigUint::from(256u32)),
            Err(OpeError::Domain(_))
        ));
        assert!(o.encrypt(&BigUint::from(255u32)).is_ok());
        assert!(matches!(
            o.decrypt(&(BigUint::one() << 16)),
            Err(OpeError::Domain(_))
        ));
    }
}
