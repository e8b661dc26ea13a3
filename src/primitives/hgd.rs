//! Hypergeometric sampling over arbitrary-precision populations.
//!
//! `hgd(k, n1, n2)` draws the number of white balls obtained when `k` balls
//! are taken without replacement from an urn of `n1` white and `n2` black
//! balls, using the caller's keystream as the only entropy source.
//! Populations can be thousands of bits wide; the urn is never
//! materialised.
//!
//! Three regimes: exact sequential trials when any side of the urn is
//! small (reached through the urn symmetries, so a tiny domain inside an
//! astronomical range still takes the exact path), inverse-CDF when the
//! mode sits against zero, and the Kachitvichyanukul–Schmeiser H2PE
//! rejection scheme (mode-centred rectangle plus exponential tails)
//! otherwise. Population-scale quantities stay in `BigUint`; only
//! mode-relative offsets and log-ratios pass through `f64`.

use num_bigint::BigUint;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::primitives::prng::BlockRng;
use crate::OpeError;

/// Sequential-trial cutoff: below this many draws the urn is walked
/// directly.
const EXACT_DRAW_LIMIT: u64 = 10;

/// Inverse-CDF cutoff on the (reduced) mode.
const INVERSE_MODE_LIMIT: u64 = 10;

/// H2PE has a constant expected number of rejections; hitting this many is
/// an invariant breach, not bad luck.
const MAX_REJECT_ROUNDS: u32 = 1000;

const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;

pub fn hgd(
    k: &BigUint,
    n1: &BigUint,
    n2: &BigUint,
    prng: &mut BlockRng,
) -> Result<BigUint, OpeError> {
    let tn = n1 + n2;
    if k > &tn {
        return Err(OpeError::Internal(format!(
            "hypergeometric draw count {} exceeds population {}",
            k, tn
        )));
    }
    if n1.is_zero() || k.is_zero() {
        return Ok(BigUint::zero());
    }
    if n2.is_zero() {
        return Ok(k.clone());
    }
    if *k == tn {
        return Ok(n1.clone());
    }

    let rest = &tn - k;

    /* Exact path from whichever side of the urn is small, via the urn
     * symmetries: role swap HGD(k;n1,n2) = HGD(n1;k,tn-k), colour swap
     * = k - HGD(k;n2,n1), complement = n1 - HGD(tn-k;n1,n2). */
    if let Some(draws) = small_draws(k) {
        return Ok(trials(draws, n1, &tn, prng));
    }
    if let Some(draws) = small_draws(n1) {
        return Ok(trials(draws, k, &tn, prng));
    }
    if let Some(draws) = small_draws(n2) {
        return Ok(k - trials(draws, k, &tn, prng));
    }
    if let Some(draws) = small_draws(&rest) {
        return Ok(n1 - trials(draws, n1, &tn, prng));
    }

    reduced(k, n1, n2, &tn, prng)
}

fn small_draws(x: &BigUint) -> Option<u64> {
    x.to_u64().filter(|v| *v <= EXACT_DRAW_LIMIT)
}

/// Walk the urn: `draws` takes, each hitting the `white` region of a
/// `total`-sized urn with the exact conditional probability.
fn trials(draws: u64, white: &BigUint, total: &BigUint, prng: &mut BlockRng) -> BigUint {
    let mut white = white.clone();
    let mut total = total.clone();
    let mut hits = BigUint::zero();
    for _ in 0..draws {
        if white.is_zero() {
            break;
        }
        if prng.rand_mod(&total) < white {
            hits += 1u32;
            white -= 1u32;
        }
        total -= 1u32;
    }
    hits
}

/// Reduce to the canonical parameterisation (`n1 <= n2`, `2k <= tn`),
/// sample there, then undo the transforms.
fn reduced(
    k: &BigUint,
    n1: &BigUint,
    n2: &BigUint,
    tn: &BigUint,
    prng: &mut BlockRng,
) -> Result<BigUint, OpeError> {
    let swapped = n1 > n2;
    let (rn1, rn2) = if swapped { (n2, n1) } else { (n1, n2) };
    let complement = k * 2u32 > *tn;
    let rk = if complement { tn - k } else { k.clone() };

    let ix = sample_canonical(&rk, rn1, rn2, tn, prng)?;

    Ok(match (complement, swapped) {
        (true, true) => (k - n2) + ix,
        (true, false) => n1 - ix,
        (false, true) => k - ix,
        (false, false) => ix,
    })
}

fn sample_canonical(
    k: &BigUint,
    n1: &BigUint,
    n2: &BigUint,
    tn: &BigUint,
    prng: &mut BlockRng,
) -> Result<BigUint, OpeError> {
    // mode of the distribution, exact
    let m = ((k + 1u32) * (n1 + 1u32)) / (tn + 2u32);
    if m.to_u64().map_or(false, |m| m < INVERSE_MODE_LIMIT) {
        inverse_cdf(k, n1, n2, prng)
    } else {
        h2pe(k, n1, n2, tn, &m, prng)
    }
}

/// Inverse-CDF walk from zero. Only entered when the mode is against the
/// lower edge, so the expected number of steps is a small constant.
fn inverse_cdf(
    k: &BigUint,
    n1: &BigUint,
    n2: &BigUint,
    prng: &mut BlockRng,
) -> Result<BigUint, OpeError> {
    let n1f = big_to_f64(n1);
    // ln pmf(0) = ln C(n2,k) - ln C(tn,k), regrouped into two factorial
    // ratios whose widths are n1
    let n2k = n2 - k;
    let ln_p0 = afc_delta(&n2k, n1f) - afc_delta(n2, n1f);
    let maxjx = k.min(n1).clone();

    let u = prng.next_f64();
    let mut ix = BigUint::zero();
    let mut p = ln_p0.exp();
    let mut cdf = p;
    loop {
        if u <= cdf || ix == maxjx {
            return Ok(ix);
        }
        // p(ix+1)/p(ix) = (n1-ix)(k-ix) / ((ix+1)(n2-k+ix+1))
        let num = (n1 - &ix) * (k - &ix);
        let den = (&ix + 1u32) * (&n2k + &ix + 1u32);
        p *= ratio_f64(&num, &den);
        ix += 1u32;
        cdf += p;
        if p < f64::MIN_POSITIVE {
            // the remaining tail is below representable mass
            return Ok(ix);
        }
    }
}

/// A signed offset from the mode.
struct Off {
    neg: bool,
    mag: BigUint,
}

impl Off {
    fn apply(&self, m: &BigUint) -> Option<BigUint> {
        if self.neg {
            if self.mag > *m {
                None
            } else {
                Some(m - &self.mag)
            }
        } else {
            Some(m + &self.mag)
        }
    }

    fn signed_f64(&self) -> f64 {
        let v = big_to_f64(&self.mag);
        if self.neg {
            -v
        } else {
            v
        }
    }

    /// The offset in window units (multiples of the deviation scale `s`).
    fn hat(&self, s: &BigUint) -> f64 {
        let v = ratio_f64(&self.mag, s);
        if self.neg {
            -v
        } else {
            v
        }
    }
}

/// The sampling window around the mode. `pmf(m + e)` is built from the
/// factorials of `m + e`, `n1 - m - e`, `k - m - e` and `n2 - k + m + e`;
/// those four anchors, the deviation scale and the log-pmf curvature are
/// everything the envelope and the acceptance test need.
struct Window {
    a1: BigUint, // m
    a2: BigUint, // n1 - m
    a3: BigUint, // k - m
    a4: BigUint, // n2 - k + m
    s: BigUint,  // deviation scale, >= 1
    /// Whether offsets are small enough for term-by-term Stirling
    /// differences to stay within f64 range.
    precise: bool,
    /// Curvature of the log-pmf at the mode in window units,
    /// `s^2 * (1/a1 + 1/a2 + 1/a3 + 1/a4)`; close to 1 by construction.
    quad: f64,
}

impl Window {
    /// ln pmf(m + e) - ln pmf(m)
    fn log_pmf_ratio(&self, e: &Off) -> f64 {
        if self.precise {
            let ef = e.signed_f64();
            let terms = [
                afc_delta(&self.a1, ef),
                afc_delta(&self.a2, -ef),
                afc_delta(&self.a3, -ef),
                afc_delta(&self.a4, ef),
            ];
            if terms.iter().any(|t| *t == f64::INFINITY) {
                // a factorial pole: pmf(m + e) is zero
                return f64::NEG_INFINITY;
            }
            -terms.iter().sum::<f64>()
        } else {
            /* At this width individual Stirling terms overflow f64, but
             * the anchors all dwarf the window (a_min >= s^2), so the
             * log-pmf is quadratic to within ~|e|/a_min of itself. */
            let eh = e.hat(&self.s);
            -0.5 * self.quad * eh * eh
        }
    }
}

/// H2PE rejection: a uniform rectangle of half-width ~1.5 deviations
/// around the mode plus exponential tails pinned to the pmf slope at the
/// rectangle edges. Rectangle positions are drawn with `rand_mod`, so the
/// proposal stays exact however wide the window is. The squeeze shortcuts
/// of the published algorithm are omitted; every candidate is settled by
/// the log-pmf comparison, so the accepted distribution is unchanged.
fn h2pe(
    k: &BigUint,
    n1: &BigUint,
    n2: &BigUint,
    tn: &BigUint,
    m: &BigUint,
    prng: &mut BlockRng,
) -> Result<BigUint, OpeError> {
    let maxjx = k.min(n1).clone();

    let var_num = (tn - k) * k * n1 * n2;
    let var_den = (tn - 1u32) * tn * tn;
    let s = (&var_num / &var_den).sqrt() + 1u32;
    let di = (&s * 3u32) / 2u32 + 1u32;

    let a1 = m.clone();
    let a2 = n1 - m;
    let a3 = k - m;
    let a4 = (n2 - k) + m;
    let quad = {
        let p234 = &a2 * &a3 * &a4;
        let p134 = &a1 * &a3 * &a4;
        let p124 = &a1 * &a2 * &a4;
        let p123 = &a1 * &a2 * &a3;
        let den = &a1 * &p234;
        ratio_f64(&((&s * &s) * (p234 + p134 + p124 + p123)), &den)
    };
    let window = Window {
        a1,
        a2,
        a3,
        a4,
        s: s.clone(),
        precise: di.bits() <= 26,
        quad,
    };

    let di_hat = ratio_f64(&di, &s);
    let left_edge = Off {
        neg: true,
        mag: di.clone(),
    };
    let right_edge = Off {
        neg: false,
        mag: di.clone(),
    };
    let kl = window.log_pmf_ratio(&left_edge).exp();
    let kr = window.log_pmf_ratio(&right_edge).exp();

    // tail rates, expressed per window unit
    let (lam_l_hat, lam_r_hat) = if window.precise {
        let dif = big_to_f64(&di);
        let sf = big_to_f64(&s);
        let lam_l = -(ln_off(&window.a1, -dif) + ln_off(&window.a4, -dif)
            - ln_off(&window.a2, dif + 1.0)
            - ln_off(&window.a3, dif + 1.0));
        let lam_r = -(ln_off(&window.a2, -dif) + ln_off(&window.a3, -dif)
            - ln_off(&window.a1, dif + 1.0)
            - ln_off(&window.a4, dif + 1.0));
        (lam_l * sf, lam_r * sf)
    } else {
        (quad * di_hat, quad * di_hat)
    };

    let rect_width = &di * 2u32 + 1u32;
    let p1 = ratio_f64(&rect_width, &s);
    let mut wl = kl / lam_l_hat;
    if !wl.is_finite() || wl < 0.0 {
        wl = 0.0;
    }
    let mut wr = kr / lam_r_hat;
    if !wr.is_finite() || wr < 0.0 {
        wr = 0.0;
    }
    let p2 = p1 + wl;
    let p3 = p2 + wr;

    for _ in 0..MAX_REJECT_ROUNDS {
        let u = prng.next_f64() * p3;
        let v = prng.next_f64();
        if v == 0.0 {
            continue;
        }

        let (e, accept_v) = if u <= p1 {
            // uniform over the rectangle, exact at any width
            let off = prng.rand_mod(&rect_width);
            let e = if off >= di {
                Off {
                    neg: false,
                    mag: &off - &di,
                }
            } else {
                Off {
                    neg: true,
                    mag: &di - &off,
                }
            };
            (e, v)
        } else if u <= p2 {
            let w = tail_steps(&window.s, -v.ln() / lam_l_hat);
            let e = Off {
                neg: true,
                mag: &di + w + 1u32,
            };
            (e, v * (u - p1) * lam_l_hat)
        } else {
            let w = tail_steps(&window.s, -v.ln() / lam_r_hat);
            let e = Off {
                neg: false,
                mag: &di + w + 1u32,
            };
            (e, v * (u - p2) * lam_r_hat)
        };

        let ix = match e.apply(m) {
            Some(ix) => ix,
            None => continue,
        };
        if ix > maxjx {
            continue;
        }

        if accept_v.ln() <= window.log_pmf_ratio(&e) {
            return Ok(ix);
        }
    }

    Err(OpeError::Internal(format!(
        "hypergeometric rejection sampler failed to converge (k={}, n1={}, n2={})",
        k, n1, n2
    )))
}

/// floor(w_hat * s): a tail excursion of `w_hat` window units, as an
/// integer step count.
fn tail_steps(s: &BigUint, w_hat: f64) -> BigUint {
    if !w_hat.is_finite() || w_hat <= 0.0 {
        if w_hat.is_finite() {
            return BigUint::zero();
        }
        // degenerate rate: push the candidate out of the window instead
        return s << 64;
    }
    let scaled = BigUint::from_f64(w_hat * 4_294_967_296.0).unwrap_or_default();
    (s * scaled) >> 32
}

/// Natural log of a positive `BigUint`, full exponent range, 53-bit
/// mantissa.
fn ln_big(x: &BigUint) -> f64 {
    let bits = x.bits();
    if bits <= 53 {
        return x.to_f64().unwrap_or(0.0).ln();
    }
    let mant = (x >> (bits - 53)).to_f64().unwrap_or(f64::MAX);
    mant.ln() + (bits - 53) as f64 * std::f64::consts::LN_2
}

fn big_to_f64(x: &BigUint) -> f64 {
    if x.bits() > 1024 {
        return f64::INFINITY;
    }
    x.to_f64().unwrap_or(f64::INFINITY)
}

fn ratio_f64(num: &BigUint, den: &BigUint) -> f64 {
    if num.is_zero() {
        return 0.0;
    }
    if num.bits() <= 52 && den.bits() <= 52 {
        return num.to_f64().unwrap_or(0.0) / den.to_f64().unwrap_or(f64::INFINITY);
    }
    (ln_big(num) - ln_big(den)).exp()
}

/// `ln(x + off)` for a `BigUint` anchor and a small real offset.
fn ln_off(x: &BigUint, off: f64) -> f64 {
    let xf = big_to_f64(x);
    if xf < 9.0e15 {
        let v = xf + off;
        if v <= 0.0 {
            return f64::NAN;
        }
        return v.ln();
    }
    let lx = ln_big(x);
    let t = if xf.is_finite() {
        off / xf
    } else {
        off * (-lx).exp()
    };
    lx + t.ln_1p()
}

/// `ln((x + e)!) - ln(x!)` for an integer-valued offset `e`.
///
/// Small anchors go through exact log-factorials; large anchors use a
/// Stirling difference arranged so the huge leading terms never appear
/// (`x ln x` overflows f64 long before `x` stops fitting in a BigUint).
fn afc_delta(x: &BigUint, e: f64) -> f64 {
    if e == 0.0 {
        return 0.0;
    }
    let xf = big_to_f64(x);
    if xf.is_finite() && xf + e < 0.0 {
        // factorial pole below zero
        return f64::INFINITY;
    }
    if xf < 16.0 {
        return afc(xf + e) - afc(xf);
    }
    if xf.is_finite() && xf + e == 0.0 {
        return -afc(xf);
    }

    let lx = ln_big(x);
    let t = if xf.is_finite() {
        e / xf
    } else {
        e * (-lx).exp()
    };
    let l1p = t.ln_1p();
    let ln_xe = lx + l1p;
    let phi = if t == 0.0 { 1.0 } else { l1p / t };
    let corr = if xf.is_finite() {
        -e / (12.0 * xf * (xf + e))
    } else {
        0.0
    };
    e * phi + 0.5 * l1p + e * ln_xe - e + corr
}

/// `ln(y!)` for a small or moderate integer-valued float.
fn afc(y: f64) -> f64 {
    if y < 16.0 {
        let mut acc = 0.0;
        let mut j = 2.0;
        while j <= y {
            acc += j.ln();
            j += 1.0;
        }
        return acc;
    }
    let ly = y.ln();
    (y + 0.5) * ly - y + HALF_LN_2PI + 1.0 / (12.0 * y) - 1.0 / (360.0 * y * y * y)
}
