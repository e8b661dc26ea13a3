use num_bigint::BigUint;
use ope_rs::{self_test, Ope};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn main() {
    let ope = Ope::new(b"sadf67ONUy 4hofuc g", 32, 128).unwrap();

    let pt = BigUint::from(5u32);
    let ct = ope.encrypt(&pt).unwrap();

    println!("{} -> {}", &pt - 1u32, ope.encrypt(&(&pt - 1u32)).unwrap());
    println!("{} -> {} -> {}", pt, ct, ope.decrypt(&ct).unwrap());
    println!("{} -> {}", &pt + 1u32, ope.encrypt(&(&pt + 1u32)).unwrap());
    println!();

    let mut rng = ChaCha20Rng::from_entropy();
    for pbits in [8u32, 16, 32, 64] {
        for cbits in [pbits + 16, pbits * 2, pbits * 2 + 32] {
            let maxerr = self_test(&mut rng, b"hello world", pbits, cbits, 100).unwrap();
            let exposed = if maxerr <= 0.0 {
                pbits
            } else {
                ((1.0 / maxerr).log2().floor() as i64).clamp(0, pbits as i64) as u32
            };
            println!(
                "--- ope: {:3}-bit plaintext, {:3}-bit ciphertext; \
                 max guess error {:.3e}; ~{} bits recoverable by scaling",
                pbits, cbits, maxerr, exposed
            );
        }
    }
}
