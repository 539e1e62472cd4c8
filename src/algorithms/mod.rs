//! Arithmetic building blocks of the protocols
//!
//! * sampling from symmetric intervals $`\pm 2^{k}`$ and $`\pm 2^{k} \hat{N}`$ and from $`Z^*_N`$
//! * modular exponentiation with exponents of either sign
//! * conversions between integers and curve scalars
//!
//! The submodules contain the transcript hasher, Paillier and Pedersen collaborators, polynomials for secret sharing and the family of zero knowledge proofs.

use curv::arithmetic::traits::Samplable;
use curv::elliptic::curves::traits::{ECPoint, ECScalar};
use curv::{BigInt, FE, GE};

pub mod encryption;
pub mod pedersen;
pub mod polynomial;
pub mod transcript;
pub mod zkp;

/// samples uniformly from $`[-2^{bits}, 2^{bits}]`$
pub fn sample_interval(bits: usize) -> BigInt {
    let bound = BigInt::from(2).pow(bits as u32);
    BigInt::sample_below(&(&bound * BigInt::from(2) + BigInt::one())) - bound
}

/// samples uniformly from $`[-2^{bits} N, 2^{bits} N]`$
pub fn sample_interval_scaled(bits: usize, n: &BigInt) -> BigInt {
    let bound = BigInt::from(2).pow(bits as u32) * n;
    BigInt::sample_below(&(&bound * BigInt::from(2) + BigInt::one())) - bound
}

/// checks that $`|x| \le 2^{bits}`$
pub fn is_in_interval(x: &BigInt, bits: usize) -> bool {
    x.abs() <= BigInt::from(2).pow(bits as u32)
}

/// samples a random element of the multiplicative group $`Z^*_N`$
pub fn sample_unit(n: &BigInt) -> BigInt {
    let one = BigInt::one();
    loop {
        let r = BigInt::sample_below(n);
        if r.gcd(n) == one {
            return r;
        }
    }
}

/// checks that $`x \in Z^*_N`$
pub fn is_unit(x: &BigInt, n: &BigInt) -> bool {
    *x > BigInt::zero() && x < n && x.gcd(n) == BigInt::one()
}

/// computes $`b^e \mod m`$ for an exponent of any sign
///
/// A negative exponent is applied to the inverse of the base, so that the result is `None` if the base is not invertible.
pub fn pow_mod(base: &BigInt, exp: &BigInt, modulus: &BigInt) -> Option<BigInt> {
    let zero = BigInt::zero();
    let base = base.mod_floor(modulus);
    if *exp == zero {
        Some(BigInt::one().mod_floor(modulus))
    } else if *exp > zero {
        Some(base.powm_sec(exp, modulus))
    } else {
        base.invert(modulus)
            .map(|inverse| inverse.powm_sec(&exp.abs(), modulus))
    }
}

/// reduces an integer of any sign into a curve scalar
///
/// Returns `None` for multiples of the group order, which have no representation as a secret key.
pub fn to_scalar(x: &BigInt) -> Option<FE> {
    let reduced = x.mod_floor(&FE::q());
    if reduced == BigInt::zero() {
        None
    } else {
        Some(ECScalar::from(&reduced))
    }
}

/// computes $`[x] \cdot G`$ for an integer of any sign
pub fn base_mul(x: &BigInt) -> Option<GE> {
    let g: GE = ECPoint::generator();
    to_scalar(x).map(|s| g * s)
}

/// computes $`[x] \cdot P`$ for an integer of any sign
pub fn point_mul(point: &GE, x: &BigInt) -> Option<GE> {
    to_scalar(x).map(|s| point * &s)
}

/// $`a + b`$; `None` if the sum is the point at infinity
pub fn add_points(a: &GE, b: &GE) -> Option<GE> {
    if a.x_coor() == b.x_coor() && a.get_element() != b.get_element() {
        None
    } else {
        Some(*a + b)
    }
}
