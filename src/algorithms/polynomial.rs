//! Polynomials over the scalar field of the curve for Feldman's verifiable secret sharing
//!
//! A dealer samples $`f(X) = a_0 + a_1 X + \dots + a_t X^t`$, publishes $`F(X) = [f(X)] \cdot G`$ as the list of points $`[a_k] \cdot G`$ and sends
//! $`f(x_j)`$ to the party with evaluation point $`x_j`$. The receiver checks the share against $`F(x_j)`$.
//!
//! Sharing of zero, used by key refresh, has no constant term. The constant is therefore optional in both representations.

use curv::arithmetic::traits::Modulo;
use curv::elliptic::curves::traits::{ECPoint, ECScalar};
use curv::{BigInt, FE, GE};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::algorithms::add_points;
use crate::algorithms::transcript::{Transcript, TranscriptWrite};

/// Secret polynomial $`f(X)`$
#[derive(Clone)]
pub struct Polynomial {
    constant: Option<FE>,
    /// coefficients of $`X^1 \dots X^t`$
    coefficients: Vec<FE>,
}

impl Polynomial {
    /// samples a polynomial of the given degree; `None` as the constant produces a sharing of zero
    pub fn sample(degree: usize, constant: Option<FE>) -> Self {
        Polynomial {
            constant,
            coefficients: (0..degree).map(|_| FE::new_random()).collect(),
        }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len()
    }

    pub fn constant(&self) -> Option<&FE> {
        self.constant.as_ref()
    }

    /// $`f(x)`$ reduced into $`[0, q)`$; zero for sharings of zero without coefficients
    pub fn evaluate(&self, x: &FE) -> BigInt {
        let q = FE::q();
        let x = x.to_big_int();
        let value = self
            .coefficients
            .iter()
            .rev()
            .fold(BigInt::zero(), |acc, a| {
                BigInt::mod_add(&BigInt::mod_mul(&acc, &x, &q), &a.to_big_int(), &q)
            });
        let value = BigInt::mod_mul(&value, &x, &q);
        match &self.constant {
            Some(a0) => BigInt::mod_add(&value, &a0.to_big_int(), &q),
            None => value,
        }
    }

    /// $`F(X)`$, the public commitment to the polynomial
    pub fn exponent(&self) -> ExponentPolynomial {
        let g: GE = ECPoint::generator();
        ExponentPolynomial {
            constant: self.constant.map(|a0| g * a0),
            coefficients: self.coefficients.iter().map(|a| g * a).collect(),
        }
    }
}

impl Zeroize for Polynomial {
    fn zeroize(&mut self) {
        if let Some(a0) = self.constant.as_mut() {
            a0.zeroize();
        }
        self.coefficients.iter_mut().for_each(|a| a.zeroize());
    }
}

impl Drop for Polynomial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Public commitment $`F(X) = [f(X)] \cdot G`$ to a polynomial
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExponentPolynomial {
    constant: Option<GE>,
    coefficients: Vec<GE>,
}

impl ExponentPolynomial {
    pub fn degree(&self) -> usize {
        self.coefficients.len()
    }

    /// $`[f(0)] \cdot G`$, absent for sharings of zero
    pub fn constant(&self) -> Option<&GE> {
        self.constant.as_ref()
    }

    /// $`F(x)`$; `None` if the result or an intermediate sum is the point at infinity
    pub fn evaluate(&self, x: &FE) -> Option<GE> {
        let mut terms = self.coefficients.iter().rev();
        let mut acc = *terms.next()?;
        for c in terms {
            acc = add_points(&(acc * x), c)?;
        }
        acc = acc * x;
        match &self.constant {
            Some(c) => add_points(&acc, c),
            None => Some(acc),
        }
    }

    /// sums commitments of the same degree and shape; `None` for mismatching shapes or a sum at infinity
    pub fn sum<'a, I>(mut polynomials: I) -> Option<Self>
    where
        I: Iterator<Item = &'a ExponentPolynomial>,
    {
        let first = polynomials.next()?.clone();
        polynomials.try_fold(first, |acc, p| {
            if acc.degree() != p.degree() || acc.constant.is_some() != p.constant.is_some() {
                return None;
            }
            let constant = match (&acc.constant, &p.constant) {
                (Some(a), Some(b)) => Some(add_points(a, b)?),
                _ => None,
            };
            let coefficients = acc
                .coefficients
                .iter()
                .zip(p.coefficients.iter())
                .map(|(a, b)| add_points(a, b))
                .collect::<Option<Vec<_>>>()?;
            Some(ExponentPolynomial {
                constant,
                coefficients,
            })
        })
    }
}

impl TranscriptWrite for ExponentPolynomial {
    fn write_to(&self, transcript: &mut Transcript) {
        match &self.constant {
            Some(c) => transcript.write_u64(1).write_point(c),
            None => transcript.write_u64(0),
        };
        transcript.write(self.coefficients.as_slice());
    }
}
