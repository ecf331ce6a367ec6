//! Shares held by a single party, and the correlated randomness built from
//! them.

use crate::parameters::MpcParameters;
use crate::{Error, Result};
use hbmpc_math::field::{Field, FieldElement};
use hbmpc_math::poly::Poly;
use itertools::Itertools;
use rand::{CryptoRng, RngCore};
use std::ops::{Add, Mul, Neg, Sub};
use zeroize::Zeroizing;

/// One party's share of a secret: the evaluation, at the party's point, of a
/// polynomial of degree at most `degree` whose constant term is the secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, zeroize_derive::Zeroize)]
pub struct Share {
    value: FieldElement,
    degree: usize,
}

impl Share {
    /// Create a share of the given sharing degree.
    pub const fn new(value: FieldElement, degree: usize) -> Self {
        Self { value, degree }
    }

    /// The local value.
    pub const fn value(&self) -> FieldElement {
        self.value
    }

    /// The degree of the sharing polynomial.
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// The field of the value.
    pub const fn field(&self) -> Field {
        self.value.field()
    }

    /// Share of the secret plus a public constant.
    pub fn add_public(&self, c: FieldElement) -> Self {
        Self::new(self.value + c, self.degree)
    }

    /// Share of the secret times a public constant.
    pub fn scale(&self, c: FieldElement) -> Self {
        Self::new(self.value * c, self.degree)
    }
}

impl Add for Share {
    type Output = Share;

    fn add(self, rhs: Share) -> Share {
        Share::new(self.value + rhs.value, self.degree.max(rhs.degree))
    }
}

impl Sub for Share {
    type Output = Share;

    fn sub(self, rhs: Share) -> Share {
        Share::new(self.value - rhs.value, self.degree.max(rhs.degree))
    }
}

impl Neg for Share {
    type Output = Share;

    fn neg(self) -> Share {
        Share::new(-self.value, self.degree)
    }
}

impl Mul<FieldElement> for Share {
    type Output = Share;

    fn mul(self, rhs: FieldElement) -> Share {
        self.scale(rhs)
    }
}

/// An ordered batch of shares opened or computed together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShareArray {
    shares: Vec<Share>,
}

impl ShareArray {
    /// Create a batch from its shares.
    pub fn new(shares: Vec<Share>) -> Self {
        Self { shares }
    }

    /// Create a batch of shares of the same degree from local values.
    pub fn from_values(values: &[FieldElement], degree: usize) -> Self {
        Self::new(values.iter().map(|v| Share::new(*v, degree)).collect_vec())
    }

    /// Number of shares.
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// The shares, in order.
    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// The local values, in order.
    pub fn values(&self) -> Vec<FieldElement> {
        self.shares.iter().map(|s| s.value()).collect_vec()
    }

    /// Element-wise sum; both batches must have the same length.
    pub fn try_add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise difference; both batches must have the same length.
    pub fn try_sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    fn zip_with(&self, other: &Self, op: impl Fn(Share, Share) -> Share) -> Result<Self> {
        if self.len() != other.len() {
            return Err(Error::length_mismatch(self.len(), other.len()));
        }
        Ok(Self::new(
            self.shares
                .iter()
                .zip(other.shares.iter())
                .map(|(a, b)| op(*a, *b))
                .collect_vec(),
        ))
    }
}

impl From<Vec<Share>> for ShareArray {
    fn from(shares: Vec<Share>) -> Self {
        Self::new(shares)
    }
}

/// A share of a multiplication triple `(a, b, ab)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, zeroize_derive::Zeroize)]
pub struct BeaverTriple {
    /// Share of a.
    pub a: Share,
    /// Share of b.
    pub b: Share,
    /// Share of a * b.
    pub ab: Share,
}

/// Shares of the same random secret at degrees t and 2t.
#[derive(Clone, Copy, Debug, PartialEq, Eq, zeroize_derive::Zeroize)]
pub struct DoubleShare {
    /// Share of degree t.
    pub r_t: Share,
    /// Share of degree 2t.
    pub r_2t: Share,
}

/// Deal `secret` to all parties with a random polynomial of the given degree.
///
/// Returns one share per party, in party order.
pub fn share_secret<R: RngCore + CryptoRng>(
    par: &MpcParameters,
    secret: FieldElement,
    degree: usize,
    rng: &mut R,
) -> Vec<Share> {
    let poly = Zeroizing::new(Poly::random_with_constant(secret, degree, rng));
    par.eval_points()
        .points()
        .iter()
        .map(|x| Share::new(poly.evaluate(*x), degree))
        .collect_vec()
}

/// Recover the secret from shares given as `(party, share)` pairs by
/// interpolating at zero.
pub fn recover_secret(par: &MpcParameters, shares: &[(usize, Share)]) -> Result<FieldElement> {
    let points = shares
        .iter()
        .map(|(i, s)| Ok((par.point(*i)?, s.value())))
        .collect::<Result<Vec<_>>>()?;
    Ok(Poly::interpolate_at(
        par.field(),
        &points,
        par.eval_points().zero(),
    )?)
}
