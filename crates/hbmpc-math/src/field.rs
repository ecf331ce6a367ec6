//! Arithmetic over a prime field Z/pZ.
//!
//! A [`Field`] is a small `Copy` descriptor of the modulus which also offers
//! raw operations on `u64` residues; a [`FieldElement`] carries its value
//! together with its field so that protocol code can use the usual operators.

use crate::{Error, Result};
use hbmpc_traits::{DeserializeWithContext, Serialize};
use hbmpc_util::{is_prime, prime_factors};
use itertools::Itertools;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;
use rand::{CryptoRng, Rng, RngCore};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use zeroize::Zeroize;

/// The prime 2^64 - 2^32 + 1. Its multiplicative group has 2-adicity 32.
pub const GOLDILOCKS: u64 = 0xffff_ffff_0000_0001;

/// Number of candidates tried when searching for a root of unity.
const ROOT_SEARCH_LIMIT: u64 = 1 << 16;

/// Structure holding a prime modulus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    p: u64,
}

impl Default for Field {
    fn default() -> Self {
        Self::goldilocks()
    }
}

impl Field {
    /// Create a field from a prime modulus.
    ///
    /// Returns an error if the modulus is not a prime.
    pub fn new(p: u64) -> Result<Self> {
        if !is_prime(p) {
            return Err(Error::InvalidModulus(p));
        }
        Ok(Self { p })
    }

    /// The field modulo [`GOLDILOCKS`].
    pub const fn goldilocks() -> Self {
        Self { p: GOLDILOCKS }
    }

    /// Returns the value of the modulus.
    pub const fn modulus(&self) -> u64 {
        self.p
    }

    /// Returns the bit length of the modulus.
    pub const fn bits(&self) -> u32 {
        u64::BITS - self.p.leading_zeros()
    }

    /// Number of bytes of a serialized element.
    pub const fn byte_len(&self) -> usize {
        self.bits().div_ceil(8) as usize
    }

    /// Reduce a `u64` modulo p.
    pub const fn reduce(&self, a: u64) -> u64 {
        a % self.p
    }

    /// Modular addition of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        let (s, overflow) = a.overflowing_add(b);
        if overflow || s >= self.p {
            s.wrapping_sub(self.p)
        } else {
            s
        }
    }

    /// Modular subtraction of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        if a >= b {
            a - b
        } else {
            self.p - b + a
        }
    }

    /// Modular multiplication of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        ((a as u128 * b as u128) % (self.p as u128)) as u64
    }

    /// Modular negation of a.
    ///
    /// Aborts if a >= p in debug mode.
    pub fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        if a == 0 {
            0
        } else {
            self.p - a
        }
    }

    /// Modular exponentiation of a to the power e.
    pub fn pow(&self, a: u64, mut e: u64) -> u64 {
        let mut base = self.reduce(a);
        let mut r = self.reduce(1);
        while e > 0 {
            if e & 1 == 1 {
                r = self.mul(r, base);
            }
            base = self.mul(base, base);
            e >>= 1;
        }
        r
    }

    /// Modular inverse of a, using Fermat's little theorem.
    ///
    /// Returns None if a is zero modulo p.
    pub fn inv(&self, a: u64) -> Option<u64> {
        let a = self.reduce(a);
        if a == 0 {
            None
        } else {
            Some(self.pow(a, self.p - 2))
        }
    }

    /// Creates the element `value mod p`.
    pub fn element(&self, value: u64) -> FieldElement {
        FieldElement {
            value: self.reduce(value),
            field: *self,
        }
    }

    /// Creates the element `value mod p`, negative values included.
    pub fn from_i64(&self, value: i64) -> FieldElement {
        let r = (value as i128).rem_euclid(self.p as i128);
        FieldElement {
            value: r as u64,
            field: *self,
        }
    }

    /// Creates the element `value mod p` from an arbitrary precision integer.
    pub fn from_biguint(&self, value: &BigUint) -> FieldElement {
        let r = value % BigUint::from(self.p);
        FieldElement {
            // r < p < 2^64
            value: r.to_u64().unwrap_or(0),
            field: *self,
        }
    }

    /// Creates the element `value mod p` from a signed arbitrary precision
    /// integer.
    pub fn from_bigint(&self, value: &BigInt) -> FieldElement {
        let magnitude = self.from_biguint(value.magnitude());
        if value.sign() == Sign::Minus {
            -magnitude
        } else {
            magnitude
        }
    }

    /// The additive identity.
    pub fn zero(&self) -> FieldElement {
        self.element(0)
    }

    /// The multiplicative identity.
    pub fn one(&self) -> FieldElement {
        self.element(1)
    }

    /// Sample a uniform element.
    pub fn random<R: RngCore + CryptoRng>(&self, rng: &mut R) -> FieldElement {
        self.element(rng.gen_range(0..self.p))
    }

    /// Sample a vector of `size` uniform elements.
    pub fn random_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<FieldElement> {
        (0..size).map(|_| self.random(rng)).collect_vec()
    }

    /// Returns a primitive root of unity of the given order.
    ///
    /// The order must divide p - 1.
    pub fn root_of_unity(&self, order: u64) -> Result<FieldElement> {
        if order == 0 || (self.p - 1) % order != 0 {
            return Err(Error::InvalidParameters(format!(
                "no root of unity of order {} modulo {}",
                order, self.p
            )));
        }
        if order == 1 {
            return Ok(self.one());
        }
        let cofactor = (self.p - 1) / order;
        let factors = prime_factors(order);
        for g in 2..self.p.min(ROOT_SEARCH_LIMIT) {
            let w = self.pow(g, cofactor);
            if factors.iter().all(|q| self.pow(w, order / q) != 1) {
                return Ok(self.element(w));
            }
        }
        Err(Error::Default(format!(
            "could not find a root of unity of order {}",
            order
        )))
    }

    /// Serialize elements as the concatenation of their fixed-width encodings.
    pub fn serialize_elements(&self, elements: &[FieldElement]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(elements.len() * self.byte_len());
        for e in elements {
            debug_assert_eq!(e.field, *self);
            bytes.extend_from_slice(&e.to_bytes());
        }
        bytes
    }

    /// Deserialize a concatenation of fixed-width element encodings.
    pub fn deserialize_elements(&self, bytes: &[u8]) -> Result<Vec<FieldElement>> {
        let width = self.byte_len();
        if bytes.len() % width != 0 {
            return Err(Error::Serialization(format!(
                "{} bytes is not a multiple of the element width {}",
                bytes.len(),
                width
            )));
        }
        bytes
            .chunks(width)
            .map(|chunk| FieldElement::from_bytes(chunk, self))
            .collect()
    }
}

/// An element of a prime field.
///
/// Binary operators work in the field of the left operand. An operand from
/// another field is first reduced modulo that field's prime, so results are
/// always canonical even when fields are mixed by mistake.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldElement {
    value: u64,
    field: Field,
}

impl FieldElement {
    /// The reduced representative in [0, p).
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// The field of this element.
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Returns whether this is the additive identity.
    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Multiplicative inverse.
    ///
    /// Returns `Error::DivisionByZero` for the zero element.
    pub fn inv(&self) -> Result<Self> {
        let value = self.field.inv(self.value).ok_or(Error::DivisionByZero)?;
        Ok(Self {
            value,
            field: self.field,
        })
    }

    /// Division by `rhs`.
    ///
    /// Returns `Error::DivisionByZero` if `rhs` is zero.
    pub fn div(&self, rhs: &Self) -> Result<Self> {
        Ok(*self * rhs.inv()?)
    }

    /// Raise to the power `e`.
    pub fn pow(&self, e: u64) -> Self {
        Self {
            value: self.field.pow(self.value, e),
            field: self.field,
        }
    }

    /// Big-endian encoding over exactly `field.byte_len()` bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let width = self.field.byte_len();
        self.value.to_be_bytes()[8 - width..].to_vec()
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.value)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl PartialOrd for FieldElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then(self.field.p.cmp(&other.field.p))
    }
}

impl Zeroize for FieldElement {
    fn zeroize(&mut self) {
        self.value.zeroize()
    }
}

impl Serialize for FieldElement {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_be_bytes()
    }
}

impl DeserializeWithContext for FieldElement {
    type Error = Error;
    type Context = Field;

    fn from_bytes(bytes: &[u8], ctx: &Field) -> Result<Self> {
        if bytes.len() != ctx.byte_len() {
            return Err(Error::Serialization(format!(
                "expected {} bytes, got {}",
                ctx.byte_len(),
                bytes.len()
            )));
        }
        let value = bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        if value >= ctx.p {
            return Err(Error::Serialization(format!(
                "value {} is not reduced modulo {}",
                value, ctx.p
            )));
        }
        Ok(ctx.element(value))
    }
}

impl Add for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.field.add(self.value, self.field.reduce(rhs.value)),
            field: self.field,
        }
    }
}

impl AddAssign for FieldElement {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl Sub for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.field.sub(self.value, self.field.reduce(rhs.value)),
            field: self.field,
        }
    }
}

impl SubAssign for FieldElement {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs
    }
}

impl Mul for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            value: self.field.mul(self.value, self.field.reduce(rhs.value)),
            field: self.field,
        }
    }
}

impl MulAssign for FieldElement {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs
    }
}

impl Neg for FieldElement {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: self.field.neg(self.value),
            field: self.field,
        }
    }
}
