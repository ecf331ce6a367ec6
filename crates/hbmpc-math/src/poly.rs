//! Dense univariate polynomials over a prime field.

use crate::field::{Field, FieldElement};
use crate::{Error, Result};
use itertools::Itertools;
use rand::{CryptoRng, RngCore};
use std::collections::HashSet;
use std::ops::{Add, Mul, Neg, Sub};
use zeroize::Zeroize;

/// A polynomial `c_0 + c_1 x + ... + c_d x^d`.
///
/// Coefficients are stored in canonical form, without trailing zeros, so the
/// zero polynomial has no coefficients and two polynomials are equal exactly
/// when they have the same coefficients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly {
    field: Field,
    coeffs: Vec<FieldElement>,
}

impl Poly {
    /// Create a polynomial from its coefficients, lowest degree first.
    pub fn new(field: Field, mut coeffs: Vec<FieldElement>) -> Self {
        debug_assert!(coeffs.iter().all(|c| c.field() == field));
        while coeffs.last().is_some_and(|c| c.is_zero()) {
            coeffs.pop();
        }
        Self { field, coeffs }
    }

    /// Create a polynomial from integer coefficients, reducing them modulo p.
    pub fn from_u64(field: Field, coeffs: &[u64]) -> Self {
        Self::new(field, coeffs.iter().map(|c| field.element(*c)).collect_vec())
    }

    /// The zero polynomial.
    pub fn zero(field: Field) -> Self {
        Self {
            field,
            coeffs: vec![],
        }
    }

    /// The constant polynomial `c`.
    pub fn constant(c: FieldElement) -> Self {
        Self::new(c.field(), vec![c])
    }

    /// The monic polynomial `x - root`.
    pub fn linear(root: FieldElement) -> Self {
        let field = root.field();
        Self::new(field, vec![-root, field.one()])
    }

    /// Sample a polynomial of degree at most `degree` with uniform
    /// coefficients.
    pub fn random<R: RngCore + CryptoRng>(field: Field, degree: usize, rng: &mut R) -> Self {
        Self::new(field, field.random_vec(degree + 1, rng))
    }

    /// Sample a polynomial of degree at most `degree` whose constant term is
    /// `constant` and whose other coefficients are uniform.
    pub fn random_with_constant<R: RngCore + CryptoRng>(
        constant: FieldElement,
        degree: usize,
        rng: &mut R,
    ) -> Self {
        let field = constant.field();
        let mut coeffs = Vec::with_capacity(degree + 1);
        coeffs.push(constant);
        coeffs.extend(field.random_vec(degree, rng));
        Self::new(field, coeffs)
    }

    /// The field of the coefficients.
    pub const fn field(&self) -> Field {
        self.field
    }

    /// The canonical coefficients, lowest degree first.
    pub fn coeffs(&self) -> &[FieldElement] {
        &self.coeffs
    }

    /// The coefficients padded with zeros up to `len` entries.
    ///
    /// Polynomials with more than `len` coefficients are returned whole.
    pub fn padded_coeffs(&self, len: usize) -> Vec<FieldElement> {
        let mut coeffs = self.coeffs.clone();
        if coeffs.len() < len {
            coeffs.resize(len, self.field.zero());
        }
        coeffs
    }

    /// The coefficient of `x^i`.
    pub fn coeff(&self, i: usize) -> FieldElement {
        self.coeffs.get(i).copied().unwrap_or(self.field.zero())
    }

    /// The degree, or None for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    /// Returns whether every coefficient is zero.
    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// The coefficient of the highest power, or None for the zero polynomial.
    pub fn leading_coefficient(&self) -> Option<FieldElement> {
        self.coeffs.last().copied()
    }

    /// Evaluate at `x` using Horner's method.
    pub fn evaluate(&self, x: FieldElement) -> FieldElement {
        self.coeffs
            .iter()
            .rev()
            .fold(self.field.zero(), |acc, c| acc * x + *c)
    }

    /// Multiply every coefficient by `c`.
    pub fn scale(&self, c: FieldElement) -> Self {
        Self::new(self.field, self.coeffs.iter().map(|a| *a * c).collect_vec())
    }

    /// Polynomial long division, returning `(quotient, remainder)` with
    /// `self = quotient * divisor + remainder` and
    /// `deg(remainder) < deg(divisor)`.
    pub fn divmod(&self, divisor: &Self) -> Result<(Self, Self)> {
        let d = divisor.degree().ok_or(Error::DivisionByZeroPolynomial)?;
        let lead_inv = divisor.coeffs[d].inv()?;
        if self.coeffs.len() <= d {
            return Ok((Self::zero(self.field), self.clone()));
        }

        let mut remainder = self.coeffs.clone();
        let mut quotient = vec![self.field.zero(); self.coeffs.len() - d];
        for i in (0..quotient.len()).rev() {
            let c = remainder[i + d] * lead_inv;
            quotient[i] = c;
            for (j, dj) in divisor.coeffs.iter().enumerate() {
                remainder[i + j] -= c * *dj;
            }
        }
        remainder.truncate(d);
        Ok((
            Self::new(self.field, quotient),
            Self::new(self.field, remainder),
        ))
    }

    /// Lagrange interpolation: the unique polynomial of minimal degree
    /// passing through the points `(x, y)`.
    pub fn interpolate(field: Field, points: &[(FieldElement, FieldElement)]) -> Result<Self> {
        let points = sorted_points(points)?;
        let m = points.len();

        // N(x) = prod_i (x - x_i)
        let mut n = vec![field.one()];
        for (xi, _) in &points {
            let mut next = vec![field.zero(); n.len() + 1];
            for (j, nj) in n.iter().enumerate() {
                next[j + 1] += *nj;
                next[j] -= *xi * *nj;
            }
            n = next;
        }

        let mut coeffs = vec![field.zero(); m];
        let mut q = vec![field.zero(); m];
        for (xi, yi) in &points {
            // q = N / (x - x_i) by synthetic division.
            q[m - 1] = n[m];
            for j in (0..m - 1).rev() {
                q[j] = n[j + 1] + *xi * q[j + 1];
            }
            let denominator = q.iter().rev().fold(field.zero(), |acc, c| acc * *xi + *c);
            let scale = *yi * denominator.inv()?;
            for (c, qj) in coeffs.iter_mut().zip(q.iter()) {
                *c += scale * *qj;
            }
        }
        Ok(Self::new(field, coeffs))
    }

    /// Evaluate at `x` the polynomial interpolating `points`, without
    /// computing its coefficients.
    pub fn interpolate_at(
        field: Field,
        points: &[(FieldElement, FieldElement)],
        x: FieldElement,
    ) -> Result<FieldElement> {
        let points = sorted_points(points)?;
        let mut result = field.zero();
        for (i, (xi, yi)) in points.iter().enumerate() {
            let mut numerator = field.one();
            let mut denominator = field.one();
            for (j, (xj, _)) in points.iter().enumerate() {
                if i != j {
                    numerator *= x - *xj;
                    denominator *= *xi - *xj;
                }
            }
            result += *yi * numerator.div(&denominator)?;
        }
        Ok(result)
    }
}

/// Validate interpolation points and sort them by abscissa.
fn sorted_points(
    points: &[(FieldElement, FieldElement)],
) -> Result<Vec<(FieldElement, FieldElement)>> {
    if points.is_empty() {
        return Err(Error::InsufficientPoints(0, 1));
    }
    let mut seen = HashSet::with_capacity(points.len());
    for (x, _) in points {
        if !seen.insert(x.value()) {
            return Err(Error::DuplicateAbscissa(x.value()));
        }
    }
    Ok(points.iter().copied().sorted_by_key(|(x, _)| *x).collect_vec())
}

impl Zeroize for Poly {
    fn zeroize(&mut self) {
        self.coeffs.iter_mut().for_each(|c| c.zeroize());
        self.coeffs.clear();
    }
}

impl Add<&Poly> for &Poly {
    type Output = Poly;

    fn add(self, rhs: &Poly) -> Poly {
        debug_assert_eq!(self.field, rhs.field);
        let len = self.coeffs.len().max(rhs.coeffs.len());
        Poly::new(
            self.field,
            (0..len).map(|i| self.coeff(i) + rhs.coeff(i)).collect_vec(),
        )
    }
}

impl Sub<&Poly> for &Poly {
    type Output = Poly;

    fn sub(self, rhs: &Poly) -> Poly {
        debug_assert_eq!(self.field, rhs.field);
        let len = self.coeffs.len().max(rhs.coeffs.len());
        Poly::new(
            self.field,
            (0..len).map(|i| self.coeff(i) - rhs.coeff(i)).collect_vec(),
        )
    }
}

impl Mul<&Poly> for &Poly {
    type Output = Poly;

    fn mul(self, rhs: &Poly) -> Poly {
        debug_assert_eq!(self.field, rhs.field);
        if self.is_zero() || rhs.is_zero() {
            return Poly::zero(self.field);
        }
        let mut coeffs = vec![self.field.zero(); self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] += *a * *b;
            }
        }
        Poly::new(self.field, coeffs)
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        Poly::new(self.field, self.coeffs.iter().map(|c| -*c).collect_vec())
    }
}
