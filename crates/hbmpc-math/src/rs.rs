//! Reed-Solomon codes with a Berlekamp-Welch decoder.
//!
//! A message of `k` symbols is read as the coefficients of a polynomial of
//! degree below `k`, and its codeword is the evaluation of that polynomial at
//! the first `n` points of an [`EvalPoint`] scheme. The decoder recovers the
//! message from a codeword with erasures (`None`) and errors, as long as
//! `n - erasures >= k + 2 * errors`.

use crate::eval_point::EvalPoint;
use crate::field::{Field, FieldElement};
use crate::linalg::some_solution;
use crate::poly::Poly;
use crate::{Error, Result};
use itertools::Itertools;
use ndarray::Array2;

/// The outcome of a successful decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// The `k` message symbols, i.e. the coefficients of the decoded
    /// polynomial.
    pub message: Vec<FieldElement>,
    /// Positions whose received symbol disagrees with the decoded codeword.
    pub errors: Vec<usize>,
}

/// A Reed-Solomon code of length `n` and dimension `k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsCodec {
    n: usize,
    k: usize,
    field: Field,
    points: Vec<FieldElement>,
}

impl RsCodec {
    /// Create a code of length `n` and dimension `k` over the first `n`
    /// points of `points`.
    ///
    /// Requires `1 <= k <= n <= p` and `n <= points.n()`.
    pub fn new(n: usize, k: usize, points: &EvalPoint) -> Result<Self> {
        let field = points.field();
        if k == 0 || k > n || n as u64 > field.modulus() {
            return Err(Error::InvalidParameters(format!(
                "expected 1 <= k <= n <= p, got k = {}, n = {}, p = {}",
                k,
                n,
                field.modulus()
            )));
        }
        if n > points.n() {
            return Err(Error::InvalidParameters(format!(
                "{} evaluation points are not enough for a code of length {}",
                points.n(),
                n
            )));
        }
        Ok(Self {
            n,
            k,
            field,
            points: points.points()[..n].to_vec(),
        })
    }

    /// Code length.
    pub const fn n(&self) -> usize {
        self.n
    }

    /// Code dimension.
    pub const fn k(&self) -> usize {
        self.k
    }

    /// The field of the symbols.
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Encode a message of exactly `k` integers, each smaller than p.
    pub fn encode(&self, message: &[u64]) -> Result<Vec<FieldElement>> {
        if let Some(m) = message.iter().find(|m| **m >= self.field.modulus()) {
            return Err(Error::MessageTooLarge(format!(
                "symbol {} is not smaller than the modulus {}",
                m,
                self.field.modulus()
            )));
        }
        let message = message.iter().map(|m| self.field.element(*m)).collect_vec();
        self.encode_elements(&message)
    }

    /// Encode a message of exactly `k` field elements.
    pub fn encode_elements(&self, message: &[FieldElement]) -> Result<Vec<FieldElement>> {
        if message.len() != self.k {
            return Err(Error::MessageTooLarge(format!(
                "expected a message of {} symbols, got {}",
                self.k,
                message.len()
            )));
        }
        let poly = Poly::new(self.field, message.to_vec());
        Ok(self.points.iter().map(|x| poly.evaluate(*x)).collect_vec())
    }

    /// Decode a received word, `None` marking an erasure, into the `k`
    /// message symbols.
    pub fn decode(&self, received: &[Option<FieldElement>]) -> Result<Vec<FieldElement>> {
        Ok(self.decode_with_errors(received)?.message)
    }

    /// Decode a received word and report the positions found to be wrong.
    ///
    /// With `r` non-erased symbols, up to `⌊(r - k) / 2⌋` errors are
    /// corrected. Fails with `Error::Undecodable` when fewer than `k` symbols
    /// are present or when the received word is farther than that from every
    /// codeword, and with `Error::NoDivisorFound` when no error locator
    /// explains the data.
    pub fn decode_with_errors(&self, received: &[Option<FieldElement>]) -> Result<Decoded> {
        if received.len() != self.n {
            return Err(Error::InvalidParameters(format!(
                "expected {} received symbols, got {}",
                self.n,
                received.len()
            )));
        }
        let known = received
            .iter()
            .enumerate()
            .filter_map(|(i, y)| y.map(|y| (i, self.points[i], y)))
            .collect_vec();
        let r = known.len();
        if r < self.k {
            return Err(Error::Undecodable(format!(
                "{} erasures leave {} symbols, need at least {}",
                self.n - r,
                r,
                self.k
            )));
        }

        let max_errors = (r - self.k) / 2;
        let poly = if max_errors == 0 {
            let points = known.iter().map(|(_, x, y)| (*x, *y)).collect_vec();
            let poly = Poly::interpolate(self.field, &points)?;
            if poly.degree().is_some_and(|d| d >= self.k) {
                return Err(Error::Undecodable(
                    "received symbols are not on a polynomial of degree below k".to_string(),
                ));
            }
            poly
        } else {
            self.berlekamp_welch(&known, max_errors)?
        };

        let errors = known
            .iter()
            .filter(|(_, x, y)| poly.evaluate(*x) != *y)
            .map(|(i, _, _)| *i)
            .collect_vec();
        if errors.len() > max_errors {
            return Err(Error::Undecodable(format!(
                "{} errors exceed the correction capacity {}",
                errors.len(),
                max_errors
            )));
        }

        Ok(Decoded {
            message: poly.padded_coeffs(self.k),
            errors,
        })
    }

    /// Try error budgets from `max_errors` down to 1 and return `Q / E` for
    /// the first budget where the error locator `E` divides `Q`.
    fn berlekamp_welch(
        &self,
        known: &[(usize, FieldElement, FieldElement)],
        max_errors: usize,
    ) -> Result<Poly> {
        for budget in (1..=max_errors).rev() {
            let Some((q, e)) = self.solve_system(known, budget)? else {
                continue;
            };
            let (p, remainder) = q.divmod(&e)?;
            if remainder.is_zero() {
                return Ok(p);
            }
        }
        Err(Error::NoDivisorFound)
    }

    /// Solve `y_i E(x_i) = Q(x_i)` for a monic `E` of degree `budget` and a
    /// `Q` of degree `budget + k - 1`.
    ///
    /// Unknowns are ordered as the coefficients of Q followed by those of E.
    fn solve_system(
        &self,
        known: &[(usize, FieldElement, FieldElement)],
        budget: usize,
    ) -> Result<Option<(Poly, Poly)>> {
        let q_vars = budget + self.k;
        let e_vars = budget + 1;
        let cols = q_vars + e_vars + 1;

        let mut system = Array2::from_elem((known.len() + 1, cols), self.field.zero());
        for (row, (_, x, y)) in known.iter().enumerate() {
            let mut x_pow = self.field.one();
            for j in 0..q_vars {
                system[[row, j]] = x_pow;
                if j < e_vars {
                    system[[row, q_vars + j]] = -(*y * x_pow);
                }
                x_pow *= *x;
            }
        }
        // E is monic.
        system[[known.len(), q_vars + budget]] = self.field.one();
        system[[known.len(), cols - 1]] = self.field.one();

        let Some(solution) = some_solution(&system, self.field.one())? else {
            return Ok(None);
        };
        let q = Poly::new(self.field, solution[..q_vars].to_vec());
        let e = Poly::new(self.field, solution[q_vars..].to_vec());
        Ok(Some((q, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::RsCodec;
    use crate::eval_point::EvalPoint;
    use crate::field::{Field, FieldElement};
    use crate::Error;
    use itertools::Itertools;
    use proptest::prelude::*;
    use rand::{seq::index::sample, Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::error::Error as StdError;

    fn codec(n: usize, k: usize, omega: bool) -> Result<RsCodec, Box<dyn StdError>> {
        let points = EvalPoint::new(Field::goldilocks(), n, omega)?;
        Ok(RsCodec::new(n, k, &points)?)
    }

    fn received(codeword: &[FieldElement]) -> Vec<Option<FieldElement>> {
        codeword.iter().copied().map(Some).collect_vec()
    }

    fn values(message: &[FieldElement]) -> Vec<u64> {
        message.iter().map(|m| m.value()).collect_vec()
    }

    #[test]
    fn parameters() -> Result<(), Box<dyn StdError>> {
        let f = Field::new(17)?;
        let points = EvalPoint::new(f, 8, false)?;
        assert!(RsCodec::new(8, 3, &points).is_ok());
        assert!(matches!(
            RsCodec::new(3, 4, &points),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            RsCodec::new(4, 0, &points),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            RsCodec::new(9, 3, &points),
            Err(Error::InvalidParameters(_))
        ));
        Ok(())
    }

    #[test]
    fn encode_rejects_bad_messages() -> Result<(), Box<dyn StdError>> {
        let rs = codec(4, 3, false)?;
        assert!(matches!(
            rs.encode(&[1, 2]),
            Err(Error::MessageTooLarge(_))
        ));
        assert!(matches!(
            rs.encode(&[1, 2, 3, 4]),
            Err(Error::MessageTooLarge(_))
        ));
        assert!(matches!(
            rs.encode(&[1, u64::MAX, 3]),
            Err(Error::MessageTooLarge(_))
        ));
        Ok(())
    }

    #[test]
    fn decode_without_errors() -> Result<(), Box<dyn StdError>> {
        for omega in [false, true] {
            let rs = codec(4, 3, omega)?;
            let encoded = rs.encode(&[2, 5, 7])?;
            assert_eq!(values(&rs.decode(&received(&encoded))?), vec![2, 5, 7]);
        }
        Ok(())
    }

    #[test]
    fn decode_with_erasure() -> Result<(), Box<dyn StdError>> {
        let rs = codec(4, 3, false)?;
        let encoded = rs.encode(&[2, 5, 7])?;
        for i in 0..4 {
            let mut word = received(&encoded);
            word[i] = None;
            assert_eq!(values(&rs.decode(&word)?), vec![2, 5, 7]);
        }
        Ok(())
    }

    #[test]
    fn decode_short_message() -> Result<(), Box<dyn StdError>> {
        // Trailing zero coefficients are part of the message.
        let rs = codec(7, 3, false)?;
        let encoded = rs.encode(&[9, 0, 0])?;
        assert_eq!(values(&rs.decode(&received(&encoded))?), vec![9, 0, 0]);
        Ok(())
    }

    #[test]
    fn error_boundary() -> Result<(), Box<dyn StdError>> {
        let rs = codec(7, 3, false)?;
        let f = rs.field();
        let encoded = rs.encode(&[2, 5, 7])?;

        let mut word = received(&encoded);
        word[1] = Some(encoded[1] + f.one());
        word[4] = Some(encoded[4] + f.element(1234));
        let decoded = rs.decode_with_errors(&word)?;
        assert_eq!(values(&decoded.message), vec![2, 5, 7]);
        assert_eq!(decoded.errors, vec![1, 4]);

        // No codeword is within distance 2, so no error locator divides.
        let mut word = received(&encoded);
        for i in 0..3 {
            word[i] = Some(encoded[i] + f.one());
        }
        assert_eq!(rs.decode(&word), Err(Error::NoDivisorFound));
        Ok(())
    }

    #[test]
    fn no_divisor_for_far_words() -> Result<(), Box<dyn StdError>> {
        // x^3 agrees with a polynomial of degree below 3 on at most 3 of the
        // 5 points 1..=5, so it is at distance at least 2 from every codeword
        // while the capacity is 1.
        let rs = codec(5, 3, false)?;
        let f = rs.field();
        let word = (1..=5u64).map(|x| Some(f.element(x).pow(3))).collect_vec();
        assert_eq!(rs.decode_with_errors(&word), Err(Error::NoDivisorFound));
        Ok(())
    }

    #[test]
    fn erasures_and_errors() -> Result<(), Box<dyn StdError>> {
        // n = 10, k = 4: two erasures leave room for two errors, four
        // erasures for one.
        let rs = codec(10, 4, true)?;
        let f = rs.field();
        let encoded = rs.encode(&[11, 22, 33, 44])?;

        let mut word = received(&encoded);
        word[0] = None;
        word[9] = None;
        word[3] = Some(f.zero());
        word[5] = Some(encoded[5] - f.one());
        let decoded = rs.decode_with_errors(&word)?;
        assert_eq!(values(&decoded.message), vec![11, 22, 33, 44]);
        assert_eq!(decoded.errors, vec![3, 5]);

        let mut word = received(&encoded);
        (0..4).for_each(|i| word[i] = None);
        word[7] = Some(encoded[7] + f.one());
        assert_eq!(values(&rs.decode(&word)?), vec![11, 22, 33, 44]);

        word[8] = Some(encoded[8] + f.one());
        assert!(rs.decode(&word).is_err());
        Ok(())
    }

    #[test]
    fn undetectable_without_redundancy() -> Result<(), Box<dyn StdError>> {
        let rs = codec(4, 3, false)?;
        let encoded = rs.encode(&[2, 5, 7])?;
        let mut word = received(&encoded);
        word[2] = Some(encoded[2] + rs.field().one());
        assert!(matches!(rs.decode(&word), Err(Error::Undecodable(_))));

        let word = vec![Some(encoded[0]), None, None, Some(encoded[3])];
        assert!(matches!(rs.decode(&word), Err(Error::Undecodable(_))));
        assert!(matches!(
            rs.decode(&word[..3]),
            Err(Error::InvalidParameters(_))
        ));
        Ok(())
    }

    proptest! {
        #[test]
        fn corrects_up_to_capacity(seed: u64, n in 4usize..16, k in 1usize..4) {
            prop_assume!(k <= n);
            let rs = codec(n, k, seed % 2 == 0).unwrap();
            let f = rs.field();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let message = f.random_vec(k, &mut rng);
            let encoded = rs.encode_elements(&message).unwrap();

            let erasures = rng.gen_range(0..=n - k);
            let errors = (n - k - erasures) / 2;
            let positions = sample(&mut rng, n, erasures + errors).into_vec();
            let mut word = received(&encoded);
            for i in &positions[..erasures] {
                word[*i] = None;
            }
            for i in &positions[erasures..] {
                word[*i] = Some(encoded[*i] + f.element(rng.gen_range(1..1000)));
            }

            let decoded = rs.decode_with_errors(&word).unwrap();
            prop_assert_eq!(decoded.message, message);
            prop_assert_eq!(
                decoded.errors,
                positions[erasures..].iter().copied().sorted().collect_vec()
            );
        }
    }
}
