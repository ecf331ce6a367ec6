//! Mapping from party indices to evaluation abscissas.

use crate::field::{Field, FieldElement};
use crate::{Error, Result};
use itertools::Itertools;

/// The evaluation point scheme shared by every participant of a session.
///
/// Party `i` evaluates shares at `point(i)`. Points are either the integers
/// `1..=n` or the powers `ω^0, ..., ω^(n-1)` of a primitive root of unity ω of
/// order `n.next_power_of_two()`. Both are injective over `[0, n)` and
/// neither contains zero, which is where secrets live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalPoint {
    field: Field,
    omega: Option<FieldElement>,
    points: Vec<FieldElement>,
}

impl EvalPoint {
    /// Create the scheme for `n` parties.
    ///
    /// Returns `Error::InvalidParameters` when `n == 0`, when the sequential
    /// points would wrap around the modulus, or when no root of unity of the
    /// required order exists.
    pub fn new(field: Field, n: usize, use_omega_powers: bool) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidParameters(
                "the number of evaluation points must be positive".to_string(),
            ));
        }
        if use_omega_powers {
            let order = n.next_power_of_two() as u64;
            let omega = field.root_of_unity(order)?;
            let points = (0..n as u64).map(|i| omega.pow(i)).collect_vec();
            Ok(Self {
                field,
                omega: Some(omega),
                points,
            })
        } else {
            if n as u64 >= field.modulus() {
                return Err(Error::InvalidParameters(format!(
                    "{} sequential points do not fit modulo {}",
                    n,
                    field.modulus()
                )));
            }
            let points = (1..=n as u64).map(|i| field.element(i)).collect_vec();
            Ok(Self {
                field,
                omega: None,
                points,
            })
        }
    }

    /// The abscissa of party `i`, or `None` if `i >= n`.
    pub fn point(&self, i: usize) -> Option<FieldElement> {
        self.points.get(i).copied()
    }

    /// All abscissas, in party order.
    pub fn points(&self) -> &[FieldElement] {
        &self.points
    }

    /// Number of parties.
    pub fn n(&self) -> usize {
        self.points.len()
    }

    /// The root of unity, when the scheme uses omega powers.
    pub fn omega(&self) -> Option<FieldElement> {
        self.omega
    }

    /// The field of the points.
    pub const fn field(&self) -> Field {
        self.field
    }

    /// The abscissa at which secrets are shared.
    pub fn zero(&self) -> FieldElement {
        self.field.zero()
    }
}

#[cfg(test)]
mod tests {
    use super::EvalPoint;
    use crate::field::Field;
    use crate::Error;
    use std::collections::HashSet;
    use std::error::Error as StdError;

    #[test]
    fn sequential() -> Result<(), Box<dyn StdError>> {
        let f = Field::goldilocks();
        let e = EvalPoint::new(f, 4, false)?;
        assert_eq!(e.n(), 4);
        assert_eq!(e.point(0), Some(f.one()));
        assert_eq!(e.point(3), Some(f.element(4)));
        assert_eq!(e.point(4), None);
        assert_eq!(e.omega(), None);
        assert_eq!(e.zero(), f.zero());
        Ok(())
    }

    #[test]
    fn omega_powers() -> Result<(), Box<dyn StdError>> {
        let f = Field::goldilocks();
        for n in [1usize, 3, 4, 7, 33] {
            let e = EvalPoint::new(f, n, true)?;
            let omega = e.omega().ok_or("missing omega")?;
            assert_eq!(omega.pow(n.next_power_of_two() as u64), f.one());
            assert_eq!(e.point(0), Some(f.one()));
            let distinct: HashSet<_> = e.points().iter().map(|p| p.value()).collect();
            assert_eq!(distinct.len(), n);
            assert!(!distinct.contains(&0));
        }
        Ok(())
    }

    #[test]
    fn invalid() -> Result<(), Box<dyn StdError>> {
        let f17 = Field::new(17)?;
        assert!(matches!(
            EvalPoint::new(f17, 0, false),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            EvalPoint::new(f17, 17, false),
            Err(Error::InvalidParameters(_))
        ));
        assert!(EvalPoint::new(f17, 16, false).is_ok());
        // 16 | 17 - 1 but 32 does not.
        assert!(EvalPoint::new(f17, 16, true).is_ok());
        assert!(matches!(
            EvalPoint::new(f17, 17, true),
            Err(Error::InvalidParameters(_))
        ));
        Ok(())
    }
}
