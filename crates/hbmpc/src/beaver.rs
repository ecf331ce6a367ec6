//! Multiplication of shared secrets with Beaver triples.
//!
//! With a triple `(a, b, ab)`, the parties open `d = y - b` and `e = x - a`,
//! which reveal nothing about x and y, and then compute locally
//! `xy = de + eb + da + ab`.
//!
//! The triple is trusted: a triple with `ab != a * b` silently yields a wrong
//! product.

use crate::share::{BeaverTriple, Share};
use crate::{Error, Result};
use async_trait::async_trait;
use hbmpc_math::field::FieldElement;
use itertools::Itertools;

/// Public reconstruction of shared values.
#[async_trait]
pub trait PublicOpener: Send {
    /// Open a batch of degree-t shares, returning the secrets in order.
    async fn open_shares(&mut self, shares: &[Share]) -> Result<Vec<FieldElement>>;
}

/// Compute the share of `x * y` from the opened `d = y - b` and `e = x - a`.
pub fn combine(d: FieldElement, e: FieldElement, triple: &BeaverTriple) -> Share {
    (triple.ab + triple.a * d + triple.b * e).add_public(d * e)
}

/// Multiply two shared secrets, consuming one triple and one opening.
pub async fn multiply<O: PublicOpener + ?Sized>(
    opener: &mut O,
    x: Share,
    y: Share,
    triple: &BeaverTriple,
) -> Result<Share> {
    let opened = opener.open_shares(&[y - triple.b, x - triple.a]).await?;
    let [d, e] = opened.as_slice() else {
        return Err(Error::length_mismatch(2, opened.len()));
    };
    Ok(combine(*d, *e, triple))
}

/// Multiply pairs of shared secrets with a single opening of all masked
/// differences.
pub async fn batch_multiply<O: PublicOpener + ?Sized>(
    opener: &mut O,
    pairs: &[(Share, Share)],
    triples: &[BeaverTriple],
) -> Result<Vec<Share>> {
    if pairs.len() != triples.len() {
        return Err(Error::malformed_share(format!(
            "{} pairs to multiply but {} triples",
            pairs.len(),
            triples.len()
        )));
    }
    if pairs.is_empty() {
        return Ok(vec![]);
    }

    let masked = pairs
        .iter()
        .zip(triples)
        .flat_map(|((x, y), triple)| [*y - triple.b, *x - triple.a])
        .collect_vec();
    let opened = opener.open_shares(&masked).await?;
    if opened.len() != masked.len() {
        return Err(Error::length_mismatch(masked.len(), opened.len()));
    }
    Ok(opened
        .chunks(2)
        .zip(triples)
        .map(|(de, triple)| combine(de[0], de[1], triple))
        .collect_vec())
}

#[cfg(test)]
mod tests {
    use super::{batch_multiply, combine, multiply, PublicOpener};
    use crate::parameters::MpcParameters;
    use crate::share::{recover_secret, share_secret, BeaverTriple, Share};
    use crate::Result;
    use async_trait::async_trait;
    use hbmpc_math::field::FieldElement;
    use itertools::Itertools;
    use rand::thread_rng;

    /// Returns fixed values and counts the openings.
    struct FixedOpener {
        values: Vec<FieldElement>,
        calls: usize,
        requested: usize,
    }

    #[async_trait]
    impl PublicOpener for FixedOpener {
        async fn open_shares(&mut self, shares: &[Share]) -> Result<Vec<FieldElement>> {
            self.calls += 1;
            self.requested += shares.len();
            Ok(self.values.iter().copied().take(shares.len()).collect_vec())
        }
    }

    fn triples(par: &MpcParameters, a: u64, b: u64, ab: u64) -> Vec<BeaverTriple> {
        let f = par.field();
        let t = par.t();
        let mut rng = thread_rng();
        let a = share_secret(par, f.element(a), t, &mut rng);
        let b = share_secret(par, f.element(b), t, &mut rng);
        let ab = share_secret(par, f.element(ab), t, &mut rng);
        (0..par.n())
            .map(|i| BeaverTriple {
                a: a[i],
                b: b[i],
                ab: ab[i],
            })
            .collect_vec()
    }

    #[tokio::test]
    async fn multiply_with_opened_differences() {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let mut rng = thread_rng();
        let x = share_secret(&par, f.element(6), 1, &mut rng);
        let y = share_secret(&par, f.element(7), 1, &mut rng);
        let triples = triples(&par, 2, 3, 6);

        let mut products = vec![];
        for i in 0..par.n() {
            // d = 7 - 3 and e = 6 - 2.
            let mut opener = FixedOpener {
                values: vec![f.element(4), f.element(4)],
                calls: 0,
                requested: 0,
            };
            products.push((i, multiply(&mut opener, x[i], y[i], &triples[i]).await.unwrap()));
            assert_eq!(opener.calls, 1);
        }

        for subset in products.iter().copied().combinations(2) {
            assert_eq!(recover_secret(&par, &subset).unwrap(), f.element(42));
        }
    }

    #[tokio::test]
    async fn batch_uses_one_opening() {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let mut rng = thread_rng();
        let triples = triples(&par, 5, 9, 45);
        let x = share_secret(&par, f.element(10), 1, &mut rng);
        let y = share_secret(&par, f.element(11), 1, &mut rng);

        let mut products = vec![vec![]; 3];
        for i in 0..par.n() {
            let mut opener = FixedOpener {
                // (11 - 9, 10 - 5) for every pair.
                values: [f.element(2), f.element(5)].repeat(3),
                calls: 0,
                requested: 0,
            };
            let pairs = vec![(x[i], y[i]); 3];
            let shares = batch_multiply(&mut opener, &pairs, &[triples[i]; 3])
                .await
                .unwrap();
            assert_eq!(opener.calls, 1);
            assert_eq!(opener.requested, 6);
            for (k, share) in shares.into_iter().enumerate() {
                products[k].push((i, share));
            }
        }
        for shares in products {
            assert_eq!(recover_secret(&par, &shares[..2]).unwrap(), f.element(110));
        }
    }

    #[tokio::test]
    async fn batch_rejects_mismatched_triples() {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let share = Share::new(f.one(), 1);
        let triple = triples(&par, 1, 1, 1)[0];
        let mut opener = FixedOpener {
            values: vec![],
            calls: 0,
            requested: 0,
        };
        assert!(batch_multiply(&mut opener, &[(share, share)], &[triple, triple])
            .await
            .is_err());
        assert!(batch_multiply(&mut opener, &[], &[]).await.unwrap().is_empty());
        assert_eq!(opener.calls, 0);
    }

    #[test]
    fn combine_is_linear_in_the_triple() {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let triple = BeaverTriple {
            a: Share::new(f.element(2), 1),
            b: Share::new(f.element(3), 1),
            ab: Share::new(f.element(6), 1),
        };
        // With constant sharings the share is the product itself.
        assert_eq!(
            combine(f.element(4), f.element(4), &triple).value(),
            f.element(42)
        );
    }
}
