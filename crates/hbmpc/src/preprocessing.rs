//! Preprocessed correlated randomness: Beaver triples, cubes, powers,
//! sharings of zero, random values, random bits, bit decompositions and
//! double shares.
//!
//! Elements live in a [`PreprocessingStore`] owned by the session and handed
//! to each party's [`NodePreprocessing`] view. A trusted [`Dealer`] fills the
//! store for simulations and tests; [`NodePreprocessing::extend_double_shares`]
//! banks the output of RanDouSha.

use crate::net::PartyId;
use crate::parameters::MpcParameters;
use crate::share::{share_secret, BeaverTriple, DoubleShare, Share};
use crate::{Error, Result};
use hbmpc_math::field::{Field, FieldElement};
use hbmpc_util::transpose;
use itertools::Itertools;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The kinds of preprocessed elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreprocessingKind {
    /// Shares of `(a, b, ab)`.
    Triple,
    /// Shares of `(a, a^2, a^3)`.
    Cube,
    /// Shares of `(x, x^2, ..., x^k)`.
    Powers(usize),
    /// A degree-t sharing of zero.
    Zero,
    /// A degree-t sharing of a random value.
    Rand,
    /// A degree-t sharing of a random bit.
    Bit,
    /// Degree-t and degree-2t sharings of the same random value.
    DoubleShare,
    /// A sharing of a random value followed by sharings of its bits, least
    /// significant first.
    ShareBits,
}

impl PreprocessingKind {
    /// Every kind without a parameter.
    pub const ALL: [Self; 7] = [
        Self::Triple,
        Self::Cube,
        Self::Zero,
        Self::Rand,
        Self::Bit,
        Self::DoubleShare,
        Self::ShareBits,
    ];

    /// Number of field elements in one entry over `field`.
    pub const fn width(&self, field: Field) -> usize {
        match self {
            Self::Triple | Self::Cube => 3,
            Self::Powers(k) => *k,
            Self::DoubleShare => 2,
            Self::Zero | Self::Rand | Self::Bit => 1,
            Self::ShareBits => 1 + field.bits() as usize,
        }
    }
}

impl fmt::Display for PreprocessingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triple => f.write_str("triples"),
            Self::Cube => f.write_str("cubes"),
            Self::Powers(k) => write!(f, "powers_{}", k),
            Self::Zero => f.write_str("zeros"),
            Self::Rand => f.write_str("rands"),
            Self::Bit => f.write_str("bits"),
            Self::DoubleShare => f.write_str("double_shares"),
            Self::ShareBits => f.write_str("share_bits"),
        }
    }
}

/// Key of a queue of preprocessed elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PreprocessingKey {
    /// Kind of the elements.
    pub kind: PreprocessingKind,
    /// Party holding the shares.
    pub party: PartyId,
    /// Number of parties of the session.
    pub n: usize,
    /// Threshold of the session.
    pub t: usize,
}

/// Queues of preprocessed shares, one per [`PreprocessingKey`].
///
/// Entries are zeroized when the store is dropped.
#[derive(Debug, Default)]
pub struct PreprocessingStore {
    entries: HashMap<PreprocessingKey, VecDeque<Vec<FieldElement>>>,
}

/// A store shared by the parties of a session.
pub type SharedStore = Arc<Mutex<PreprocessingStore>>;

impl PreprocessingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the store to share it between parties.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Append one entry to the queue of `key`.
    pub fn push(&mut self, key: PreprocessingKey, entry: Vec<FieldElement>) {
        self.entries.entry(key).or_default().push_back(entry);
    }

    /// Append entries to the queue of `key`.
    pub fn extend<I: IntoIterator<Item = Vec<FieldElement>>>(
        &mut self,
        key: PreprocessingKey,
        entries: I,
    ) {
        self.entries.entry(key).or_default().extend(entries);
    }

    /// Remove the oldest entry of the queue of `key`.
    pub fn pop(&mut self, key: &PreprocessingKey) -> Option<Vec<FieldElement>> {
        self.entries.get_mut(key)?.pop_front()
    }

    /// Number of entries left for `key`.
    pub fn count(&self, key: &PreprocessingKey) -> usize {
        self.entries.get(key).map_or(0, |q| q.len())
    }
}

impl Zeroize for PreprocessingStore {
    fn zeroize(&mut self) {
        self.entries
            .values_mut()
            .flat_map(|queue| queue.iter_mut())
            .for_each(|entry| entry.zeroize());
        self.entries.clear();
    }
}

impl Drop for PreprocessingStore {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for PreprocessingStore {}

fn lock(store: &SharedStore) -> Result<MutexGuard<'_, PreprocessingStore>> {
    store
        .lock()
        .map_err(|_| Error::DefaultError("preprocessing store lock poisoned".to_string()))
}

/// A trusted dealer of preprocessed elements.
#[derive(Debug, Clone)]
pub struct Dealer {
    par: Arc<MpcParameters>,
}

impl Dealer {
    /// Create a dealer for the session with parameters `par`.
    pub fn new(par: &Arc<MpcParameters>) -> Self {
        Self { par: par.clone() }
    }

    fn key(&self, kind: PreprocessingKind, party: PartyId) -> PreprocessingKey {
        PreprocessingKey {
            kind,
            party,
            n: self.par.n(),
            t: self.par.t(),
        }
    }

    /// Deal `k` elements of `kind` to every party.
    ///
    /// Elements are dealt in parallel, each from its own RNG seeded by `rng`.
    pub fn generate<R: RngCore + CryptoRng>(
        &self,
        store: &mut PreprocessingStore,
        kind: PreprocessingKind,
        k: usize,
        rng: &mut R,
    ) {
        let seeds: Vec<u64> = (0..k).map(|_| rng.gen()).collect();
        let dealt = seeds
            .par_iter()
            .map(|seed| {
                let mut rng = ChaCha20Rng::seed_from_u64(*seed);
                self.deal(kind, &mut rng)
            })
            .collect::<Vec<_>>();

        for (party, entries) in transpose(&dealt).into_iter().enumerate() {
            store.extend(self.key(kind, party), entries);
        }
        debug!(%kind, k, "dealt preprocessing");
    }

    /// Deal `k` elements of every kind without a parameter to every party.
    pub fn generate_all<R: RngCore + CryptoRng>(
        &self,
        store: &mut PreprocessingStore,
        k: usize,
        rng: &mut R,
    ) {
        for kind in PreprocessingKind::ALL {
            self.generate(store, kind, k, rng);
        }
    }

    /// Deal one element, returning the entry of every party.
    fn deal<R: RngCore + CryptoRng>(
        &self,
        kind: PreprocessingKind,
        rng: &mut R,
    ) -> Vec<Vec<FieldElement>> {
        let par = self.par.as_ref();
        let field = par.field();
        let t = par.t();
        let sharings = match kind {
            PreprocessingKind::Triple => {
                let a = Zeroizing::new(field.random(rng));
                let b = Zeroizing::new(field.random(rng));
                vec![
                    share_secret(par, *a, t, rng),
                    share_secret(par, *b, t, rng),
                    share_secret(par, *a * *b, t, rng),
                ]
            }
            PreprocessingKind::Cube => {
                let a = Zeroizing::new(field.random(rng));
                (1..=3)
                    .map(|e| share_secret(par, a.pow(e), t, rng))
                    .collect_vec()
            }
            PreprocessingKind::Powers(k) => {
                let x = Zeroizing::new(field.random(rng));
                (1..=k as u64)
                    .map(|e| share_secret(par, x.pow(e), t, rng))
                    .collect_vec()
            }
            PreprocessingKind::Zero => vec![share_secret(par, field.zero(), t, rng)],
            PreprocessingKind::Rand => {
                let r = Zeroizing::new(field.random(rng));
                vec![share_secret(par, *r, t, rng)]
            }
            PreprocessingKind::Bit => {
                let bit = Zeroizing::new(field.element(rng.gen_range(0..2)));
                vec![share_secret(par, *bit, t, rng)]
            }
            PreprocessingKind::DoubleShare => {
                let r = Zeroizing::new(field.random(rng));
                vec![
                    share_secret(par, *r, t, rng),
                    share_secret(par, *r, 2 * t, rng),
                ]
            }
            PreprocessingKind::ShareBits => {
                let r = Zeroizing::new(field.random(rng));
                let mut sharings = vec![share_secret(par, *r, t, rng)];
                for i in 0..field.bits() {
                    let bit = Zeroizing::new(field.element((r.value() >> i) & 1));
                    sharings.push(share_secret(par, *bit, t, rng));
                }
                sharings
            }
        };
        (0..par.n())
            .map(|i| sharings.iter().map(|s| s[i].value()).collect_vec())
            .collect_vec()
    }
}

/// A source of Beaver triples.
pub trait TripleSource {
    /// Take a fresh triple.
    fn get_triple(&mut self) -> Result<BeaverTriple>;
}

/// A source of double shares.
pub trait DoubleShareSource {
    /// Take a fresh pair of degree-t and degree-2t shares of the same secret.
    fn get_double_share(&mut self) -> Result<DoubleShare>;
}

/// One party's view of the preprocessing store.
#[derive(Debug, Clone)]
pub struct NodePreprocessing {
    store: SharedStore,
    field: Field,
    party: PartyId,
    n: usize,
    t: usize,
}

impl NodePreprocessing {
    /// The view of `party` on `store`.
    pub fn new(store: SharedStore, par: &MpcParameters, party: PartyId) -> Self {
        Self {
            store,
            field: par.field(),
            party,
            n: par.n(),
            t: par.t(),
        }
    }

    fn key(&self, kind: PreprocessingKind) -> PreprocessingKey {
        PreprocessingKey {
            kind,
            party: self.party,
            n: self.n,
            t: self.t,
        }
    }

    fn take(&self, kind: PreprocessingKind) -> Result<Zeroizing<Vec<FieldElement>>> {
        let entry = lock(&self.store)?
            .pop(&self.key(kind))
            .ok_or_else(|| Error::PreprocessingExhausted(kind.to_string(), self.party))?;
        let entry = Zeroizing::new(entry);
        let width = kind.width(self.field);
        if entry.len() != width {
            return Err(Error::malformed_share(format!(
                "{} entry of {} values, expected {}",
                kind,
                entry.len(),
                width
            )));
        }
        Ok(entry)
    }

    /// Number of elements of `kind` left for this party.
    pub fn count(&self, kind: PreprocessingKind) -> Result<usize> {
        Ok(lock(&self.store)?.count(&self.key(kind)))
    }

    /// Take a sharing of zero.
    pub fn get_zero(&mut self) -> Result<Share> {
        Ok(Share::new(self.take(PreprocessingKind::Zero)?[0], self.t))
    }

    /// Take a sharing of a random value.
    pub fn get_rand(&mut self) -> Result<Share> {
        Ok(Share::new(self.take(PreprocessingKind::Rand)?[0], self.t))
    }

    /// Take sharings of `(a, a^2, a^3)` for a random a.
    pub fn get_cube(&mut self) -> Result<[Share; 3]> {
        let entry = self.take(PreprocessingKind::Cube)?;
        Ok([0, 1, 2].map(|i| Share::new(entry[i], self.t)))
    }

    /// Take sharings of `(x, x^2, ..., x^k)` for a random x.
    pub fn get_powers(&mut self, k: usize) -> Result<Vec<Share>> {
        if k == 0 {
            return Err(Error::TooFewValues(0, 1));
        }
        let entry = self.take(PreprocessingKind::Powers(k))?;
        Ok(entry.iter().map(|v| Share::new(*v, self.t)).collect_vec())
    }

    /// Take a sharing of a random value together with sharings of its bits,
    /// least significant first.
    pub fn get_share_bits(&mut self) -> Result<(Share, Vec<Share>)> {
        let entry = self.take(PreprocessingKind::ShareBits)?;
        let bits = entry[1..]
            .iter()
            .map(|v| Share::new(*v, self.t))
            .collect_vec();
        Ok((Share::new(entry[0], self.t), bits))
    }

    /// Take a sharing of a random bit.
    pub fn get_bit(&mut self) -> Result<Share> {
        Ok(Share::new(self.take(PreprocessingKind::Bit)?[0], self.t))
    }

    /// Bank double shares produced by this party, e.g. by RanDouSha.
    pub fn extend_double_shares(&mut self, shares: &[DoubleShare]) -> Result<()> {
        if let Some(s) = shares
            .iter()
            .find(|s| s.r_t.degree() != self.t || s.r_2t.degree() != 2 * self.t)
        {
            return Err(Error::malformed_share(format!(
                "double share of degrees ({}, {}), expected ({}, {})",
                s.r_t.degree(),
                s.r_2t.degree(),
                self.t,
                2 * self.t
            )));
        }
        lock(&self.store)?.extend(
            self.key(PreprocessingKind::DoubleShare),
            shares.iter().map(|s| vec![s.r_t.value(), s.r_2t.value()]),
        );
        Ok(())
    }
}

impl TripleSource for NodePreprocessing {
    fn get_triple(&mut self) -> Result<BeaverTriple> {
        let entry = self.take(PreprocessingKind::Triple)?;
        Ok(BeaverTriple {
            a: Share::new(entry[0], self.t),
            b: Share::new(entry[1], self.t),
            ab: Share::new(entry[2], self.t),
        })
    }
}

impl DoubleShareSource for NodePreprocessing {
    fn get_double_share(&mut self) -> Result<DoubleShare> {
        let entry = self.take(PreprocessingKind::DoubleShare)?;
        Ok(DoubleShare {
            r_t: Share::new(entry[0], self.t),
            r_2t: Share::new(entry[1], 2 * self.t),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Dealer, DoubleShareSource, NodePreprocessing, PreprocessingKey, PreprocessingKind,
        PreprocessingStore, TripleSource,
    };
    use crate::parameters::MpcParameters;
    use crate::share::{recover_secret, DoubleShare, Share};
    use crate::Error;
    use hbmpc_math::poly::Poly;
    use itertools::Itertools;
    use rand::thread_rng;
    use std::error::Error as StdError;

    fn views(par: &MpcParameters, store: PreprocessingStore) -> Vec<NodePreprocessing> {
        let store = store.into_shared();
        (0..par.n())
            .map(|i| NodePreprocessing::new(store.clone(), par, i))
            .collect_vec()
    }

    fn recover(par: &MpcParameters, shares: &[Share]) -> hbmpc_math::field::FieldElement {
        let indexed = shares.iter().copied().enumerate().collect_vec();
        recover_secret(par, &indexed).unwrap()
    }

    #[test]
    fn store_queues() {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let key = PreprocessingKey {
            kind: PreprocessingKind::Zero,
            party: 0,
            n: 4,
            t: 1,
        };
        let other = PreprocessingKey { n: 7, t: 2, ..key };
        let mut store = PreprocessingStore::new();
        store.push(key, vec![f.one()]);
        store.extend(key, [vec![f.element(2)], vec![f.element(3)]]);
        assert_eq!(store.count(&key), 3);
        assert_eq!(store.count(&other), 0);
        assert_eq!(store.pop(&key), Some(vec![f.one()]));
        assert_eq!(store.pop(&other), None);
        assert_eq!(store.count(&key), 2);
    }

    #[test]
    fn dealt_elements_are_consistent() -> Result<(), Box<dyn StdError>> {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let mut store = PreprocessingStore::new();
        Dealer::new(&par).generate_all(&mut store, 5, &mut thread_rng());
        let mut views = views(&par, store);
        assert_eq!(views[2].count(PreprocessingKind::Bit)?, 5);

        for _ in 0..5 {
            let triples = views
                .iter_mut()
                .map(|v| v.get_triple())
                .collect::<Result<Vec<_>, _>>()?;
            let a = recover(&par, &triples.iter().map(|t| t.a).collect_vec());
            let b = recover(&par, &triples.iter().map(|t| t.b).collect_vec());
            let ab = recover(&par, &triples.iter().map(|t| t.ab).collect_vec());
            assert_eq!(a * b, ab);

            let zeros = views.iter_mut().map(|v| v.get_zero()).collect::<Result<Vec<_>, _>>()?;
            assert_eq!(recover(&par, &zeros), f.zero());

            let bits = views.iter_mut().map(|v| v.get_bit()).collect::<Result<Vec<_>, _>>()?;
            let bit = recover(&par, &bits);
            assert!(bit == f.zero() || bit == f.one());

            let rands = views.iter_mut().map(|v| v.get_rand()).collect::<Result<Vec<_>, _>>()?;
            assert!(rands.iter().all(|r| r.degree() == 1));

            let doubles = views
                .iter_mut()
                .map(|v| v.get_double_share())
                .collect::<Result<Vec<_>, _>>()?;
            let points = |shares: Vec<Share>| {
                shares
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (par.point(i).unwrap(), s.value()))
                    .collect_vec()
            };
            let r_t = Poly::interpolate(f, &points(doubles.iter().map(|d| d.r_t).collect()))?;
            let r_2t = Poly::interpolate(f, &points(doubles.iter().map(|d| d.r_2t).collect()))?;
            assert!(r_t.degree().unwrap_or(0) <= 1);
            assert!(r_2t.degree().unwrap_or(0) <= 2);
            assert_eq!(r_t.coeff(0), r_2t.coeff(0));
        }

        assert_eq!(
            views[1].get_triple(),
            Err(Error::PreprocessingExhausted("triples".to_string(), 1))
        );
        Ok(())
    }

    #[test]
    fn kind_widths() {
        let f = hbmpc_math::field::Field::goldilocks();
        assert_eq!(PreprocessingKind::Cube.width(f), 3);
        assert_eq!(PreprocessingKind::Powers(5).width(f), 5);
        assert_eq!(PreprocessingKind::ShareBits.width(f), 65);
        assert_eq!(PreprocessingKind::Powers(5).to_string(), "powers_5");
        assert_ne!(
            PreprocessingKey {
                kind: PreprocessingKind::Powers(2),
                party: 0,
                n: 4,
                t: 1
            },
            PreprocessingKey {
                kind: PreprocessingKind::Powers(3),
                party: 0,
                n: 4,
                t: 1
            }
        );
    }

    #[test]
    fn powers_need_an_exponent() {
        let par = MpcParameters::default_arc(4, 1);
        let mut views = views(&par, PreprocessingStore::new());
        assert_eq!(views[0].get_powers(0), Err(Error::TooFewValues(0, 1)));
        assert_eq!(
            views[0].get_powers(2),
            Err(Error::PreprocessingExhausted("powers_2".to_string(), 0))
        );
    }

    #[test]
    fn bank_double_shares() -> Result<(), Box<dyn StdError>> {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let mut views = views(&par, PreprocessingStore::new());
        let good = DoubleShare {
            r_t: Share::new(f.one(), 1),
            r_2t: Share::new(f.element(2), 2),
        };
        let bad = DoubleShare {
            r_t: Share::new(f.one(), 2),
            r_2t: Share::new(f.element(2), 2),
        };
        assert!(matches!(
            views[0].extend_double_shares(&[good, bad]),
            Err(Error::MalformedShare(_))
        ));
        views[0].extend_double_shares(&[good, good])?;
        assert_eq!(views[0].count(PreprocessingKind::DoubleShare)?, 2);
        assert_eq!(views[1].count(PreprocessingKind::DoubleShare)?, 0);
        assert_eq!(views[0].get_double_share()?, good);
        Ok(())
    }
}
