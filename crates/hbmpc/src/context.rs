//! The per-party handle through which MPC programs run.

use crate::beaver::PublicOpener;
use crate::net::{Mailbox, PartyId, Tag, TaggedChannel};
use crate::parameters::MpcParameters;
use crate::preprocessing::{NodePreprocessing, SharedStore};
use crate::reconstruction::{batch_reconstruct, Reconstruction};
use crate::share::{Share, ShareArray};
use crate::{Error, Result};
use async_trait::async_trait;
use hbmpc_math::field::{Field, FieldElement};
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// One party's view of an MPC session.
///
/// Every party must issue the same sequence of openings and protocol calls:
/// tags are allocated from per-prefix counters, so the n contexts agree on
/// them without coordination.
#[derive(Debug)]
pub struct Context {
    my_id: PartyId,
    par: Arc<MpcParameters>,
    mailbox: Mailbox,
    preprocessing: NodePreprocessing,
    counters: HashMap<String, usize>,
    evil_nodes: BTreeSet<PartyId>,
}

impl Context {
    /// Create the context of party `my_id`.
    pub fn new(my_id: PartyId, par: &Arc<MpcParameters>, mailbox: Mailbox, store: SharedStore) -> Self {
        Self {
            my_id,
            preprocessing: NodePreprocessing::new(store, par, my_id),
            par: par.clone(),
            mailbox,
            counters: HashMap::new(),
            evil_nodes: BTreeSet::new(),
        }
    }

    /// The party running this context.
    pub const fn my_id(&self) -> PartyId {
        self.my_id
    }

    /// Number of parties.
    pub fn n(&self) -> usize {
        self.par.n()
    }

    /// Threshold.
    pub fn t(&self) -> usize {
        self.par.t()
    }

    /// The field of the session.
    pub fn field(&self) -> Field {
        self.par.field()
    }

    /// The parameters of the session.
    pub fn parameters(&self) -> &Arc<MpcParameters> {
        &self.par
    }

    /// This party's preprocessed elements.
    pub fn preprocessing(&mut self) -> &mut NodePreprocessing {
        &mut self.preprocessing
    }

    /// Every party caught misbehaving by an opening so far.
    pub fn evil_nodes(&self) -> &BTreeSet<PartyId> {
        &self.evil_nodes
    }

    /// The next tag under `prefix`, i.e. `prefix/0`, `prefix/1`, ...
    pub fn next_tag(&mut self, prefix: &str) -> Tag {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let tag = Tag::new(prefix).child(*counter);
        *counter += 1;
        tag
    }

    /// The channel of `tag`.
    pub fn channel(&self, tag: &Tag) -> Result<TaggedChannel> {
        self.mailbox.channel(tag)
    }

    /// Wrap a local value as this party's degree-t share.
    pub fn share(&self, value: FieldElement) -> Share {
        Share::new(value, self.t())
    }

    /// Wrap local values as this party's degree-t shares.
    pub fn share_array(&self, values: &[FieldElement]) -> ShareArray {
        ShareArray::from_values(values, self.t())
    }

    /// Run a batch reconstruction of degree-t `shares` with the other parties.
    pub async fn reconstruct(&mut self, shares: &[Share]) -> Result<Reconstruction> {
        let t = self.t();
        if let Some(s) = shares.iter().find(|s| s.degree() != t) {
            return Err(Error::malformed_share(format!(
                "cannot open a share of degree {}, expected {}",
                s.degree(),
                t
            )));
        }

        let tag = self.next_tag("open");
        let mut row = self.channel(&tag.child("row"))?;
        let mut col = self.channel(&tag.child("col"))?;
        let values = shares.iter().map(|s| s.value()).collect_vec();
        debug!(my_id = self.my_id, %tag, shares = values.len(), "opening");

        let reconstruction = batch_reconstruct(&self.par, self.my_id, &values, &mut row, &mut col);
        let reconstruction = match self.par.reconstruction_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, reconstruction)
                .await
                .map_err(|_| Error::Timeout(timeout))??,
            None => reconstruction.await?,
        };
        if !reconstruction.evil_nodes.is_empty() {
            warn!(my_id = self.my_id, %tag, evil = ?reconstruction.evil_nodes, "opening blamed parties");
            self.evil_nodes.extend(&reconstruction.evil_nodes);
        }
        Ok(reconstruction)
    }

    /// Open one share.
    pub async fn open(&mut self, share: &Share) -> Result<FieldElement> {
        let opened = self.reconstruct(&[*share]).await?.secrets;
        opened
            .first()
            .copied()
            .ok_or_else(|| Error::length_mismatch(1, opened.len()))
    }

    /// Open an array of shares in one batch.
    pub async fn open_array(&mut self, shares: &ShareArray) -> Result<Vec<FieldElement>> {
        Ok(self.reconstruct(shares.shares()).await?.secrets)
    }
}

#[async_trait]
impl PublicOpener for Context {
    async fn open_shares(&mut self, shares: &[Share]) -> Result<Vec<FieldElement>> {
        Ok(self.reconstruct(shares).await?.secrets)
    }
}

/// Contexts of all parties, connected by an in-process router and sharing
/// an empty preprocessing store.
#[cfg(test)]
pub(crate) fn test_contexts(par: &Arc<MpcParameters>) -> Vec<Context> {
    use crate::net::Router;
    use crate::preprocessing::PreprocessingStore;

    let (router, inboxes) = Router::new(par.n());
    let store = PreprocessingStore::new().into_shared();
    inboxes
        .into_iter()
        .enumerate()
        .map(|(i, inbox)| {
            let mailbox = Mailbox::spawn(i, par.field(), router.clone(), inbox);
            Context::new(i, par, mailbox, store.clone())
        })
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use super::test_contexts as contexts;
    use crate::net::Tag;
    use crate::parameters::{MpcParameters, MpcParametersBuilder};
    use crate::share::{share_secret, Share};
    use crate::Error;
    use rand::thread_rng;
    use std::time::Duration;
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn open_across_parties() {
        let par = MpcParameters::default_arc(4, 1);
        let f = par.field();
        let x = share_secret(&par, f.element(12), 1, &mut thread_rng());
        let y = share_secret(&par, f.element(30), 1, &mut thread_rng());

        let mut tasks = JoinSet::new();
        for (i, mut ctx) in contexts(&par).into_iter().enumerate() {
            let (x, y) = (x[i], y[i]);
            tasks.spawn(async move {
                let first = ctx.open(&x).await?;
                let both = ctx.open_array(&vec![x, y].into()).await?;
                Ok::<_, Error>((first, both))
            });
        }
        while let Some(result) = tasks.join_next().await {
            let (first, both) = result.unwrap().unwrap();
            assert_eq!(first, f.element(12));
            assert_eq!(both, vec![f.element(12), f.element(30)]);
        }
    }

    #[tokio::test]
    async fn stalled_opening_times_out() {
        let par = MpcParametersBuilder::new()
            .set_parties(4)
            .set_threshold(1)
            .set_reconstruction_timeout(Duration::from_millis(50))
            .build_arc()
            .unwrap();
        let mut ctx = contexts(&par).remove(0);
        let share = ctx.share(par.field().one());
        assert_eq!(
            ctx.open(&share).await,
            Err(Error::Timeout(Duration::from_millis(50)))
        );
    }

    #[tokio::test]
    async fn only_degree_t_shares_open() {
        let par = MpcParameters::default_arc(4, 1);
        let mut ctx = contexts(&par).remove(0);
        let share = Share::new(par.field().one(), 2);
        assert!(matches!(ctx.open(&share).await, Err(Error::MalformedShare(_))));
    }

    #[tokio::test]
    async fn tags_are_sequential() {
        let par = MpcParameters::default_arc(4, 1);
        let mut ctx = contexts(&par).remove(0);
        assert_eq!(ctx.next_tag("open"), Tag::new("open/0"));
        assert_eq!(ctx.next_tag("open"), Tag::new("open/1"));
        assert_eq!(ctx.next_tag("randousha"), Tag::new("randousha/0"));
        assert_eq!(ctx.next_tag("open"), Tag::new("open/2"));
    }
}
