//! Robust, asynchronous batch reconstruction of t-shared secrets.
//!
//! The secrets `s_0, ..., s_{m-1}` are shared by polynomials `φ_i` of degree
//! at most t. Split into chunks of at most t+1 secrets, each chunk defines
//! the bivariate polynomial `F(x, y) = Σ_i φ_i(x) y^i`, and party j holds the
//! row `F(x_j, y)`, whose coefficients are its shares.
//!
//! 1. Party j sends `F(x_j, x_i)` to every party i. For party i these values
//!    are evaluations of `F(x, x_i)`, of degree at most t in x, which it
//!    decodes with Berlekamp-Welch.
//! 2. Party i broadcasts `F(0, x_i) = Σ_k s_k x_i^k` and everyone decodes the
//!    column polynomial, whose coefficients are the secrets.
//!
//! A decoded polynomial is only accepted once it agrees with at least 2t+1
//! received values, i.e. with at least t+1 honest ones. Senders disagreeing
//! with an accepted polynomial, or sending malformed payloads, are reported
//! as evil and ignored in the second round.

use crate::net::{PartyId, TaggedChannel};
use crate::parameters::MpcParameters;
use crate::{Error, Result};
use hbmpc_math::field::FieldElement;
use hbmpc_math::poly::Poly;
use hbmpc_math::rs::RsCodec;
use itertools::Itertools;
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

/// The outcome of a batch reconstruction at one party.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconstruction {
    /// The secrets, in the order of the input shares.
    pub secrets: Vec<FieldElement>,
    /// Parties caught sending inconsistent or malformed values in either
    /// round.
    pub evil_nodes: BTreeSet<PartyId>,
}

/// Reconstruct the secrets of which `shares` are party `my_id`'s degree-t
/// shares.
///
/// Every party must call this with the same number of shares and with
/// channels of the same two tags. Opening any number of shares costs one
/// message per party and round.
pub async fn batch_reconstruct(
    par: &MpcParameters,
    my_id: PartyId,
    shares: &[FieldElement],
    row: &mut TaggedChannel,
    col: &mut TaggedChannel,
) -> Result<Reconstruction> {
    let (n, t) = (par.n(), par.t());
    if my_id >= n {
        return Err(Error::InvalidParty(my_id));
    }
    if shares.is_empty() {
        return Err(Error::malformed_share("cannot reconstruct an empty batch"));
    }
    let field = par.field();
    let rs = par.codec(t + 1)?;
    let chunk_lens = shares.chunks(t + 1).map(|c| c.len()).collect_vec();

    let rows = Zeroizing::new(
        shares
            .chunks(t + 1)
            .map(|c| Poly::new(field, c.to_vec()))
            .collect_vec(),
    );
    for (j, x) in par.eval_points().points().iter().enumerate() {
        let values = rows.iter().map(|r| r.evaluate(*x)).collect_vec();
        row.send(j, &values)?;
    }
    trace!(my_id, tag = %row.tag(), "sent row evaluations");

    let session = DecodeSession::new(n, chunk_lens.len(), BTreeSet::new());
    let (row_polys, row_evil) = decode_round(session, &rs, t, row).await?;

    let column = row_polys.iter().map(|p| p[0]).collect_vec();
    col.broadcast(&column)?;
    trace!(my_id, tag = %col.tag(), "sent column evaluations");

    let session = DecodeSession::new(n, chunk_lens.len(), row_evil.clone());
    let (col_polys, col_evil) = decode_round(session, &rs, t, col).await?;

    let secrets = col_polys
        .iter()
        .zip(chunk_lens.iter())
        .flat_map(|(p, len)| p[..*len].to_vec())
        .collect_vec();
    let evil_nodes = row_evil.union(&col_evil).copied().collect::<BTreeSet<_>>();
    debug!(
        my_id,
        secrets = secrets.len(),
        evil = ?evil_nodes,
        "batch reconstruction complete"
    );
    Ok(Reconstruction {
        secrets,
        evil_nodes,
    })
}

/// What one party knows during one decoding round.
#[derive(Debug)]
struct DecodeSession {
    /// One payload per sender, `None` while nothing valid was received.
    received: Vec<Option<Vec<FieldElement>>>,
    /// Senders whose messages are ignored.
    excluded: BTreeSet<PartyId>,
    /// Senders of malformed payloads.
    faulty: BTreeSet<PartyId>,
    /// Number of values per payload.
    width: usize,
    well_formed: usize,
}

impl DecodeSession {
    fn new(n: usize, width: usize, excluded: BTreeSet<PartyId>) -> Self {
        Self {
            received: vec![None; n],
            excluded,
            faulty: BTreeSet::new(),
            width,
            well_formed: 0,
        }
    }

    /// Record a message, returning false when it is ignored.
    fn record(&mut self, sender: PartyId, payload: Option<Vec<FieldElement>>) -> bool {
        if sender >= self.received.len()
            || self.excluded.contains(&sender)
            || self.faulty.contains(&sender)
            || self.received[sender].is_some()
        {
            return false;
        }
        match payload {
            Some(values) if values.len() == self.width => {
                self.received[sender] = Some(values);
                self.well_formed += 1;
            }
            _ => {
                self.faulty.insert(sender);
            }
        }
        true
    }

    /// Whether every sender that may still speak has been heard from.
    fn complete(&self) -> bool {
        self.well_formed + self.faulty.len() + self.excluded.len() >= self.received.len()
    }

    /// Decode every chunk, returning the message of each chunk and the
    /// senders to blame, or None if the data does not pin the polynomials
    /// yet.
    fn try_decode(
        &self,
        rs: &RsCodec,
        t: usize,
    ) -> Result<Option<(Vec<Vec<FieldElement>>, BTreeSet<PartyId>)>> {
        let mut messages = Vec::with_capacity(self.width);
        let mut evil = self.faulty.clone();
        for c in 0..self.width {
            let word = self
                .received
                .iter()
                .map(|r| r.as_ref().map(|values| values[c]))
                .collect_vec();
            let decoded = match rs.decode_with_errors(&word) {
                Ok(decoded) => decoded,
                Err(hbmpc_math::Error::Undecodable(_) | hbmpc_math::Error::NoDivisorFound) => {
                    return Ok(None)
                }
                Err(e) => return Err(e.into()),
            };
            if self.well_formed - decoded.errors.len() < 2 * t + 1 {
                return Ok(None);
            }
            evil.extend(decoded.errors);
            messages.push(decoded.message);
        }
        Ok(Some((messages, evil)))
    }
}

async fn decode_round(
    mut session: DecodeSession,
    rs: &RsCodec,
    t: usize,
    channel: &mut TaggedChannel,
) -> Result<(Vec<Vec<FieldElement>>, BTreeSet<PartyId>)> {
    loop {
        let (sender, payload) = channel.recv().await?;
        if !session.record(sender, payload) {
            trace!(sender, tag = %channel.tag(), "ignoring message");
            continue;
        }

        if session.well_formed >= 2 * t + 1 {
            trace!(
                tag = %channel.tag(),
                received = session.well_formed,
                "attempting to decode"
            );
            if let Some((messages, evil)) = session.try_decode(rs, t)? {
                if !evil.is_empty() {
                    warn!(tag = %channel.tag(), evil = ?evil, "detected faulty senders");
                }
                return Ok((messages, evil));
            }
        }

        if session.complete() {
            return Err(Error::ReconstructionFailed(format!(
                "heard from every sender of {} without decoding",
                channel.tag()
            )));
        }
    }
}
