//! RanDouSha: random double sharings with passive checking.
//!
//! Every party deals k random secrets, each shared at degree t and at degree
//! 2t. The n dealings of each secret index are mixed by the Vandermonde
//! matrix `M[i][j] = x_i^j`; the first `n - 2t` mixed sharings are kept and
//! the last 2t are opened towards one checker each, which verifies that the
//! two sharings have the right degrees and the same secret. One failed check
//! aborts the whole run.

use crate::context::Context;
use crate::net::{PartyId, TaggedChannel};
use crate::parameters::MpcParameters;
use crate::share::{DoubleShare, Share};
use crate::{Error, Result};
use hbmpc_math::field::FieldElement;
use hbmpc_math::poly::Poly;
use itertools::Itertools;
use ndarray::Array2;
use rand::{CryptoRng, RngCore};
use std::ops::Range;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// The shares one dealer sends: `messages[j]` holds party j's k degree-t
/// shares followed by its k degree-2t shares.
#[derive(Debug)]
struct Dealing {
    messages: Zeroizing<Vec<Vec<FieldElement>>>,
}

impl Dealing {
    fn random<R: RngCore + CryptoRng>(par: &MpcParameters, k: usize, rng: &mut R) -> Self {
        let field = par.field();
        let t = par.t();
        let mut t_polys = Zeroizing::new(Vec::with_capacity(k));
        let mut two_t_polys = Zeroizing::new(Vec::with_capacity(k));
        for _ in 0..k {
            let secret = Zeroizing::new(field.random(rng));
            t_polys.push(Poly::random_with_constant(*secret, t, rng));
            two_t_polys.push(Poly::random_with_constant(*secret, 2 * t, rng));
        }
        Self::from_polys(par, &t_polys, &two_t_polys)
    }

    fn from_polys(par: &MpcParameters, t_polys: &[Poly], two_t_polys: &[Poly]) -> Self {
        let messages = par
            .eval_points()
            .points()
            .iter()
            .map(|x| {
                t_polys
                    .iter()
                    .chain(two_t_polys)
                    .map(|p| p.evaluate(*x))
                    .collect_vec()
            })
            .collect_vec();
        Self {
            messages: Zeroizing::new(messages),
        }
    }
}

/// Run RanDouSha, returning this party's `k * (n - 2t)` double shares.
///
/// All parties must call this with the same k. The run is robust against
/// nothing: a missing party stalls it and a detected inconsistency aborts it
/// with `Error::RanDouShaAborted`.
pub async fn randousha<R: RngCore + CryptoRng>(
    ctx: &mut Context,
    k: usize,
    rng: &mut R,
) -> Result<Vec<DoubleShare>> {
    if k == 0 {
        return Err(Error::TooFewValues(0, 1));
    }
    let dealing = Dealing::random(ctx.parameters(), k, rng);
    run_with_dealing(ctx, k, dealing).await
}

async fn run_with_dealing(
    ctx: &mut Context,
    k: usize,
    dealing: Dealing,
) -> Result<Vec<DoubleShare>> {
    let par = ctx.parameters().clone();
    let (n, t, my_id) = (par.n(), par.t(), ctx.my_id());
    let field = par.field();
    let tag = ctx.next_tag("randousha");
    let mut deal = ctx.channel(&tag.child("deal"))?;
    let mut check = ctx.channel(&tag.child("check"))?;
    let mut ok = ctx.channel(&tag.child("ok"))?;
    let kept = n - 2 * t;
    let checkers = kept..n;

    for (j, message) in dealing.messages.iter().enumerate() {
        deal.send(j, message)?;
    }
    drop(dealing);
    debug!(my_id, %tag, k, "dealt double sharings");

    let dealt = Zeroizing::new(collect_all(&mut deal, 0..n, 2 * k).await?);
    let points = par.eval_points().points();
    let vandermonde = Array2::from_shape_fn((n, n), |(i, j)| points[i].pow(j as u64));
    // mixed[i][s] is output i of secret index s at degree t, then at degree 2t.
    let mixed = Zeroizing::new(
        (0..n)
            .map(|i| {
                (0..2 * k)
                    .map(|s| {
                        dealt
                            .iter()
                            .enumerate()
                            .fold(field.zero(), |acc, (j, d)| acc + vandermonde[[i, j]] * d[s])
                    })
                    .collect_vec()
            })
            .collect_vec(),
    );

    for checker in checkers.clone() {
        check.send(checker, &mixed[checker])?;
    }

    if checkers.contains(&my_id) {
        let received = collect_all(&mut check, 0..n, 2 * k).await?;
        let valid = verify(&par, &received, k)?;
        if !valid {
            info!(my_id, %tag, "double sharing check failed");
        }
        ok.broadcast(&[if valid { field.one() } else { field.zero() }])?;
    }

    let flags = collect_all(&mut ok, checkers, 1).await?;
    if let Some(c) = flags.iter().position(|f| f[0] != field.one()) {
        return Err(Error::RanDouShaAborted(format!(
            "party {} rejected the double sharings of {}",
            kept + c,
            tag
        )));
    }

    let output = mixed[..kept]
        .iter()
        .flat_map(|row| {
            (0..k).map(move |s| DoubleShare {
                r_t: Share::new(row[s], t),
                r_2t: Share::new(row[k + s], 2 * t),
            })
        })
        .collect_vec();
    info!(my_id, %tag, shares = output.len(), "generated double shares");
    Ok(output)
}

/// Check that the received columns are degree-t and degree-2t sharings of
/// the same secrets.
fn verify(par: &MpcParameters, received: &[Vec<FieldElement>], k: usize) -> Result<bool> {
    let field = par.field();
    let t = par.t();
    for s in 0..k {
        let points = |offset: usize| -> Result<Vec<(FieldElement, FieldElement)>> {
            received
                .iter()
                .enumerate()
                .map(|(j, values)| Ok((par.point(j)?, values[offset + s])))
                .collect()
        };
        let r_t = Zeroizing::new(Poly::interpolate(field, &points(0)?)?);
        let r_2t = Zeroizing::new(Poly::interpolate(field, &points(k)?)?);
        if r_t.degree().unwrap_or(0) > t
            || r_2t.degree().unwrap_or(0) > 2 * t
            || r_t.coeff(0) != r_2t.coeff(0)
        {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Wait for one message of `width` values from every party in `senders`,
/// returned in sender order.
async fn collect_all(
    channel: &mut TaggedChannel,
    senders: Range<PartyId>,
    width: usize,
) -> Result<Vec<Vec<FieldElement>>> {
    let mut received: Vec<Option<Vec<FieldElement>>> = vec![None; senders.len()];
    let mut missing = senders.len();
    while missing > 0 {
        let (sender, payload) = channel.recv().await?;
        if !senders.contains(&sender) || received[sender - senders.start].is_some() {
            continue;
        }
        match payload {
            Some(values) if values.len() == width => {
                received[sender - senders.start] = Some(values);
                missing -= 1;
            }
            _ => {
                return Err(Error::RanDouShaAborted(format!(
                    "malformed message from party {} on {}",
                    sender,
                    channel.tag()
                )))
            }
        }
    }
    Ok(received.into_iter().flatten().collect_vec())
}
