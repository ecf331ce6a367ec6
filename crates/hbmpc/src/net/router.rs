use super::{Envelope, PartyId, Transport};
use crate::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// In-process transport connecting `n` parties through unbounded queues.
///
/// With delays enabled, every delivery is postponed by a random duration
/// drawn from a seeded RNG, which shuffles the arrival order across senders.
#[derive(Debug)]
pub struct Router {
    senders: Vec<UnboundedSender<Envelope>>,
    delays: Option<Delays>,
}

#[derive(Debug)]
struct Delays {
    rng: Mutex<ChaCha20Rng>,
    max_delay: Duration,
}

impl Router {
    /// Create a router delivering immediately. Returns the inbound queue of
    /// every party, in party order.
    pub fn new(n: usize) -> (Arc<Self>, Vec<UnboundedReceiver<Envelope>>) {
        Self::build(n, None)
    }

    /// Create a router delaying every delivery by up to `max_delay`.
    pub fn with_delays(
        n: usize,
        seed: u64,
        max_delay: Duration,
    ) -> (Arc<Self>, Vec<UnboundedReceiver<Envelope>>) {
        Self::build(
            n,
            Some(Delays {
                rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
                max_delay,
            }),
        )
    }

    fn build(n: usize, delays: Option<Delays>) -> (Arc<Self>, Vec<UnboundedReceiver<Envelope>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..n).map(|_| unbounded_channel::<Envelope>()).unzip();
        (Arc::new(Self { senders, delays }), receivers)
    }
}

impl Transport for Router {
    fn send(&self, dest: PartyId, envelope: Envelope) -> Result<()> {
        let tx = self.senders.get(dest).ok_or(Error::InvalidParty(dest))?;
        let Some(delays) = &self.delays else {
            if tx.send(envelope).is_err() {
                trace!(dest, "dropping message to a party that has shut down");
            }
            return Ok(());
        };

        let delay = {
            let mut rng = delays.rng.lock().unwrap_or_else(|e| e.into_inner());
            let max = delays.max_delay.as_micros() as u64;
            Duration::from_micros(rng.gen_range(0..=max))
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(envelope).is_err() {
                trace!(dest, "dropping delayed message to a party that has shut down");
            }
        });
        Ok(())
    }

    fn parties(&self) -> usize {
        self.senders.len()
    }
}
