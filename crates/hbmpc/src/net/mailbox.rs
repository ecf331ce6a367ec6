use super::{Envelope, PartyId, Tag, Transport};
use crate::{Error, Result};
use hbmpc_math::field::{Field, FieldElement};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Number of finished tags remembered to drop their late messages.
const CLOSED_TAGS: usize = 4096;

type Inbound = (PartyId, Vec<u8>);

#[derive(Debug)]
struct Queue {
    tx: UnboundedSender<Inbound>,
    rx: Option<UnboundedReceiver<Inbound>>,
}

impl Queue {
    fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self { tx, rx: Some(rx) }
    }
}

/// Live queues, plus the most recently finished tags.
#[derive(Debug, Default)]
struct Queues {
    live: HashMap<Tag, Queue>,
    closed: HashSet<Tag>,
    closed_order: VecDeque<Tag>,
}

impl Queues {
    fn close(&mut self, tag: &Tag) {
        self.live.remove(tag);
        if self.closed.insert(tag.clone()) {
            self.closed_order.push_back(tag.clone());
        }
        while self.closed_order.len() > CLOSED_TAGS {
            if let Some(oldest) = self.closed_order.pop_front() {
                self.closed.remove(&oldest);
            }
        }
    }
}

type SharedQueues = Arc<Mutex<Queues>>;

fn lock(queues: &SharedQueues) -> MutexGuard<'_, Queues> {
    queues.lock().unwrap_or_else(|e| e.into_inner())
}

/// A party's inbound demultiplexer.
///
/// A background task moves every incoming envelope into the queue of its
/// tag, creating the queue on first use, so messages that arrive before a
/// protocol asks for its channel are kept until then. Dropping a
/// [`TaggedChannel`] releases its queue; later messages of that tag are
/// discarded.
#[derive(Debug)]
pub struct Mailbox {
    my_id: PartyId,
    field: Field,
    transport: Arc<dyn Transport>,
    queues: SharedQueues,
    demux: JoinHandle<()>,
}

impl Mailbox {
    /// Start demultiplexing `inbound` for party `my_id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        my_id: PartyId,
        field: Field,
        transport: Arc<dyn Transport>,
        mut inbound: UnboundedReceiver<Envelope>,
    ) -> Self {
        let queues: SharedQueues = Arc::new(Mutex::new(Queues::default()));
        let demux_queues = queues.clone();
        let demux = tokio::spawn(async move {
            while let Some(envelope) = inbound.recv().await {
                let mut queues = lock(&demux_queues);
                if queues.closed.contains(&envelope.tag) {
                    trace!(my_id, tag = %envelope.tag, "dropping message for a finished protocol");
                    continue;
                }
                let queue = queues
                    .live
                    .entry(envelope.tag.clone())
                    .or_insert_with(Queue::new);
                // The receiver is only gone once the channel was dropped,
                // which also removes the queue.
                let _ = queue.tx.send((envelope.sender, envelope.payload));
            }
            debug!(my_id, "mailbox closed");
        });
        Self {
            my_id,
            field,
            transport,
            queues,
            demux,
        }
    }

    /// The party owning this mailbox.
    pub const fn my_id(&self) -> PartyId {
        self.my_id
    }

    /// Number of parties.
    pub fn parties(&self) -> usize {
        self.transport.parties()
    }

    /// Hand out the channel of `tag`.
    ///
    /// Every tag has a single consumer: returns `Error::ChannelInUse` if the
    /// channel was already handed out.
    pub fn channel(&self, tag: &Tag) -> Result<TaggedChannel> {
        let mut queues = lock(&self.queues);
        if queues.closed.contains(tag) {
            return Err(Error::ChannelInUse(tag.to_string()));
        }
        let rx = queues
            .live
            .entry(tag.clone())
            .or_insert_with(Queue::new)
            .rx
            .take()
            .ok_or_else(|| Error::ChannelInUse(tag.to_string()))?;
        Ok(TaggedChannel {
            my_id: self.my_id,
            field: self.field,
            tag: tag.clone(),
            transport: self.transport.clone(),
            queues: self.queues.clone(),
            rx,
        })
    }

    /// Number of tags with a queue, handed out or still buffering.
    pub fn live_tags(&self) -> usize {
        lock(&self.queues).live.len()
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        self.demux.abort();
    }
}

/// The messages of one tag, seen by one party.
#[derive(Debug)]
pub struct TaggedChannel {
    my_id: PartyId,
    field: Field,
    tag: Tag,
    transport: Arc<dyn Transport>,
    queues: SharedQueues,
    rx: UnboundedReceiver<Inbound>,
}

impl TaggedChannel {
    /// The party owning this channel.
    pub const fn my_id(&self) -> PartyId {
        self.my_id
    }

    /// Number of parties.
    pub fn parties(&self) -> usize {
        self.transport.parties()
    }

    /// The tag of this channel.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Send `values` to party `dest`.
    pub fn send(&self, dest: PartyId, values: &[FieldElement]) -> Result<()> {
        self.transport.send(
            dest,
            Envelope {
                sender: self.my_id,
                tag: self.tag.clone(),
                payload: self.field.serialize_elements(values),
            },
        )
    }

    /// Send the same `values` to every party, including this one.
    pub fn broadcast(&self, values: &[FieldElement]) -> Result<()> {
        (0..self.parties()).try_for_each(|dest| self.send(dest, values))
    }

    /// Wait for the next message of this tag.
    ///
    /// Returns the sender and the values, or `None` when the payload is not a
    /// valid sequence of field elements.
    pub async fn recv(&mut self) -> Result<(PartyId, Option<Vec<FieldElement>>)> {
        let (sender, payload) = self
            .rx
            .recv()
            .await
            .ok_or_else(|| Error::ChannelClosed(self.tag.to_string()))?;
        Ok((sender, self.field.deserialize_elements(&payload).ok()))
    }
}

impl Drop for TaggedChannel {
    fn drop(&mut self) {
        lock(&self.queues).close(&self.tag);
    }
}
