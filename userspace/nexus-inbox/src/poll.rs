// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Poll loop: receive into ready lanes, hand messages to per-lane dispatch workers.
//!
//! Threaded mode runs, per lane, one poller blocking on that lane's channel
//! queue (bounded by the tick) and one dispatch worker running the handler.
//! A slow handler therefore only ever holds back its own lane. Shutdown clears
//! the running flag, joins the pollers (dropping the hand-off senders) and then
//! joins the workers, so in-flight handlers finish before the channel goes away.
//!
//! Finding the channel removed by another party is terminal: the inbox stops
//! running and every lane stops polling.

use std::io;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, warn};

use crate::channel::Wait;
use crate::error::{ChannelError, InboxError};
use crate::inbox::{InboxHandle, Shared};
use crate::lane::Lane;
use crate::message::Message;
use crate::wire;

/// Result of one receive attempt on one lane.
pub(crate) enum PollOutcome {
    /// A message was received and the lane is now occupied.
    Delivered(Message),
    /// Nothing waiting.
    Idle,
    /// Lane locked; receive skipped.
    Occupied,
    /// Received record could not be decoded and was dropped; already logged.
    Malformed,
    /// Receive failed; already logged.
    Failed(ChannelError),
}

/// One receive attempt on `lane` if it is ready; occupies the lane on success.
pub(crate) fn poll_lane(shared: &Shared, lane: Lane, wait: Wait) -> PollOutcome {
    let slot = shared.lanes.get(lane);
    let _gate = slot.enter_receive();
    if slot.is_locked() {
        return PollOutcome::Occupied;
    }
    match shared.channel.recv(lane, wait) {
        Ok(record) => match wire::decode(lane, &record) {
            Ok(message) => {
                slot.occupy(message.clone());
                PollOutcome::Delivered(message)
            }
            Err(err) => {
                warn!("nexus-inbox: {}: dropping undecodable {lane} record: {}", shared.name, InboxError::from(err));
                PollOutcome::Malformed
            }
        },
        Err(err) if err.is_empty() => PollOutcome::Idle,
        Err(ChannelError::Removed) => {
            if shared.running.swap(false, Ordering::AcqRel) {
                error!(
                    "nexus-inbox: {}: channel {} removed underneath the inbox; polling stopped",
                    shared.name,
                    shared.channel.id()
                );
            }
            PollOutcome::Failed(ChannelError::Removed)
        }
        Err(err) => {
            warn!("nexus-inbox: {}: {}", shared.name, InboxError::Receive(err));
            PollOutcome::Failed(err)
        }
    }
}

/// Runs the lane's handler; handler failures are logged, never escalated.
pub(crate) fn dispatch(handle: &InboxHandle, lane: Lane, message: &Message) {
    debug!(
        "nexus-inbox: {}: dispatch {lane} type={} id={} from {}",
        handle.name(),
        message.message_type(),
        message.correlation_id(),
        message.sender()
    );
    if let Err(err) = handle.dispatch(lane, message) {
        warn!("nexus-inbox: {}: {lane} handler: {err}", handle.name());
    }
}

/// Threads of a running poll loop.
pub(crate) struct PollLoop {
    pollers: Vec<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl PollLoop {
    pub(crate) fn spawn(handle: &InboxHandle) -> io::Result<Self> {
        let mut poll_loop = Self { pollers: Vec::with_capacity(3), workers: Vec::with_capacity(3) };
        for lane in Lane::ALL {
            if let Err(err) = poll_loop.spawn_lane(handle, lane) {
                handle.shared.running.store(false, Ordering::Release);
                poll_loop.join();
                return Err(err);
            }
        }
        Ok(poll_loop)
    }

    fn spawn_lane(&mut self, handle: &InboxHandle, lane: Lane) -> io::Result<()> {
        // Capacity 1: a lane holds at most one unreleased message.
        let (tx, rx) = bounded::<Message>(1);
        let worker_handle = handle.clone();
        let worker = thread::Builder::new()
            .name(format!("{}-{lane}-dispatch", handle.name()))
            .spawn(move || run_worker(worker_handle, lane, rx))?;
        self.workers.push(worker);

        let poller_handle = handle.clone();
        let poller = thread::Builder::new()
            .name(format!("{}-{lane}-poll", handle.name()))
            .spawn(move || run_poller(poller_handle, lane, tx))?;
        self.pollers.push(poller);
        Ok(())
    }

    /// Joins pollers first so the workers see their queues close.
    pub(crate) fn join(self) {
        for poller in self.pollers {
            if poller.join().is_err() {
                warn!("nexus-inbox: poller thread panicked");
            }
        }
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("nexus-inbox: dispatch worker panicked");
            }
        }
    }
}

fn run_poller(handle: InboxHandle, lane: Lane, tx: Sender<Message>) {
    let shared = &handle.shared;
    let tick = shared.tick;
    while shared.running.load(Ordering::Acquire) {
        if !shared.lanes.get(lane).wait_unlocked(Some(tick)) {
            continue;
        }
        if !shared.running.load(Ordering::Acquire) {
            break;
        }
        match poll_lane(shared, lane, Wait::Timeout(tick)) {
            PollOutcome::Delivered(message) => {
                if tx.send(message).is_err() {
                    break;
                }
            }
            PollOutcome::Idle | PollOutcome::Occupied | PollOutcome::Malformed => {}
            PollOutcome::Failed(ChannelError::Removed) => break,
            PollOutcome::Failed(_) => thread::sleep(tick),
        }
    }
}

fn run_worker(handle: InboxHandle, lane: Lane, rx: Receiver<Message>) {
    for message in rx.iter() {
        dispatch(&handle, lane, &message);
    }
}
