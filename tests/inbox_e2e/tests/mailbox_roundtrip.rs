//! CONTEXT: nexus-inbox end-to-end integration tests
//! INTENT: Two or more mailboxes exchanging commands, replies and urgent messages
//! DEPS: nexus-inbox (host transport), inbox-e2e harness
//! TESTS: base->motor command + reply, urgent during slow command, FIFO after unlock,
//!        full channel, standalone outbox, config file bootstrap, restart after quit,
//!        quit waiting for an in-flight handler
// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use inbox_e2e::{Forward, Harness, Responder, SlowCommand, DELIVERY_TIMEOUT};
use nexus_inbox::{ChannelError, Inbox, InboxConfig, InboxError, Lane, LaneState, MailboxName, Message, PollMode};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn command_reply_roundtrip_between_two_inboxes() {
    init_logging();
    let harness = Harness::new();
    let (forward, replies) = Forward::releasing();
    let base = harness.inbox("base", forward);
    let motor = harness.inbox("motor", Responder::new(1, b"OK"));

    base.create_command("motor", 3, 7, b"GO").unwrap();

    let (lane, reply) = replies.recv_timeout(DELIVERY_TIMEOUT).expect("reply delivered");
    assert_eq!(lane, Lane::Reply);
    assert_eq!(reply.lane(), Lane::Reply);
    assert_eq!(reply.correlation_id(), 7);
    assert_eq!(reply.message_type(), 1);
    assert_eq!(reply.payload(), b"OK");
    assert_eq!(reply.sender(), "motor");
    assert_eq!(reply.recipient(), "base");

    motor.quit().unwrap();
    base.quit().unwrap();
}

#[test]
fn delivered_fields_match_what_was_sent() {
    init_logging();
    let harness = Harness::new();
    let (forward, delivered) = Forward::releasing();
    let motor = harness.inbox("motor", forward);
    let payload: Vec<u8> = (0..128u8).collect();
    let sender = "base-controller-0123456789abcdef";
    let sent = Message::new(Lane::Command, -4, i32::MAX, &payload, sender, "motor").unwrap();

    harness.outbox().send(&sent).unwrap();

    let (_, got) = delivered.recv_timeout(DELIVERY_TIMEOUT).unwrap();
    assert_eq!(got, sent);
    motor.quit().unwrap();
}

#[test]
fn urgent_is_delivered_while_command_handler_is_busy() {
    init_logging();
    let harness = Harness::new();
    let (handler, controls) = SlowCommand::with_controls();
    let motor = harness.inbox("motor", handler);
    let base = MailboxName::new("base").unwrap();
    let outbox = harness.outbox();

    outbox.create_command(&base, "motor", 3, 1, b"DRIVE").unwrap();
    assert_eq!(controls.started.recv_timeout(DELIVERY_TIMEOUT).unwrap(), 1);

    outbox.create_urgent(&base, "motor", 9, 2, b"STOP").unwrap();
    let urgent = controls.urgent.recv_timeout(DELIVERY_TIMEOUT).expect("urgent not starved by command handler");
    assert_eq!(urgent.payload(), b"STOP");
    assert_eq!(motor.lane_state(Lane::Command), LaneState::Occupied);

    controls.release.send(()).unwrap();
    assert!(motor.wait_unlocked(Lane::Command, Some(DELIVERY_TIMEOUT)));
    motor.quit().unwrap();
}

#[test]
fn command_lane_releases_in_fifo_order_after_each_unlock() {
    init_logging();
    let harness = Harness::new();
    let (forward, delivered) = Forward::holding();
    let motor = harness.inbox("motor", forward);
    let base = MailboxName::new("base").unwrap();
    let outbox = harness.outbox();
    for id in 1..=5 {
        outbox.create_command(&base, "motor", 3, id, b"").unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        let (lane, message) = delivered.recv_timeout(DELIVERY_TIMEOUT).unwrap();
        assert_eq!(lane, Lane::Command);
        assert!(delivered.recv_timeout(Duration::from_millis(20)).is_err(), "a locked lane must not receive");
        assert_eq!(motor.buffer(Lane::Command).map(|held| held.correlation_id()), Some(message.correlation_id()));
        seen.push(message.correlation_id());
        motor.unlock(Lane::Command);
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    motor.quit().unwrap();
}

#[test]
fn full_recipient_channel_reports_send_failure() {
    init_logging();
    let harness = Harness::with_mode(PollMode::Manual).with_capacity(2);
    let (forward, _delivered) = Forward::holding();
    let motor = harness.inbox("motor", forward);
    let base = MailboxName::new("base").unwrap();
    let outbox = harness.outbox();

    outbox.create_command(&base, "motor", 3, 1, b"").unwrap();
    outbox.create_command(&base, "motor", 3, 2, b"").unwrap();
    let err = outbox.create_command(&base, "motor", 3, 3, b"").unwrap_err();
    assert!(matches!(err, InboxError::SendFailure { source: ChannelError::WouldBlock, .. }));

    assert_eq!(motor.tick(), 1);
    outbox.create_command(&base, "motor", 3, 3, b"").unwrap();
    motor.quit().unwrap();
}

#[test]
fn manual_mode_host_loop_drives_delivery() {
    init_logging();
    let harness = Harness::with_mode(PollMode::Manual);
    let (forward, delivered) = Forward::releasing();
    let motor = harness.inbox("motor", forward);
    let base = harness.inbox("base", Responder::new(0, b""));

    base.create_urgent("motor", 9, 1, b"STOP").unwrap();
    base.create_command("motor", 3, 2, b"GO").unwrap();
    assert!(delivered.try_recv().is_err(), "nothing moves without a tick");

    assert_eq!(motor.tick(), 2);
    let lanes: Vec<Lane> = delivered.try_iter().map(|(lane, _)| lane).collect();
    assert_eq!(lanes, vec![Lane::Urgent, Lane::Command]);
    assert_eq!(motor.poll_mode(), PollMode::Manual);

    base.quit().unwrap();
    motor.quit().unwrap();
}

#[test]
fn inbox_boots_from_config_file() {
    init_logging();
    let harness = Harness::new();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "namespace_root = {:?}\nproject_token = 4242\ntick_ms = 2\npoll_mode = \"threaded\"\n",
        harness.root().display().to_string()
    )
    .unwrap();
    let config = InboxConfig::load(file.path()).unwrap();
    assert_eq!(config.project_token, 4242);

    let (forward, delivered) = Forward::releasing();
    let motor = Inbox::init("motor", &config, harness.transport().clone(), forward).unwrap();
    let outbox = nexus_inbox::Outbox::from_config(&config, harness.transport().clone());
    outbox.create_command(&MailboxName::new("base").unwrap(), "motor", 3, 11, b"").unwrap();
    assert_eq!(delivered.recv_timeout(DELIVERY_TIMEOUT).unwrap().1.correlation_id(), 11);

    // Different token, different channel: nothing crosses projects.
    let other = harness.outbox();
    other.create_command(&MailboxName::new("base").unwrap(), "motor", 3, 12, b"").unwrap();
    assert!(delivered.recv_timeout(Duration::from_millis(50)).is_err());

    motor.quit().unwrap();
}

#[test]
fn name_can_be_claimed_again_after_quit() {
    init_logging();
    let harness = Harness::new();
    let (forward, _) = Forward::releasing();
    let first = harness.inbox("motor", forward);
    let id = first.channel_id();
    first.quit().unwrap();
    assert!(harness.transport().lookup(id).is_none());

    let (forward, delivered) = Forward::releasing();
    let second = harness.inbox("motor", forward);
    assert_eq!(second.channel_id(), id);
    harness.outbox().create_command(&MailboxName::new("base").unwrap(), "motor", 3, 1, b"").unwrap();
    assert_eq!(delivered.recv_timeout(DELIVERY_TIMEOUT).unwrap().1.correlation_id(), 1);
    second.quit().unwrap();
}

#[test]
fn quit_keeps_channel_until_in_flight_handler_returns() {
    init_logging();
    let harness = Harness::new();
    let (handler, controls) = SlowCommand::with_controls();
    let motor = harness.inbox("motor", handler);
    let id = motor.channel_id();
    harness.outbox().create_command(&MailboxName::new("base").unwrap(), "motor", 3, 1, b"DRIVE").unwrap();
    assert_eq!(controls.started.recv_timeout(DELIVERY_TIMEOUT).unwrap(), 1);

    let transport = harness.transport().clone();
    let release = controls.release.clone();
    let observer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        let present = transport.lookup(id).is_some();
        release.send(()).unwrap();
        present
    });

    let started = Instant::now();
    motor.quit().unwrap();
    let waited = started.elapsed();

    assert!(observer.join().unwrap(), "channel destroyed while the command handler was running");
    assert!(waited >= Duration::from_millis(200), "quit returned after {waited:?}");
    assert!(harness.transport().lookup(id).is_none());
}
