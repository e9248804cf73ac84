//! Advance services: immediate grants, grants deferred until GALT moves,
//! next-message delivery, and queue flushing.

use fedra_shared::{FederateHandle, Notification};
use fedra_test::helpers::{interval, time, TestFederation};

#[test]
fn unconstrained_advance_is_granted_immediately() {
    let fixture = TestFederation::with_federates(1);
    let f = &fixture.federation;
    let a = FederateHandle::new(1);

    f.time().time_advance_request(a, time(10)).unwrap();

    assert_eq!(
        fixture.session(a).last(),
        Some(Notification::TimeAdvanceGranted { time: time(10) })
    );
    assert_eq!(f.time().federate_time(a).unwrap(), time(10));
}

#[test]
fn constrained_advance_waits_for_galt() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [a, b] = [FederateHandle::new(1), FederateHandle::new(2)];

    f.time().enable_time_constrained(a).unwrap();
    f.time().enable_time_regulation(b, interval(1)).unwrap();
    fixture.clear_notifications();

    // GALT is 1; a constrained advance to 5 cannot be granted yet
    f.time().time_advance_request(a, time(5)).unwrap();
    assert!(fixture.session(a).is_empty());
    assert_eq!(f.time().federate_time(a).unwrap(), time(0));

    // B advancing to 10 raises GALT to 11 and releases the pending grant
    f.time().time_advance_request(b, time(10)).unwrap();
    assert!(fixture
        .session(a)
        .contains(&Notification::TimeAdvanceGranted { time: time(5) }));
    assert_eq!(f.time().federate_time(a).unwrap(), time(5));
}

#[test]
fn next_message_request_available_is_granted_at_lits() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [a, b] = [FederateHandle::new(1), FederateHandle::new(2)];

    f.time().enable_time_constrained(a).unwrap();
    f.time().enable_time_regulation(a, interval(1)).unwrap();
    f.time().enable_time_regulation(b, interval(10)).unwrap();
    fixture.clear_notifications();

    // A has an undelivered message at 3 and asks for 5: the grant lands on
    // the message, not the requested time
    f.time().queue_timestamped_message(a, time(3)).unwrap();
    f.time()
        .next_message_request_available(a, time(5))
        .unwrap();

    assert!(fixture
        .session(a)
        .contains(&Notification::TimeAdvanceGranted { time: time(3) }));
    assert_eq!(f.time().federate_time(a).unwrap(), time(3));

    // the message was released; LITS falls back to A's GALT view
    assert_eq!(f.time().query_lits(a).unwrap(), Some(time(10)));
}

#[test]
fn next_message_request_without_messages_is_granted_at_target() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [a, b] = [FederateHandle::new(1), FederateHandle::new(2)];

    f.time().enable_time_constrained(a).unwrap();
    f.time().enable_time_regulation(b, interval(10)).unwrap();
    fixture.clear_notifications();

    // GALT is 10, no queued messages: NMR(4) grants 4 straight away
    f.time().next_message_request(a, time(4)).unwrap();
    assert!(fixture
        .session(a)
        .contains(&Notification::TimeAdvanceGranted { time: time(4) }));
}

#[test]
fn flush_queue_grants_at_the_furthest_safe_time() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [a, b] = [FederateHandle::new(1), FederateHandle::new(2)];

    f.time().enable_time_constrained(a).unwrap();
    f.time().enable_time_regulation(b, interval(1)).unwrap();
    fixture.clear_notifications();

    f.time().queue_timestamped_message(a, time(2)).unwrap();
    f.time().queue_timestamped_message(a, time(7)).unwrap();

    // bounded by GALT 1, below both the request and LITS
    f.time().flush_queue_request(a, time(10)).unwrap();

    assert!(fixture
        .session(a)
        .contains(&Notification::TimeAdvanceGranted { time: time(1) }));

    // every queued message was flushed
    assert_eq!(f.time().query_lits(a).unwrap(), Some(time(1)));
}

#[test]
fn queued_messages_feed_lits() {
    let fixture = TestFederation::with_federates(1);
    let f = &fixture.federation;
    let a = FederateHandle::new(1);

    assert_eq!(f.time().query_lits(a).unwrap(), None);

    f.time().queue_timestamped_message(a, time(9)).unwrap();
    f.time().queue_timestamped_message(a, time(4)).unwrap();

    assert_eq!(f.time().query_lits(a).unwrap(), Some(time(4)));
}

#[test]
fn blocked_next_message_request_is_pinned_to_its_message() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [a, b] = [FederateHandle::new(1), FederateHandle::new(2)];

    f.time().enable_time_constrained(a).unwrap();
    f.time().enable_time_regulation(a, interval(1)).unwrap();
    f.time().enable_time_regulation(b, interval(5)).unwrap();
    fixture.clear_notifications();

    // A's message at 5 sits exactly on the reachable GALT: NMR(10) cannot
    // be granted yet, and the request is pinned down to the message time
    f.time().queue_timestamped_message(a, time(5)).unwrap();
    f.time().next_message_request(a, time(10)).unwrap();

    assert_eq!(f.time().galt(), Some(time(5)));
    assert!(!fixture
        .session(a)
        .contains(&Notification::TimeAdvanceGranted { time: time(5) }));

    // B moving on delivers A's message; the pinned LOTS 6 (time 5 plus
    // lookahead 1), not the originally requested 10 plus lookahead, now
    // bounds GALT
    f.time().time_advance_request(b, time(20)).unwrap();
    assert!(fixture
        .session(a)
        .contains(&Notification::TimeAdvanceGranted { time: time(5) }));
    assert_eq!(f.time().federate_time(a).unwrap(), time(5));
    assert_eq!(f.time().galt(), Some(time(6)));
}

#[test]
fn available_variant_respects_galt_inclusively() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [a, b] = [FederateHandle::new(1), FederateHandle::new(2)];

    f.time().enable_time_constrained(a).unwrap();
    f.time().enable_time_regulation(b, interval(3)).unwrap();
    fixture.clear_notifications();

    // GALT is 3: TARA(3) may be granted, plain TAR(3) may not
    f.time().time_advance_request_available(a, time(3)).unwrap();
    assert!(fixture
        .session(a)
        .contains(&Notification::TimeAdvanceGranted { time: time(3) }));
}
