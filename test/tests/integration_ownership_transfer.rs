//! Attribute ownership transfer: divestiture, acquisition, cancellation,
//! and the batched notifications each operation emits.

use fedra_server::ownership::{AttributeDescriptor, OwnershipError};
use fedra_server::FederationError;
use fedra_shared::{
    AttributeHandle, FederateHandle, Notification, ObjectClassHandle, ObjectInstanceHandle,
};
use fedra_test::helpers::{attrs, TestFederation};

const X: u64 = 10;

#[test]
fn acquisition_prompts_release_then_divestiture_hands_off() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    let instance = fixture.register_object(X, &[1], Some(f1));

    let tag = Some(b"takeover".to_vec());
    f.acquisition(f2, object, &attrs(&[1]), tag.clone()).unwrap();

    // the unwilling owner is asked to release
    assert_eq!(
        fixture.session(f1).last(),
        Some(Notification::RequestAttributeOwnershipRelease {
            object,
            attributes: attrs(&[1]),
            tag,
        })
    );
    assert!(fixture.session(f2).is_empty());

    f.unconditional_divestiture(f1, object, &attrs(&[1])).unwrap();

    // the queued acquirer takes over in the same transition
    assert_eq!(
        fixture.session(f2).last(),
        Some(Notification::AttributeOwnershipAcquisition {
            object,
            attributes: attrs(&[1]),
            tag: None,
        })
    );
    assert_eq!(instance.owner_of(AttributeHandle::new(1)), Some(f2));
}

#[test]
fn acquisition_if_available_takes_unowned_attributes_only() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    // attribute 1 owned by F2, attribute 2 unowned
    let instance = fixture.register_object(X, &[1, 2], None);
    f.acquisition_if_available(f2, object, &attrs(&[1])).unwrap();
    fixture.clear_notifications();

    f.acquisition_if_available(f1, object, &attrs(&[1, 2])).unwrap();

    assert!(fixture.session(f1).contains(&Notification::AttributeOwnershipAcquisition {
        object,
        attributes: attrs(&[2]),
        tag: None,
    }));
    assert!(fixture.session(f1).contains(&Notification::AttributeOwnershipUnavailable {
        object,
        attributes: attrs(&[1]),
    }));

    // no queue state remains
    let snapshot = instance.snapshot();
    assert!(snapshot.attributes.iter().all(|attr| attr.queue.is_empty()));
}

#[test]
fn acquisition_if_available_is_idempotent_for_the_owner() {
    let fixture = TestFederation::with_federates(1);
    let f = &fixture.federation;
    let f1 = FederateHandle::new(1);
    let object = ObjectInstanceHandle::new(X);

    let instance = fixture.register_object(X, &[1], None);
    f.acquisition_if_available(f1, object, &attrs(&[1])).unwrap();
    let after_first = instance.snapshot();
    fixture.clear_notifications();

    // the second call changes nothing and stays silent
    f.acquisition_if_available(f1, object, &attrs(&[1])).unwrap();
    assert!(fixture.session(f1).is_empty());
    assert_eq!(instance.snapshot(), after_first);
}

#[test]
fn successive_divestitures_honor_request_order() {
    let fixture = TestFederation::with_federates(4);
    let f = &fixture.federation;
    let handles: Vec<FederateHandle> = (1..=4).map(FederateHandle::new).collect();
    let object = ObjectInstanceHandle::new(X);

    let instance = fixture.register_object(X, &[1], Some(handles[0]));
    for requester in &handles[1..] {
        f.acquisition(*requester, object, &attrs(&[1]), None).unwrap();
    }

    // each divestiture hands off to the earliest waiting requester
    let mut owner = handles[0];
    for expected in &handles[1..] {
        f.unconditional_divestiture(owner, object, &attrs(&[1])).unwrap();
        assert_eq!(instance.owner_of(AttributeHandle::new(1)), Some(*expected));
        owner = *expected;
    }
}

#[test]
fn negotiated_divestiture_waits_for_confirmation() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    let instance = fixture.register_object(X, &[1, 2], Some(f1));
    fixture.clear_notifications();

    // no acquirer is waiting yet: intent is recorded, nothing is sent
    f.negotiated_divestiture(f1, object, &attrs(&[1, 2]), Some(b"nd".to_vec()))
        .unwrap();
    assert!(fixture.session(f1).is_empty());

    // an acquisition against a divesting owner asks for confirmation
    f.acquisition(f2, object, &attrs(&[1]), None).unwrap();
    assert_eq!(
        fixture.session(f1).last(),
        Some(Notification::RequestDivestitureConfirmation {
            object,
            attributes: attrs(&[1]),
        })
    );

    f.confirm_divestiture(f1, object, &attrs(&[1, 2])).unwrap();

    // attribute 1 hands off to F2 with the offered tag; attribute 2 had no
    // acquirer and becomes unowned
    assert_eq!(instance.owner_of(AttributeHandle::new(1)), Some(f2));
    assert_eq!(instance.owner_of(AttributeHandle::new(2)), None);
    assert!(fixture.session(f2).contains(&Notification::AttributeOwnershipAcquisition {
        object,
        attributes: attrs(&[1]),
        tag: Some(b"nd".to_vec()),
    }));
}

#[test]
fn divestiture_if_wanted_hands_off_without_a_prior_offer() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    // F2 queues for attribute 1 only; F1 never negotiated a divestiture
    let instance = fixture.register_object(X, &[1, 2], Some(f1));
    f.acquisition(f2, object, &attrs(&[1]), None).unwrap();
    fixture.clear_notifications();

    f.divestiture_if_wanted(f1, object, &attrs(&[1, 2])).unwrap();

    // attribute 1 had a waiting acquirer; attribute 2 stays with F1
    assert_eq!(instance.owner_of(AttributeHandle::new(1)), Some(f2));
    assert_eq!(instance.owner_of(AttributeHandle::new(2)), Some(f1));
    assert!(fixture.session(f2).contains(&Notification::AttributeOwnershipAcquisition {
        object,
        attributes: attrs(&[1]),
        tag: None,
    }));
}

#[test]
fn cancel_acquisition_confirms_only_actual_queue_members() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    fixture.register_object(X, &[1], Some(f1));
    f.acquisition(f2, object, &attrs(&[1]), None).unwrap();
    fixture.clear_notifications();

    f.cancel_acquisition(f2, object, &attrs(&[1]));
    assert_eq!(
        fixture.session(f2).last(),
        Some(Notification::ConfirmAttributeOwnershipAcquisitionCancellation {
            object,
            attributes: attrs(&[1]),
        })
    );
    fixture.clear_notifications();

    // not queued anymore: the repeated cancel is a silent no-op
    f.cancel_acquisition(f2, object, &attrs(&[1]));
    assert!(fixture.session(f2).is_empty());
}

#[test]
fn stale_divestiture_cancel_does_not_revert_a_completed_handoff() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    let instance = fixture.register_object(X, &[1], Some(f1));
    f.negotiated_divestiture(f1, object, &attrs(&[1]), None).unwrap();
    f.acquisition(f2, object, &attrs(&[1]), None).unwrap();
    f.confirm_divestiture(f1, object, &attrs(&[1])).unwrap();
    assert_eq!(instance.owner_of(AttributeHandle::new(1)), Some(f2));

    // F1's cancel raced the completed divestiture
    f.cancel_negotiated_divestiture(f1, object, &attrs(&[1]));
    assert_eq!(instance.owner_of(AttributeHandle::new(1)), Some(f2));
}

#[test]
fn query_ownership_reports_all_three_states() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    f.create_object(
        object,
        ObjectClassHandle::new(1),
        "query-object",
        vec![
            AttributeDescriptor::new(AttributeHandle::new(1)),
            AttributeDescriptor::new(AttributeHandle::new(2)),
            AttributeDescriptor::rti_owned(AttributeHandle::new(3)),
        ],
        Some(f1),
        &attrs(&[1]),
    )
    .unwrap();

    f.query_ownership(f2, object, AttributeHandle::new(1)).unwrap();
    f.query_ownership(f2, object, AttributeHandle::new(2)).unwrap();
    f.query_ownership(f2, object, AttributeHandle::new(3)).unwrap();

    assert_eq!(
        fixture.session(f2).take(),
        vec![
            Notification::InformAttributeOwnership {
                object,
                attribute: AttributeHandle::new(1),
                owner: f1,
            },
            Notification::AttributeIsNotOwned {
                object,
                attribute: AttributeHandle::new(2),
            },
            Notification::AttributeIsOwnedByRti {
                object,
                attribute: AttributeHandle::new(3),
            },
        ]
    );
}

#[test]
fn unknown_attributes_abort_before_any_mutation() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    let instance = fixture.register_object(X, &[1], Some(f1));
    let before = instance.snapshot();

    let result = f.acquisition(f2, object, &attrs(&[1, 99]), None);
    assert_eq!(
        result,
        Err(FederationError::Ownership(OwnershipError::UnknownAttribute {
            object,
            attribute: AttributeHandle::new(99),
        }))
    );

    // attribute 1 was not touched either
    assert_eq!(instance.snapshot(), before);
    assert!(fixture.session(f1).is_empty());
}

#[test]
fn operations_on_a_deleted_object_are_benign() {
    let fixture = TestFederation::with_federates(2);
    let f = &fixture.federation;
    let [f1, f2] = [FederateHandle::new(1), FederateHandle::new(2)];
    let object = ObjectInstanceHandle::new(X);

    fixture.register_object(X, &[1], Some(f1));
    assert!(f.delete_object(object).is_some());

    // a request racing the deletion skips without error or notification
    f.acquisition(f2, object, &attrs(&[1]), None).unwrap();
    f.unconditional_divestiture(f1, object, &attrs(&[1])).unwrap();
    assert!(fixture.session(f1).is_empty());
    assert!(fixture.session(f2).is_empty());
}
