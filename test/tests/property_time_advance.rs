//! Property tests over sequences of time advance operations.

use fedra_shared::{FederateHandle, LogicalTime};
use fedra_test::helpers::{interval, time, TestFederation};
use proptest::prelude::*;

proptest! {
    /// Once defined, GALT never regresses, and it never passes any
    /// regulating federate's LOTS.
    #[test]
    fn galt_is_monotonic_and_bounded_by_lots(
        advances in prop::collection::vec((0u64..3, 1i64..20), 1..40)
    ) {
        let fixture = TestFederation::with_federates(3);
        let f = &fixture.federation;
        let federates: Vec<FederateHandle> = (1..=3).map(FederateHandle::new).collect();

        let lookahead = 1i64;
        for federate in &federates {
            f.time().enable_time_regulation(*federate, interval(lookahead)).unwrap();
        }

        let mut targets = [0i64; 3];
        let mut previous_galt = f.time().galt();
        prop_assert!(previous_galt.is_some());

        for (index, delta) in advances {
            let index = index as usize;
            targets[index] += delta;
            f.time()
                .time_advance_request(federates[index], time(targets[index]))
                .unwrap();

            let galt = f.time().galt();
            prop_assert!(galt >= previous_galt, "galt regressed: {:?} -> {:?}", previous_galt, galt);
            previous_galt = galt;

            // unconstrained federates are granted immediately, so LOTS is
            // the granted time plus lookahead
            if let Some(galt) = &galt {
                for federate in &federates {
                    let lots = f.time().federate_time(*federate).unwrap()
                        .add(&interval(lookahead)).unwrap();
                    prop_assert!(*galt <= lots, "galt {:?} passed lots {:?}", galt, lots);
                }
            }
        }
    }

    /// A lone unconstrained federate is granted exactly what it asks for, in
    /// order.
    #[test]
    fn unconstrained_grants_match_requests(
        deltas in prop::collection::vec(1i64..50, 1..20)
    ) {
        let fixture = TestFederation::with_federates(1);
        let f = &fixture.federation;
        let a = FederateHandle::new(1);

        let mut target = 0i64;
        for delta in deltas {
            target += delta;
            f.time().time_advance_request(a, time(target)).unwrap();
            prop_assert_eq!(f.time().federate_time(a).unwrap(), time(target));
        }
    }
}
