use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use fedra_shared::{FederateHandle, LogicalTime, LogicalTimeInterval};

use crate::session::Session;
use crate::time::error::TimeError;
use crate::time::federate::{AdvanceRequestKind, FederateTimeState};

// TimeManagerSnapshot

/// Verbatim persistable image of the federation-wide time state, consumed
/// and produced by the external save/restore collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeManagerSnapshot<T> {
    pub regulating: Vec<FederateHandle>,
    pub constrained: Vec<FederateHandle>,
    pub galt: Option<T>,
}

struct EngineState<T: LogicalTime> {
    federates: HashMap<FederateHandle, FederateTimeState<T>>,
    regulating: HashSet<FederateHandle>,
    constrained: HashSet<FederateHandle>,
    /// The federation-wide GALT, served to all non-regulating federates.
    /// Regulating federates each carry their own local view instead.
    galt: Option<T>,
}

// TimeSynchronizationEngine

/// Per-federation time synchronization: owns the regulating/constrained sets
/// and GALT, computes and propagates time advance grants.
///
/// All mutating operations hold the exclusive lock for the whole
/// compute-and-notify sequence, so every federate observes one total order
/// of time notifications per federation. Reads take the shared lock.
pub struct TimeSynchronizationEngine<T: LogicalTime> {
    state: RwLock<EngineState<T>>,
}

impl<T: LogicalTime> TimeSynchronizationEngine<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState {
                federates: HashMap::new(),
                regulating: HashSet::new(),
                constrained: HashSet::new(),
                galt: None,
            }),
        }
    }

    /// Creates time state for a joining federate at the initial time.
    pub fn register_federate(
        &self,
        federate: FederateHandle,
        session: Arc<dyn Session<T>>,
    ) -> Result<(), TimeError> {
        let mut state = self.state.write();
        if state.federates.contains_key(&federate) {
            return Err(TimeError::FederateAlreadyRegistered { federate });
        }
        state
            .federates
            .insert(federate, FederateTimeState::new(federate, session));
        Ok(())
    }

    /// Destroys a resigning federate's time state, rebalancing GALT first if
    /// it was regulating.
    pub fn resign_federate(&self, federate: FederateHandle) -> Result<(), TimeError> {
        let was_regulating = {
            let state = self.state.read();
            state
                .federates
                .get(&federate)
                .map(FederateTimeState::is_regulating)
                .ok_or(TimeError::UnknownFederate { federate })?
        };

        if was_regulating {
            self.disable_time_regulation(federate)?;
        }

        let mut state = self.state.write();
        state.regulating.remove(&federate);
        state.constrained.remove(&federate);
        state.federates.remove(&federate);
        Ok(())
    }

    /// Enables time regulation for `federate` with the given lookahead.
    ///
    /// When constrained federates exist, the requester's time may be raised
    /// so that its LOTS does not undercut any constrained federate's LITS.
    /// All interval arithmetic is validated before anything is mutated; a
    /// failure aborts the enable with the engine state untouched.
    pub fn enable_time_regulation(
        &self,
        federate: FederateHandle,
        lookahead: T::Interval,
    ) -> Result<(), TimeError> {
        if !lookahead.is_positive() {
            return Err(TimeError::InvalidLookahead);
        }

        let mut state = self.state.write();
        let state = &mut *state;

        {
            let fed = state
                .federates
                .get(&federate)
                .ok_or(TimeError::UnknownFederate { federate })?;
            if fed.is_regulating() {
                return Err(TimeError::AlreadyRegulating { federate });
            }
        }

        let federate_time = {
            let fed = &state.federates[&federate];

            if state.constrained.is_empty() {
                fed.time().clone()
            } else {
                // the requester must not regulate from below any constrained
                // federate's LITS
                let mut max_lits = T::initial();
                for handle in &state.constrained {
                    if let Some(constrained) = state.federates.get(handle) {
                        let mut lits = constrained.time().clone();
                        if constrained.advance_time().is_none() {
                            // not mid-advance: messages at its current time
                            // are already delivered
                            lits = lits.add(&T::epsilon())?;
                        }
                        if lits > max_lits {
                            max_lits = lits;
                        }
                    }
                }

                if *fed.time() >= max_lits {
                    fed.time().clone()
                } else if fed.time().add(&lookahead)? >= max_lits {
                    fed.time().clone()
                } else {
                    max_lits.subtract(&lookahead)?
                }
            }
        };
        let lots = federate_time.add(&lookahead)?;

        state.regulating.insert(federate);
        if let Some(fed) = state.federates.get_mut(&federate) {
            fed.enable_time_regulation(lookahead, federate_time, lots);
        }

        self.recalculate_galt(state, federate)
    }

    /// Disables time regulation and rebalances GALT across the remaining
    /// regulating federates.
    pub fn disable_time_regulation(&self, federate: FederateHandle) -> Result<(), TimeError> {
        let mut state = self.state.write();
        let state = &mut *state;

        {
            let fed = state
                .federates
                .get(&federate)
                .ok_or(TimeError::UnknownFederate { federate })?;
            if !fed.is_regulating() {
                warn!("federate {:?} disabled time regulation while not regulating", federate);
                return Err(TimeError::NotRegulating { federate });
            }
        }

        state.regulating.remove(&federate);

        if state.regulating.is_empty() {
            // no regulating federates remain: GALT is gone for everyone
            state.galt = None;

            debug!("galt undefined");

            for fed in state.federates.values_mut() {
                fed.galt_undefined();
            }
        } else if state.regulating.len() == 1 {
            // the survivor's own view (min LOTS over the *others*) is gone,
            // but the federation-wide GALT survives and may even advance
            if let Some(&remaining) = state.regulating.iter().next() {
                let remaining_lots = state
                    .federates
                    .get(&remaining)
                    .and_then(|fed| fed.lots().cloned());

                if let Some(fed) = state.federates.get_mut(&remaining) {
                    fed.galt_undefined();
                }

                let raised = match (&remaining_lots, &state.galt) {
                    (Some(lots), Some(galt)) => lots > galt,
                    (Some(_), None) => true,
                    _ => false,
                };
                if raised {
                    let new_galt = remaining_lots.unwrap_or_else(T::latest);

                    debug!("galt updated: {:?} -> {:?}", state.galt, new_galt);

                    state.galt = Some(new_galt.clone());

                    for (handle, fed) in state.federates.iter_mut() {
                        if *handle != remaining {
                            fed.galt_updated(new_galt.clone());
                        }
                    }
                }
            }
        } else {
            // two or more regulating federates remain
            let regulating: Vec<FederateHandle> = state.regulating.iter().copied().collect();

            let mut least = T::latest();
            for handle in &regulating {
                if let Some(lots) = state.federates.get(handle).and_then(FederateTimeState::lots) {
                    if *lots < least {
                        least = lots.clone();
                    }
                }
            }
            let changed = state.galt.as_ref() != Some(&least);

            let locals = local_galt_views(&state.federates, &regulating);

            if changed {
                debug!("galt updated: {:?} -> {:?}", state.galt, least);
                state.galt = Some(least.clone());
            }

            for (handle, local) in locals {
                if let Some(fed) = state.federates.get_mut(&handle) {
                    fed.galt_updated(local);
                }
            }

            if changed {
                for fed in state.federates.values_mut() {
                    if !fed.is_regulating() {
                        fed.galt_updated(least.clone());
                    }
                }
            }
        }

        if let Some(fed) = state.federates.get_mut(&federate) {
            fed.disable_time_regulation();
        }
        Ok(())
    }

    /// Enables the time constraint. GALT derives only from regulating
    /// federates, so no recalculation happens here; the enable may stay
    /// pending until the next GALT update if the federate is ahead of GALT.
    pub fn enable_time_constrained(&self, federate: FederateHandle) -> Result<(), TimeError> {
        let mut state = self.state.write();
        let state = &mut *state;

        let fed = state
            .federates
            .get_mut(&federate)
            .ok_or(TimeError::UnknownFederate { federate })?;
        fed.enable_time_constrained();

        state.constrained.insert(federate);
        Ok(())
    }

    pub fn disable_time_constrained(&self, federate: FederateHandle) -> Result<(), TimeError> {
        let mut state = self.state.write();
        let state = &mut *state;

        if !state.constrained.remove(&federate) {
            warn!("federate {:?} disabled time constraint while not constrained", federate);
            return Err(TimeError::NotConstrained { federate });
        }

        if let Some(fed) = state.federates.get_mut(&federate) {
            fed.disable_time_constrained();
        }
        Ok(())
    }

    /// Changes a regulating federate's lookahead. Unlike the enable, zero is
    /// allowed here; exclusive advance kinds bump a zero lookahead to epsilon
    /// when computing LOTS.
    pub fn modify_lookahead(
        &self,
        federate: FederateHandle,
        lookahead: T::Interval,
    ) -> Result<(), TimeError> {
        if !lookahead.is_positive() && !lookahead.is_zero() {
            return Err(TimeError::InvalidLookahead);
        }

        let mut state = self.state.write();
        let fed = state
            .federates
            .get_mut(&federate)
            .ok_or(TimeError::UnknownFederate { federate })?;
        if !fed.is_regulating() {
            return Err(TimeError::NotRegulating { federate });
        }
        fed.modify_lookahead(lookahead);
        Ok(())
    }

    // advance services

    pub fn time_advance_request(&self, federate: FederateHandle, time: T) -> Result<(), TimeError> {
        self.advance_request(federate, time, AdvanceRequestKind::TimeAdvance)
    }

    pub fn time_advance_request_available(
        &self,
        federate: FederateHandle,
        time: T,
    ) -> Result<(), TimeError> {
        self.advance_request(federate, time, AdvanceRequestKind::TimeAdvanceAvailable)
    }

    pub fn next_message_request(&self, federate: FederateHandle, time: T) -> Result<(), TimeError> {
        self.advance_request(federate, time, AdvanceRequestKind::NextMessage)
    }

    pub fn next_message_request_available(
        &self,
        federate: FederateHandle,
        time: T,
    ) -> Result<(), TimeError> {
        self.advance_request(federate, time, AdvanceRequestKind::NextMessageAvailable)
    }

    pub fn flush_queue_request(&self, federate: FederateHandle, time: T) -> Result<(), TimeError> {
        self.advance_request(federate, time, AdvanceRequestKind::FlushQueue)
    }

    fn advance_request(
        &self,
        federate: FederateHandle,
        time: T,
        kind: AdvanceRequestKind,
    ) -> Result<(), TimeError> {
        let mut state = self.state.write();
        let state = &mut *state;

        let fed = state
            .federates
            .get_mut(&federate)
            .ok_or(TimeError::UnknownFederate { federate })?;

        match kind {
            AdvanceRequestKind::TimeAdvance => fed.time_advance_request(time)?,
            AdvanceRequestKind::TimeAdvanceAvailable => fed.time_advance_request_available(time)?,
            AdvanceRequestKind::NextMessage => fed.next_message_request(time)?,
            AdvanceRequestKind::NextMessageAvailable => {
                fed.next_message_request_available(time)?
            }
            AdvanceRequestKind::FlushQueue => fed.flush_queue_request(time)?,
            AdvanceRequestKind::None => {}
        }

        let regulating = fed.is_regulating();
        if regulating {
            self.recalculate_galt(state, federate)?;
        }
        Ok(())
    }

    /// Records an undelivered time-stamp-ordered message bound for
    /// `federate`; its timestamp feeds the federate's LITS.
    pub fn queue_timestamped_message(
        &self,
        federate: FederateHandle,
        time: T,
    ) -> Result<(), TimeError> {
        let mut state = self.state.write();
        let fed = state
            .federates
            .get_mut(&federate)
            .ok_or(TimeError::UnknownFederate { federate })?;
        fed.queue_message(time);
        Ok(())
    }

    // queries

    /// The caller's current GALT view: local for regulating federates, the
    /// federation-wide value otherwise.
    pub fn query_galt(&self, federate: FederateHandle) -> Result<Option<T>, TimeError> {
        let state = self.state.read();
        let fed = state
            .federates
            .get(&federate)
            .ok_or(TimeError::UnknownFederate { federate })?;
        Ok(fed.galt().cloned())
    }

    /// The caller's LITS, falling back to its GALT view when no message is
    /// queued.
    pub fn query_lits(&self, federate: FederateHandle) -> Result<Option<T>, TimeError> {
        let state = self.state.read();
        let fed = state
            .federates
            .get(&federate)
            .ok_or(TimeError::UnknownFederate { federate })?;
        Ok(fed.lits_or_galt())
    }

    pub fn federate_time(&self, federate: FederateHandle) -> Result<T, TimeError> {
        let state = self.state.read();
        let fed = state
            .federates
            .get(&federate)
            .ok_or(TimeError::UnknownFederate { federate })?;
        Ok(fed.time().clone())
    }

    /// The federation-wide GALT.
    pub fn galt(&self) -> Option<T> {
        self.state.read().galt.clone()
    }

    // save/restore accessors

    pub fn snapshot(&self) -> TimeManagerSnapshot<T> {
        let state = self.state.read();

        let mut regulating: Vec<FederateHandle> = state.regulating.iter().copied().collect();
        regulating.sort();
        let mut constrained: Vec<FederateHandle> = state.constrained.iter().copied().collect();
        constrained.sort();

        TimeManagerSnapshot {
            regulating,
            constrained,
            galt: state.galt.clone(),
        }
    }

    /// Restores the snapshot verbatim. Per-federate views are reset to the
    /// restored federation-wide GALT; local views converge on the next
    /// recalculation.
    pub fn restore(&self, snapshot: TimeManagerSnapshot<T>) {
        let mut state = self.state.write();
        let state = &mut *state;

        state.regulating = snapshot.regulating.into_iter().collect();
        state.constrained = snapshot.constrained.into_iter().collect();
        state.galt = snapshot.galt;

        for (handle, fed) in state.federates.iter_mut() {
            fed.set_regulating_flag(state.regulating.contains(handle));
            fed.set_constrained_flag(state.constrained.contains(handle));
            fed.set_galt_view(state.galt.clone());
        }
    }

    /// The central GALT computation, run after any state change of a
    /// regulating federate.
    fn recalculate_galt(
        &self,
        state: &mut EngineState<T>,
        triggering: FederateHandle,
    ) -> Result<(), TimeError> {
        debug_assert!(!state.regulating.is_empty());

        if state.regulating.len() == 1 {
            let new_galt = match state
                .federates
                .get(&triggering)
                .and_then(FederateTimeState::lots)
            {
                Some(lots) => lots.clone(),
                None => return Err(TimeError::NotRegulating { federate: triggering }),
            };

            debug!("galt updated: {:?} -> {:?}", state.galt, new_galt);

            state.galt = Some(new_galt.clone());

            for (handle, fed) in state.federates.iter_mut() {
                if *handle != triggering {
                    fed.galt_updated(new_galt.clone());
                }
            }
            return Ok(());
        }

        let regulating: Vec<FederateHandle> = state.regulating.iter().copied().collect();

        // the GALT we could advance to if no blocked next-message federate
        // constrained it
        let mut potential_galt = T::latest();
        for handle in &regulating {
            if let Some(lots) = state.federates.get(handle).and_then(FederateTimeState::lots) {
                if *lots < potential_galt {
                    potential_galt = lots.clone();
                }
            }
        }

        // regulating-and-constrained federates blocked on a next-message
        // request, with the LITS that actually constrains GALT
        let mut blocked: Vec<(FederateHandle, Option<T>)> = Vec::new();
        for handle in &regulating {
            if let Some(fed) = state.federates.get(handle) {
                if fed.is_constrained()
                    && fed.advance_time().is_some()
                    && matches!(
                        fed.advance_kind(),
                        AdvanceRequestKind::NextMessage | AdvanceRequestKind::NextMessageAvailable
                    )
                {
                    blocked.push((*handle, fed.lits_bounding(&potential_galt)));
                }
            }
        }

        let mut smallest_lits: Option<T> = None;
        for (_, lits) in &blocked {
            if let Some(lits) = lits {
                let smaller = match &smallest_lits {
                    None => true,
                    Some(smallest) => lits < smallest,
                };
                if smaller {
                    smallest_lits = Some(lits.clone());
                }
            }
        }

        debug!("potential galt: {:?} -> {:?}", state.galt, potential_galt);

        let new_galt;
        let mut pinned: Vec<(FederateHandle, T, T)> = Vec::new();
        match smallest_lits {
            Some(smallest) if smallest <= potential_galt => {
                // GALT may not pass the earliest undelivered message of the
                // tied federates; the grant bound deliberately uses the
                // triggering federate's LOTS
                let triggering_lots = state
                    .federates
                    .get(&triggering)
                    .and_then(FederateTimeState::lots)
                    .cloned()
                    .unwrap_or_else(|| potential_galt.clone());
                new_galt = if triggering_lots < potential_galt {
                    triggering_lots
                } else {
                    potential_galt
                };

                // every pinned LOTS is computed before any state is touched
                for (handle, lits) in &blocked {
                    if let Some(lits) = lits {
                        let pin_to = if *lits == smallest {
                            // may not skip past its own next message
                            Some(smallest.clone())
                        } else if *lits > smallest && *lits <= new_galt {
                            Some(lits.clone())
                        } else {
                            None
                        };
                        if let Some(pin_to) = pin_to {
                            if let Some(fed) = state.federates.get(handle) {
                                let lots = fed.adjusted_lots(&pin_to)?;
                                pinned.push((*handle, pin_to, lots));
                            }
                        }
                    }
                }
            }
            _ => {
                new_galt = potential_galt;
            }
        }

        for (handle, time, lots) in pinned {
            if let Some(fed) = state.federates.get_mut(&handle) {
                fed.pin_next_message_request(time, lots);
            }
        }

        debug!("galt updated: {:?} -> {:?}", state.galt, new_galt);

        state.galt = Some(new_galt.clone());

        // each regulating federate sees min LOTS over the *other* regulating
        // federates (pinned LOTS included)
        let locals = local_galt_views(&state.federates, &regulating);
        for (handle, local) in locals {
            if let Some(fed) = state.federates.get_mut(&handle) {
                fed.galt_updated(local);
            }
        }

        for fed in state.federates.values_mut() {
            if !fed.is_regulating() {
                fed.galt_updated(new_galt.clone());
            }
        }

        Ok(())
    }
}

impl<T: LogicalTime> Default for TimeSynchronizationEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// min(LOTS) over every regulating federate other than the one the view is
/// computed for.
fn local_galt_views<T: LogicalTime>(
    federates: &HashMap<FederateHandle, FederateTimeState<T>>,
    regulating: &[FederateHandle],
) -> Vec<(FederateHandle, T)> {
    let mut views = Vec::with_capacity(regulating.len());
    for handle in regulating {
        let mut local = T::latest();
        for other in regulating {
            if other != handle {
                if let Some(lots) = federates.get(other).and_then(FederateTimeState::lots) {
                    if *lots < local {
                        local = lots.clone();
                    }
                }
            }
        }
        views.push((*handle, local));
    }
    views
}
