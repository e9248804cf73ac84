use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use log::{debug, trace, warn};

use fedra_shared::{
    FederateHandle, LogicalTime, LogicalTimeInterval, Notification, TimeArithmeticError,
};

use crate::session::Session;

/// Which advance service a federate last invoked.
///
/// The kind outlives the pending request itself: after a grant the target
/// time is cleared but the kind is kept, because it decides whether the
/// federate's current time is exclusive (plain TAR/NMR, where messages at
/// that time are already delivered) or inclusive (the `available` variants,
/// where messages at exactly that time may still be undelivered).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceRequestKind {
    None,
    TimeAdvance,
    TimeAdvanceAvailable,
    NextMessage,
    NextMessageAvailable,
    FlushQueue,
}

// FederateTimeState

/// Per-federate clock, lookahead, regulation/constraint flags, and pending
/// advance request. One exists for every joined federate; all mutation
/// happens under the owning engine's write lock.
pub struct FederateTimeState<T: LogicalTime> {
    handle: FederateHandle,
    session: Arc<dyn Session<T>>,
    time: T,
    lookahead: Option<T::Interval>,
    regulating: bool,
    constrained: bool,
    constrained_pending: bool,
    /// This federate's local view of GALT (min LOTS over the *other*
    /// regulating federates when this federate regulates).
    galt: Option<T>,
    /// Lower Output Time Stamp: the earliest timestamp this federate could
    /// next produce. Defined exactly while regulating.
    lots: Option<T>,
    advance_kind: AdvanceRequestKind,
    advance_time: Option<T>,
    /// Timestamps of undelivered time-stamp-ordered messages, min-first.
    queued_messages: BinaryHeap<Reverse<T>>,
}

impl<T: LogicalTime> FederateTimeState<T> {
    pub fn new(handle: FederateHandle, session: Arc<dyn Session<T>>) -> Self {
        Self {
            handle,
            session,
            time: T::initial(),
            lookahead: None,
            regulating: false,
            constrained: false,
            constrained_pending: false,
            galt: None,
            lots: None,
            advance_kind: AdvanceRequestKind::None,
            advance_time: None,
            queued_messages: BinaryHeap::new(),
        }
    }

    pub fn handle(&self) -> FederateHandle {
        self.handle
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    pub fn lookahead(&self) -> Option<&T::Interval> {
        self.lookahead.as_ref()
    }

    pub fn is_regulating(&self) -> bool {
        self.regulating
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained
    }

    pub fn is_constrained_pending(&self) -> bool {
        self.constrained_pending
    }

    pub fn galt(&self) -> Option<&T> {
        self.galt.as_ref()
    }

    pub fn lots(&self) -> Option<&T> {
        self.lots.as_ref()
    }

    pub fn advance_kind(&self) -> AdvanceRequestKind {
        self.advance_kind
    }

    pub fn advance_time(&self) -> Option<&T> {
        self.advance_time.as_ref()
    }

    /// Lower Incoming Time Stamp: the timestamp of the earliest undelivered
    /// time-stamp-ordered message, if any.
    pub fn lits(&self) -> Option<&T> {
        self.queued_messages.peek().map(|Reverse(time)| time)
    }

    /// The caller-facing LITS view: the earliest undelivered message, or the
    /// local GALT when the queue is empty.
    pub fn lits_or_galt(&self) -> Option<T> {
        match self.lits() {
            Some(lits) => Some(lits.clone()),
            None => self.galt.clone(),
        }
    }

    /// LITS as it constrains GALT computation: `None` when the head message
    /// is already deliverable under `potential_galt` (the blocked federate
    /// will be granted by the GALT update itself and constrains nothing).
    pub(crate) fn lits_bounding(&self, potential_galt: &T) -> Option<T> {
        let head = self.lits()?;
        let deliverable = match self.advance_kind {
            AdvanceRequestKind::NextMessage => head < potential_galt,
            AdvanceRequestKind::NextMessageAvailable => head <= potential_galt,
            _ => return None,
        };
        if deliverable {
            None
        } else {
            Some(head.clone())
        }
    }

    /// Enqueues the timestamp of an undelivered time-stamp-ordered message.
    pub fn queue_message(&mut self, time: T) {
        self.queued_messages.push(Reverse(time));
    }

    fn release_messages_through(&mut self, time: &T) {
        while let Some(Reverse(head)) = self.queued_messages.peek() {
            if head > time {
                break;
            }
            trace!(
                "federate {:?} releasing time-stamp-ordered message at {:?}",
                self.handle,
                head
            );
            self.queued_messages.pop();
        }
    }

    fn release_all_messages(&mut self) {
        if !self.queued_messages.is_empty() {
            trace!(
                "federate {:?} releasing all {} queued messages receive-ordered",
                self.handle,
                self.queued_messages.len()
            );
            self.queued_messages.clear();
        }
    }

    /// The lookahead used for LOTS computation. Exclusive advance kinds bump
    /// a zero lookahead to epsilon so LOTS stays strictly ahead of the
    /// federate's time.
    fn effective_lookahead(&self, exclusive: bool) -> Option<T::Interval> {
        self.lookahead.as_ref().map(|lookahead| {
            if exclusive && lookahead.is_zero() {
                T::epsilon()
            } else {
                lookahead.clone()
            }
        })
    }

    /// LOTS that would result from pinning the pending next-message request
    /// to `time`. Pure; the engine validates this before committing.
    pub(crate) fn adjusted_lots(&self, time: &T) -> Result<T, TimeArithmeticError> {
        let exclusive = self.advance_kind == AdvanceRequestKind::NextMessage;
        match self.effective_lookahead(exclusive) {
            Some(lookahead) => time.add(&lookahead),
            None => Ok(time.clone()),
        }
    }

    fn below_galt(&self, time: &T, inclusive: bool) -> bool {
        match &self.galt {
            None => true,
            Some(galt) => {
                if inclusive {
                    time <= galt
                } else {
                    time < galt
                }
            }
        }
    }

    fn grant(&mut self, time: T) {
        trace!(
            "federate {:?} time advance grant: {:?} -> {:?}",
            self.handle,
            self.time,
            time
        );

        self.time = time.clone();
        self.advance_time = None;

        self.session.send(Notification::TimeAdvanceGranted { time });
    }

    // regulation / constraint toggles

    /// Commits time regulation with the engine-computed federate time and
    /// LOTS. All arithmetic was validated by the engine beforehand.
    pub(crate) fn enable_time_regulation(&mut self, lookahead: T::Interval, time: T, lots: T) {
        self.lookahead = Some(lookahead);
        self.time = time.clone();
        // inclusive kind: messages at exactly `time` may still be undelivered
        self.advance_kind = AdvanceRequestKind::TimeAdvanceAvailable;
        self.lots = Some(lots);
        self.regulating = true;

        debug!("federate {:?} time regulation enabled at {:?}", self.handle, time);

        self.session.send(Notification::TimeRegulationEnabled { time });
    }

    pub(crate) fn disable_time_regulation(&mut self) {
        self.regulating = false;
        self.lookahead = None;
        self.lots = None;

        debug!("federate {:?} time regulation disabled", self.handle);
    }

    pub(crate) fn modify_lookahead(&mut self, lookahead: T::Interval) {
        self.lookahead = Some(lookahead);
    }

    /// Enables the constraint, deferring it while the federate's time is
    /// ahead of GALT (completed by the next GALT update).
    pub(crate) fn enable_time_constrained(&mut self) {
        let behind_galt = match &self.galt {
            None => true,
            Some(galt) => self.time <= *galt,
        };

        if behind_galt {
            self.constrained = true;

            debug!("federate {:?} time constrained enabled at {:?}", self.handle, self.time);

            self.session.send(Notification::TimeConstrainedEnabled {
                time: self.time.clone(),
            });
        } else {
            self.constrained_pending = true;

            debug!("federate {:?} enable time constrained pending", self.handle);
        }
    }

    pub(crate) fn disable_time_constrained(&mut self) {
        self.constrained = false;
        self.constrained_pending = false;

        debug!("federate {:?} time constrained disabled", self.handle);
    }

    // advance services

    pub(crate) fn time_advance_request(&mut self, time: T) -> Result<(), TimeArithmeticError> {
        let new_lots = match self.effective_lookahead(true) {
            Some(lookahead) => Some(time.add(&lookahead)?),
            None => None,
        };

        debug!("federate {:?} time advance request: {:?}", self.handle, time);

        self.advance_time = Some(time.clone());
        self.advance_kind = AdvanceRequestKind::TimeAdvance;
        if new_lots.is_some() {
            self.lots = new_lots;
        }

        if !self.constrained || self.below_galt(&time, false) {
            self.release_messages_through(&time);
            self.grant(time);
        }
        Ok(())
    }

    pub(crate) fn time_advance_request_available(
        &mut self,
        time: T,
    ) -> Result<(), TimeArithmeticError> {
        let new_lots = match self.effective_lookahead(false) {
            Some(lookahead) => Some(time.add(&lookahead)?),
            None => None,
        };

        debug!("federate {:?} time advance request available: {:?}", self.handle, time);

        self.advance_time = Some(time.clone());
        self.advance_kind = AdvanceRequestKind::TimeAdvanceAvailable;
        if new_lots.is_some() {
            self.lots = new_lots;
        }

        if !self.constrained || self.below_galt(&time, true) {
            self.release_messages_through(&time);
            self.grant(time);
        }
        Ok(())
    }

    pub(crate) fn next_message_request(&mut self, time: T) -> Result<(), TimeArithmeticError> {
        let new_lots = match self.effective_lookahead(true) {
            Some(lookahead) => Some(time.add(&lookahead)?),
            None => None,
        };

        debug!("federate {:?} next message request: {:?}", self.handle, time);

        self.advance_time = Some(time.clone());
        self.advance_kind = AdvanceRequestKind::NextMessage;

        if self.regulating {
            self.lots = new_lots;

            if !self.constrained || self.galt.is_none() {
                self.grant(time);
            }
            // otherwise the triggered GALT recalculation decides
        } else if self.galt.is_none() {
            self.grant(time);
        } else if self.constrained {
            // constrained-only federates check LITS themselves
            let lits = self.lits().cloned();
            if let Some(lits) = lits.filter(|lits| self.below_galt(lits, false)) {
                self.release_messages_through(&lits);
                self.grant(lits);
            } else if self.below_galt(&time, false) {
                self.release_messages_through(&time);
                self.grant(time);
            }
        }
        Ok(())
    }

    pub(crate) fn next_message_request_available(
        &mut self,
        time: T,
    ) -> Result<(), TimeArithmeticError> {
        let new_lots = match self.effective_lookahead(false) {
            Some(lookahead) => Some(time.add(&lookahead)?),
            None => None,
        };

        debug!("federate {:?} next message request available: {:?}", self.handle, time);

        self.advance_time = Some(time.clone());
        self.advance_kind = AdvanceRequestKind::NextMessageAvailable;

        if self.regulating {
            self.lots = new_lots;

            if !self.constrained || self.galt.is_none() {
                self.grant(time);
            }
        } else if self.galt.is_none() {
            self.grant(time);
        } else if self.constrained {
            let lits = self.lits().cloned();
            if let Some(lits) = lits.filter(|lits| self.below_galt(lits, true)) {
                self.release_messages_through(&lits);
                self.grant(lits);
            } else if self.below_galt(&time, true) {
                self.release_messages_through(&time);
                self.grant(time);
            }
        }
        Ok(())
    }

    /// Grants immediately at the furthest safe time (bounded by GALT and
    /// LITS) and flushes every queued message.
    pub(crate) fn flush_queue_request(&mut self, time: T) -> Result<(), TimeArithmeticError> {
        let mut grant_time = time;
        if let Some(galt) = &self.galt {
            if *galt < grant_time {
                grant_time = galt.clone();
            }
        }
        if let Some(lits) = self.lits() {
            if *lits < grant_time {
                grant_time = lits.clone();
            }
        }

        let new_lots = match self.effective_lookahead(false) {
            Some(lookahead) => Some(grant_time.add(&lookahead)?),
            None => None,
        };

        debug!("federate {:?} flush queue request, granting {:?}", self.handle, grant_time);

        self.advance_kind = AdvanceRequestKind::FlushQueue;
        if new_lots.is_some() {
            self.lots = new_lots;
        }

        self.release_all_messages();
        self.grant(grant_time);
        Ok(())
    }

    /// Pins the pending next-message request to `time` with the LOTS the
    /// engine already validated via [`Self::adjusted_lots`].
    pub(crate) fn pin_next_message_request(&mut self, time: T, lots: T) {
        debug!(
            "federate {:?} next message request pinned to {:?}",
            self.handle, time
        );

        self.advance_time = Some(time);
        self.lots = Some(lots);
    }

    // GALT propagation

    /// Installs a new local GALT view and fires whatever that unblocks: a
    /// deferred constraint enable, or the pending advance request.
    pub(crate) fn galt_updated(&mut self, galt: T) {
        if self.galt.is_none() {
            debug!("federate {:?} galt defined: {:?}", self.handle, galt);
        }

        self.galt = Some(galt.clone());

        self.session.send(Notification::GaltUpdated { galt: galt.clone() });

        if self.constrained_pending && self.time < galt {
            self.constrained_pending = false;
            self.constrained = true;

            debug!("federate {:?} time constrained enabled at {:?}", self.handle, self.time);

            self.session.send(Notification::TimeConstrainedEnabled {
                time: self.time.clone(),
            });
        } else if let Some(target) = self.advance_time.clone() {
            match self.advance_kind {
                AdvanceRequestKind::TimeAdvance => {
                    if target < galt {
                        self.release_messages_through(&target);
                        self.grant(target);
                    }
                }
                AdvanceRequestKind::TimeAdvanceAvailable => {
                    if target <= galt {
                        self.release_messages_through(&target);
                        self.grant(target);
                    }
                }
                AdvanceRequestKind::NextMessage => {
                    let lits = self.lits().cloned();
                    if let Some(lits) = lits.filter(|lits| *lits < galt) {
                        self.release_messages_through(&lits);
                        self.grant(lits);
                    } else if target < galt {
                        self.release_messages_through(&target);
                        self.grant(target);
                    }
                }
                AdvanceRequestKind::NextMessageAvailable => {
                    let lits = self.lits().cloned();
                    if let Some(lits) = lits.filter(|lits| *lits <= galt) {
                        self.release_messages_through(&lits);
                        self.grant(lits);
                    } else if target <= galt {
                        self.release_messages_through(&target);
                        self.grant(target);
                    }
                }
                AdvanceRequestKind::None | AdvanceRequestKind::FlushQueue => {
                    // flush queue grants immediately and never leaves a target
                    warn!(
                        "federate {:?} has a pending advance time with kind {:?}",
                        self.handle, self.advance_kind
                    );
                }
            }
        }
    }

    /// The federation lost its last regulating federate: the GALT view is
    /// gone and queued messages drain receive-ordered.
    pub(crate) fn galt_undefined(&mut self) {
        self.galt = None;

        self.release_all_messages();

        self.session.send(Notification::GaltUndefined);
    }

    pub(crate) fn set_regulating_flag(&mut self, regulating: bool) {
        self.regulating = regulating;
    }

    pub(crate) fn set_constrained_flag(&mut self, constrained: bool) {
        self.constrained = constrained;
    }

    pub(crate) fn set_galt_view(&mut self, galt: Option<T>) {
        self.galt = galt;
    }
}
