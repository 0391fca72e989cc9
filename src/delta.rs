//! Delta Engine (E): a pure function over current Slot State and a bag
//! event, producing the new Slot State plus zero, one, or two signed
//! deltas (§4.4). Holds no state itself — the Collector owns reading and
//! writing Slot State through the Store.

use crate::constants::is_excluded_slot;
use crate::database::{SlotKey, SlotOccupant, TypeId};

#[derive(Debug, Clone, PartialEq)]
pub enum BagEvent {
    Init {
        slot: SlotKey,
        type_id: TypeId,
        quantity: i64,
    },
    Modify {
        slot: SlotKey,
        type_id: TypeId,
        quantity: i64,
    },
    Remove {
        slot: SlotKey,
    },
}

impl BagEvent {
    fn slot(&self) -> SlotKey {
        match self {
            BagEvent::Init { slot, .. } => *slot,
            BagEvent::Modify { slot, .. } => *slot,
            BagEvent::Remove { slot } => *slot,
        }
    }
}

/// One signed delta against a single TypeId. A swap produces two of
/// these, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDelta {
    pub type_id: TypeId,
    pub signed_quantity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeltaOutcome {
    pub new_state: Option<SlotOccupant>,
    pub deltas: Vec<RawDelta>,
}

fn unchanged(current: Option<SlotOccupant>) -> DeltaOutcome {
    DeltaOutcome {
        new_state: current,
        deltas: Vec::new(),
    }
}

/// Apply one bag event against the current occupant of its slot.
///
/// Rule 1 (excluded page without allowlisted TypeId) is evaluated first
/// and leaves state untouched. The remaining rules follow §4.4 exactly,
/// including the state-inconsistent handling deferred to §7: any event
/// is taken as authoritative for the slot's new occupant, never
/// reconciled against what "should" have happened.
pub fn apply(current: Option<SlotOccupant>, event: &BagEvent) -> DeltaOutcome {
    let slot = event.slot();

    let relevant_type_id = match event {
        BagEvent::Init { type_id, .. } | BagEvent::Modify { type_id, .. } => Some(*type_id),
        BagEvent::Remove { .. } => current.map(|o| o.type_id),
    };
    if let Some(type_id) = relevant_type_id {
        if is_excluded_slot(slot.page_id, type_id) {
            return unchanged(current);
        }
    }

    match event {
        BagEvent::Init { type_id, quantity, .. } => DeltaOutcome {
            new_state: Some(SlotOccupant {
                type_id: *type_id,
                quantity: *quantity,
            }),
            deltas: Vec::new(),
        },

        BagEvent::Modify { type_id, quantity, .. } => match current {
            None => DeltaOutcome {
                new_state: Some(SlotOccupant {
                    type_id: *type_id,
                    quantity: *quantity,
                }),
                deltas: vec![RawDelta {
                    type_id: *type_id,
                    signed_quantity: *quantity,
                }],
            },
            Some(occupant) if occupant.type_id == *type_id => {
                let signed = *quantity - occupant.quantity;
                DeltaOutcome {
                    new_state: Some(SlotOccupant {
                        type_id: *type_id,
                        quantity: *quantity,
                    }),
                    deltas: if signed == 0 {
                        Vec::new()
                    } else {
                        vec![RawDelta {
                            type_id: *type_id,
                            signed_quantity: signed,
                        }]
                    },
                }
            }
            Some(occupant) => DeltaOutcome {
                new_state: Some(SlotOccupant {
                    type_id: *type_id,
                    quantity: *quantity,
                }),
                deltas: vec![
                    RawDelta {
                        type_id: occupant.type_id,
                        signed_quantity: -occupant.quantity,
                    },
                    RawDelta {
                        type_id: *type_id,
                        signed_quantity: *quantity,
                    },
                ],
            },
        },

        BagEvent::Remove { .. } => match current {
            None => unchanged(None),
            Some(occupant) => DeltaOutcome {
                new_state: None,
                deltas: vec![RawDelta {
                    type_id: occupant.type_id,
                    signed_quantity: -occupant.quantity,
                }],
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(page_id: i64, slot_id: i64) -> SlotKey {
        SlotKey { page_id, slot_id }
    }

    #[test]
    fn scenario_1_pickup_delta() {
        let current = Some(SlotOccupant {
            type_id: 100300,
            quantity: 640,
        });
        let event = BagEvent::Modify {
            slot: slot(102, 0),
            type_id: 100300,
            quantity: 671,
        };
        let outcome = apply(current, &event);
        assert_eq!(
            outcome.deltas,
            vec![RawDelta {
                type_id: 100300,
                signed_quantity: 31
            }]
        );
        assert_eq!(
            outcome.new_state,
            Some(SlotOccupant {
                type_id: 100300,
                quantity: 671
            })
        );
    }

    #[test]
    fn scenario_2_stack_swap_emits_two_deltas_in_order() {
        let current = Some(SlotOccupant {
            type_id: 10, // A
            quantity: 10,
        });
        let event = BagEvent::Modify {
            slot: slot(103, 5),
            type_id: 20, // B
            quantity: 3,
        };
        let outcome = apply(current, &event);
        assert_eq!(
            outcome.deltas,
            vec![
                RawDelta {
                    type_id: 10,
                    signed_quantity: -10
                },
                RawDelta {
                    type_id: 20,
                    signed_quantity: 3
                },
            ]
        );
        assert_eq!(
            outcome.new_state,
            Some(SlotOccupant {
                type_id: 20,
                quantity: 3
            })
        );
    }

    #[test]
    fn scenario_3_removal() {
        let current = Some(SlotOccupant {
            type_id: 99, // X
            quantity: 1,
        });
        let event = BagEvent::Remove { slot: slot(103, 39) };
        let outcome = apply(current, &event);
        assert_eq!(
            outcome.deltas,
            vec![RawDelta {
                type_id: 99,
                signed_quantity: -1
            }]
        );
        assert_eq!(outcome.new_state, None);
    }

    #[test]
    fn removing_already_empty_slot_is_a_no_op() {
        let outcome = apply(None, &BagEvent::Remove { slot: slot(1, 1) });
        assert!(outcome.deltas.is_empty());
        assert_eq!(outcome.new_state, None);
    }

    #[test]
    fn no_change_modify_emits_no_delta() {
        let current = Some(SlotOccupant {
            type_id: 5,
            quantity: 10,
        });
        let outcome = apply(
            current,
            &BagEvent::Modify {
                slot: slot(1, 1),
                type_id: 5,
                quantity: 10,
            },
        );
        assert!(outcome.deltas.is_empty());
    }

    #[test]
    fn bag_init_never_emits_a_delta() {
        let outcome = apply(
            None,
            &BagEvent::Init {
                slot: slot(1, 1),
                type_id: 5,
                quantity: 999,
            },
        );
        assert!(outcome.deltas.is_empty());
        assert_eq!(
            outcome.new_state,
            Some(SlotOccupant {
                type_id: 5,
                quantity: 999
            })
        );
    }

    #[test]
    fn excluded_gear_page_without_allowlist_is_untouched() {
        let outcome = apply(
            None,
            &BagEvent::Modify {
                slot: slot(crate::constants::GEAR_PAGE_ID, 1),
                type_id: 5,
                quantity: 1,
            },
        );
        assert!(outcome.deltas.is_empty());
        assert_eq!(outcome.new_state, None);
    }
}
