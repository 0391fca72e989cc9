//! Run Segmenter (F): converts the sequence of level-transition events
//! into run lifecycle actions, including the sub-zone splice rule (§4.5).
//! Pure except for run-id generation, which is injected so transitions
//! stay testable without a real clock or RNG.

use crate::constants::{is_hub_path, is_subzone_signature, zone_signature};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterState {
    Idle,
    InMap {
        run_id: String,
        zone_signature: String,
        level_id: i64,
    },
    InSubZone {
        outer_run_id: String,
        outer_zone_signature: String,
        outer_level_id: i64,
        sub_run_id: String,
    },
}

impl Default for SegmenterState {
    fn default() -> Self {
        SegmenterState::Idle
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub run_id: String,
    pub zone_signature: String,
    pub level_id: i64,
    pub level_type: String,
    pub level_uid: String,
    pub is_hub_zone: bool,
    pub is_sub_zone: bool,
    pub parent_run_id: Option<String>,
    pub start_ts: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentAction {
    OpenRun(NewRun),
    CloseRun { run_id: String, end_ts: DateTime<Utc> },
    /// The sub-run closed and its loot re-attaches to the outer run,
    /// which remains open with its original startTs.
    SpliceSubRun {
        sub_run_id: String,
        outer_run_id: String,
        end_ts: DateTime<Utc>,
    },
}

pub struct Segmenter {
    state: SegmenterState,
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
        }
    }

    pub fn state(&self) -> &SegmenterState {
        &self.state
    }

    /// Reset to `Idle` without emitting close actions — used on a
    /// PlayerScope change, where the caller has already flushed the open
    /// run under the prior scope (§4.6).
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
    }

    pub fn on_level_enter(
        &mut self,
        level_uid: &str,
        level_type: &str,
        level_id: i64,
        level_path: &str,
        now: DateTime<Utc>,
        mut new_run_id: impl FnMut() -> String,
    ) -> Vec<SegmentAction> {
        let signature = zone_signature(level_path, level_id);
        let is_hub = is_hub_path(level_path);
        let is_sub = is_subzone_signature(level_path);

        match self.state.clone() {
            SegmenterState::Idle => {
                if is_hub {
                    Vec::new()
                } else {
                    let run_id = new_run_id();
                    self.state = SegmenterState::InMap {
                        run_id: run_id.clone(),
                        zone_signature: signature.clone(),
                        level_id,
                    };
                    // A sub-zone entered straight from Idle has no outer
                    // run to attach to, so it's tracked as its own
                    // top-level run (§4.5 "from Idle: ... tracked as its
                    // own run") — is_sub_zone stays false since that flag
                    // means "has a parent", per the §3 invariant.
                    vec![SegmentAction::OpenRun(NewRun {
                        run_id,
                        zone_signature: signature,
                        level_id,
                        level_type: level_type.to_string(),
                        level_uid: level_uid.to_string(),
                        is_hub_zone: false,
                        is_sub_zone: false,
                        parent_run_id: None,
                        start_ts: now,
                    })]
                }
            }

            SegmenterState::InMap {
                run_id,
                zone_signature: outer_signature,
                level_id: outer_level_id,
            } => {
                if is_hub {
                    self.state = SegmenterState::Idle;
                    vec![SegmentAction::CloseRun { run_id, end_ts: now }]
                } else if is_sub {
                    let sub_run_id = new_run_id();
                    self.state = SegmenterState::InSubZone {
                        outer_run_id: run_id.clone(),
                        outer_zone_signature: outer_signature,
                        outer_level_id,
                        sub_run_id: sub_run_id.clone(),
                    };
                    vec![SegmentAction::OpenRun(NewRun {
                        run_id: sub_run_id,
                        zone_signature: signature,
                        level_id,
                        level_type: level_type.to_string(),
                        level_uid: level_uid.to_string(),
                        is_hub_zone: false,
                        is_sub_zone: true,
                        parent_run_id: Some(run_id),
                        start_ts: now,
                    })]
                } else if signature == outer_signature && level_id == outer_level_id {
                    let new_run = new_run_id();
                    self.state = SegmenterState::InMap {
                        run_id: new_run.clone(),
                        zone_signature: signature.clone(),
                        level_id,
                    };
                    vec![
                        SegmentAction::CloseRun {
                            run_id,
                            end_ts: now,
                        },
                        SegmentAction::OpenRun(NewRun {
                            run_id: new_run,
                            zone_signature: signature,
                            level_id,
                            level_type: level_type.to_string(),
                            level_uid: level_uid.to_string(),
                            is_hub_zone: false,
                            is_sub_zone: false,
                            parent_run_id: None,
                            start_ts: now,
                        }),
                    ]
                } else {
                    let new_run = new_run_id();
                    self.state = SegmenterState::InMap {
                        run_id: new_run.clone(),
                        zone_signature: signature.clone(),
                        level_id,
                    };
                    vec![
                        SegmentAction::CloseRun {
                            run_id,
                            end_ts: now,
                        },
                        SegmentAction::OpenRun(NewRun {
                            run_id: new_run,
                            zone_signature: signature,
                            level_id,
                            level_type: level_type.to_string(),
                            level_uid: level_uid.to_string(),
                            is_hub_zone: false,
                            is_sub_zone: false,
                            parent_run_id: None,
                            start_ts: now,
                        }),
                    ]
                }
            }

            SegmenterState::InSubZone {
                outer_run_id,
                outer_zone_signature,
                outer_level_id,
                sub_run_id,
            } => {
                if is_hub {
                    self.state = SegmenterState::Idle;
                    vec![
                        SegmentAction::CloseRun {
                            run_id: sub_run_id,
                            end_ts: now,
                        },
                        SegmentAction::CloseRun {
                            run_id: outer_run_id,
                            end_ts: now,
                        },
                    ]
                } else if signature == outer_zone_signature {
                    self.state = SegmenterState::InMap {
                        run_id: outer_run_id.clone(),
                        zone_signature: outer_zone_signature,
                        level_id: outer_level_id,
                    };
                    vec![SegmentAction::SpliceSubRun {
                        sub_run_id,
                        outer_run_id,
                        end_ts: now,
                    }]
                } else {
                    let new_run = new_run_id();
                    self.state = SegmenterState::InMap {
                        run_id: new_run.clone(),
                        zone_signature: signature.clone(),
                        level_id,
                    };
                    vec![
                        SegmentAction::CloseRun {
                            run_id: sub_run_id,
                            end_ts: now,
                        },
                        SegmentAction::CloseRun {
                            run_id: outer_run_id,
                            end_ts: now,
                        },
                        SegmentAction::OpenRun(NewRun {
                            run_id: new_run,
                            zone_signature: signature,
                            level_id,
                            level_type: level_type.to_string(),
                            level_uid: level_uid.to_string(),
                            is_hub_zone: false,
                            is_sub_zone: false,
                            parent_run_id: None,
                            start_ts: now,
                        }),
                    ]
                }
            }
        }
    }

    /// The run id loot should currently be attributed to, if any.
    pub fn active_run_id(&self) -> Option<&str> {
        match &self.state {
            SegmenterState::Idle => None,
            SegmenterState::InMap { run_id, .. } => Some(run_id),
            SegmenterState::InSubZone { sub_run_id, .. } => Some(sub_run_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn id_gen() -> impl FnMut() -> String {
        let counter = Cell::new(0);
        move || {
            let n = counter.get();
            counter.set(n + 1);
            format!("run-{n}")
        }
    }

    #[test]
    fn idle_to_in_map_on_first_non_hub_zone() {
        let mut seg = Segmenter::new();
        let actions = seg.on_level_enter("u1", "map", 212, "forest", Utc::now(), id_gen());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SegmentAction::OpenRun(_)));
        assert_eq!(seg.active_run_id(), Some("run-0"));
    }

    #[test]
    fn hub_from_idle_stays_idle() {
        let mut seg = Segmenter::new();
        let actions = seg.on_level_enter("u1", "town", 1, "town_main", Utc::now(), id_gen());
        assert!(actions.is_empty());
        assert_eq!(seg.state(), &SegmenterState::Idle);
    }

    #[test]
    fn scenario_5_sub_zone_splice() {
        let mut seg = Segmenter::new();
        let mut gen = id_gen();
        let t0 = Utc::now();

        // hub -> outer zone Z1
        let a1 = seg.on_level_enter("u1", "map", 212, "forest", t0, &mut gen);
        let outer_run_id = match &a1[0] {
            SegmentAction::OpenRun(r) => r.run_id.clone(),
            _ => panic!("expected OpenRun"),
        };

        // loot in Z1 happens elsewhere (delta engine); then sub-zone entry
        let t1 = t0 + chrono::Duration::seconds(30);
        let a2 = seg.on_level_enter("u2", "map", 900, "nightmare", t1, &mut gen);
        assert_eq!(a2.len(), 1);
        let sub_run_id = match &a2[0] {
            SegmentAction::OpenRun(r) => {
                assert_eq!(r.parent_run_id.as_deref(), Some(outer_run_id.as_str()));
                assert!(r.is_sub_zone);
                r.run_id.clone()
            }
            _ => panic!("expected OpenRun"),
        };
        assert_eq!(seg.active_run_id(), Some(sub_run_id.as_str()));

        // return to Z1 -> splice
        let t2 = t1 + chrono::Duration::seconds(30);
        let a3 = seg.on_level_enter("u1", "map", 212, "forest", t2, &mut gen);
        assert_eq!(a3.len(), 1);
        match &a3[0] {
            SegmentAction::SpliceSubRun {
                sub_run_id: closed_sub,
                outer_run_id: outer,
                ..
            } => {
                assert_eq!(closed_sub, &sub_run_id);
                assert_eq!(outer, &outer_run_id);
            }
            _ => panic!("expected SpliceSubRun"),
        }
        assert_eq!(seg.active_run_id(), Some(outer_run_id.as_str()));

        // hub closes the outer run, not a new one
        let t3 = t2 + chrono::Duration::seconds(30);
        let a4 = seg.on_level_enter("u3", "town", 1, "town_main", t3, &mut gen);
        assert_eq!(
            a4,
            vec![SegmentAction::CloseRun {
                run_id: outer_run_id,
                end_ts: t3
            }]
        );
        assert_eq!(seg.state(), &SegmenterState::Idle);
    }

    #[test]
    fn reentering_identical_zone_closes_and_reopens() {
        let mut seg = Segmenter::new();
        let mut gen = id_gen();
        let t0 = Utc::now();
        seg.on_level_enter("u1", "map", 212, "forest", t0, &mut gen);
        let t1 = t0 + chrono::Duration::seconds(10);
        let actions = seg.on_level_enter("u1", "map", 212, "forest", t1, &mut gen);
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], SegmentAction::CloseRun { .. }));
        assert!(matches!(actions[1], SegmentAction::OpenRun(_)));
    }
}
