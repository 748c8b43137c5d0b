//! One scheduling attempt.
//!
//! # Algorithm
//!
//! 1. Activity sessions go to the two fixed activity slots, alternating by
//!    sequence index. Each activity teacher is pinned to one room for the attempt.
//! 2. Ordinary sessions are handled bundle by bundle (all sessions of one group
//!    and subject) in shuffled order. A bundle is placed as the largest
//!    contiguous block that fits anywhere, least-loaded day first, and the rest
//!    of the bundle is retried the same way.
//!
//! Nothing committed is ever undone. Sessions that can't be placed are reported
//! as unassigned.
//!
//! # Tie-breaks
//! - teachers: expertise list order
//! - days: ascending load of the group, then Monday to Friday
//! - windows: earliest period first

use crate::model::{Assignment, Expertise, GroupKey, Session};
use crate::rules::{SCHOOL_DAYS, SchedulerConfig};
use crate::timeslots::{IndexedSlot, TimeslotIndex};
use chrono::Weekday;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Teacher recorded for an activity subject nobody is qualified for.
pub const UNKNOWN_TEACHER: &str = "T_UNKNOWN";

/// All ordinary sessions of one (group, subject) pair.
#[derive(Debug, Clone)]
pub struct Bundle<'a> {
    pub group: &'a GroupKey,
    pub subject_id: &'a str,
    pub sessions: Vec<&'a Session>,
}

/// Sessions of a run split into activity sessions and ordinary bundles.
///
/// Built once per run and shared by every attempt.
#[derive(Debug, Clone, Default)]
pub struct SessionPlan<'a> {
    pub specials: Vec<&'a Session>,
    pub bundles: Vec<Bundle<'a>>,
}

impl<'a> SessionPlan<'a> {
    pub fn new(sessions: &'a [Session]) -> Self {
        let mut plan = Self::default();
        let mut bundle_index: HashMap<(&GroupKey, &str), usize> = HashMap::new();

        for session in sessions {
            if session.special {
                plan.specials.push(session);
                continue;
            }
            let key = (&session.group, session.subject_id.as_str());
            let idx = *bundle_index.entry(key).or_insert_with(|| {
                plan.bundles.push(Bundle {
                    group: &session.group,
                    subject_id: &session.subject_id,
                    sessions: Vec::new(),
                });
                plan.bundles.len() - 1
            });
            plan.bundles[idx].sessions.push(session);
        }

        plan
    }

    pub fn session_count(&self) -> usize {
        self.specials.len() + self.bundles.iter().map(|b| b.sessions.len()).sum::<usize>()
    }
}

#[derive(Debug, Default)]
struct SlotOccupancy<'a> {
    groups: HashSet<&'a str>,
    teachers: HashSet<&'a str>,
    rooms: HashSet<&'a str>,
}

/// Mutable state of one attempt, discarded when the attempt ends.
#[derive(Debug, Default)]
pub struct AttemptContext<'a> {
    occupancy: HashMap<&'a str, SlotOccupancy<'a>>,
    daily_load: HashMap<(&'a str, Weekday), u32>,
    activity_rooms: HashMap<&'a str, &'a str>,
    assignments: Vec<Assignment>,
    unassigned: Vec<&'a Session>,
}

impl<'a> AttemptContext<'a> {
    /// Periods already committed for `group` on `day`.
    pub fn load(&self, group: &str, day: Weekday) -> u32 {
        self.daily_load.get(&(group, day)).copied().unwrap_or(0)
    }

    fn composite_load(&self, group: &GroupKey, day: Weekday) -> u32 {
        group.members().iter().map(|member| self.load(member, day)).sum()
    }

    pub(crate) fn add_load(&mut self, group: &'a str, day: Weekday, periods: u32) {
        *self.daily_load.entry((group, day)).or_default() += periods;
    }

    fn group_free(&self, slot_id: &str, group: &GroupKey) -> bool {
        self.occupancy.get(slot_id).is_none_or(|occupancy| {
            group
                .members()
                .iter()
                .all(|member| !occupancy.groups.contains(member.as_str()))
        })
    }

    fn teacher_free(&self, slot_id: &str, teacher: &str) -> bool {
        self.occupancy
            .get(slot_id)
            .is_none_or(|occupancy| !occupancy.teachers.contains(teacher))
    }

    fn room_free(&self, slot_id: &str, room: &str) -> bool {
        self.occupancy
            .get(slot_id)
            .is_none_or(|occupancy| !occupancy.rooms.contains(room))
    }

    fn commit(&mut self, session: &'a Session, slot_id: &'a str, teacher: &'a str, room: &'a str) {
        let occupancy = self.occupancy.entry(slot_id).or_default();
        for member in session.group.members() {
            occupancy.groups.insert(member);
        }
        occupancy.teachers.insert(teacher);
        occupancy.rooms.insert(room);

        self.assignments.push(Assignment {
            group: session.group.clone(),
            timeslot_id: slot_id.to_string(),
            subject_id: session.subject_id.clone(),
            teacher_id: teacher.to_string(),
            room_id: room.to_string(),
        });
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn unassigned(&self) -> &[&'a Session] {
        &self.unassigned
    }

    fn into_outcome(self) -> AttemptOutcome {
        AttemptOutcome {
            assignments: self.assignments,
            unassigned: self.unassigned.into_iter().cloned().collect(),
        }
    }
}

/// Result of one attempt.
#[derive(Debug, Clone, Default)]
pub struct AttemptOutcome {
    pub assignments: Vec<Assignment>,
    pub unassigned: Vec<Session>,
}

/// A window that passed every check.
#[derive(Debug)]
struct Block<'a> {
    day: Weekday,
    slots: &'a [IndexedSlot],
    teacher: &'a str,
    room: &'a str,
}

fn is_consecutive(window: &[IndexedSlot]) -> bool {
    window.windows(2).all(|pair| pair[1].period == pair[0].period + 1)
}

/// Runs attempts over one set of immutable inputs.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    index: &'a TimeslotIndex,
    expertise: &'a Expertise,
    rooms: &'a [String],
    config: &'a SchedulerConfig,
}

impl<'a> Engine<'a> {
    pub fn new(
        index: &'a TimeslotIndex,
        expertise: &'a Expertise,
        rooms: &'a [String],
        config: &'a SchedulerConfig,
    ) -> Self {
        Self {
            index,
            expertise,
            rooms,
            config,
        }
    }

    /// Runs both phases from empty state.
    pub fn run_attempt<R: Rng>(&self, plan: &SessionPlan<'a>, rng: &mut R) -> AttemptOutcome {
        let mut ctx = AttemptContext::default();

        self.place_specials(&mut ctx, &plan.specials, rng);

        let mut order: Vec<&Bundle<'a>> = plan.bundles.iter().collect();
        order.shuffle(rng);
        for bundle in order {
            self.place_bundle(&mut ctx, bundle, rng);
        }

        ctx.into_outcome()
    }

    /// Phase 1: activity sessions into the fixed activity slots.
    pub(crate) fn place_specials<R: Rng>(
        &self,
        ctx: &mut AttemptContext<'a>,
        specials: &[&'a Session],
        rng: &mut R,
    ) {
        let index: &'a TimeslotIndex = self.index;
        let expertise: &'a Expertise = self.expertise;
        let fixed = index.fixed_activity_slots();
        let day = self.config.activity_day;

        for &session in specials {
            if fixed.len() < 2 {
                ctx.unassigned.push(session);
                continue;
            }
            let slot_id = fixed[session.seq as usize % 2].as_str();
            let teacher = expertise
                .teachers_for(&session.subject_id)
                .first()
                .map(String::as_str)
                .unwrap_or(UNKNOWN_TEACHER);

            let Some(room) = self.activity_room(ctx, teacher, rng) else {
                debug!("no room left to pin teacher {} for {}", teacher, session);
                ctx.unassigned.push(session);
                continue;
            };

            let group_conflict = !ctx.group_free(slot_id, &session.group)
                || session
                    .group
                    .members()
                    .iter()
                    .any(|member| ctx.load(member, day) >= self.config.daily_max_periods);
            let resource_conflict = self.config.exclusive_activity_resources
                && (!ctx.teacher_free(slot_id, teacher) || !ctx.room_free(slot_id, room));
            if group_conflict || resource_conflict {
                debug!("{} conflicts in activity slot {}", session, slot_id);
                ctx.unassigned.push(session);
                continue;
            }

            ctx.commit(session, slot_id, teacher, room);
            for member in session.group.members() {
                ctx.add_load(member, day, 1);
            }
        }
    }

    /// Room pinned to an activity teacher, pinning a random free one on first use.
    fn activity_room<R: Rng>(
        &self,
        ctx: &mut AttemptContext<'a>,
        teacher: &'a str,
        rng: &mut R,
    ) -> Option<&'a str> {
        if let Some(&room) = ctx.activity_rooms.get(teacher) {
            return Some(room);
        }

        let pinned: HashSet<&str> = ctx.activity_rooms.values().copied().collect();
        let available: Vec<&'a str> = self
            .rooms
            .iter()
            .map(String::as_str)
            .filter(|room| !pinned.contains(room))
            .collect();
        let room = available.choose(rng).copied()?;
        ctx.activity_rooms.insert(teacher, room);
        Some(room)
    }

    /// Phase 2: one bundle as contiguous blocks, largest first.
    pub(crate) fn place_bundle<R: Rng>(
        &self,
        ctx: &mut AttemptContext<'a>,
        bundle: &Bundle<'a>,
        rng: &mut R,
    ) {
        let expertise: &'a Expertise = self.expertise;
        let teachers = expertise.teachers_for(bundle.subject_id);
        if teachers.is_empty() {
            debug!("no teacher for subject {}, dropping {} sessions", bundle.subject_id, bundle.sessions.len());
            ctx.unassigned.extend(&bundle.sessions);
            return;
        }

        let mut pending: &[&'a Session] = &bundle.sessions;
        while !pending.is_empty() {
            let Some(block) = self.find_block(ctx, bundle.group, teachers, pending.len(), rng) else {
                debug!(
                    "{} sessions of {} for {} left unplaced",
                    pending.len(),
                    bundle.subject_id,
                    bundle.group
                );
                ctx.unassigned.extend(pending);
                break;
            };

            let (placed, rest) = pending.split_at(block.slots.len());
            for (&session, slot) in placed.iter().zip(block.slots) {
                ctx.commit(session, &slot.id, block.teacher, block.room);
            }
            for member in bundle.group.members() {
                ctx.add_load(member, block.day, placed.len() as u32);
            }
            trace!(
                "placed {} x{} on {} with {} in {}",
                bundle.subject_id,
                placed.len(),
                block.day,
                block.teacher,
                block.room
            );
            pending = rest;
        }
    }

    /// Days in the order they are tried for `group`.
    fn days_by_load(&self, ctx: &AttemptContext<'a>, group: &GroupKey) -> [Weekday; 5] {
        let mut days = SCHOOL_DAYS;
        days.sort_by_key(|&day| ctx.composite_load(group, day));
        days
    }

    fn find_block<R: Rng>(
        &self,
        ctx: &AttemptContext<'a>,
        group: &GroupKey,
        teachers: &'a [String],
        max_size: usize,
        rng: &mut R,
    ) -> Option<Block<'a>> {
        let index: &'a TimeslotIndex = self.index;

        for size in (1..=max_size).rev() {
            for day in self.days_by_load(ctx, group) {
                let over_cap = group.members().iter().any(|member| {
                    ctx.load(member, day) + size as u32 > self.config.daily_max_periods
                });
                if over_cap {
                    trace!("{} can't take {} more periods on {}", group, size, day);
                    continue;
                }

                for window in index.usable_slots(day).windows(size) {
                    if !is_consecutive(window) {
                        continue;
                    }
                    if !window.iter().all(|slot| ctx.group_free(&slot.id, group)) {
                        continue;
                    }

                    let Some(teacher) = teachers
                        .iter()
                        .map(String::as_str)
                        .find(|teacher| window.iter().all(|slot| ctx.teacher_free(&slot.id, teacher)))
                    else {
                        continue;
                    };

                    let mut rooms: Vec<&'a str> = self.rooms.iter().map(String::as_str).collect();
                    rooms.shuffle(rng);
                    let Some(room) = rooms
                        .into_iter()
                        .find(|room| window.iter().all(|slot| ctx.room_free(&slot.id, room)))
                    else {
                        continue;
                    };

                    return Some(Block {
                        day,
                        slots: window,
                        teacher,
                        room,
                    });
                }
            }
        }

        None
    }
}
