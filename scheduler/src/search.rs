//! Restart loop: repeated independent attempts, keeping the one with the fewest
//! unassigned sessions.

use crate::engine::{AttemptOutcome, Engine, SessionPlan};
use crate::error::ScheduleErr;
use crate::expand::SessionExpander;
use crate::model::{Assignment, Dataset, Expertise, Session};
use crate::rules::SchedulerConfig;
use crate::timeslots::TimeslotIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Seed of attempt `attempt` under base seed `seed`.
pub fn attempt_seed(seed: u64, attempt: usize) -> u64 {
    seed ^ (attempt as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Best attempt seen so far.
///
/// Fewer unassigned sessions wins; on a tie the lower attempt index wins, so the
/// outcome doesn't depend on the order attempts finish in.
#[derive(Debug, Default)]
pub struct BestAttempt {
    best: Option<(usize, AttemptOutcome)>,
}

impl BestAttempt {
    /// Records `outcome` if it beats the current best. Returns true when it did.
    pub fn offer(&mut self, attempt: usize, outcome: AttemptOutcome) -> bool {
        let better = match &self.best {
            None => true,
            Some((best_attempt, best)) => {
                (outcome.unassigned.len(), attempt) < (best.unassigned.len(), *best_attempt)
            }
        };
        if better {
            self.best = Some((attempt, outcome));
        }
        better
    }

    pub fn unassigned_count(&self) -> Option<usize> {
        self.best.as_ref().map(|(_, outcome)| outcome.unassigned.len())
    }

    pub fn into_inner(self) -> Option<(usize, AttemptOutcome)> {
        self.best
    }
}

/// The schedule a run settled on.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub assignments: Vec<Assignment>,
    pub unassigned: Vec<Session>,
    /// Zero-based index of the winning attempt.
    pub attempt: usize,
    pub attempts_run: usize,
    pub session_count: usize,
    pub seed: u64,
}

impl SearchOutcome {
    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }
}

/// Drives attempts of an engine over a fixed plan.
#[derive(Debug)]
pub struct RestartSearch<'a> {
    engine: Engine<'a>,
    plan: &'a SessionPlan<'a>,
    max_attempts: usize,
}

impl<'a> RestartSearch<'a> {
    pub fn new(engine: Engine<'a>, plan: &'a SessionPlan<'a>, max_attempts: usize) -> Self {
        Self {
            engine,
            plan,
            max_attempts,
        }
    }

    fn attempt(&self, seed: u64, attempt: usize) -> AttemptOutcome {
        let mut rng = StdRng::seed_from_u64(attempt_seed(seed, attempt));
        let outcome = self.engine.run_attempt(self.plan, &mut rng);
        debug!(
            "attempt #{}: {} placed, {} unassigned",
            attempt + 1,
            outcome.assignments.len(),
            outcome.unassigned.len()
        );
        outcome
    }

    /// Runs attempts one after another, stopping at the first one that places
    /// everything. Returns the best attempt and the number of attempts run.
    pub fn run_sequential(&self, seed: u64) -> (BestAttempt, usize) {
        let mut best = BestAttempt::default();
        let mut attempts_run = 0;

        for attempt in 0..self.max_attempts {
            attempts_run += 1;
            let outcome = self.attempt(seed, attempt);
            let perfect = outcome.unassigned.is_empty();
            best.offer(attempt, outcome);
            if perfect {
                info!("complete schedule found at attempt #{}", attempt + 1);
                break;
            }
        }

        (best, attempts_run)
    }

    /// Runs attempts on the rayon pool. Attempts after the earliest known
    /// complete one are skipped; the result equals `run_sequential` for the
    /// same seed.
    pub fn run_parallel(&self, seed: u64) -> (BestAttempt, usize) {
        let best = Mutex::new(BestAttempt::default());
        let first_perfect = AtomicUsize::new(usize::MAX);
        let attempts_run = AtomicUsize::new(0);

        (0..self.max_attempts).into_par_iter().for_each(|attempt| {
            if attempt > first_perfect.load(Ordering::Acquire) {
                return;
            }
            attempts_run.fetch_add(1, Ordering::Relaxed);
            let outcome = self.attempt(seed, attempt);
            if outcome.unassigned.is_empty() {
                first_perfect.fetch_min(attempt, Ordering::AcqRel);
            }
            // A poisoned lock only means another attempt panicked
            let mut best = best.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            best.offer(attempt, outcome);
        });

        let best = best.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        let first_perfect = first_perfect.into_inner();
        if first_perfect != usize::MAX {
            info!("complete schedule found at attempt #{}", first_perfect + 1);
        }
        (best, attempts_run.into_inner())
    }
}

/// Builds a timetable for `dataset`: expands sessions, then runs up to
/// `config.max_attempts` attempts and keeps the best.
///
/// # Returns
/// The winning attempt. It may still have unassigned sessions.
///
/// # Errors
/// - `ScheduleErr::UnknownSubject` if a registration names an unknown subject
/// - `ScheduleErr::NoSchedule` if no attempt ran
pub fn schedule(dataset: &Dataset, config: &SchedulerConfig) -> Result<SearchOutcome, ScheduleErr> {
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    info!("scheduling with seed {}", seed);

    let mut rng = StdRng::seed_from_u64(seed);
    let sessions = SessionExpander::new(config).expand(dataset, &mut rng)?;
    let index = TimeslotIndex::build(&dataset.timeslots, config);
    let expertise = Expertise::from_teaches(&dataset.teaches);
    let plan = SessionPlan::new(&sessions);
    let engine = Engine::new(&index, &expertise, &dataset.rooms, config);

    info!(
        "{} activity sessions, {} bundles, up to {} attempts",
        plan.specials.len(),
        plan.bundles.len(),
        config.max_attempts
    );

    let search = RestartSearch::new(engine, &plan, config.max_attempts);
    let (best, attempts_run) = if config.parallel {
        search.run_parallel(seed)
    } else {
        search.run_sequential(seed)
    };

    let Some((attempt, outcome)) = best.into_inner() else {
        return Err(ScheduleErr::NoSchedule {
            attempts: attempts_run,
        });
    };

    if !outcome.unassigned.is_empty() {
        warn!(
            "best attempt #{} leaves {} of {} sessions unassigned",
            attempt + 1,
            outcome.unassigned.len(),
            plan.session_count()
        );
    }

    Ok(SearchOutcome {
        assignments: outcome.assignments,
        unassigned: outcome.unassigned,
        attempt,
        attempts_run,
        session_count: plan.session_count(),
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupKey, Registration, StudentGroup, Subject, Teach};
    use crate::testing::{assert_daily_cap, assert_exclusive, make_school, make_week};

    mod common {
        use super::*;

        pub(crate) fn outcome(unassigned: usize) -> AttemptOutcome {
            AttemptOutcome {
                assignments: Vec::new(),
                unassigned: (0..unassigned as u32)
                    .map(|seq| Session {
                        group: GroupKey::single("G1"),
                        subject_id: "S1".to_string(),
                        seq,
                        special: false,
                    })
                    .collect(),
            }
        }

        /// Two groups that both need all ten periods of the only day with a single
        /// teacher, so every attempt leaves something unassigned.
        pub(crate) fn make_overloaded() -> Dataset {
            Dataset {
                teachers: vec!["T1".to_string()],
                rooms: vec!["R1".to_string(), "R2".to_string()],
                groups: vec![StudentGroup::new("G1", Some(20)), StudentGroup::new("G2", Some(20))],
                subjects: vec![Subject::new("S1", "Workshop", 3, 3)],
                teaches: vec![Teach::new("T1", "S1")],
                timeslots: make_week().into_iter().filter(|t| t.day == "Mon").collect(),
                registrations: vec![Registration::new("G1", "S1"), Registration::new("G2", "S1")],
            }
        }
    }

    mod unit_tests {
        use super::{common::*, *};

        #[test]
        fn test_best_attempt_prefers_fewer_unassigned() {
            let mut best = BestAttempt::default();
            assert!(best.offer(0, outcome(5)));
            assert!(best.offer(1, outcome(3)));
            assert!(!best.offer(2, outcome(4)));
            assert_eq!(best.unassigned_count(), Some(3));
        }

        #[test]
        fn test_best_attempt_keeps_earlier_on_tie() {
            let mut best = BestAttempt::default();
            best.offer(3, outcome(2));
            assert!(!best.offer(4, outcome(2)));
            // A lower index finishing late still wins the tie
            assert!(best.offer(1, outcome(2)));
            assert_eq!(best.into_inner().map(|(attempt, _)| attempt), Some(1));
        }

        #[test]
        fn test_attempt_seeds_differ() {
            let seeds: std::collections::HashSet<u64> = (0..30).map(|a| attempt_seed(42, a)).collect();
            assert_eq!(seeds.len(), 30);
        }

        #[test]
        fn test_complete_schedule_stops_early() {
            let dataset = make_school();
            let config = SchedulerConfig::default().with_seed(11);
            let result = schedule(&dataset, &config).unwrap();

            assert!(result.is_complete());
            assert_eq!(result.attempts_run, result.attempt + 1);
            assert_eq!(result.assignments.len(), result.session_count);
        }

        #[test]
        fn test_same_seed_same_schedule() {
            let dataset = make_school();
            let config = SchedulerConfig::default().with_seed(7);

            let first = schedule(&dataset, &config).unwrap();
            let second = schedule(&dataset, &config).unwrap();
            assert_eq!(first.assignments, second.assignments);
            assert_eq!(first.attempt, second.attempt);
        }

        #[test]
        fn test_parallel_matches_sequential() {
            let dataset = make_overloaded();
            for seed in [1, 2, 3] {
                let sequential = schedule(&dataset, &SchedulerConfig::default().with_seed(seed)).unwrap();
                let parallel = schedule(
                    &dataset,
                    &SchedulerConfig::default().with_seed(seed).with_parallel(true),
                )
                .unwrap();

                assert_eq!(sequential.attempt, parallel.attempt);
                assert_eq!(sequential.assignments, parallel.assignments);
                assert_eq!(sequential.unassigned, parallel.unassigned);
            }
        }

        #[test]
        fn test_partial_schedule_is_kept() {
            let dataset = make_overloaded();
            let config = SchedulerConfig::default().with_seed(3).with_max_attempts(5);
            let result = schedule(&dataset, &config).unwrap();

            // One teacher and nine Monday periods can't cover 2 x 6 periods
            assert!(!result.is_complete());
            assert_eq!(result.attempts_run, 5);
            assert_eq!(result.assignments.len() + result.unassigned.len(), 12);
            assert_exclusive(&result.assignments);
        }

        #[test]
        fn test_zero_attempts_is_total_failure() {
            let dataset = make_school();
            let config = SchedulerConfig::default().with_seed(1).with_max_attempts(0);

            assert!(matches!(
                schedule(&dataset, &config),
                Err(ScheduleErr::NoSchedule { attempts: 0 })
            ));
        }

        #[test]
        fn test_no_sessions_is_an_empty_schedule() {
            let dataset = Dataset {
                timeslots: make_week(),
                ..Default::default()
            };
            let result = schedule(&dataset, &SchedulerConfig::default().with_seed(1)).unwrap();

            assert!(result.is_complete());
            assert!(result.assignments.is_empty());
            assert_eq!(result.attempts_run, 1);
        }

        #[test]
        fn test_unknown_subject_aborts() {
            let mut dataset = make_school();
            dataset.registrations.push(Registration::new("G1", "nope"));

            assert!(matches!(
                schedule(&dataset, &SchedulerConfig::default().with_seed(1)),
                Err(ScheduleErr::UnknownSubject { .. })
            ));
        }

        #[test]
        fn test_session_counts_per_group_and_subject() {
            let dataset = make_school();
            let config = SchedulerConfig::default().with_seed(21);
            let result = schedule(&dataset, &config).unwrap();
            let index = TimeslotIndex::build(&dataset.timeslots, &config);
            assert_daily_cap(&result.assignments, &index, config.daily_max_periods);

            // Every group gets theory + practice periods of every subject
            for group in &dataset.groups {
                for subject in &dataset.subjects {
                    let placed = result
                        .assignments
                        .iter()
                        .filter(|a| a.subject_id == subject.id)
                        .filter(|a| a.group.members().contains(&group.id))
                        .count();
                    let missing = result
                        .unassigned
                        .iter()
                        .filter(|s| s.subject_id == subject.id)
                        .filter(|s| s.group.members().contains(&group.id))
                        .count();
                    assert_eq!(placed + missing, subject.period_count() as usize);
                }
            }
        }
    }
}
