//! Tunable scheduling rules and subject classification.

use crate::model::{Subject, SubjectKind};
use chrono::Weekday;

pub const MAX_ATTEMPTS: usize = 30;
pub const DAILY_MAX_PERIODS: u32 = 10;
pub const LUNCH_PERIOD: u32 = 5;

/// Days the engine places ordinary sessions on, in tie-break order.
pub const SCHOOL_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Name fragments that mark an activity subject (promotion, ethics, professional
/// association and morality activities).
pub const SPECIAL_KEYWORDS: [&str; 4] = ["ส่งเสริม", "คุณธรรม", "องค์การวิชาชีพ", "จริยธรรม"];

/// Subject id prefixes of general-education subjects.
pub const GENERAL_PREFIXES: [&str; 2] = ["20000", "30000"];

/// Rules applied to one scheduling run.
///
/// # Fields
/// - `max_attempts`: upper bound on restart attempts
/// - `daily_max_periods`: hard cap of periods per student group per day
/// - `lunch_period`: period number excluded from every day
/// - `activity_day`, `activity_periods`: the two slots reserved for activity subjects
/// - `special_keywords`: a subject whose name contains any of these is an activity subject
/// - `general_prefixes`: a subject whose id starts with any of these is a general subject
/// - `seed`: base seed; a random one is drawn when absent
/// - `parallel`: run attempts on the rayon thread pool
/// - `exclusive_activity_resources`: also reject activity sessions whose teacher or room
///   already occupies the activity slot
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_attempts: usize,
    pub daily_max_periods: u32,
    pub lunch_period: u32,
    pub activity_day: Weekday,
    pub activity_periods: [u32; 2],
    pub special_keywords: Vec<String>,
    pub general_prefixes: Vec<String>,
    pub seed: Option<u64>,
    pub parallel: bool,
    pub exclusive_activity_resources: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            daily_max_periods: DAILY_MAX_PERIODS,
            lunch_period: LUNCH_PERIOD,
            activity_day: Weekday::Wed,
            activity_periods: [8, 9],
            special_keywords: SPECIAL_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            general_prefixes: GENERAL_PREFIXES.iter().map(|p| p.to_string()).collect(),
            seed: None,
            parallel: false,
            exclusive_activity_resources: false,
        }
    }
}

impl SchedulerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Activity keywords win over general prefixes.
    pub fn classify(&self, subject: &Subject) -> SubjectKind {
        if self
            .special_keywords
            .iter()
            .any(|keyword| subject.name.contains(keyword.as_str()))
        {
            SubjectKind::Special
        } else if self
            .general_prefixes
            .iter()
            .any(|prefix| subject.id.starts_with(prefix.as_str()))
        {
            SubjectKind::General
        } else {
            SubjectKind::Ordinary
        }
    }

    pub fn is_activity_position(&self, day: Weekday, period: u32) -> bool {
        day == self.activity_day && self.activity_periods.contains(&period)
    }
}
