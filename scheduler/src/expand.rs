//! Session expansion: registrations become one-period session units, with small
//! groups merged pairwise for shared general subjects.

use crate::error::ScheduleErr;
use crate::model::{Dataset, GroupKey, Session, Subject, SubjectKind};
use crate::rules::SchedulerConfig;
use rand::Rng;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Range sizes are drawn from when a group's enrollment is unknown.
pub const SYNTHETIC_SIZE: Range<u32> = 20..40;

/// Enrollment size of every group, synthesizing the ones the input doesn't give.
///
/// Synthesized sizes only decide merge order.
pub fn group_sizes<R: Rng>(dataset: &Dataset, rng: &mut R) -> HashMap<String, u32> {
    let mut sizes = HashMap::with_capacity(dataset.groups.len());
    for group in &dataset.groups {
        let size = match group.size {
            Some(size) => size,
            None => {
                let size = rng.random_range(SYNTHETIC_SIZE);
                debug!("group {} has no usable size, using {}", group.id, size);
                size
            }
        };
        sizes.insert(group.id.clone(), size);
    }

    for registration in &dataset.registrations {
        if !sizes.contains_key(&registration.group_id) {
            warn!(
                "group {} is registered but not listed among student groups",
                registration.group_id
            );
            let size = rng.random_range(SYNTHETIC_SIZE);
            sizes.insert(registration.group_id.clone(), size);
        }
    }

    sizes
}

/// Pairs groups smallest-first: after sorting by size, the first and second are
/// merged, then the third and fourth, and so on. An odd group out stays alone.
///
/// Groups of equal size keep their registration order.
pub fn merge_groups(groups: &[&str], sizes: &HashMap<String, u32>) -> Vec<GroupKey> {
    let mut by_size = groups.to_vec();
    by_size.sort_by_key(|group| sizes.get(*group).copied().unwrap_or_default());

    by_size
        .chunks(2)
        .map(|pair| match pair {
            [first, second] => GroupKey::merged(first, second),
            [single] => GroupKey::single(single),
            _ => unreachable!("chunks(2) yields one or two groups"),
        })
        .collect()
}

/// Turns subject registrations into the flat session list of a run.
#[derive(Debug)]
pub struct SessionExpander<'a> {
    config: &'a SchedulerConfig,
}

impl<'a> SessionExpander<'a> {
    pub fn new(config: &'a SchedulerConfig) -> Self {
        Self { config }
    }

    /// Expands every registration into `theory + practice` sessions.
    ///
    /// Sessions come out grouped by subject (in order of first registration), then
    /// by group, then by sequence index.
    ///
    /// # Errors
    /// `ScheduleErr::UnknownSubject` if a registration names a subject that isn't in
    /// the dataset.
    pub fn expand<R: Rng>(&self, dataset: &Dataset, rng: &mut R) -> Result<Vec<Session>, ScheduleErr> {
        let subjects: HashMap<&str, &Subject> = dataset
            .subjects
            .iter()
            .map(|subject| (subject.id.as_str(), subject))
            .collect();
        let sizes = group_sizes(dataset, rng);

        let mut registry: Vec<(&Subject, Vec<&str>)> = Vec::new();
        let mut registry_index: HashMap<&str, usize> = HashMap::new();
        for registration in &dataset.registrations {
            let subject: &Subject = subjects
                .get(registration.subject_id.as_str())
                .copied()
                .ok_or_else(|| ScheduleErr::UnknownSubject {
                    group: registration.group_id.clone(),
                    subject: registration.subject_id.clone(),
                })?;
            let idx = *registry_index
                .entry(subject.id.as_str())
                .or_insert_with(|| {
                    registry.push((subject, Vec::new()));
                    registry.len() - 1
                });
            registry[idx].1.push(registration.group_id.as_str());
        }

        let mut sessions = Vec::new();
        let mut merged_count = 0;
        for (subject, groups) in &registry {
            let kind = self.config.classify(subject);
            let keys = if kind == SubjectKind::General && groups.len() >= 2 {
                let keys = merge_groups(groups, &sizes);
                merged_count += keys.iter().filter(|key| key.is_merged()).count();
                keys
            } else {
                groups.iter().map(|group| GroupKey::single(group)).collect()
            };

            for key in keys {
                for seq in 0..subject.period_count() {
                    sessions.push(Session {
                        group: key.clone(),
                        subject_id: subject.id.clone(),
                        seq,
                        special: kind == SubjectKind::Special,
                    });
                }
            }
        }

        info!(
            "expanded {} registrations into {} sessions ({} merged groups)",
            dataset.registrations.len(),
            sessions.len(),
            merged_count
        );
        Ok(sessions)
    }
}
