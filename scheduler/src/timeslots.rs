//! Weekly grid of usable timeslots.

use crate::model::Timeslot;
use crate::rules::SchedulerConfig;
use chrono::Weekday;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSlot {
    pub id: String,
    pub period: u32,
}

/// Timeslots grouped per day and sorted by period, with lunch removed.
#[derive(Debug, Clone, Default)]
pub struct TimeslotIndex {
    slots: HashMap<String, Timeslot>,
    by_day: HashMap<Weekday, Vec<IndexedSlot>>,
    usable_by_day: HashMap<Weekday, Vec<IndexedSlot>>,
    fixed_activity_slots: Vec<String>,
}

impl TimeslotIndex {
    pub fn build(timeslots: &[Timeslot], config: &SchedulerConfig) -> Self {
        let mut index = Self::default();

        for slot in timeslots {
            let Some(period) = slot.period else {
                warn!("timeslot {} has no usable period, skipping", slot.id);
                continue;
            };
            if period == config.lunch_period {
                continue;
            }

            index.slots.insert(slot.id.clone(), slot.clone());
            match slot.day.trim().parse::<Weekday>() {
                Ok(day) => index.by_day.entry(day).or_default().push(IndexedSlot {
                    id: slot.id.clone(),
                    period,
                }),
                Err(_) => warn!("timeslot {} has unknown day {:?}", slot.id, slot.day),
            }
        }

        for (day, slots) in index.by_day.iter_mut() {
            slots.sort_by_key(|slot| slot.period);
            let usable = slots
                .iter()
                .filter(|slot| !config.is_activity_position(*day, slot.period))
                .cloned()
                .collect();
            index.usable_by_day.insert(*day, usable);
        }

        let [first, second] = config.activity_periods;
        let find_activity_slot = |wanted: u32| {
            timeslots
                .iter()
                .find(|slot| {
                    slot.period == Some(wanted)
                        && slot.day.trim().parse::<Weekday>().ok() == Some(config.activity_day)
                })
                .map(|slot| slot.id.clone())
        };
        if let (Some(first), Some(second)) = (find_activity_slot(first), find_activity_slot(second)) {
            index.fixed_activity_slots = vec![first, second];
        } else {
            warn!("activity slots are missing, activity sessions can't be placed");
        }

        info!(
            "indexed {} timeslots over {} days",
            index.slots.len(),
            index.by_day.len()
        );
        index
    }

    pub fn get(&self, timeslot_id: &str) -> Option<&Timeslot> {
        self.slots.get(timeslot_id)
    }

    /// All non-lunch slots of `day`, sorted by period.
    pub fn day_slots(&self, day: Weekday) -> &[IndexedSlot] {
        self.by_day.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Slots of `day` available to ordinary sessions: the activity positions are
    /// left out.
    pub fn usable_slots(&self, day: Weekday) -> &[IndexedSlot] {
        self.usable_by_day.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The two activity slot ids, or an empty slice when either is missing.
    pub fn fixed_activity_slots(&self) -> &[String] {
        &self.fixed_activity_slots
    }

    pub fn day_of(&self, timeslot_id: &str) -> Option<Weekday> {
        self.slots
            .get(timeslot_id)
            .and_then(|slot| slot.day.trim().parse::<Weekday>().ok())
    }
}
