//! Fixtures shared by the unit tests of the scheduler modules.

use crate::model::{Assignment, Dataset, Registration, StudentGroup, Subject, Teach, Timeslot};
use crate::timeslots::TimeslotIndex;
use std::collections::{HashMap, HashSet};

pub(crate) const DAYS: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

/// A full week of periods 1 to 10. Slot ids are `day * 10 + period`, so Monday
/// period 1 is `1` and Friday period 10 is `50`. Periods are pushed in reverse
/// to make sure nothing depends on input order.
pub(crate) fn make_week() -> Vec<Timeslot> {
    let mut timeslots = Vec::new();
    for (day_idx, day) in DAYS.iter().enumerate() {
        for period in (1..=10).rev() {
            let id = day_idx as u32 * 10 + period;
            timeslots.push(Timeslot::new(&id.to_string(), day, Some(period)));
        }
    }
    timeslots
}

/// Five groups, a handful of ordinary, general and activity subjects, enough
/// teachers and rooms to place everything.
pub(crate) fn make_school() -> Dataset {
    let groups: Vec<StudentGroup> = (1..=5)
        .map(|i| StudentGroup::new(&format!("G{i}"), Some(20 + i * 3)))
        .collect();
    let subjects = vec![
        Subject::new("20000-1101", "Thai Language", 2, 0),
        Subject::new("20000-1201", "English", 1, 2),
        Subject::new("20204-2001", "Programming", 1, 3),
        Subject::new("20204-2002", "Databases", 2, 2),
        Subject::new("20000-2001", "กิจกรรมองค์การวิชาชีพ 1", 0, 2),
    ];
    let teaches = vec![
        Teach::new("T1", "20000-1101"),
        Teach::new("T2", "20000-1201"),
        Teach::new("T3", "20204-2001"),
        Teach::new("T4", "20204-2001"),
        Teach::new("T4", "20204-2002"),
        Teach::new("T5", "20204-2002"),
        Teach::new("T6", "20000-2001"),
    ];
    let registrations = groups
        .iter()
        .flat_map(|group| {
            subjects
                .iter()
                .map(|subject| Registration::new(&group.id, &subject.id))
        })
        .collect();

    Dataset {
        teachers: (1..=6).map(|i| format!("T{i}")).collect(),
        rooms: (1..=6).map(|i| format!("R{i}")).collect(),
        groups,
        subjects,
        teaches,
        timeslots: make_week(),
        registrations,
    }
}

/// No two assignments share a slot together with a group, a teacher or a room.
pub(crate) fn assert_exclusive(assignments: &[Assignment]) {
    let mut groups = HashSet::new();
    let mut teachers = HashSet::new();
    let mut rooms = HashSet::new();
    for a in assignments {
        for member in a.group.members() {
            assert!(
                groups.insert((a.timeslot_id.clone(), member.clone())),
                "group {member} double booked in slot {}",
                a.timeslot_id
            );
        }
        assert!(
            teachers.insert((a.timeslot_id.clone(), a.teacher_id.clone())),
            "teacher {} double booked in slot {}",
            a.teacher_id,
            a.timeslot_id
        );
        assert!(
            rooms.insert((a.timeslot_id.clone(), a.room_id.clone())),
            "room {} double booked in slot {}",
            a.room_id,
            a.timeslot_id
        );
    }
}

/// No group has more than `cap` periods on any day.
pub(crate) fn assert_daily_cap(assignments: &[Assignment], index: &TimeslotIndex, cap: u32) {
    let mut load: HashMap<(String, String), u32> = HashMap::new();
    for a in assignments {
        let day = index.get(&a.timeslot_id).unwrap().day.clone();
        for member in a.group.members() {
            *load.entry((member.clone(), day.clone())).or_default() += 1;
        }
    }
    for ((group, day), periods) in load {
        assert!(periods <= cap, "group {group} has {periods} periods on {day}");
    }
}
