use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Separator between member ids of a merged group, e.g. `G1+G2`.
pub const GROUP_SEPARATOR: char = '+';

/// Parses a numeric input field the way a spreadsheet export is read: surrounding
/// whitespace is ignored and anything that isn't a non-negative integer is absent.
pub fn parse_count(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub theory: u32,
    pub practice: u32,
}

impl Subject {
    pub fn new(id: &str, name: &str, theory: u32, practice: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            theory,
            practice,
        }
    }

    /// Number of one-period sessions each registered group needs per week.
    pub fn period_count(&self) -> u32 {
        self.theory + self.practice
    }
}

/// How a subject is treated by the expander and the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    /// Activity subject pinned to the fixed activity slots.
    Special,
    /// General-education subject whose groups may be merged.
    General,
    Ordinary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentGroup {
    pub id: String,
    /// Enrollment size. `None` when the input was missing, unparsable or zero.
    pub size: Option<u32>,
}

impl StudentGroup {
    pub fn new(id: &str, size: Option<u32>) -> Self {
        Self {
            id: id.to_string(),
            size: size.filter(|&s| s > 0),
        }
    }
}

/// "This group takes this subject."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub group_id: String,
    pub subject_id: String,
}

impl Registration {
    pub fn new(group_id: &str, subject_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            subject_id: subject_id.to_string(),
        }
    }
}

/// One teacher qualified for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teach {
    pub teacher_id: String,
    pub subject_id: String,
}

impl Teach {
    pub fn new(teacher_id: &str, subject_id: &str) -> Self {
        Self {
            teacher_id: teacher_id.to_string(),
            subject_id: subject_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeslot {
    pub id: String,
    /// Day label as it appears in the input (`Mon`, `Tue`, ...).
    pub day: String,
    pub period: Option<u32>,
}

impl Timeslot {
    pub fn new(id: &str, day: &str, period: Option<u32>) -> Self {
        Self {
            id: id.to_string(),
            day: day.to_string(),
            period,
        }
    }
}

/// All immutable inputs of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub teachers: Vec<String>,
    pub rooms: Vec<String>,
    pub groups: Vec<StudentGroup>,
    pub subjects: Vec<Subject>,
    pub teaches: Vec<Teach>,
    pub timeslots: Vec<Timeslot>,
    pub registrations: Vec<Registration>,
}

/// Ordered lists of teachers qualified for each subject.
///
/// List order is the assignment preference: the engine always takes the first
/// qualified teacher that is free.
#[derive(Debug, Clone, Default)]
pub struct Expertise {
    by_subject: HashMap<String, Vec<String>>,
}

impl Expertise {
    pub fn from_teaches(teaches: &[Teach]) -> Self {
        let mut by_subject: HashMap<String, Vec<String>> = HashMap::new();
        for teach in teaches {
            by_subject
                .entry(teach.subject_id.clone())
                .or_default()
                .push(teach.teacher_id.clone());
        }
        Self { by_subject }
    }

    pub fn teachers_for(&self, subject_id: &str) -> &[String] {
        self.by_subject
            .get(subject_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The scheduling unit of a session: one student group, or two groups merged
/// for a shared general subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    members: Vec<String>,
}

impl GroupKey {
    pub fn single(group_id: &str) -> Self {
        Self {
            members: vec![group_id.to_string()],
        }
    }

    pub fn merged(first: &str, second: &str) -> Self {
        Self {
            members: vec![first.to_string(), second.to_string()],
        }
    }

    /// Splits a composite id such as `G1+G2` back into its members.
    pub fn parse(composite: &str) -> Self {
        Self {
            members: composite
                .split(GROUP_SEPARATOR)
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn is_merged(&self) -> bool {
        self.members.len() > 1
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, "{GROUP_SEPARATOR}")?;
            }
            f.write_str(member)?;
        }
        Ok(())
    }
}

/// One period of one subject for one (possibly merged) group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    pub group: GroupKey,
    pub subject_id: String,
    /// Position of this session among the sessions of the same group and subject.
    pub seq: u32,
    pub special: bool,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.group, self.subject_id, self.seq)
    }
}

/// A committed (group, timeslot, subject, teacher, room) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub group: GroupKey,
    pub timeslot_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub room_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(" 3 "), Some(3));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count("-2"), None);
    }

    #[test]
    fn test_zero_size_is_absent() {
        assert_eq!(StudentGroup::new("G1", Some(0)).size, None);
        assert_eq!(StudentGroup::new("G1", Some(25)).size, Some(25));
    }

    #[test]
    fn test_group_key_display_and_parse() {
        let merged = GroupKey::merged("G1", "G2");
        assert_eq!(merged.to_string(), "G1+G2");
        assert!(merged.is_merged());
        assert_eq!(GroupKey::parse("G1+G2"), merged);

        let single = GroupKey::parse("G3");
        assert_eq!(single, GroupKey::single("G3"));
        assert!(!single.is_merged());
    }

    #[test]
    fn test_expertise_keeps_input_order() {
        let expertise = Expertise::from_teaches(&[
            Teach::new("T2", "S1"),
            Teach::new("T1", "S1"),
            Teach::new("T3", "S2"),
        ]);

        assert_eq!(expertise.teachers_for("S1"), ["T2", "T1"]);
        assert_eq!(expertise.teachers_for("S2"), ["T3"]);
        assert!(expertise.teachers_for("S9").is_empty());
    }
}
