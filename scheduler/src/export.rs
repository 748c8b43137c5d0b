//! Timetable artifact: one row per individual group per assignment.

use crate::error::ScheduleErr;
use crate::model::Assignment;
use crate::timeslots::TimeslotIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HEADER: [&str; 7] = [
    "group_id",
    "timeslot_id",
    "day",
    "period",
    "subject_id",
    "teacher_id",
    "room_id",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub group_id: String,
    pub timeslot_id: String,
    pub day: String,
    pub period: u32,
    pub subject_id: String,
    pub teacher_id: String,
    pub room_id: String,
}

/// What a reader finds at the artifact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleArtifact {
    /// No scheduling run has written the file yet.
    Missing,
    /// The file exists but holds no rows.
    Empty,
    Rows(Vec<ScheduleRow>),
}

/// Numeric ids sort by value and before any non-numeric id.
fn compare_timeslot_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Splits merged groups back into their members and sorts the rows by group id,
/// then by timeslot id.
pub fn expand_rows(assignments: &[Assignment], index: &TimeslotIndex) -> Vec<ScheduleRow> {
    let mut rows = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        let Some(slot) = index.get(&assignment.timeslot_id) else {
            warn!("assignment to unknown timeslot {}", assignment.timeslot_id);
            continue;
        };
        let period = slot.period.unwrap_or_default();
        for member in assignment.group.members() {
            rows.push(ScheduleRow {
                group_id: member.clone(),
                timeslot_id: assignment.timeslot_id.clone(),
                day: slot.day.clone(),
                period,
                subject_id: assignment.subject_id.clone(),
                teacher_id: assignment.teacher_id.clone(),
                room_id: assignment.room_id.clone(),
            });
        }
    }

    rows.sort_by(|a, b| {
        a.group_id
            .cmp(&b.group_id)
            .then_with(|| compare_timeslot_ids(&a.timeslot_id, &b.timeslot_id))
    });
    rows
}

/// Writes the header and `rows` as CSV.
pub fn write_rows<W: Write>(rows: &[ScheduleRow], writer: W) -> Result<(), ScheduleErr> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the artifact at `path`.
///
/// Rows go to a sibling staging file first, which replaces `path` only once it
/// is complete, so readers never see a partial timetable.
///
/// # Errors
/// If the staging file can't be written or renamed. `path` is left untouched.
pub fn write_schedule(path: &Path, rows: &[ScheduleRow]) -> Result<(), ScheduleErr> {
    let staging = staging_path(path);
    let result = File::create(&staging)
        .map_err(ScheduleErr::from)
        .and_then(|file| write_rows(rows, file))
        .and_then(|()| fs::rename(&staging, path).map_err(ScheduleErr::from));

    if result.is_err() {
        let _ = fs::remove_file(&staging);
    } else {
        info!("schedule exported to {} ({} rows)", path.display(), rows.len());
    }
    result
}

/// Reads an artifact written by `write_schedule`.
///
/// A missing file or a file without rows is reported as such rather than as an
/// error.
///
/// # Errors
/// If the file exists but can't be read or parsed.
pub fn read_schedule(path: &Path) -> Result<ScheduleArtifact, ScheduleErr> {
    if !path.exists() {
        return Ok(ScheduleArtifact::Missing);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let rows = rdr
        .deserialize::<ScheduleRow>()
        .collect::<Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        Ok(ScheduleArtifact::Empty)
    } else {
        Ok(ScheduleArtifact::Rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupKey;
    use crate::rules::SchedulerConfig;
    use crate::testing::make_week;

    fn assignment(group: GroupKey, timeslot_id: &str, subject_id: &str) -> Assignment {
        Assignment {
            group,
            timeslot_id: timeslot_id.to_string(),
            subject_id: subject_id.to_string(),
            teacher_id: "T1".to_string(),
            room_id: "R1".to_string(),
        }
    }

    #[test]
    fn test_expand_rows_splits_and_sorts() {
        let index = TimeslotIndex::build(&make_week(), &SchedulerConfig::default());
        let assignments = vec![
            assignment(GroupKey::single("G2"), "12", "S2"),
            assignment(GroupKey::merged("G2", "G1"), "3", "S1"),
            assignment(GroupKey::single("G1"), "21", "S3"),
            assignment(GroupKey::single("G2"), "2", "S2"),
        ];

        let rows = expand_rows(&assignments, &index);
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.group_id.as_str(), r.timeslot_id.as_str()))
            .collect();
        // "12" sorts after "3" because ids compare as numbers
        assert_eq!(
            keys,
            [("G1", "3"), ("G1", "21"), ("G2", "2"), ("G2", "3"), ("G2", "12")]
        );
        assert_eq!(rows[0].day, "Mon");
        assert_eq!(rows[0].period, 3);
        assert_eq!(rows[1].day, "Wed");
    }

    #[test]
    fn test_compare_timeslot_ids() {
        assert_eq!(compare_timeslot_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_timeslot_ids("10", "x"), Ordering::Less);
        assert_eq!(compare_timeslot_ids("b", "a"), Ordering::Greater);
    }

    #[test]
    fn test_write_rows_format() {
        let index = TimeslotIndex::build(&make_week(), &SchedulerConfig::default());
        let rows = expand_rows(&[assignment(GroupKey::single("G1"), "1", "S1")], &index);

        let mut out = Vec::new();
        write_rows(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "group_id,timeslot_id,day,period,subject_id,teacher_id,room_id\nG1,1,Mon,1,S1,T1,R1\n"
        );
    }

    #[test]
    fn test_write_rows_empty_keeps_header() {
        let mut out = Vec::new();
        write_rows(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "group_id,timeslot_id,day,period,subject_id,teacher_id,room_id\n"
        );
    }

    #[test]
    fn test_artifact_states() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.csv");
        assert_eq!(read_schedule(&path).unwrap(), ScheduleArtifact::Missing);

        write_schedule(&path, &[]).unwrap();
        assert_eq!(read_schedule(&path).unwrap(), ScheduleArtifact::Empty);

        fs::write(&path, "").unwrap();
        assert_eq!(read_schedule(&path).unwrap(), ScheduleArtifact::Empty);

        let index = TimeslotIndex::build(&make_week(), &SchedulerConfig::default());
        let rows = expand_rows(
            &[assignment(GroupKey::merged("G1", "G2"), "41", "S1")],
            &index,
        );
        write_schedule(&path, &rows).unwrap();
        assert_eq!(read_schedule(&path).unwrap(), ScheduleArtifact::Rows(rows));
        assert!(!staging_path(&path).exists());
    }
}
