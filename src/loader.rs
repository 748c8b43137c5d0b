use scheduler::model::parse_count;
use scheduler::{Dataset, Registration, StudentGroup, Subject, Teach, Timeslot};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// An enumeration of errors that may occur while reading the input tables
#[derive(Debug, thiserror::Error)]
pub enum LoadErr {
    #[error("input file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

#[derive(Debug, Deserialize)]
struct TeacherRecord {
    #[serde(default)]
    teacher_id: String,
}

#[derive(Debug, Deserialize)]
struct RoomRecord {
    #[serde(default)]
    room_id: String,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    #[serde(default)]
    group_id: String,
    #[serde(default)]
    size: String,
}

#[derive(Debug, Deserialize)]
struct SubjectRecord {
    #[serde(default)]
    subject_id: String,
    #[serde(default)]
    subject_name: String,
    #[serde(default)]
    theory: String,
    #[serde(default)]
    practice: String,
}

#[derive(Debug, Deserialize)]
struct TeachRecord {
    #[serde(default)]
    teacher_id: String,
    #[serde(default)]
    subject_id: String,
}

#[derive(Debug, Deserialize)]
struct TimeslotRecord {
    #[serde(default)]
    timeslot_id: String,
    #[serde(default)]
    day: String,
    #[serde(default)]
    period: String,
}

#[derive(Debug, Deserialize)]
struct RegisterRecord {
    #[serde(default)]
    group_id: String,
    #[serde(default)]
    subject_id: String,
}

/// Reads `<dir>/<name>.csv` into records of type `T`.
///
/// Header names are trimmed and lose a leading byte-order mark, every field is
/// trimmed, and columns missing from the file deserialize as empty text.
///
/// # Errors
/// - `LoadErr::MissingFile` if the file doesn't exist
/// - `LoadErr::Csv` if it can't be read or a row doesn't fit `T`
fn read_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>, LoadErr> {
    let path = dir.join(format!("{name}.csv"));
    if !path.exists() {
        return Err(LoadErr::MissingFile(path));
    }
    let csv_err = |source| LoadErr::Csv {
        path: path.clone(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(&path)
        .map_err(csv_err)?;

    let headers: csv::StringRecord = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').trim())
        .collect();
    rdr.set_headers(headers);

    let records = rdr
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)?;
    info!("read {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Loads the seven input tables of a run from `dir`.
///
/// Rows without an id are dropped. Numeric fields are parsed leniently; what
/// can't be parsed is left for the scheduler to default.
///
/// # Errors
/// If any table is missing or unreadable. Nothing is scheduled in that case.
pub fn load_dataset(dir: &Path) -> Result<Dataset, LoadErr> {
    let teachers = read_table::<TeacherRecord>(dir, "teacher")?
        .into_iter()
        .map(|r| r.teacher_id)
        .filter(|id| !id.is_empty())
        .collect();

    let rooms = read_table::<RoomRecord>(dir, "room")?
        .into_iter()
        .map(|r| r.room_id)
        .filter(|id| !id.is_empty())
        .collect();

    let groups = read_table::<GroupRecord>(dir, "student_group")?
        .into_iter()
        .filter(|r| !r.group_id.is_empty())
        .map(|r| StudentGroup::new(&r.group_id, parse_count(&r.size)))
        .collect();

    let subjects = read_table::<SubjectRecord>(dir, "subject")?
        .into_iter()
        .filter(|r| !r.subject_id.is_empty())
        .map(|r| {
            Subject::new(
                &r.subject_id,
                &r.subject_name,
                parse_count(&r.theory).unwrap_or(0),
                parse_count(&r.practice).unwrap_or(0),
            )
        })
        .collect();

    let teaches = read_table::<TeachRecord>(dir, "teach")?
        .into_iter()
        .filter(|r| !r.teacher_id.is_empty() && !r.subject_id.is_empty())
        .map(|r| Teach::new(&r.teacher_id, &r.subject_id))
        .collect();

    let timeslots = read_table::<TimeslotRecord>(dir, "timeslot")?
        .into_iter()
        .filter(|r| !r.timeslot_id.is_empty())
        .map(|r| Timeslot::new(&r.timeslot_id, &r.day, parse_count(&r.period)))
        .collect();

    let registrations: Vec<Registration> = read_table::<RegisterRecord>(dir, "register")?
        .into_iter()
        .filter(|r| {
            let complete = !r.group_id.is_empty() && !r.subject_id.is_empty();
            if !complete {
                warn!("skipping incomplete registration {:?}", r);
            }
            complete
        })
        .map(|r| Registration::new(&r.group_id, &r.subject_id))
        .collect();

    Ok(Dataset {
        teachers,
        rooms,
        groups,
        subjects,
        teaches,
        timeslots,
        registrations,
    })
}
