/// An enumeration of errors that may occur while building or exporting a timetable
#[derive(Debug, thiserror::Error)]
pub enum ScheduleErr {
    #[error("group {group} is registered for subject {subject}, which doesn't exist")]
    UnknownSubject { group: String, subject: String },
    #[error("no schedule was established after {attempts} attempts")]
    NoSchedule { attempts: usize },
    #[error("schedule io failed: {0}")]
    IoError(#[from] std::io::Error),
    #[error("schedule csv failed: {0}")]
    Csv(#[from] csv::Error),
}
