use clap::Parser;
use scheduler::SchedulerConfig;
use std::path::PathBuf;

/// Command line of the timetable builder. Every flag can also come from a
/// `TIMETABLE_*` environment variable or a `.env` file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding teacher.csv, room.csv, student_group.csv, subject.csv,
    /// teach.csv, timeslot.csv and register.csv
    #[arg(long, env = "TIMETABLE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Where the timetable is written
    #[arg(long, short, env = "TIMETABLE_OUTPUT", default_value = "output.csv")]
    pub output: PathBuf,

    /// Optional JSON summary of the run
    #[arg(long, env = "TIMETABLE_REPORT")]
    pub report: Option<PathBuf>,

    /// Maximum number of restart attempts
    #[arg(long, env = "TIMETABLE_ATTEMPTS", default_value_t = scheduler::rules::MAX_ATTEMPTS)]
    pub attempts: usize,

    /// Maximum periods per student group per day
    #[arg(long, env = "TIMETABLE_DAILY_MAX", default_value_t = scheduler::rules::DAILY_MAX_PERIODS)]
    pub daily_max: u32,

    /// Base seed, for reproducible runs
    #[arg(long, env = "TIMETABLE_SEED")]
    pub seed: Option<u64>,

    /// Run attempts in parallel
    #[arg(long, env = "TIMETABLE_PARALLEL")]
    pub parallel: bool,

    /// Don't let activity sessions share a teacher or room within a slot
    #[arg(long, env = "TIMETABLE_EXCLUSIVE_ACTIVITIES")]
    pub exclusive_activities: bool,
}

/// Settings of one run
///
/// # Fields
/// - `data_dir`: directory the input tables are read from
/// - `output`: path of the timetable artifact
/// - `report`: optional path of the JSON run report
/// - `scheduler`: rules handed to the scheduling core
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub report: Option<PathBuf>,
    pub scheduler: SchedulerConfig,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let scheduler = SchedulerConfig {
            max_attempts: cli.attempts,
            daily_max_periods: cli.daily_max,
            seed: cli.seed,
            parallel: cli.parallel,
            exclusive_activity_resources: cli.exclusive_activities,
            ..SchedulerConfig::default()
        };

        Self {
            data_dir: cli.data_dir,
            output: cli.output,
            report: cli.report,
            scheduler,
        }
    }
}
