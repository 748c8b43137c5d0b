use itertools::Itertools;
use num_format::{Locale, ToFormattedString};
use scheduler::model::{Registration, StudentGroup, Subject, Teach, Timeslot};
use scheduler::{Dataset, SchedulerConfig, SearchOutcome};
use std::time::{Duration, Instant};

struct EvalResults {
    unassigned: Vec<usize>,
    winning_attempts: Vec<usize>,
    attempts_run: usize,
    elapsed: Duration,
    best: SearchOutcome,
}

fn make_test_data(num_of_groups: u32, num_of_rooms: u32) -> Dataset {
    let mut timeslots = Vec::new();
    for (day_idx, day) in ["Mon", "Tue", "Wed", "Thu", "Fri"].iter().enumerate() {
        for period in 1..=10 {
            let id = day_idx as u32 * 10 + period;
            timeslots.push(Timeslot::new(&id.to_string(), day, Some(period)));
        }
    }

    // Two general subjects shared by everyone, six trade subjects split across
    // two departments, one activity
    let mut subjects = vec![
        Subject::new("20000-1101", "Thai Language", 2, 0),
        Subject::new("30000-1201", "English", 1, 2),
        Subject::new("20000-2001", "กิจกรรมองค์การวิชาชีพ 1", 0, 2),
    ];
    for i in 1..=6 {
        subjects.push(Subject::new(&format!("2020{i}-200{i}"), &format!("Trade {i}"), 1 + i % 2, 3));
    }

    let mut teaches = vec![
        Teach::new("T1", "20000-1101"),
        Teach::new("T2", "20000-1101"),
        Teach::new("T3", "30000-1201"),
        Teach::new("T4", "30000-1201"),
        Teach::new("T5", "20000-2001"),
    ];
    for i in 1..=6 {
        teaches.push(Teach::new(&format!("T{}", 5 + i), &format!("2020{i}-200{i}")));
        teaches.push(Teach::new(&format!("T{}", 6 + i % 6), &format!("2020{i}-200{i}")));
    }

    let groups: Vec<StudentGroup> = (1..=num_of_groups)
        .map(|g| StudentGroup::new(&format!("G{g}"), Some(15 + (g * 7) % 25)))
        .collect();

    let mut registrations = Vec::new();
    for (g, group) in groups.iter().enumerate() {
        for general in ["20000-1101", "30000-1201", "20000-2001"] {
            registrations.push(Registration::new(&group.id, general));
        }
        let department = g % 2;
        for i in (1 + department * 3)..=(3 + department * 3) {
            registrations.push(Registration::new(&group.id, &format!("2020{i}-200{i}")));
        }
    }

    Dataset {
        teachers: (1..=12).map(|t| format!("T{t}")).collect(),
        rooms: (1..=num_of_rooms).map(|r| format!("R{r}")).collect(),
        groups,
        subjects,
        teaches,
        timeslots,
        registrations,
    }
}

fn run_search(data: &Dataset, seeds: u64, parallel: bool) -> EvalResults {
    let start = Instant::now();
    let mut unassigned = Vec::new();
    let mut winning_attempts = Vec::new();
    let mut attempts_run = 0;
    let mut best: Option<SearchOutcome> = None;

    for seed in 0..seeds {
        let config = SchedulerConfig::default().with_seed(seed).with_parallel(parallel);
        let outcome = match scheduler::schedule(data, &config) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("seed {seed} failed: {e}");
                continue;
            }
        };

        unassigned.push(outcome.unassigned.len());
        winning_attempts.push(outcome.attempt + 1);
        attempts_run += outcome.attempts_run;
        if best.as_ref().is_none_or(|b| outcome.unassigned.len() < b.unassigned.len()) {
            best = Some(outcome);
        }
    }

    EvalResults {
        unassigned,
        winning_attempts,
        attempts_run,
        elapsed: start.elapsed(),
        best: best.expect("at least one seed produces a schedule"),
    }
}

fn print_results(label: &str, results: &EvalResults) {
    let runs = results.unassigned.len();
    let complete = results.unassigned.iter().filter(|&&u| u == 0).count();
    let avg = results.unassigned.iter().sum::<usize>() as f32 / runs as f32;
    let (min, max) = results.unassigned.iter().minmax().into_option().unwrap_or((&0, &0));

    println!("\n=== {label} ({runs} seeds) ===");
    println!("Attempts run: {}", results.attempts_run.to_formatted_string(&Locale::en));
    println!("Elapsed: {:.2?}", results.elapsed);
    println!("Complete schedules: {complete}/{runs}");
    println!("Unassigned sessions: avg {avg:.2}, min {min}, max {max}");

    let histogram = results
        .winning_attempts
        .iter()
        .counts()
        .into_iter()
        .sorted()
        .map(|(attempt, count)| format!("#{attempt}: {count}"))
        .join(", ");
    println!("Winning attempt: {histogram}");
    println!(
        "Best run: seed {} placed {} of {} sessions",
        results.best.seed,
        results.best.assignments.len(),
        results.best.session_count
    );
}

fn main() {
    for (groups, rooms) in [(8, 6), (16, 8), (24, 8)] {
        let data = make_test_data(groups, rooms);
        println!(
            "\n##### {} groups, {} rooms, {} registrations #####",
            groups,
            rooms,
            data.registrations.len().to_formatted_string(&Locale::en)
        );

        let sequential = run_search(&data, 20, false);
        print_results("SEQUENTIAL", &sequential);

        let parallel = run_search(&data, 20, true);
        print_results("PARALLEL", &parallel);

        if sequential.unassigned != parallel.unassigned {
            eprintln!("sequential and parallel searches disagree");
        }
    }
}
