use crate::assemble::assemble;
use crate::data::{Period, SessionType, TimetableEntry, Weekday};
use crate::error::GenerateError;
use crate::postphase;
use crate::solver;
use crate::store::ScheduleStore;
use crate::venues::VenueAllocator;
use log::info;
use serde::Serialize;
use std::collections::HashSet;

/// Result summary of one generation run. `entries` is the complete new
/// schedule for the (department, semester); nothing has been written yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutcome {
    pub department: String,
    pub semester: u8,
    pub entry_count: usize,
    pub is_overloaded: bool,
    pub entries: Vec<TimetableEntry>,
}

/// Run the full pipeline against an immutable store snapshot:
/// assemble → solve → materialize venues → post-phase placement.
///
/// Pure with respect to the store; use [`generate_and_commit`] to also
/// perform the replace-all write.
pub fn generate(
    store: &ScheduleStore,
    department: &str,
    semester: u8,
    mentor_day: Weekday,
    mentor_period: Period,
) -> Result<GenerateOutcome, GenerateError> {
    info!("generation request for {department}/S{semester}, mentor {mentor_day}/P{mentor_period}");

    let inst = assemble(store, department, semester, mentor_day, mentor_period)?;
    let solution = solver::solve(&inst)?;

    let mut alloc = VenueAllocator::new(&inst);
    let mut entries: Vec<TimetableEntry> = Vec::new();
    let mut filled: HashSet<(Weekday, Period)> = HashSet::new();

    let course_name = |code: &str| -> String {
        inst.courses()
            .find(|c| c.course_code == code)
            .map_or_else(|| code.to_string(), |c| c.course_name.clone())
    };

    for (code, day, period) in &solution.theory {
        let venue = alloc.assign(*day, *period, code, false);
        entries.push(inst.make_entry(
            code,
            &course_name(code),
            inst.lead_faculty(code),
            SessionType::Theory,
            *day,
            *period,
            venue,
        ));
        filled.insert((*day, *period));
    }

    for (code, day, start) in &solution.lab_blocks {
        for period in [*start, *start + 1] {
            let venue = alloc.assign(*day, period, code, true);
            entries.push(inst.make_entry(
                code,
                &course_name(code),
                inst.lead_faculty(code),
                SessionType::Lab,
                *day,
                period,
                venue,
            ));
            filled.insert((*day, period));
        }
    }

    postphase::run(&inst, &mut alloc, &mut entries, &mut filled);

    info!(
        "generated {} entries for {department}/S{semester}",
        entries.len()
    );
    Ok(GenerateOutcome {
        department: department.to_string(),
        semester,
        entry_count: entries.len(),
        is_overloaded: inst.is_overloaded,
        entries,
    })
}

/// [`generate`] followed by the replace-all write. On error the store is
/// left untouched and the prior schedule stays in place.
pub fn generate_and_commit(
    store: &mut ScheduleStore,
    department: &str,
    semester: u8,
    mentor_day: Weekday,
    mentor_period: Period,
) -> Result<GenerateOutcome, GenerateError> {
    let outcome = generate(store, department, semester, mentor_day, mentor_period)?;
    store.replace_entries(department, semester, outcome.entries.clone());
    Ok(outcome)
}
