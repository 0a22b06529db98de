//! End-to-end generation scenarios over the full pipeline.

mod support;

use std::collections::BTreeSet;
use support::{StoreBuilder, assert_invariants, course, filled_cells};
use timetable_engine::data::{Period, SessionType, TimetableEntry, Weekday};
use timetable_engine::engine::{generate, generate_and_commit};
use timetable_engine::error::GenerateError;

fn weekdays() -> [Weekday; 5] {
    [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ]
}

fn assert_grid_full(entries: &[TimetableEntry], dept: &str, sem: u8, max_period: Period) {
    let cells = filled_cells(entries, dept, sem);
    for day in weekdays() {
        for p in 1..=max_period {
            assert!(cells.contains(&(day, p)), "{day}/P{p} left empty");
        }
    }
}

#[test]
fn tiny_feasible_schedule_fills_every_cell() {
    let store = StoreBuilder::new()
        .course(course("C1").lectures(3).credits(4))
        .faculty_map("CS", "C1", "F1")
        .classroom("CS", 3, "V1")
        .build();
    let out = generate(&store, "CS", 3, Weekday::Wednesday, 8).unwrap();

    assert_invariants(&out.entries);
    assert!(!out.is_overloaded);
    assert_grid_full(&out.entries, "CS", 3, 7);

    // 35 grid cells of C1 theory plus the mentor hour
    assert_eq!(out.entries.len(), 36);
    let c1: Vec<&TimetableEntry> = out
        .entries
        .iter()
        .filter(|e| e.course_code == "C1")
        .collect();
    assert_eq!(c1.len(), 35);
    assert!(c1.iter().all(|e| e.session_type == SessionType::Theory));
    assert!(c1.iter().all(|e| e.faculty_id.as_deref() == Some("F1")));
    assert!(c1.iter().all(|e| e.venue_name.as_deref() == Some("V1")));

    let mentors: Vec<&TimetableEntry> = out
        .entries
        .iter()
        .filter(|e| e.session_type == SessionType::Mentor)
        .collect();
    assert_eq!(mentors.len(), 1);
    assert_eq!(
        (mentors[0].day_of_week, mentors[0].period_number),
        (Weekday::Wednesday, 8)
    );
}

#[test]
fn lab_blocks_surface_as_matched_pairs() {
    let store = StoreBuilder::new()
        .course(course("C1").lectures(2).practicals(4))
        .classroom("CS", 3, "V1")
        .lab("CS", 3, "L1")
        .build();
    let out = generate(&store, "CS", 3, Weekday::Saturday, 8).unwrap();

    assert_invariants(&out.entries);
    assert_grid_full(&out.entries, "CS", 3, 7);

    // two solver-placed blocks, plus at most one reinforcement pair from
    // the gap filler
    let labs = out
        .entries
        .iter()
        .filter(|e| e.session_type == SessionType::Lab)
        .count();
    assert!(labs == 4 || labs == 6, "unexpected LAB entry count {labs}");
    assert!(
        out.entries
            .iter()
            .filter(|e| e.course_code == "C1" && e.session_type == SessionType::Theory)
            .count()
            >= 2
    );
}

#[test]
fn overloaded_without_honours_spills_theory_into_period_8() {
    let mut builder = StoreBuilder::new().periods(8).classroom("CS", 3, "V1");
    for i in 0..5 {
        builder = builder.course(course(&format!("C{i}")).lectures(8));
    }
    let store = builder.build();
    let out = generate(&store, "CS", 3, Weekday::Saturday, 8).unwrap();

    assert_invariants(&out.entries);
    assert!(out.is_overloaded);
    assert_grid_full(&out.entries, "CS", 3, 8);
    assert!(
        out.entries
            .iter()
            .any(|e| e.period_number == 8 && e.session_type == SessionType::Theory)
    );

    // 8 sessions over 5 days forces a doubled day for every course
    let doubled = out.entries.iter().any(|e| {
        out.entries
            .iter()
            .filter(|o| {
                o.course_code == e.course_code
                    && o.day_of_week == e.day_of_week
                    && o.period_number != e.period_number
            })
            .count()
            > 0
    });
    assert!(doubled);
}

#[test]
fn honours_sessions_round_robin_into_period_8() {
    let store = StoreBuilder::new()
        .periods(8)
        .course(course("C1").lectures(3))
        .course(course("H1").honours(2))
        .course(course("H2").honours(3))
        .classroom("CS", 3, "V1")
        .build();
    let out = generate(&store, "CS", 3, Weekday::Saturday, 8).unwrap();

    assert_invariants(&out.entries);
    assert_grid_full(&out.entries, "CS", 3, 7);

    let mut p8: Vec<(Weekday, &str)> = out
        .entries
        .iter()
        .filter(|e| e.period_number == 8)
        .map(|e| (e.day_of_week, e.course_code.as_str()))
        .collect();
    p8.sort();
    let codes: Vec<&str> = p8.iter().map(|&(_, c)| c).collect();
    assert_eq!(codes, ["H1", "H2", "H1", "H2", "H2"]);
}

#[test]
fn single_honours_session_avoids_the_mentor_cell() {
    let store = StoreBuilder::new()
        .periods(8)
        .course(course("C1").lectures(3))
        .course(course("H1").honours(1))
        .classroom("CS", 3, "V1")
        .build();
    let out = generate(&store, "CS", 3, Weekday::Monday, 8).unwrap();

    assert_invariants(&out.entries);
    let h1: Vec<&TimetableEntry> = out
        .entries
        .iter()
        .filter(|e| e.course_code == "H1")
        .collect();
    assert_eq!(h1.len(), 1);
    assert_eq!(
        (h1[0].day_of_week, h1[0].period_number),
        (Weekday::Tuesday, 8)
    );
    assert!(
        out.entries
            .iter()
            .filter(|e| e.day_of_week == Weekday::Monday && e.period_number == 8)
            .all(|e| e.session_type == SessionType::Mentor)
    );
}

#[test]
fn cross_department_runs_never_share_a_lab() {
    let mut store = StoreBuilder::new()
        .course(course("A1").lectures(2).practicals(2).department("A"))
        .course(course("B1").lectures(2).practicals(2).department("B"))
        .classroom("A", 3, "R-A")
        .lab("A", 3, "L1")
        .classroom("B", 3, "R-B")
        .lab("B", 3, "L1")
        .lab("B", 3, "L2")
        .build();

    generate_and_commit(&mut store, "A", 3, Weekday::Saturday, 8).unwrap();
    generate_and_commit(&mut store, "B", 3, Weekday::Saturday, 8).unwrap();

    // the combined schedules must respect the global venue invariant: every
    // cell where A holds L1, B must have fallen back to L2
    assert_invariants(&store.entries);
    assert!(
        store
            .entries
            .iter()
            .any(|e| e.department_code == "B" && e.session_type == SessionType::Lab)
    );
}

#[test]
fn semester5_open_elective_takes_three_leftover_cells() {
    let mut builder = StoreBuilder::new().classroom("CS", 5, "V1");
    for i in 0..4 {
        builder = builder.course(course(&format!("C{i}")).lectures(5).semester(5));
    }
    let store = builder
        .course(
            course("OE5")
                .name("Open Elective Basket")
                .open_elective()
                .semester(5)
                .department("MGMT"),
        )
        .build();
    let out = generate(&store, "CS", 5, Weekday::Saturday, 8).unwrap();

    assert_invariants(&out.entries);
    assert_grid_full(&out.entries, "CS", 5, 7);

    let oe: Vec<&TimetableEntry> = out
        .entries
        .iter()
        .filter(|e| e.session_type == SessionType::OpenElective)
        .collect();
    assert_eq!(oe.len(), 3);
    assert!(oe.iter().all(|e| e.course_code == "OE5"));
    assert!(oe.iter().all(|e| e.faculty_id.is_none()));
    assert!(oe.iter().all(|e| e.faculty_name.as_deref() == Some("Unassigned")));
}

#[test]
fn semester6_highest_elective_gets_the_open_elective_label() {
    let store = StoreBuilder::new()
        .course(course("A").lectures(4).semester(6))
        .course(
            course("E1")
                .lectures(4)
                .semester(6)
                .elective()
                .category("PROFESSIONAL ELECTIVE 1"),
        )
        .course(
            course("E2")
                .lectures(4)
                .semester(6)
                .elective()
                .category("PROFESSIONAL ELECTIVE 2"),
        )
        .course(course("OE6").open_elective().semester(6).department("MGMT"))
        .classroom("CS", 6, "V1")
        .build();
    let out = generate(&store, "CS", 6, Weekday::Saturday, 8).unwrap();

    assert_invariants(&out.entries);
    let e2: Vec<&TimetableEntry> = out
        .entries
        .iter()
        .filter(|e| e.course_code == "E2")
        .collect();
    assert!(!e2.is_empty());
    assert!(e2.iter().all(|e| e.course_name.ends_with("/ OPEN ELECTIVE")));
    assert!(
        out.entries
            .iter()
            .filter(|e| e.course_code == "E1")
            .all(|e| !e.course_name.contains("OPEN ELECTIVE"))
    );
}

#[test]
fn three_lab_blocks_spread_across_mon_wed_fri() {
    let mut builder = StoreBuilder::new().classroom("CS", 3, "V1").lab("CS", 3, "L1");
    for i in 0..3 {
        builder = builder.course(course(&format!("LC{i}")).lectures(3).practicals(2));
    }
    for i in 0..4 {
        builder = builder.course(course(&format!("T{i}")).lectures(5));
    }
    let store = builder.build();
    let out = generate(&store, "CS", 3, Weekday::Saturday, 8).unwrap();

    assert_invariants(&out.entries);
    assert!(!out.is_overloaded);
    assert_grid_full(&out.entries, "CS", 3, 7);

    // 29 theory + 6 lab periods fill the grid exactly, so the gap filler
    // adds nothing and the three blocks must obey the hard spread
    let lab_days: BTreeSet<Weekday> = out
        .entries
        .iter()
        .filter(|e| e.session_type == SessionType::Lab)
        .map(|e| e.day_of_week)
        .collect();
    assert_eq!(
        out.entries
            .iter()
            .filter(|e| e.session_type == SessionType::Lab)
            .count(),
        6
    );
    assert_eq!(
        lab_days.into_iter().collect::<Vec<_>>(),
        [Weekday::Monday, Weekday::Wednesday, Weekday::Friday]
    );
}

#[test]
fn regenerating_after_deletion_reproduces_the_schedule() {
    let mut store = StoreBuilder::new()
        .course(course("C1").lectures(3).credits(4))
        .course(course("C2").lectures(2).practicals(2))
        .classroom("CS", 3, "V1")
        .lab("CS", 3, "L1")
        .build();
    let first = generate_and_commit(&mut store, "CS", 3, Weekday::Wednesday, 8).unwrap();

    store.replace_entries("CS", 3, Vec::new());
    assert!(store.entries_for("CS", 3).is_empty());

    let second = generate_and_commit(&mut store, "CS", 3, Weekday::Wednesday, 8).unwrap();
    assert_eq!(first.entries, second.entries);
}

#[test]
fn impossible_load_reports_sessions_and_capacity() {
    let mut builder = StoreBuilder::new().periods(8).classroom("CS", 3, "V1");
    for i in 0..6 {
        builder = builder.course(course(&format!("C{i}")).lectures(8));
    }
    let store = builder.build();
    let err = generate(&store, "CS", 3, Weekday::Saturday, 8).unwrap_err();
    assert_eq!(
        err,
        GenerateError::Infeasible {
            sessions: 48,
            p17_slots: 35
        }
    );
}
