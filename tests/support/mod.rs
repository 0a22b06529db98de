//! Fixture builders and invariant checks shared by the integration tests.

use std::collections::{HashMap, HashSet};
use timetable_engine::data::{
    Course, CourseFacultyMap, DepartmentVenueMap, Period, SessionType, Slot, SlotType,
    TimetableEntry, Venue, Weekday,
};
use timetable_engine::store::ScheduleStore;

/// P1-P2, P3-P4, P5-P6 and P7-P8 are contiguous pairs; breaks separate the
/// rest.
const PERIOD_TIMES: [(&str, &str); 8] = [
    ("09:00", "09:50"),
    ("09:50", "10:40"),
    ("11:00", "11:50"),
    ("11:50", "12:40"),
    ("13:30", "14:20"),
    ("14:20", "15:10"),
    ("15:30", "16:20"),
    ("16:20", "17:10"),
];

pub fn course(code: &str) -> CourseSpec {
    CourseSpec(Course {
        course_code: code.into(),
        course_name: code.into(),
        department_code: "CS".into(),
        semester: 3,
        course_category: None,
        delivery_type: None,
        lecture_hours: 0,
        tutorial_hours: 0,
        practical_hours: 0,
        weekly_sessions: 0,
        credits: 3,
        is_lab: false,
        is_elective: false,
        is_open_elective: false,
        is_honours: false,
        is_minor: false,
        is_add_course: false,
        enrolled_students: None,
    })
}

pub struct CourseSpec(Course);

impl CourseSpec {
    pub fn name(mut self, name: &str) -> Self {
        self.0.course_name = name.into();
        self
    }

    pub fn department(mut self, dept: &str) -> Self {
        self.0.department_code = dept.into();
        self
    }

    pub fn semester(mut self, semester: u8) -> Self {
        self.0.semester = semester;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.0.course_category = Some(category.into());
        self
    }

    pub fn lectures(mut self, n: u32) -> Self {
        self.0.lecture_hours = n;
        self
    }

    pub fn practicals(mut self, n: u32) -> Self {
        self.0.practical_hours = n;
        self.0.is_lab = n > 0;
        self
    }

    pub fn credits(mut self, n: u32) -> Self {
        self.0.credits = n;
        self
    }

    pub fn elective(mut self) -> Self {
        self.0.is_elective = true;
        self
    }

    pub fn open_elective(mut self) -> Self {
        self.0.is_open_elective = true;
        self
    }

    pub fn honours(mut self, weekly_sessions: u32) -> Self {
        self.0.is_honours = true;
        self.0.weekly_sessions = weekly_sessions;
        self
    }
}

pub struct StoreBuilder {
    days: usize,
    periods: Period,
    store: ScheduleStore,
    next_venue_id: u32,
}

impl StoreBuilder {
    pub fn new() -> Self {
        StoreBuilder {
            days: 5,
            periods: 7,
            store: ScheduleStore::default(),
            next_venue_id: 0,
        }
    }

    pub fn periods(mut self, periods: Period) -> Self {
        self.periods = periods;
        self
    }

    pub fn course(mut self, spec: CourseSpec) -> Self {
        self.store.courses.push(spec.0);
        self
    }

    pub fn faculty_map(mut self, dept: &str, course_code: &str, faculty_id: &str) -> Self {
        self.store.course_faculty.push(CourseFacultyMap {
            course_code: course_code.into(),
            faculty_id: faculty_id.into(),
            department_code: dept.into(),
            delivery_type: None,
        });
        self
    }

    fn venue(&mut self, name: &str, is_lab: bool) -> u32 {
        if let Some(existing) = self.store.venues.iter().find(|v| v.venue_name == name) {
            return existing.venue_id;
        }
        self.next_venue_id += 1;
        self.store.venues.push(Venue {
            venue_id: self.next_venue_id,
            venue_name: name.into(),
            block: None,
            is_lab,
            capacity: 60,
        });
        self.next_venue_id
    }

    pub fn classroom(mut self, dept: &str, semester: u8, name: &str) -> Self {
        let id = self.venue(name, false);
        self.store.department_venues.push(DepartmentVenueMap {
            department_code: dept.into(),
            semester,
            venue_id: id,
        });
        self
    }

    pub fn lab(mut self, dept: &str, semester: u8, name: &str) -> Self {
        let id = self.venue(name, true);
        self.store.department_venues.push(DepartmentVenueMap {
            department_code: dept.into(),
            semester,
            venue_id: id,
        });
        self
    }

    pub fn build(mut self) -> ScheduleStore {
        let mut slot_id = 0;
        for day in Weekday::ALL.iter().take(self.days) {
            for p in 1..=self.periods {
                let (start, end) = PERIOD_TIMES[(p - 1) as usize];
                slot_id += 1;
                self.store.slots.push(Slot {
                    slot_id,
                    day_of_week: *day,
                    period_number: p,
                    start_time: start.into(),
                    end_time: end.into(),
                    slot_type: SlotType::Regular,
                    is_active: true,
                });
            }
        }
        self.store
    }
}

/// Cells a department's schedule occupies.
pub fn filled_cells(entries: &[TimetableEntry], dept: &str, sem: u8) -> HashSet<(Weekday, Period)> {
    entries
        .iter()
        .filter(|e| e.department_code == dept && e.semester == sem)
        .map(|e| (e.day_of_week, e.period_number))
        .collect()
}

/// Structural invariants that must hold on any set of generated entries,
/// possibly spanning several departments.
pub fn assert_invariants(entries: &[TimetableEntry]) {
    // at most one entry per cell within a (department, semester)
    let mut cell_seen = HashSet::new();
    for e in entries {
        let key = (
            e.department_code.clone(),
            e.semester,
            e.day_of_week,
            e.period_number,
        );
        assert!(
            cell_seen.insert(key),
            "{}/{} holds two entries at {}/P{}",
            e.department_code,
            e.semester,
            e.day_of_week,
            e.period_number
        );
    }

    // a faculty member sits in at most one cell at a time, across departments
    let mut faculty_seen = HashSet::new();
    for e in entries {
        if let Some(fid) = &e.faculty_id {
            assert!(
                faculty_seen.insert((fid.clone(), e.day_of_week, e.period_number)),
                "faculty {fid} double-booked at {}/P{}",
                e.day_of_week,
                e.period_number
            );
        }
    }

    // a venue holds at most one session at a time, across departments
    let mut venue_seen = HashSet::new();
    for e in entries {
        if let Some(names) = &e.venue_name {
            for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                assert!(
                    venue_seen.insert((name.to_string(), e.day_of_week, e.period_number)),
                    "venue {name} double-booked at {}/P{}",
                    e.day_of_week,
                    e.period_number
                );
            }
        }
    }

    // every LAB entry belongs to a matched pair starting at P1, P3 or P5
    let mut lab_periods: HashMap<(String, u8, String, Weekday), Vec<Period>> = HashMap::new();
    for e in entries.iter().filter(|e| e.session_type == SessionType::Lab) {
        lab_periods
            .entry((
                e.department_code.clone(),
                e.semester,
                e.course_code.clone(),
                e.day_of_week,
            ))
            .or_default()
            .push(e.period_number);
    }
    for ((dept, sem, code, day), mut periods) in lab_periods {
        periods.sort_unstable();
        assert!(
            periods.len() % 2 == 0,
            "unpaired LAB periods {periods:?} for {dept}/{sem} {code} on {day}"
        );
        for pair in periods.chunks(2) {
            assert!(
                [1, 3, 5].contains(&pair[0]) && pair[1] == pair[0] + 1,
                "invalid LAB block {pair:?} for {dept}/{sem} {code} on {day}"
            );
        }
    }
}
