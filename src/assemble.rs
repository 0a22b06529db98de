use crate::data::{Course, CourseCode, FacultyId, Period, SessionType, Slot, TimetableEntry, Weekday};
use crate::error::GenerateError;
use crate::store::ScheduleStore;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Lab blocks may only begin at these periods, pairing P1-P2, P3-P4, P5-P6.
pub const LAB_BLOCK_STARTS: [Period; 3] = [1, 3, 5];

/// A faculty assignment resolved for output. Placeholder ids from the
/// curriculum sheets ("nan", "none", empty) become `None` here and never
/// participate in clash detection.
#[derive(Debug, Clone)]
pub struct FacultyRef {
    pub id: Option<FacultyId>,
    pub name: String,
}

/// Everything the solver and post phase need for one (department, semester)
/// run, materialized up front so the phases are pure computation.
#[derive(Debug, Clone)]
pub struct ProblemInstance {
    pub department: String,
    pub semester: u8,
    pub mentor_day: Weekday,
    pub mentor_period: Period,
    /// Courses entering the CP formulation, in input order.
    pub regular: Vec<Course>,
    /// Honours/minor courses, placed greedily into period 8.
    pub honours: Vec<Course>,
    pub course_faculty: HashMap<CourseCode, Vec<FacultyRef>>,
    /// Days with at least one active slot, in canonical weekday order.
    pub days: Vec<Weekday>,
    pub day_periods: BTreeMap<Weekday, Vec<Period>>,
    pub slots: HashMap<(Weekday, Period), Slot>,
    pub pinned_venues: HashMap<CourseCode, String>,
    pub default_classrooms: Vec<String>,
    pub default_labs: Vec<String>,
    /// Venue bookings held by other departments at this semester.
    pub global_occupancy: HashMap<(Weekday, Period), HashSet<String>>,
    /// The semester-wide open elective for post-phase injection/merging.
    pub open_elective: Option<Course>,
    pub reg_sessions: u32,
    pub hon_sessions: u32,
    pub p17_slots: u32,
    pub p8_slots: u32,
    pub is_overloaded: bool,
    pub use_p8_for_regular: bool,
}

impl ProblemInstance {
    pub fn is_mentor_cell(&self, day: Weekday, period: Period) -> bool {
        day == self.mentor_day && period == self.mentor_period
    }

    /// Highest period regular theory may occupy. Period 8 opens up only for
    /// an overloaded curriculum with no honours competing for it.
    pub fn max_regular_period(&self) -> Period {
        if self.use_p8_for_regular { 8 } else { 7 }
    }

    pub fn periods(&self, day: Weekday) -> &[Period] {
        match self.day_periods.get(&day) {
            Some(periods) => periods,
            None => &[],
        }
    }

    /// Whether (day, p) and (day, p+1) are physically back-to-back, i.e. the
    /// first slot ends exactly when the second starts.
    pub fn contiguous(&self, day: Weekday, period: Period) -> bool {
        match (
            self.slots.get(&(day, period)),
            self.slots.get(&(day, period + 1)),
        ) {
            (Some(a), Some(b)) => a.is_contiguous_with(b),
            _ => false,
        }
    }

    /// First faculty mapped to a course, for the output record.
    pub fn lead_faculty(&self, code: &str) -> (Option<FacultyId>, Option<String>) {
        match self.course_faculty.get(code).and_then(|v| v.first()) {
            Some(f) => (f.id.clone(), Some(f.name.clone())),
            None => (None, None),
        }
    }

    /// All courses of the instance, regular first (input order), then
    /// honours. Used by the post phase for extra-session bookkeeping.
    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.regular.iter().chain(self.honours.iter())
    }

    /// Build an output record for one cell, resolving the denormalized slot
    /// reference. The slot id stays `None` for cells outside the configured
    /// grid (the mentor entry is emitted regardless).
    pub fn make_entry(
        &self,
        course_code: &str,
        course_name: &str,
        faculty: (Option<FacultyId>, Option<String>),
        session_type: SessionType,
        day: Weekday,
        period: Period,
        venue_name: Option<String>,
    ) -> TimetableEntry {
        TimetableEntry {
            department_code: self.department.clone(),
            semester: self.semester,
            course_code: course_code.to_string(),
            course_name: course_name.to_string(),
            faculty_id: faculty.0,
            faculty_name: faculty.1,
            session_type,
            slot_id: self.slots.get(&(day, period)).map(|s| s.slot_id),
            day_of_week: day,
            period_number: period,
            venue_name,
        }
    }
}

fn is_placeholder_id(raw: &str) -> bool {
    let cleaned = raw.trim().to_lowercase();
    cleaned.is_empty() || cleaned == "nan" || cleaned == "none"
}

/// Materialize the scheduling problem for one (department, semester) from
/// the collaborator store. Fails fast on missing inputs; touches nothing.
pub fn assemble(
    store: &ScheduleStore,
    department: &str,
    semester: u8,
    mentor_day: Weekday,
    mentor_period: Period,
) -> Result<ProblemInstance, GenerateError> {
    let no_courses = || GenerateError::NoCourses {
        department: department.to_string(),
        semester,
    };

    // Open electives never enter the primary phase; the post phase injects
    // or merges them per semester policy.
    let mut courses: Vec<Course> = store
        .courses
        .iter()
        .filter(|c| {
            c.department_code == department && c.semester == semester && !c.is_open_elective
        })
        .cloned()
        .collect();
    if courses.is_empty() {
        return Err(no_courses());
    }

    let active_slots: Vec<&Slot> = store.slots.iter().filter(|s| s.is_active).collect();
    if active_slots.is_empty() {
        return Err(GenerateError::NoSlots);
    }

    let mut course_faculty: HashMap<CourseCode, Vec<FacultyRef>> = HashMap::new();
    for course in &courses {
        let refs: Vec<FacultyRef> = store
            .course_faculty
            .iter()
            .filter(|m| m.course_code == course.course_code)
            .map(|m| {
                let name = store
                    .faculty_by_id(&m.faculty_id)
                    .map_or_else(|| m.faculty_id.clone(), |f| f.faculty_name.clone());
                let id = (!is_placeholder_id(&m.faculty_id)).then(|| m.faculty_id.clone());
                FacultyRef { id, name }
            })
            .collect();
        if !refs.is_empty() {
            course_faculty.insert(course.course_code.clone(), refs);
        }
    }

    // Language electives show up in curriculum tables before a language is
    // assigned; without faculty they cannot be scheduled yet.
    courses.retain(|c| {
        let keep = !c.is_language_elective() || course_faculty.contains_key(&c.course_code);
        if !keep {
            warn!(
                "skipping {} - language elective with no faculty mapping",
                c.course_code
            );
        }
        keep
    });
    if courses.is_empty() {
        return Err(no_courses());
    }

    let mut slots: HashMap<(Weekday, Period), Slot> = HashMap::new();
    let mut day_periods: BTreeMap<Weekday, Vec<Period>> = BTreeMap::new();
    for slot in active_slots {
        let key = (slot.day_of_week, slot.period_number);
        if slots.contains_key(&key) {
            continue;
        }
        slots.insert(key, slot.clone());
        day_periods.entry(slot.day_of_week).or_default().push(slot.period_number);
    }
    for periods in day_periods.values_mut() {
        periods.sort_unstable();
        periods.dedup();
    }
    let days: Vec<Weekday> = Weekday::ALL
        .into_iter()
        .filter(|d| day_periods.contains_key(d))
        .collect();

    let mut pinned_venues = HashMap::new();
    for cv in store
        .course_venues
        .iter()
        .filter(|cv| cv.department_code == department)
    {
        if let Some(venue) = store.venue_by_id(cv.venue_id) {
            pinned_venues.insert(cv.course_code.clone(), venue.venue_name.clone());
        }
    }

    let mut default_classrooms = Vec::new();
    let mut default_labs = Vec::new();
    for dvm in store
        .department_venues
        .iter()
        .filter(|d| d.department_code == department && d.semester == semester)
    {
        if let Some(venue) = store.venue_by_id(dvm.venue_id) {
            if venue.is_lab {
                default_labs.push(venue.venue_name.clone());
            } else {
                default_classrooms.push(venue.venue_name.clone());
            }
        }
    }

    let (regular, honours): (Vec<Course>, Vec<Course>) = courses
        .into_iter()
        .partition(|c| !c.is_honours_or_minor());

    let p17_slots = days
        .iter()
        .flat_map(|d| day_periods[d].iter().map(move |p| (*d, *p)))
        .filter(|(d, p)| *p <= 7 && !(*d == mentor_day && *p == mentor_period))
        .count() as u32;
    let p8_slots = days
        .iter()
        .filter(|d| {
            slots.contains_key(&(**d, 8)) && !(**d == mentor_day && mentor_period == 8)
        })
        .count() as u32;

    let reg_sessions: u32 = regular
        .iter()
        .map(|c| c.theory_count() + c.lab_blocks() * 2)
        .sum();
    let hon_sessions: u32 = honours.iter().map(Course::honours_sessions).sum();

    let is_overloaded = reg_sessions > p17_slots;
    let use_p8_for_regular = is_overloaded && honours.is_empty();

    info!(
        "{department}/S{semester}: {} regular ({reg_sessions} sessions) + {} honours ({hon_sessions} sessions), P1-P7 slots: {p17_slots}, P8 slots: {p8_slots}",
        regular.len(),
        honours.len(),
    );
    if is_overloaded {
        warn!("overloaded schedule: {reg_sessions} sessions > {p17_slots} P1-P7 slots");
        if use_p8_for_regular {
            info!("P8 opened to regular theory (no honours courses)");
        }
    }

    Ok(ProblemInstance {
        department: department.to_string(),
        semester,
        mentor_day,
        mentor_period,
        regular,
        honours,
        course_faculty,
        days,
        day_periods,
        slots,
        pinned_venues,
        default_classrooms,
        default_labs,
        global_occupancy: store.global_venue_occupancy(semester, department),
        open_elective: store.open_elective_for(semester).cloned(),
        reg_sessions,
        hon_sessions,
        p17_slots,
        p8_slots,
        is_overloaded,
        use_p8_for_regular,
    })
}
