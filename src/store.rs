use crate::data::{
    Course, CourseFacultyMap, CourseVenueMap, DepartmentVenueMap, Faculty, FacultyId, Period, Slot,
    TimetableEntry, Venue, VenueId, Weekday,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The collaborator-maintained dataset the engine reads from, plus the
/// timetable entries it writes back. Importers and the CRUD surface own the
/// master tables; the engine only ever rewrites `entries` for one
/// (department, semester) at a time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStore {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub faculty: Vec<Faculty>,
    #[serde(default)]
    pub course_faculty: Vec<CourseFacultyMap>,
    #[serde(default)]
    pub venues: Vec<Venue>,
    #[serde(default)]
    pub department_venues: Vec<DepartmentVenueMap>,
    #[serde(default)]
    pub course_venues: Vec<CourseVenueMap>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub entries: Vec<TimetableEntry>,
}

impl ScheduleStore {
    pub fn faculty_by_id(&self, id: &FacultyId) -> Option<&Faculty> {
        self.faculty.iter().find(|f| &f.faculty_id == id)
    }

    pub fn venue_by_id(&self, id: VenueId) -> Option<&Venue> {
        self.venues.iter().find(|v| v.venue_id == id)
    }

    pub fn entries_for(&self, department: &str, semester: u8) -> Vec<&TimetableEntry> {
        self.entries
            .iter()
            .filter(|e| e.department_code == department && e.semester == semester)
            .collect()
    }

    /// The semester-wide open elective, if any department declared one.
    pub fn open_elective_for(&self, semester: u8) -> Option<&Course> {
        self.courses
            .iter()
            .find(|c| c.is_open_elective && c.semester == semester)
    }

    /// Venue bookings held by *other* departments at the same semester,
    /// keyed by cell. Legacy rows may carry comma-joined venue lists, so
    /// names are split before they enter the set.
    pub fn global_venue_occupancy(
        &self,
        semester: u8,
        exclude_department: &str,
    ) -> HashMap<(Weekday, Period), HashSet<String>> {
        let mut occupancy: HashMap<(Weekday, Period), HashSet<String>> = HashMap::new();
        for entry in &self.entries {
            if entry.semester != semester || entry.department_code == exclude_department {
                continue;
            }
            let Some(names) = entry.venue_name.as_deref() else {
                continue;
            };
            let cell = occupancy
                .entry((entry.day_of_week, entry.period_number))
                .or_default();
            for name in names.split(',') {
                let name = name.trim();
                if !name.is_empty() {
                    cell.insert(name.to_string());
                }
            }
        }
        occupancy
    }

    /// Replace-all write: drops every entry for (department, semester) and
    /// inserts the new set in one step, so concurrent readers observe either
    /// the old schedule or the new one.
    pub fn replace_entries(&mut self, department: &str, semester: u8, new: Vec<TimetableEntry>) {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.department_code == department && e.semester == semester));
        let dropped = before - self.entries.len();
        let inserted = new.len();
        self.entries.extend(new);
        info!(
            "replaced schedule for {department}/S{semester}: {dropped} entries dropped, {inserted} inserted"
        );
    }
}
