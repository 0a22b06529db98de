use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type CourseCode = String;
pub type FacultyId = String;
pub type VenueId = u32;
pub type SlotId = u32;
pub type Period = u8;

/// Weekdays in timetable order. Saturday exists in the grid but most
/// departments only activate slots Monday through Friday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    /// Case-insensitive parse of a weekday name, tolerating stray whitespace.
    pub fn parse(raw: &str) -> Option<Weekday> {
        let cleaned = raw.trim();
        Weekday::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(cleaned))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What kind of session a timetable entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    Theory,
    Lab,
    Mentor,
    OpenElective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotType {
    #[default]
    Regular,
    Lunch,
    Break,
}

/// A course row as maintained by the curriculum importers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_code: CourseCode,
    pub course_name: String,
    pub department_code: String,
    pub semester: u8,
    #[serde(default)]
    pub course_category: Option<String>,
    #[serde(default)]
    pub delivery_type: Option<String>,
    #[serde(default)]
    pub lecture_hours: u32,
    #[serde(default)]
    pub tutorial_hours: u32,
    #[serde(default)]
    pub practical_hours: u32,
    #[serde(default)]
    pub weekly_sessions: u32,
    #[serde(default)]
    pub credits: u32,
    #[serde(default)]
    pub is_lab: bool,
    #[serde(default)]
    pub is_elective: bool,
    #[serde(default)]
    pub is_open_elective: bool,
    #[serde(default)]
    pub is_honours: bool,
    #[serde(default)]
    pub is_minor: bool,
    #[serde(default)]
    pub is_add_course: bool,
    #[serde(default)]
    pub enrolled_students: Option<u32>,
}

impl Course {
    /// Weekly single-period theory sessions. An odd practical hour spills
    /// into one extra theory period since labs only come in 2-period blocks.
    pub fn theory_count(&self) -> u32 {
        self.lecture_hours + self.tutorial_hours + (self.practical_hours % 2)
    }

    /// Weekly 2-period lab blocks.
    pub fn lab_blocks(&self) -> u32 {
        self.practical_hours / 2
    }

    pub fn is_honours_or_minor(&self) -> bool {
        self.is_honours || self.is_minor
    }

    /// Honours/minor rows sometimes carry only `weekly_sessions` and no
    /// L/T/P split, so the explicit count wins when present.
    pub fn honours_sessions(&self) -> u32 {
        if self.weekly_sessions > 0 {
            self.weekly_sessions
        } else {
            self.theory_count() + self.lab_blocks() * 2
        }
    }

    pub fn is_mini_project(&self) -> bool {
        self.course_name.to_lowercase().contains("mini project")
    }

    pub fn is_language_elective(&self) -> bool {
        self.course_category
            .as_deref()
            .is_some_and(|c| c.to_uppercase().contains("LANGUAGE"))
    }

    /// Ordinal used to pick the highest elective for open-elective merging:
    /// first number in the category, else in the name, else in the code.
    pub fn elective_number(&self) -> u32 {
        self.course_category
            .as_deref()
            .and_then(first_number)
            .or_else(|| first_number(&self.course_name))
            .or_else(|| first_number(&self.course_code))
            .unwrap_or(0)
    }
}

fn first_number(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// A faculty member. Status is managed by the HR importers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub faculty_id: FacultyId,
    pub faculty_name: String,
    #[serde(default)]
    pub faculty_email: Option<String>,
    pub department_code: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "ACTIVE".to_string()
}

/// Course-to-faculty assignment. `department_code` is the consuming
/// department, which may differ from the faculty's home department.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFacultyMap {
    pub course_code: CourseCode,
    pub faculty_id: FacultyId,
    pub department_code: String,
    #[serde(default)]
    pub delivery_type: Option<String>,
}

/// A physical room, either a classroom or a lab.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub venue_id: VenueId,
    pub venue_name: String,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub is_lab: bool,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

fn default_capacity() -> u32 {
    60
}

/// Pools a venue for every course of a (department, semester).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentVenueMap {
    pub department_code: String,
    pub semester: u8,
    pub venue_id: VenueId,
}

/// Pins a venue to one course of a department, bypassing the pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseVenueMap {
    pub department_code: String,
    pub course_code: CourseCode,
    pub venue_id: VenueId,
}

/// One cell of the weekly grid.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub slot_id: SlotId,
    pub day_of_week: Weekday,
    pub period_number: Period,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub slot_type: SlotType,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Slot {
    /// Two periods form a lab-capable pair only when no break or lunch sits
    /// between them, i.e. this slot ends exactly when `next` starts.
    pub fn is_contiguous_with(&self, next: &Slot) -> bool {
        self.end_time == next.start_time
    }
}

/// One scheduled session. Day and period are denormalized from the slot for
/// fast per-cell queries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub department_code: String,
    pub semester: u8,
    pub course_code: CourseCode,
    pub course_name: String,
    #[serde(default)]
    pub faculty_id: Option<FacultyId>,
    #[serde(default)]
    pub faculty_name: Option<String>,
    pub session_type: SessionType,
    #[serde(default)]
    pub slot_id: Option<SlotId>,
    pub day_of_week: Weekday,
    pub period_number: Period,
    #[serde(default)]
    pub venue_name: Option<String>,
}
