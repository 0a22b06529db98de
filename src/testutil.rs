//! Fixture builders shared by the unit tests.

use crate::data::{
    Course, CourseFacultyMap, CourseVenueMap, DepartmentVenueMap, Period, SessionType, Slot,
    SlotType, TimetableEntry, Venue, Weekday,
};
use crate::store::ScheduleStore;

/// Standard period times: P1-P2, P3-P4, P5-P6 and P7-P8 are contiguous
/// pairs; a break or lunch separates everything else.
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

pub fn course(code: &str) -> CourseBuilder {
    CourseBuilder(Course {
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

pub struct CourseBuilder(Course);

impl CourseBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.0.course_name = name.into();
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

    pub fn honours(mut self, weekly_sessions: u32) -> Self {
        self.0.is_honours = true;
        self.0.weekly_sessions = weekly_sessions;
        self
    }

    pub fn build(self) -> Course {
        self.0
    }
}

/// Builds a `ScheduleStore` around a Mon-Fri grid for department CS,
/// semester 3 unless overridden per course.
pub struct TestStore {
    days: usize,
    periods: Period,
    store: ScheduleStore,
    next_venue_id: u32,
}

impl TestStore {
    pub fn new() -> Self {
        TestStore {
            days: 5,
            periods: 7,
            store: ScheduleStore::default(),
            next_venue_id: 0,
        }
    }

    pub fn days(mut self, days: usize) -> Self {
        self.days = days;
        self
    }

    pub fn periods(mut self, periods: Period) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_course(mut self, builder: CourseBuilder) -> Self {
        self.store.courses.push(builder.build());
        self
    }

    pub fn with_faculty_map(mut self, course_code: &str, faculty_id: &str) -> Self {
        self.store.course_faculty.push(CourseFacultyMap {
            course_code: course_code.into(),
            faculty_id: faculty_id.into(),
            department_code: "CS".into(),
            delivery_type: None,
        });
        self
    }

    fn add_venue(&mut self, name: &str, is_lab: bool) -> u32 {
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

    pub fn with_classroom(mut self, name: &str) -> Self {
        let id = self.add_venue(name, false);
        self.store.department_venues.push(DepartmentVenueMap {
            department_code: "CS".into(),
            semester: 3,
            venue_id: id,
        });
        self
    }

    pub fn with_lab(mut self, name: &str) -> Self {
        let id = self.add_venue(name, true);
        self.store.department_venues.push(DepartmentVenueMap {
            department_code: "CS".into(),
            semester: 3,
            venue_id: id,
        });
        self
    }

    pub fn with_pinned_venue(mut self, course_code: &str, name: &str) -> Self {
        let id = self.add_venue(name, false);
        self.store.course_venues.push(CourseVenueMap {
            department_code: "CS".into(),
            course_code: course_code.into(),
            venue_id: id,
        });
        self
    }

    /// An entry another department already holds at this semester.
    pub fn with_foreign_booking(mut self, day: Weekday, period: Period, venue: &str) -> Self {
        self.store.entries.push(TimetableEntry {
            department_code: "EC".into(),
            semester: 3,
            course_code: "EC300".into(),
            course_name: "Foreign".into(),
            faculty_id: None,
            faculty_name: None,
            session_type: SessionType::Lab,
            slot_id: None,
            day_of_week: day,
            period_number: period,
            venue_name: Some(venue.into()),
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
