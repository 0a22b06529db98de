use crate::assemble::ProblemInstance;
use crate::data::{Period, Weekday};
use log::warn;
use std::collections::{HashMap, HashSet};

/// Rotating venue allocator consulted as assignments are materialized.
///
/// Pinned venues win unconditionally; pooled venues rotate through whatever
/// is free at the cell once other departments' bookings (the global
/// snapshot) and this run's own picks are subtracted.
pub struct VenueAllocator<'a> {
    inst: &'a ProblemInstance,
    run_occupancy: HashMap<(Weekday, Period), HashSet<String>>,
    counter: usize,
}

impl<'a> VenueAllocator<'a> {
    pub fn new(inst: &'a ProblemInstance) -> Self {
        VenueAllocator {
            inst,
            run_occupancy: HashMap::new(),
            counter: 0,
        }
    }

    /// Pick a venue for one (course, cell) placement. Returns `None` only
    /// when the department has no pool of the required kind at all.
    pub fn assign(
        &mut self,
        day: Weekday,
        period: Period,
        course_code: &str,
        needs_lab: bool,
    ) -> Option<String> {
        if let Some(pinned) = self.inst.pinned_venues.get(course_code) {
            return Some(pinned.clone());
        }

        let pool = if needs_lab {
            &self.inst.default_labs
        } else {
            &self.inst.default_classrooms
        };
        if pool.is_empty() {
            return None;
        }

        let key = (day, period);
        let globally_occupied = self.inst.global_occupancy.get(&key);
        let locally_occupied = self.run_occupancy.get(&key);
        let is_free = |name: &String| {
            !globally_occupied.is_some_and(|s| s.contains(name))
                && !locally_occupied.is_some_and(|s| s.contains(name))
        };

        let available: Vec<usize> = pool
            .iter()
            .enumerate()
            .filter(|&(_, name)| is_free(name))
            .map(|(i, _)| i)
            .collect();
        let chosen = if available.is_empty() {
            // Every room of this kind is taken at this cell. Reuse one and
            // keep going; the operator needs to expand the venue pool.
            warn!(
                "venue pool exhausted at {day}/P{period} for {course_code}, reusing a booked venue"
            );
            pool[self.counter % pool.len()].clone()
        } else {
            pool[available[self.counter % available.len()]].clone()
        };
        self.counter += 1;

        self.run_occupancy
            .entry(key)
            .or_default()
            .insert(chosen.clone());
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::testutil::{TestStore, course};

    fn instance_with_rooms(classrooms: &[&str], labs: &[&str]) -> ProblemInstance {
        let mut ts = TestStore::new().with_course(course("A").lectures(3));
        for room in classrooms {
            ts = ts.with_classroom(room);
        }
        for room in labs {
            ts = ts.with_lab(room);
        }
        let store = ts.build();
        assemble(&store, "CS", 3, Weekday::Saturday, 8).unwrap()
    }

    #[test]
    fn same_cell_never_reuses_a_free_venue() {
        let inst = instance_with_rooms(&["R1", "R2", "R3"], &[]);
        let mut alloc = VenueAllocator::new(&inst);
        let a = alloc.assign(Weekday::Monday, 1, "A", false).unwrap();
        let b = alloc.assign(Weekday::Monday, 1, "B", false).unwrap();
        let c = alloc.assign(Weekday::Monday, 1, "C", false).unwrap();
        let picked: HashSet<String> = [a, b, c].into_iter().collect();
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn exhausted_pool_overcommits_instead_of_failing() {
        let inst = instance_with_rooms(&["R1"], &[]);
        let mut alloc = VenueAllocator::new(&inst);
        assert_eq!(alloc.assign(Weekday::Monday, 1, "A", false).as_deref(), Some("R1"));
        // degraded: same venue again rather than no venue
        assert_eq!(alloc.assign(Weekday::Monday, 1, "B", false).as_deref(), Some("R1"));
    }

    #[test]
    fn pinned_venue_bypasses_pool_and_occupancy() {
        let mut ts = TestStore::new()
            .with_course(course("A").lectures(3))
            .with_classroom("R1");
        ts = ts.with_pinned_venue("A", "SEMINAR-HALL");
        let store = ts.build();
        let inst = assemble(&store, "CS", 3, Weekday::Saturday, 8).unwrap();
        let mut alloc = VenueAllocator::new(&inst);
        assert_eq!(
            alloc.assign(Weekday::Monday, 1, "A", false).as_deref(),
            Some("SEMINAR-HALL")
        );
    }

    #[test]
    fn globally_booked_venue_is_skipped() {
        let store = TestStore::new()
            .with_course(course("A").lectures(2).practicals(2))
            .with_lab("LAB-1")
            .with_lab("LAB-2")
            .with_foreign_booking(Weekday::Monday, 1, "LAB-1")
            .build();
        let inst = assemble(&store, "CS", 3, Weekday::Saturday, 8).unwrap();
        let mut alloc = VenueAllocator::new(&inst);
        assert_eq!(
            alloc.assign(Weekday::Monday, 1, "A", true).as_deref(),
            Some("LAB-2")
        );
    }

    #[test]
    fn missing_pool_yields_no_venue() {
        let inst = instance_with_rooms(&[], &["LAB-1"]);
        let mut alloc = VenueAllocator::new(&inst);
        assert_eq!(alloc.assign(Weekday::Monday, 1, "A", false), None);
    }
}
