use crate::assemble::ProblemInstance;
use crate::data::{Course, CourseCode, Period, SessionType, TimetableEntry, Weekday};
use crate::venues::VenueAllocator;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet, VecDeque};

/// Greedy placement that runs after the solver's assignment has been
/// materialized: honours into period 8, the mentor hour, then gap filling
/// until no cell in scope is left empty.
pub fn run<'a>(
    inst: &'a ProblemInstance,
    alloc: &mut VenueAllocator<'a>,
    entries: &mut Vec<TimetableEntry>,
    filled: &mut HashSet<(Weekday, Period)>,
) {
    let mut placer = Placer {
        inst,
        alloc,
        entries,
        filled,
        weekly_extra: HashMap::new(),
        daily_extra: HashMap::new(),
    };
    placer.place_honours();
    placer.place_mentor();

    let (mut blocks, mut singles) = placer.classify_gaps();
    debug!(
        "gap classification: {} free 2-blocks, {} single frees",
        blocks.len(),
        singles.len()
    );
    placer.place_mini_projects(&mut blocks);

    // Remaining regular courses, highest credits first, core before electives.
    let mut core: Vec<&Course> = inst
        .regular
        .iter()
        .filter(|c| !c.is_elective && !c.is_mini_project())
        .collect();
    let mut electives: Vec<&Course> = inst
        .regular
        .iter()
        .filter(|c| c.is_elective && !c.is_mini_project())
        .collect();
    core.sort_by(|a, b| b.credits.cmp(&a.credits));
    electives.sort_by(|a, b| b.credits.cmp(&a.credits));

    placer.fill_remaining(&core, &mut blocks, &mut singles);
    if !blocks.is_empty() || !singles.is_empty() {
        placer.fill_remaining(&electives, &mut blocks, &mut singles);
    }

    placer.inject_open_elective(&mut blocks, &mut singles);
    placer.absolute_fallback(&core, &electives, &mut blocks, &mut singles);
    placer.merge_open_elective_label();
    placer.check_no_gaps();
}

struct Placer<'a, 'b> {
    inst: &'a ProblemInstance,
    alloc: &'b mut VenueAllocator<'a>,
    entries: &'b mut Vec<TimetableEntry>,
    filled: &'b mut HashSet<(Weekday, Period)>,
    weekly_extra: HashMap<CourseCode, u32>,
    daily_extra: HashMap<(CourseCode, Weekday), u32>,
}

impl Placer<'_, '_> {
    fn push(
        &mut self,
        course_code: &str,
        course_name: &str,
        session_type: SessionType,
        day: Weekday,
        period: Period,
        venue: Option<String>,
    ) {
        let faculty = self.inst.lead_faculty(course_code);
        self.entries.push(self.inst.make_entry(
            course_code,
            course_name,
            faculty,
            session_type,
            day,
            period,
            venue,
        ));
        self.filled.insert((day, period));
    }

    fn bump_extra(&mut self, course_code: &str, day: Weekday) {
        *self.weekly_extra.entry(course_code.to_string()).or_default() += 1;
        *self
            .daily_extra
            .entry((course_code.to_string(), day))
            .or_default() += 1;
    }

    fn weekly(&self, course_code: &str) -> u32 {
        self.weekly_extra.get(course_code).copied().unwrap_or(0)
    }

    fn daily(&self, course_code: &str, day: Weekday) -> u32 {
        self.daily_extra
            .get(&(course_code.to_string(), day))
            .copied()
            .unwrap_or(0)
    }

    fn day_has_lab(&self, day: Weekday) -> bool {
        self.entries
            .iter()
            .any(|e| e.day_of_week == day && e.session_type == SessionType::Lab)
    }

    /// Honours/minor sessions round-robin over the free period-8 cells,
    /// interleaving courses rather than clustering each one.
    fn place_honours(&mut self) {
        if self.inst.honours.is_empty() {
            return;
        }
        let p8_cells: Vec<Weekday> = self
            .inst
            .days
            .iter()
            .copied()
            .filter(|&d| {
                self.inst.slots.contains_key(&(d, 8))
                    && !self.filled.contains(&(d, 8))
                    && !self.inst.is_mentor_cell(d, 8)
            })
            .collect();

        let mut queues: VecDeque<(usize, u32)> = self
            .inst
            .honours
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let sessions = c.honours_sessions();
                (sessions > 0).then_some((i, sessions))
            })
            .collect();

        for day in p8_cells {
            let Some((i, remaining)) = queues.pop_front() else {
                break;
            };
            let course = &self.inst.honours[i];
            let venue = self.alloc.assign(day, 8, &course.course_code, false);
            self.push(
                &course.course_code,
                &course.course_name,
                SessionType::Theory,
                day,
                8,
                venue,
            );
            if remaining > 1 {
                queues.push_back((i, remaining - 1));
            }
        }
        if let Some(left) = queues.iter().map(|&(_, n)| n).reduce(|a, b| a + b) {
            warn!("{left} honours sessions left unplaced, no free P8 cells remain");
        }
    }

    /// The single mentor entry. Emitted even when the mentor cell has no
    /// configured slot row; the entry then carries no slot reference.
    fn place_mentor(&mut self) {
        self.push(
            "MENTOR",
            "Mentor Interaction",
            SessionType::Mentor,
            self.inst.mentor_day,
            self.inst.mentor_period,
            None,
        );
    }

    /// Partition the empty cells into physically contiguous 2-blocks and
    /// single frees. Period 8 stays out of scope unless the overload path
    /// opened it to regular courses.
    fn classify_gaps(&self) -> (VecDeque<(Weekday, Period)>, VecDeque<(Weekday, Period)>) {
        let mut blocks = VecDeque::new();
        let mut singles = VecDeque::new();
        for &day in &self.inst.days {
            let empties: Vec<Period> = self
                .inst
                .periods(day)
                .iter()
                .copied()
                .filter(|&p| {
                    (p != 8 || self.inst.use_p8_for_regular) && !self.filled.contains(&(day, p))
                })
                .collect();
            let mut i = 0;
            while i < empties.len() {
                if i + 1 < empties.len()
                    && empties[i + 1] == empties[i] + 1
                    && self.inst.contiguous(day, empties[i])
                {
                    blocks.push_back((day, empties[i]));
                    i += 2;
                } else {
                    singles.push_back((day, empties[i]));
                    i += 1;
                }
            }
        }
        (blocks, singles)
    }

    fn place_lab_pair(&mut self, course: &Course, day: Weekday, p1: Period) {
        for p in [p1, p1 + 1] {
            let venue = self.alloc.assign(day, p, &course.course_code, true);
            self.push(
                &course.course_code,
                &course.course_name,
                SessionType::Lab,
                day,
                p,
                venue,
            );
            self.bump_extra(&course.course_code, day);
        }
    }

    /// Mini-project courses absorb up to two free 2-blocks each.
    fn place_mini_projects(&mut self, blocks: &mut VecDeque<(Weekday, Period)>) {
        let minis: Vec<&Course> = self.inst.courses().filter(|c| c.is_mini_project()).collect();
        for mp in minis {
            while self.weekly(&mp.course_code) < 4 {
                let Some((day, p1)) = blocks.pop_front() else {
                    return;
                };
                self.place_lab_pair(mp, day, p1);
            }
        }
    }

    /// Round-robin the target set over the leftover gaps. Lab pairs only
    /// for courses with practical hours on lab-free days; everything else
    /// becomes single theory reinforcements under the extra caps.
    fn fill_remaining(
        &mut self,
        targets: &[&'_ Course],
        blocks: &mut VecDeque<(Weekday, Period)>,
        singles: &mut VecDeque<(Weekday, Period)>,
    ) {
        if targets.is_empty() {
            return;
        }
        let mut idx = 0usize;
        let mut failures = 0usize;
        while let Some(&(day, p1)) = blocks.front() {
            if failures >= targets.len() {
                break;
            }
            let course = targets[idx % targets.len()];
            idx += 1;
            let placeable = course.practical_hours > 0
                && self.weekly(&course.course_code) <= 1
                && self.daily(&course.course_code, day) == 0
                && !self.day_has_lab(day);
            if placeable {
                blocks.pop_front();
                failures = 0;
                self.place_lab_pair(course, day, p1);
            } else {
                failures += 1;
            }
        }

        // Whatever could not be filled as a pair competes as singles.
        while let Some((day, p1)) = blocks.pop_front() {
            singles.push_back((day, p1));
            singles.push_back((day, p1 + 1));
        }

        let mut idx = 0usize;
        let mut failures = 0usize;
        while let Some(&(day, period)) = singles.front() {
            if failures >= targets.len() {
                break;
            }
            let course = targets[idx % targets.len()];
            idx += 1;
            if self.weekly(&course.course_code) < 3 && self.daily(&course.course_code, day) < 2 {
                singles.pop_front();
                failures = 0;
                let venue = self.alloc.assign(day, period, &course.course_code, false);
                self.push(
                    &course.course_code,
                    &course.course_name,
                    SessionType::Theory,
                    day,
                    period,
                    venue,
                );
                self.bump_extra(&course.course_code, day);
            } else {
                failures += 1;
            }
        }
    }

    /// Semester 5 only: the semester-wide open elective takes up to three
    /// single frees, faculty left unassigned.
    fn inject_open_elective(
        &mut self,
        blocks: &mut VecDeque<(Weekday, Period)>,
        singles: &mut VecDeque<(Weekday, Period)>,
    ) {
        if self.inst.semester != 5 {
            return;
        }
        let Some(oe) = self.inst.open_elective.clone() else {
            return;
        };
        while let Some((day, p1)) = blocks.pop_front() {
            singles.push_back((day, p1));
            singles.push_back((day, p1 + 1));
        }
        let mut needed = 3;
        while needed > 0 {
            let Some((day, period)) = singles.pop_front() else {
                break;
            };
            let venue = self.alloc.assign(day, period, &oe.course_code, false);
            self.entries.push(self.inst.make_entry(
                &oe.course_code,
                &oe.course_name,
                (None, Some("Unassigned".to_string())),
                SessionType::OpenElective,
                day,
                period,
                venue,
            ));
            self.filled.insert((day, period));
            needed -= 1;
        }
    }

    /// Zero free cells allowed. Remaining singles are force-filled with
    /// the highest-credit courses, extra caps ignored.
    fn absolute_fallback(
        &mut self,
        core: &[&Course],
        electives: &[&Course],
        blocks: &mut VecDeque<(Weekday, Period)>,
        singles: &mut VecDeque<(Weekday, Period)>,
    ) {
        if blocks.is_empty() && singles.is_empty() {
            return;
        }
        while let Some((day, p1)) = blocks.pop_front() {
            singles.push_back((day, p1));
            singles.push_back((day, p1 + 1));
        }
        let mut fallback: Vec<&Course> = if !core.is_empty() {
            core.to_vec()
        } else if !electives.is_empty() {
            electives.to_vec()
        } else {
            self.inst.courses().collect()
        };
        if fallback.is_empty() {
            return;
        }
        fallback.sort_by(|a, b| b.credits.cmp(&a.credits));
        info!("absolute fallback filling {} leftover cells", singles.len());
        let mut idx = 0usize;
        while let Some((day, period)) = singles.pop_front() {
            let course = fallback[idx % fallback.len()];
            idx += 1;
            let venue = self.alloc.assign(day, period, &course.course_code, false);
            self.push(
                &course.course_code,
                &course.course_name,
                SessionType::Theory,
                day,
                period,
                venue,
            );
        }
    }

    /// Semester 6 only: the highest-numbered department elective doubles as
    /// the open elective; its emitted entries get the merged label.
    fn merge_open_elective_label(&mut self) {
        if self.inst.semester != 6 || self.inst.open_elective.is_none() {
            return;
        }
        let highest = self
            .inst
            .courses()
            .filter(|c| c.is_elective)
            .min_by_key(|c| std::cmp::Reverse(c.elective_number()));
        let Some(highest) = highest else {
            return;
        };
        for entry in self.entries.iter_mut() {
            if entry.course_code == highest.course_code
                && !entry.course_name.to_uppercase().contains("OPEN ELECTIVE")
            {
                entry.course_name = format!("{} / OPEN ELECTIVE", entry.course_name);
            }
        }
    }

    /// The absolute-fallback guarantee: every cell in scope is now filled.
    fn check_no_gaps(&self) {
        for &day in &self.inst.days {
            for &p in self.inst.periods(day) {
                if p == 8 && !self.inst.use_p8_for_regular {
                    continue;
                }
                if !self.filled.contains(&(day, p)) {
                    warn!("cell {day}/P{p} left empty after gap filling");
                }
            }
        }
    }
}
