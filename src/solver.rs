use crate::assemble::{LAB_BLOCK_STARTS, ProblemInstance};
use crate::data::{CourseCode, Period, Weekday};
use crate::error::GenerateError;
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    default_solver,
};
use itertools::Itertools;
use log::{info, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

/// Wall-clock budget for one solve.
const TIME_BUDGET_SECONDS: f64 = 60.0;
/// Parallel search workers inside the solver.
const SOLVER_WORKERS: i32 = 4;
/// Fixed seed so identical inputs reproduce identical schedules.
const RANDOM_SEED: i32 = 42;

// objective weights
const SLOT_FILL_WEIGHT: f64 = 10.0;
const SAME_DAY_BONUS_WEIGHT: f64 = 3.0;
const LAB_SPREAD_PENALTY_WEIGHT: f64 = 5.0;

/// Lab-day spread stays a hard constraint while this many blocks still fit
/// a Mon/Wed/Fri pattern; beyond it the spread becomes a soft penalty.
const HARD_SPREAD_MAX_BLOCKS: u32 = 3;

/// The raw assignment read back from the solver: theory cells and lab block
/// start cells, in course/day/period order.
#[derive(Debug, Clone)]
pub struct CpSolution {
    pub theory: Vec<(CourseCode, Weekday, Period)>,
    pub lab_blocks: Vec<(CourseCode, Weekday, Period)>,
}

/// Solves the primary placement problem with the HiGHS ILP solver.
///
/// Two boolean variable families: T[course, day, period] for theory and
/// L[course, day, start] for 2-period lab blocks. Variables are pre-filtered
/// so the mentor cell, inactive cells and non-contiguous block starts never
/// get a variable at all.
pub fn solve(inst: &ProblemInstance) -> Result<CpSolution, GenerateError> {
    let start_time = Instant::now();
    let max_regular_period = inst.max_regular_period();
    let max_theory_per_day: f64 = if inst.is_overloaded { 2.0 } else { 1.0 };
    let total_lab_blocks: u32 = inst.regular.iter().map(|c| c.lab_blocks()).sum();

    info!(
        "building model: {} courses, {} days, max_regular_period={max_regular_period}, max_theory/course/day={max_theory_per_day}, back-to-back={}",
        inst.regular.len(),
        inst.days.len(),
        if inst.is_overloaded { "allowed" } else { "blocked" },
    );

    let mut problem = ProblemVariables::new();

    // T[c,d,p] — enumeration order is fixed (courses in input order, days in
    // weekday order, periods ascending) so reruns stay reproducible.
    let mut theory_vars: HashMap<(usize, Weekday, Period), Variable> = HashMap::new();
    for (ci, course) in inst.regular.iter().enumerate() {
        if course.theory_count() == 0 {
            continue;
        }
        for &day in &inst.days {
            for &period in inst.periods(day) {
                if period > max_regular_period || inst.is_mentor_cell(day, period) {
                    continue;
                }
                theory_vars.insert((ci, day, period), problem.add(variable().binary()));
            }
        }
    }

    // L[c,d,s] — only where both covered slots exist, are contiguous, and
    // neither is the mentor cell.
    let mut lab_vars: HashMap<(usize, Weekday, Period), Variable> = HashMap::new();
    for (ci, course) in inst.regular.iter().enumerate() {
        if course.lab_blocks() == 0 {
            continue;
        }
        for &day in &inst.days {
            for &bs in &LAB_BLOCK_STARTS {
                if !inst.contiguous(day, bs)
                    || inst.is_mentor_cell(day, bs)
                    || inst.is_mentor_cell(day, bs + 1)
                {
                    continue;
                }
                lab_vars.insert((ci, day, bs), problem.add(variable().binary()));
            }
        }
    }
    trace!(
        "created {} theory and {} lab variables",
        theory_vars.len(),
        lab_vars.len()
    );

    // Lab vars covering a given cell, in course order.
    let labs_covering = |ci: usize, day: Weekday, period: Period| -> Vec<Variable> {
        LAB_BLOCK_STARTS
            .iter()
            .filter(|&&bs| period == bs || period == bs + 1)
            .filter_map(|&bs| lab_vars.get(&(ci, day, bs)).copied())
            .collect()
    };

    let day_lab_vars = |day: Weekday| -> Vec<Variable> {
        let lab_vars_ref = &lab_vars;
        (0..inst.regular.len())
            .flat_map(move |ci| {
                LAB_BLOCK_STARTS
                    .iter()
                    .filter_map(move |&bs| lab_vars_ref.get(&(ci, day, bs)).copied())
            })
            .collect()
    };

    // Soft-constraint indicator variables must exist before the objective is
    // handed to the solver, so they are declared up front and linked to the
    // decision variables by constraints further down.

    // Same-day theory+lab bonus indicators per (course, day).
    let mut same_day_bonus: Vec<(Variable, Expression, Expression)> = Vec::new();
    for (ci, course) in inst.regular.iter().enumerate() {
        if course.lab_blocks() == 0 || course.theory_count() == 0 {
            continue;
        }
        for &day in &inst.days {
            let day_labs: Vec<Variable> = LAB_BLOCK_STARTS
                .iter()
                .filter_map(|&bs| lab_vars.get(&(ci, day, bs)).copied())
                .collect();
            let day_theory: Vec<Variable> = inst
                .periods(day)
                .iter()
                .filter_map(|&p| theory_vars.get(&(ci, day, p)).copied())
                .collect();
            if !day_labs.is_empty() && !day_theory.is_empty() {
                let both = problem.add(variable().binary());
                let lab_sum: Expression = day_labs.into_iter().sum();
                let theory_sum: Expression = day_theory.into_iter().sum();
                same_day_bonus.push((both, lab_sum, theory_sum));
            }
        }
    }

    // Adjacent-day lab penalty indicators, only when the spread constraint
    // falls back to soft (more blocks than a Mon/Wed/Fri pattern can hold).
    let spread_is_hard = total_lab_blocks <= HARD_SPREAD_MAX_BLOCKS;
    let mut spread_penalties: Vec<(Variable, Expression, Expression)> = Vec::new();
    let mut hard_spread_pairs: Vec<(Expression, Expression)> = Vec::new();
    for pair in inst.days.windows(2) {
        let (vars1, vars2) = (day_lab_vars(pair[0]), day_lab_vars(pair[1]));
        if vars1.is_empty() || vars2.is_empty() {
            continue;
        }
        let sum1: Expression = vars1.into_iter().sum();
        let sum2: Expression = vars2.into_iter().sum();
        if spread_is_hard {
            hard_spread_pairs.push((sum1, sum2));
        } else {
            let consec = problem.add(variable().binary());
            spread_penalties.push((consec, sum1, sum2));
        }
    }

    // --- OBJECTIVE ---
    // Heavy weight on filling cells, a nudge for a course's theory landing on
    // its lab day, and a penalty for labs on adjacent days.
    let mut objective = Expression::default();
    for (ci, _) in inst.regular.iter().enumerate() {
        for &day in &inst.days {
            for &period in inst.periods(day) {
                if period > max_regular_period || inst.is_mentor_cell(day, period) {
                    continue;
                }
                if let Some(&t) = theory_vars.get(&(ci, day, period)) {
                    objective += SLOT_FILL_WEIGHT * t;
                }
                for l in labs_covering(ci, day, period) {
                    objective += SLOT_FILL_WEIGHT * l;
                }
            }
        }
    }
    for (both, _, _) in &same_day_bonus {
        objective += SAME_DAY_BONUS_WEIGHT * *both;
    }
    for (consec, _, _) in &spread_penalties {
        objective += (-LAB_SPREAD_PENALTY_WEIGHT) * *consec;
    }

    let mut model = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("time_limit", TIME_BUDGET_SECONDS)
        .set_option("threads", SOLVER_WORKERS)
        .set_option("parallel", "on")
        .set_option("random_seed", RANDOM_SEED);

    // --- weekly session counts ---
    for (ci, course) in inst.regular.iter().enumerate() {
        if course.theory_count() > 0 {
            let theory_vars_ref = &theory_vars;
            let sum: Expression = inst
                .days
                .iter()
                .flat_map(move |&day| {
                    inst.periods(day)
                        .iter()
                        .filter_map(move |&p| theory_vars_ref.get(&(ci, day, p)).copied())
                })
                .sum();
            model.add_constraint(constraint!(sum == course.theory_count() as f64));
        }
        if course.lab_blocks() > 0 {
            let lab_vars_ref = &lab_vars;
            let sum: Expression = inst
                .days
                .iter()
                .flat_map(move |&day| {
                    LAB_BLOCK_STARTS
                        .iter()
                        .filter_map(move |&bs| lab_vars_ref.get(&(ci, day, bs)).copied())
                })
                .sum();
            model.add_constraint(constraint!(sum == course.lab_blocks() as f64));
        }
    }

    // --- at most one occupant per cell (the mentor cell holds trivially:
    // it never received a variable) ---
    for &day in &inst.days {
        for &period in inst.periods(day) {
            if period > max_regular_period {
                continue;
            }
            let occupants: Vec<Variable> = (0..inst.regular.len())
                .flat_map(|ci| {
                    theory_vars
                        .get(&(ci, day, period))
                        .copied()
                        .into_iter()
                        .chain(labs_covering(ci, day, period))
                })
                .collect();
            if occupants.len() > 1 {
                let sum: Expression = occupants.into_iter().sum();
                model.add_constraint(constraint!(sum <= 1));
            }
        }
    }

    // --- a course's theory may not sit inside its own lab block ---
    for (ci, course) in inst.regular.iter().enumerate() {
        if course.lab_blocks() == 0 {
            continue;
        }
        for &day in &inst.days {
            for &bs in &LAB_BLOCK_STARTS {
                let Some(&l) = lab_vars.get(&(ci, day, bs)) else {
                    continue;
                };
                for p in [bs, bs + 1] {
                    if let Some(&t) = theory_vars.get(&(ci, day, p)) {
                        model.add_constraint(constraint!(t + l <= 1));
                    }
                }
            }
        }
    }

    // --- per-course daily theory cap (2 when overloaded, else 1) ---
    for (ci, _) in inst.regular.iter().enumerate() {
        for &day in &inst.days {
            let day_theory: Vec<Variable> = inst
                .periods(day)
                .iter()
                .filter_map(|&p| theory_vars.get(&(ci, day, p)).copied())
                .collect();
            if day_theory.len() > 1 {
                let sum: Expression = day_theory.into_iter().sum();
                model.add_constraint(constraint!(sum <= max_theory_per_day));
            }
        }
    }

    // --- no back-to-back theory of the same course (relaxed when
    // overloaded; only physically contiguous pairs count) ---
    if !inst.is_overloaded {
        for (ci, _) in inst.regular.iter().enumerate() {
            for &day in &inst.days {
                for &p in inst.periods(day) {
                    if p + 1 > 7 || !inst.contiguous(day, p) {
                        continue;
                    }
                    if let (Some(&a), Some(&b)) = (
                        theory_vars.get(&(ci, day, p)),
                        theory_vars.get(&(ci, day, p + 1)),
                    ) {
                        model.add_constraint(constraint!(a + b <= 1));
                    }
                }
            }
        }
    }

    // --- at most one lab block per day across all courses ---
    for &day in &inst.days {
        let blocks = day_lab_vars(day);
        if blocks.len() > 1 {
            let sum: Expression = blocks.into_iter().sum();
            model.add_constraint(constraint!(sum <= 1));
        }
    }

    // --- lab-day spread, hard for few blocks, else soft ---
    for (sum1, sum2) in hard_spread_pairs {
        model.add_constraint(constraint!(sum1 + sum2 <= 1));
    }
    for (consec, sum1, sum2) in &spread_penalties {
        // consec = 1 exactly when both days carry a lab block (each day sum
        // is already capped at 1 by the per-day block limit; the -5 weight
        // pulls consec down)
        model.add_constraint(constraint!(sum1.clone() + sum2.clone() - *consec <= 1));
    }

    // --- a faculty member teaching several courses never sits in two cells ---
    let faculty_courses: BTreeMap<&str, BTreeSet<usize>> = inst
        .regular
        .iter()
        .enumerate()
        .flat_map(|(ci, course)| {
            inst.course_faculty
                .get(&course.course_code)
                .into_iter()
                .flatten()
                .filter_map(move |f| f.id.as_deref().map(|id| (id, ci)))
        })
        .into_group_map()
        .into_iter()
        .map(|(fid, idxs)| (fid, idxs.into_iter().collect()))
        .collect();
    for (fid, course_idxs) in &faculty_courses {
        if course_idxs.len() <= 1 {
            continue;
        }
        trace!("faculty {fid} teaches {} courses, adding clash constraints", course_idxs.len());
        for &day in &inst.days {
            for &period in inst.periods(day) {
                let occupants: Vec<Variable> = course_idxs
                    .iter()
                    .flat_map(|&ci| {
                        theory_vars
                            .get(&(ci, day, period))
                            .copied()
                            .into_iter()
                            .chain(labs_covering(ci, day, period))
                    })
                    .collect();
                if occupants.len() > 1 {
                    let sum: Expression = occupants.into_iter().sum();
                    model.add_constraint(constraint!(sum <= 1));
                }
            }
        }
    }

    // --- soft-constraint links ---
    for (both, lab_sum, theory_sum) in &same_day_bonus {
        model.add_constraint(constraint!(*both <= lab_sum.clone()));
        model.add_constraint(constraint!(*both <= theory_sum.clone()));
    }

    // --- SOLVE ---
    info!("starting solver (budget {TIME_BUDGET_SECONDS}s, {SOLVER_WORKERS} workers)...");
    let solution = match model.solve() {
        Ok(s) => s,
        Err(ResolutionError::Infeasible) => {
            return Err(GenerateError::Infeasible {
                sessions: inst.reg_sessions,
                p17_slots: inst.p17_slots,
            });
        }
        Err(e) => return Err(GenerateError::SolverTimeout(e.to_string())),
    };
    info!("solution found in {:.2?}", start_time.elapsed());

    // Read back in the same fixed order the variables were created in.
    let mut theory = Vec::new();
    let mut lab_blocks = Vec::new();
    for (ci, course) in inst.regular.iter().enumerate() {
        for &day in &inst.days {
            for &period in inst.periods(day) {
                if let Some(&t) = theory_vars.get(&(ci, day, period)) {
                    if solution.value(t) > 0.5 {
                        theory.push((course.course_code.clone(), day, period));
                    }
                }
            }
            for &bs in &LAB_BLOCK_STARTS {
                if let Some(&l) = lab_vars.get(&(ci, day, bs)) {
                    if solution.value(l) > 0.5 {
                        lab_blocks.push((course.course_code.clone(), day, bs));
                    }
                }
            }
        }
    }

    Ok(CpSolution { theory, lab_blocks })
}
