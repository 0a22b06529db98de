use thiserror::Error;

/// Why a generation request failed. Input errors fail fast before any model
/// is built; solver errors leave the prior schedule untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("no courses found for department {department} semester {semester}")]
    NoCourses { department: String, semester: u8 },

    #[error("no active slots configured")]
    NoSlots,

    #[error("no feasible timetable: {sessions} weekly sessions against {p17_slots} P1-P7 slots")]
    Infeasible { sessions: u32, p17_slots: u32 },

    #[error("solver gave up within the time budget: {0}")]
    SolverTimeout(String),

    #[error("invalid request: {0}")]
    BadRequest(String),
}
