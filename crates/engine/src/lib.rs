#![forbid(unsafe_code)]

pub mod check;
pub mod collector;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod event;
pub mod probe;
pub mod reduce;
pub mod scheduler;
pub mod threshold;

pub use check::{CHECK_ID, CycleReport, NofileCheck};
pub use collector::collect;
pub use discovery::{ProcessHandle, ProcessTable, ProcfsTable, discover};
pub use domain::{LimitSnapshot, MatchSpec, Measurement, ProbeOutcome, SelectionCriterion};
pub use error::Error;
pub use event::{ChannelSink, Event, EventFormatter, EventSink, Severity, TracingSink};
pub use probe::{LimitProbe, LimitSource, LimitsParseError, ProbeError, ProcfsLimitProbe};
pub use reduce::{ReducedResult, Verdict, reduce};
pub use scheduler::Scheduler;
pub use threshold::evaluate_ge_threshold;
