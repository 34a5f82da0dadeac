use crate::{
    anki::DeckReport,
    audio::NormalizeReport,
    core::pipeline::PipelineSummary,
    organizer::OrganizeReport,
};

/// Messages a background stage sends back to its host.
///
/// A stage sends any number of `Log` lines followed by exactly one completion.
#[derive(Debug, Clone)]
pub enum TaskResult {
    Log(String),

    Normalized(Result<NormalizeReport, String>),
    Organized(Result<OrganizeReport, String>),
    DeckGenerated(Result<DeckReport, String>),
    PipelineFinished(Result<PipelineSummary, String>),
}

impl TaskResult {
    pub fn task_type(&self) -> &'static str {
        match self {
            TaskResult::Log(_) => "log",
            TaskResult::Normalized(_) => "normalize",
            TaskResult::Organized(_) => "organize",
            TaskResult::DeckGenerated(_) => "generate_deck",
            TaskResult::PipelineFinished(_) => "run_all",
        }
    }

    pub fn is_completion(&self) -> bool {
        !matches!(self, TaskResult::Log(_))
    }

    /// Whether the finished stage reported success.
    pub fn succeeded(&self) -> bool {
        match self {
            TaskResult::Log(_) => false,
            TaskResult::Normalized(r) => r.as_ref().is_ok_and(|r| r.success()),
            TaskResult::Organized(r) => r.as_ref().is_ok_and(|r| r.success()),
            TaskResult::DeckGenerated(r) => r.as_ref().is_ok_and(|r| r.success()),
            TaskResult::PipelineFinished(r) => r.as_ref().is_ok_and(|r| r.success()),
        }
    }
}
