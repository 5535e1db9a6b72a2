#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    RunningSolver,
    DifferencingBudget,
    SummarizingBoundaries,
    ParsingFluxes,
    DumpingFluxes,
    AggregatingReaches,
    RollingUp,
    WritingManifest,
    Completed,
}

impl PipelineStage {
    pub fn label(self) -> &'static str {
        match self {
            PipelineStage::RunningSolver => "Running solver",
            PipelineStage::DifferencingBudget => "Differencing budget",
            PipelineStage::SummarizingBoundaries => "Summarizing boundaries",
            PipelineStage::ParsingFluxes => "Parsing fluxes",
            PipelineStage::DumpingFluxes => "Dumping fluxes",
            PipelineStage::AggregatingReaches => "Aggregating reaches",
            PipelineStage::RollingUp => "Rolling up stations",
            PipelineStage::WritingManifest => "Writing manifest",
            PipelineStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineProgressEvent {
    pub stage: PipelineStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}

impl PipelineProgressEvent {
    pub fn stage(stage: PipelineStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
        }
    }
}
