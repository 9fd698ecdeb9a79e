/// Which part of the transform a worker is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Loading,
    Grouping,
    Binning,
    Curves,
    Writing,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Grouping => "grouping",
            Stage::Binning => "binning",
            Stage::Curves => "curves",
            Stage::Writing => "writing",
            Stage::Done => "done",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub table_index: usize,
    pub worker_id: usize,
    pub stage: Stage,
}

impl WorkerStatus {
    pub fn new(progress: f32, table_index: usize, worker_id: usize, stage: Stage) -> Self {
        Self {
            progress,
            table_index,
            worker_id,
            stage,
        }
    }
}
