use super::state::SyncStage;

#[derive(Debug, Clone)]
pub enum Progress {
    StageStart { stage: SyncStage },
    StageFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Reports a per-structure task of `total` steps, one tick per item.
    pub fn task<T, I, F>(&self, items: I, mut step: F) -> Vec<T>
    where
        I: ExactSizeIterator,
        F: FnMut(I::Item) -> T,
    {
        self.report(Progress::TaskStart {
            total_steps: items.len() as u64,
        });
        let results = items
            .map(|item| {
                let result = step(item);
                self.report(Progress::TaskIncrement);
                result
            })
            .collect();
        self.report(Progress::TaskFinish);
        results
    }
}
