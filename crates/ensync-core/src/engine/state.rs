use std::fmt;

/// Stages of an ensemble synchronization run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncStage {
    Loading,
    Cleaning,
    ChainMatching,
    SequenceAligning,
    StructureAligning,
    Writing,
    Done,
}

impl SyncStage {
    pub fn name(&self) -> &'static str {
        match self {
            SyncStage::Loading => "Loading structures",
            SyncStage::Cleaning => "Cleaning structures",
            SyncStage::ChainMatching => "Matching chains",
            SyncStage::SequenceAligning => "Aligning sequences",
            SyncStage::StructureAligning => "Aligning structures",
            SyncStage::Writing => "Writing output",
            SyncStage::Done => "Done",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_order_and_display() {
        assert!(SyncStage::Loading < SyncStage::Cleaning);
        assert!(SyncStage::SequenceAligning < SyncStage::StructureAligning);
        assert!(SyncStage::Writing < SyncStage::Done);
        assert_eq!(SyncStage::ChainMatching.to_string(), "Matching chains");
    }
}
