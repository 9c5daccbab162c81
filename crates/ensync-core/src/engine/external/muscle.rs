use super::SequenceAligner;
use super::process::{ToolCommand, ToolError, Workspace, run_first_success};
use crate::core::align::msa::AlignmentMatrix;
use crate::core::io::fasta::{FastaRecord, read_fasta, write_fasta};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

const TOOL_NAME: &str = "muscle";
const INPUT_FILE: &str = "input.fasta";
const OUTPUT_FILE: &str = "output.fasta";

/// MUSCLE-compatible multiple sequence aligner.
///
/// The v5 command line (`-align`/`-output`) is tried first, then the v3 one
/// (`-in`/`-out`).
pub struct MuscleAligner {
    binary: PathBuf,
    keep_temporary: bool,
}

impl MuscleAligner {
    pub fn new(binary: PathBuf, keep_temporary: bool) -> Self {
        Self {
            binary,
            keep_temporary,
        }
    }

    fn candidates(&self) -> Vec<ToolCommand> {
        vec![
            ToolCommand::new(&self.binary).args(["-align", INPUT_FILE, "-output", OUTPUT_FILE]),
            ToolCommand::new(&self.binary).args(["-in", INPUT_FILE, "-out", OUTPUT_FILE]),
        ]
    }
}

fn record_index(id: &str) -> Option<usize> {
    id.strip_prefix("seq")?.parse().ok()
}

fn malformed(message: impl Into<String>) -> ToolError {
    ToolError::MalformedOutput {
        tool: TOOL_NAME.to_string(),
        message: message.into(),
    }
}

/// Restores submission order and checks every row against its input sequence.
fn assemble_alignment(
    records: Vec<FastaRecord>,
    sequences: &[String],
) -> Result<AlignmentMatrix, ToolError> {
    let mut rows: Vec<Option<String>> = vec![None; sequences.len()];
    for record in records {
        let index = record_index(&record.id)
            .filter(|&i| i < sequences.len())
            .ok_or_else(|| malformed(format!("unexpected record '{}'", record.id)))?;
        rows[index] = Some(record.sequence);
    }

    let rows: Vec<String> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| row.ok_or_else(|| malformed(format!("record 'seq{}' is missing", i))))
        .collect::<Result<_, _>>()?;

    let alignment =
        AlignmentMatrix::from_strs(&rows).map_err(|e| malformed(e.to_string()))?;

    for (i, sequence) in sequences.iter().enumerate() {
        if !alignment.ungapped(i).eq_ignore_ascii_case(sequence) {
            return Err(malformed(format!(
                "aligned row 'seq{}' does not match the submitted sequence",
                i
            )));
        }
    }
    Ok(alignment)
}

impl SequenceAligner for MuscleAligner {
    fn align(&self, sequences: &[String]) -> Result<AlignmentMatrix, ToolError> {
        let workspace = Workspace::new("ensync-muscle-", self.keep_temporary)?;
        let records: Vec<FastaRecord> = sequences
            .iter()
            .enumerate()
            .map(|(i, sequence)| FastaRecord::new(format!("seq{}", i), sequence.clone()))
            .collect();

        let mut writer = BufWriter::new(File::create(workspace.path().join(INPUT_FILE))?);
        write_fasta(&records, &mut writer)?;
        writer.flush()?;
        drop(writer);

        run_first_success(TOOL_NAME, &self.candidates(), workspace.path())?;

        let output_path = workspace.path().join(OUTPUT_FILE);
        if !output_path.exists() {
            return Err(ToolError::MissingOutput {
                tool: TOOL_NAME.to_string(),
                path: output_path,
            });
        }
        let aligned = read_fasta(File::open(&output_path)?)
            .map_err(|e| malformed(e.to_string()))?;
        debug!(records = aligned.len(), "Read aligned sequences");

        assemble_alignment(aligned, sequences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reorders_records_by_index() {
        let records = vec![
            FastaRecord::new("seq1", "-ASTP"),
            FastaRecord::new("seq0", "MAST-"),
        ];
        let alignment = assemble_alignment(records, &seqs(&["MAST", "ASTP"])).unwrap();
        assert_eq!(alignment.row(0), &['M', 'A', 'S', 'T', '-']);
        assert_eq!(alignment.row(1), &['-', 'A', 'S', 'T', 'P']);
    }

    #[test]
    fn missing_and_foreign_records_are_malformed() {
        let missing = assemble_alignment(
            vec![FastaRecord::new("seq0", "MAST")],
            &seqs(&["MAST", "MAST"]),
        );
        assert!(matches!(missing, Err(ToolError::MalformedOutput { .. })));

        let foreign = assemble_alignment(
            vec![FastaRecord::new("chainA", "MAST")],
            &seqs(&["MAST"]),
        );
        assert!(matches!(foreign, Err(ToolError::MalformedOutput { .. })));
    }

    #[test]
    fn altered_residues_are_rejected() {
        let result = assemble_alignment(
            vec![FastaRecord::new("seq0", "MAST"), FastaRecord::new("seq1", "MGST")],
            &seqs(&["MAST", "MAST"]),
        );
        assert!(matches!(result, Err(ToolError::MalformedOutput { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn falls_back_to_legacy_command_line() {
        use crate::engine::external::process::test_support::write_script;

        let bin = tempfile::tempdir().unwrap();
        let script = write_script(
            bin.path(),
            "muscle3",
            "if [ \"$1\" = \"-in\" ]; then cp \"$2\" \"$4\"; exit 0; fi\necho \"unknown option $1\" >&2\nexit 1",
        );
        let aligner = MuscleAligner::new(script, false);

        let alignment = aligner.align(&seqs(&["MKTAYIAK", "MKTGYIAK"])).unwrap();
        assert_eq!(alignment.num_rows(), 2);
        assert_eq!(alignment.ungapped(1), "MKTGYIAK");
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let aligner = MuscleAligner::new(PathBuf::from("/nonexistent/muscle"), false);
        let err = aligner.align(&seqs(&["MAST", "MAST"])).unwrap_err();
        assert!(err.is_unavailable());
    }
}
