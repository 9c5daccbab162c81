use super::process::{ToolCommand, ToolError, Workspace, run};
use super::{StructureAligner, Superposition};
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::{StructureFile, WriteOptions};
use crate::core::models::atom::AtomClass;
use crate::core::models::structure::StructureRecord;
use crate::core::utils::geometry::{calculate_rmsd, superposition_transform};
use nalgebra::Point3;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

const TOOL_NAME: &str = "lovoalign";
const MOBILE_FILE: &str = "mobile.pdb";
const REFERENCE_FILE: &str = "reference.pdb";
const ALIGNED_FILE: &str = "aligned.pdb";

/// LovoAlign-compatible rigid-body structural aligner.
pub struct LovoalignAligner {
    binary: PathBuf,
    keep_temporary: bool,
}

impl LovoalignAligner {
    pub fn new(binary: PathBuf, keep_temporary: bool) -> Self {
        Self {
            binary,
            keep_temporary,
        }
    }
}

/// Extracts the RMSD from an aligner report.
///
/// The last line mentioning `FINAL SCORE` is preferred; otherwise the last
/// line carrying an `RMSD:` label is used. The value is the token following
/// the label.
pub fn parse_rmsd(report: &str) -> Option<f64> {
    let value_after_label = |line: &str| -> Option<f64> {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if let Some(rest) = token.strip_prefix("RMSD:") {
                let value = if rest.is_empty() { tokens.next()? } else { rest };
                return value.parse().ok();
            }
        }
        None
    };

    report
        .lines()
        .rev()
        .filter(|line| line.contains("FINAL SCORE"))
        .find_map(value_after_label)
        .or_else(|| report.lines().rev().find_map(value_after_label))
}

type AtomKey = (char, isize, Option<char>, String, AtomClass);

/// Moves `original` into the frame of `aligned`, the aligner's copy of it.
///
/// When every atom of `original` has a counterpart, coordinates are copied
/// directly. Otherwise the rigid transform fitted on the matched atoms is
/// applied to all rows, so atoms the aligner dropped still move with the rest.
fn transfer_coordinates(
    original: &StructureRecord,
    aligned: &StructureRecord,
) -> Result<StructureRecord, ToolError> {
    let aligned_positions: HashMap<AtomKey, Point3<f64>> = aligned
        .atoms()
        .iter()
        .map(|atom| {
            (
                (
                    atom.chain,
                    atom.residue_number,
                    atom.insertion_code,
                    atom.name.clone(),
                    atom.class,
                ),
                atom.position,
            )
        })
        .collect();

    let matched: Vec<Option<Point3<f64>>> = original
        .atoms()
        .iter()
        .map(|atom| {
            aligned_positions
                .get(&(
                    atom.chain,
                    atom.residue_number,
                    atom.insertion_code,
                    atom.name.clone(),
                    atom.class,
                ))
                .copied()
        })
        .collect();

    if matched.iter().all(Option::is_some) {
        let atoms = original
            .atoms()
            .iter()
            .zip(matched)
            .map(|(atom, position)| {
                let mut atom = atom.clone();
                atom.position = position.unwrap_or(atom.position);
                atom
            })
            .collect();
        return Ok(original.with_atoms(atoms));
    }

    let (from, to): (Vec<Point3<f64>>, Vec<Point3<f64>>) = original
        .atoms()
        .iter()
        .zip(&matched)
        .filter_map(|(atom, position)| position.map(|p| (atom.position, p)))
        .unzip();
    debug!(matched = from.len(), total = original.len(), "Fitting transform on matched atoms");

    let transform = superposition_transform(&from, &to).ok_or_else(|| ToolError::MalformedOutput {
        tool: TOOL_NAME.to_string(),
        message: format!(
            "only {} atoms of '{}' could be matched in the aligned structure",
            from.len(),
            original.id()
        ),
    })?;
    let fitted: Vec<Point3<f64>> = from.iter().map(|p| transform * p).collect();
    debug!(fit_rmsd = ?calculate_rmsd(&fitted, &to), "Applied fitted transform");

    let atoms = original
        .atoms()
        .iter()
        .map(|atom| {
            let mut atom = atom.clone();
            atom.position = transform * atom.position;
            atom
        })
        .collect();
    Ok(original.with_atoms(atoms))
}

impl StructureAligner for LovoalignAligner {
    fn superpose(
        &self,
        mobile: &StructureRecord,
        reference: &StructureRecord,
        chain: char,
    ) -> Result<Superposition, ToolError> {
        let workspace = Workspace::new("ensync-lovoalign-", self.keep_temporary)?;
        let options = WriteOptions {
            overwrite: true,
            ..WriteOptions::default()
        };
        let write = |structure: &StructureRecord, name: &str| {
            PdbFile::write_to_path(structure, &options, workspace.path().join(name)).map_err(
                |e| ToolError::MalformedOutput {
                    tool: TOOL_NAME.to_string(),
                    message: format!("could not stage '{}': {}", structure.id(), e),
                },
            )
        };
        write(mobile, MOBILE_FILE)?;
        write(reference, REFERENCE_FILE)?;

        let chain = chain.to_string();
        let command = ToolCommand::new(&self.binary).args([
            "-p1",
            MOBILE_FILE,
            "-c1",
            chain.as_str(),
            "-p2",
            REFERENCE_FILE,
            "-c2",
            chain.as_str(),
            "-o",
            ALIGNED_FILE,
        ]);
        let output = run(&command, workspace.path())?;

        let rmsd = parse_rmsd(&output.stdout).ok_or_else(|| ToolError::MalformedOutput {
            tool: TOOL_NAME.to_string(),
            message: format!("no RMSD in report: {}", output.summary()),
        })?;

        let aligned_path = workspace.path().join(ALIGNED_FILE);
        if !aligned_path.exists() {
            return Err(ToolError::MissingOutput {
                tool: TOOL_NAME.to_string(),
                path: aligned_path,
            });
        }
        let aligned =
            PdbFile::read_from_path(&aligned_path).map_err(|e| ToolError::MalformedOutput {
                tool: TOOL_NAME.to_string(),
                message: e.to_string(),
            })?;

        Ok(Superposition {
            structure: transfer_coordinates(mobile, &aligned)?,
            rmsd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomRecord;
    use nalgebra::{Rotation3, Vector3};

    fn structure(points: &[(f64, f64, f64)]) -> StructureRecord {
        let atoms = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| {
                AtomRecord::new(
                    AtomClass::Atom,
                    "CA",
                    "ALA",
                    'A',
                    i as isize + 1,
                    Point3::new(x, y, z),
                )
            })
            .collect();
        StructureRecord::new("mobile.pdb", atoms)
    }

    #[test]
    fn parses_rmsd_from_final_score_line() {
        let report = "\
 Initial RMSD: 5.000
 Iteration 1 RMSD: 2.000
 FINAL SCORE:   95.12  COVERAGE:  120  RMSD:    0.734
";
        assert_eq!(parse_rmsd(report), Some(0.734));
    }

    #[test]
    fn falls_back_to_last_rmsd_label() {
        assert_eq!(parse_rmsd("a RMSD: 3.5\nb RMSD:1.25\n"), Some(1.25));
        assert_eq!(parse_rmsd("no score here"), None);
        assert_eq!(parse_rmsd("RMSD: n/a"), None);
    }

    #[test]
    fn copies_coordinates_when_all_atoms_match() {
        let original = structure(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]);
        let aligned = structure(&[(5.0, 5.0, 5.0), (6.0, 5.0, 5.0)]);
        let moved = transfer_coordinates(&original, &aligned).unwrap();
        assert_eq!(moved.atoms()[1].position, Point3::new(6.0, 5.0, 5.0));
        assert_eq!(moved.id(), original.id());
    }

    #[test]
    fn fits_transform_when_some_atoms_are_missing() {
        let points = [
            (0.0, 0.0, 0.0),
            (1.5, 0.0, 0.0),
            (1.5, 1.2, 0.0),
            (0.3, 1.9, 0.8),
        ];
        let original = structure(&points);
        let rotation = Rotation3::from_euler_angles(0.4, 0.1, -0.9);
        let shift = Vector3::new(1.0, 2.0, 3.0);
        let expected: Vec<_> = original
            .atoms()
            .iter()
            .map(|a| rotation * a.position + shift)
            .collect();

        // The aligner output lacks the last atom.
        let aligned = original.with_atoms(
            original.atoms()[..3]
                .iter()
                .zip(&expected)
                .map(|(atom, p)| {
                    let mut atom = atom.clone();
                    atom.position = *p;
                    atom
                })
                .collect(),
        );

        let moved = transfer_coordinates(&original, &aligned).unwrap();
        for (atom, target) in moved.atoms().iter().zip(&expected) {
            assert!((atom.position - target).norm() < 1e-8);
        }
    }

    #[test]
    fn too_few_matches_is_an_error() {
        let original = structure(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        let aligned = original.with_atoms(original.atoms()[..1].to_vec());
        assert!(matches!(
            transfer_coordinates(&original, &aligned),
            Err(ToolError::MalformedOutput { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn superposes_through_external_program() {
        use crate::engine::external::process::test_support::write_script;

        let bin = tempfile::tempdir().unwrap();
        let script = write_script(
            bin.path(),
            "lovoalign",
            r#"while [ $# -gt 0 ]; do
  case "$1" in
    -p1) mobile="$2"; shift 2;;
    -o) out="$2"; shift 2;;
    *) shift;;
  esac
done
cp "$mobile" "$out"
echo " FINAL SCORE:   10.0   RMSD:    0.512"
"#,
        );
        let aligner = LovoalignAligner::new(script, false);
        let mobile = structure(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        let reference = structure(&[(0.0, 0.0, 1.0), (1.0, 0.0, 1.0), (0.0, 1.0, 1.0)]);

        let result = aligner.superpose(&mobile, &reference, 'A').unwrap();
        assert_eq!(result.rmsd, 0.512);
        assert_eq!(result.structure.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_failure_not_unavailability() {
        use crate::engine::external::process::test_support::write_script;

        let bin = tempfile::tempdir().unwrap();
        let script = write_script(bin.path(), "lovoalign", "echo 'chain not found' >&2\nexit 2");
        let aligner = LovoalignAligner::new(script, false);
        let mobile = structure(&[(0.0, 0.0, 0.0)]);

        let err = aligner.superpose(&mobile, &mobile, 'A').unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
        assert!(!err.is_unavailable());
    }
}
