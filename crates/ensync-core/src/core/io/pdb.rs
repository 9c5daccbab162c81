use crate::core::io::traits::{StructureFile, WriteOptions};
use crate::core::models::atom::{AtomClass, AtomRecord, element_from_name};
use crate::core::models::structure::StructureRecord;
use nalgebra::Point3;
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const MIN_COORDINATE_LINE_LENGTH: usize = 54;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn char_at(line: &str, index: usize) -> Option<char> {
    line.get(index..index + 1).and_then(|s| s.chars().next())
}

fn parse_float(line: &str, start: usize, end: usize, line_num: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    if value.is_empty() {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::MissingRequiredField {
                columns: format!("{}-{}", start + 1, end),
            },
        });
    }
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.to_string(),
        },
    })
}

fn parse_optional_float(
    line: &str,
    start: usize,
    end: usize,
    default: f64,
    line_num: usize,
) -> Result<f64, PdbError> {
    if slice_and_trim(line, start, end).is_empty() {
        Ok(default)
    } else {
        parse_float(line, start, end, line_num)
    }
}

fn parse_int(line: &str, start: usize, end: usize, line_num: usize) -> Result<isize, PdbError> {
    let value = slice_and_trim(line, start, end);
    if value.is_empty() {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::MissingRequiredField {
                columns: format!("{}-{}", start + 1, end),
            },
        });
    }
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.to_string(),
        },
    })
}

/// Fixed-column PDB format.
///
/// Reading keeps `ATOM`/`HETATM` rows and tracks `MODEL` sections; every other
/// record is ignored. Of several alternate locations for one atom only the first
/// is kept. Residue numbers written five columns wide (as this writer does for
/// numbers that do not fit four) are read back including the insertion-code column.
pub struct PdbFile;

impl PdbFile {
    fn parse_atom_line(line: &str, line_num: usize, model: usize) -> Result<AtomRecord, PdbError> {
        if line.len() < MIN_COORDINATE_LINE_LENGTH {
            return Err(PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::LineTooShort,
            });
        }

        let class = if line.starts_with("HETATM") {
            AtomClass::Hetatm
        } else {
            AtomClass::Atom
        };
        let serial = slice_and_trim(line, 6, 11).parse::<usize>().unwrap_or(0);
        let name = slice_and_trim(line, 12, 16);
        if name.is_empty() {
            return Err(PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::MissingRequiredField {
                    columns: "13-16".to_string(),
                },
            });
        }
        let residue_name = slice_and_trim(line, 17, 20);
        let chain = char_at(line, 21).filter(|c| !c.is_whitespace()).unwrap_or('A');

        let wide_number = char_at(line, 26).is_some_and(|c| c.is_ascii_digit());
        let (residue_number, insertion_code) = if wide_number {
            (parse_int(line, 22, 27, line_num)?, None)
        } else {
            let code = char_at(line, 26).filter(|c| c.is_ascii_alphanumeric());
            (parse_int(line, 22, 26, line_num)?, code)
        };

        let x = parse_float(line, 30, 38, line_num)?;
        let y = parse_float(line, 38, 46, line_num)?;
        let z = parse_float(line, 46, 54, line_num)?;
        let occupancy = parse_optional_float(line, 54, 60, 1.0, line_num)?;
        let temperature_factor = parse_optional_float(line, 60, 66, 0.0, line_num)?;
        let element = match slice_and_trim(line, 76, 78) {
            "" => element_from_name(name),
            symbol => symbol.to_string(),
        };

        Ok(AtomRecord {
            serial,
            model,
            class,
            name: name.to_string(),
            residue_name: residue_name.to_string(),
            chain,
            residue_number,
            insertion_code,
            position: Point3::new(x, y, z),
            occupancy,
            temperature_factor,
            element,
            annotation: None,
        })
    }

    fn format_atom_line(serial: usize, atom: &AtomRecord, options: &WriteOptions) -> String {
        let name_field = if atom.name.len() >= 4 {
            format!("{:<4}", atom.name)
        } else {
            format!(" {:<3}", atom.name)
        };
        let number = atom.residue_number.to_string();
        let residue_field = if number.len() <= 4 {
            format!("{:>4}{}", number, atom.insertion_code.unwrap_or(' '))
        } else {
            format!("{:>5}", number)
        };

        // Annotated output: occupancy carries identity, b-factor carries sharing.
        let (occupancy, b_factor) = if options.annotations {
            match (atom.class, atom.annotation) {
                (AtomClass::Atom, Some(annotation)) => (
                    if annotation.identical_aa { 1.0 } else { 0.0 },
                    annotation.shared_fraction,
                ),
                _ => (0.0, 0.0),
            }
        } else {
            (atom.occupancy, atom.temperature_factor)
        };
        let b_field = if options.annotations {
            format!("{:>6.3}", b_factor)
        } else {
            format!("{:>6.2}", b_factor)
        };

        format!(
            "{:<6}{:>5} {} {:>3} {}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{}          {:>2}",
            atom.class.record_name(),
            serial % 100_000,
            name_field,
            atom.residue_name,
            atom.chain,
            residue_field,
            atom.position.x,
            atom.position.y,
            atom.position.z,
            occupancy,
            b_field,
            atom.element,
        )
    }
}

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead, id: &str) -> Result<StructureRecord, Self::Error> {
        let mut atoms = Vec::new();
        let mut model = 1usize;
        let mut models_seen = 0usize;
        let mut seen_alternates = HashSet::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line_num = index + 1;

            if line.starts_with("MODEL") {
                models_seen += 1;
                model = slice_and_trim(&line, 6, line.len())
                    .parse::<usize>()
                    .unwrap_or(models_seen);
            } else if line.starts_with("ATOM  ") || line.starts_with("HETATM") {
                let atom = Self::parse_atom_line(&line, line_num, model)?;
                let alternate = char_at(&line, 16).filter(|c| !c.is_whitespace());
                if alternate.is_some() {
                    let key = (
                        atom.model,
                        atom.chain,
                        atom.residue_number,
                        atom.insertion_code,
                        atom.name.clone(),
                    );
                    if !seen_alternates.insert(key) {
                        continue;
                    }
                }
                atoms.push(atom);
            } else if line.starts_with("END") && !line.starts_with("ENDMDL") {
                break;
            }
        }

        if atoms.is_empty() {
            return Err(PdbError::MissingRecord(
                "no ATOM or HETATM records found".to_string(),
            ));
        }

        Ok(StructureRecord::new(id, atoms))
    }

    fn write_to(
        structure: &StructureRecord,
        options: &WriteOptions,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let mut serial = 0usize;
        let mut current_model: Option<usize> = None;
        let mut previous: Option<&AtomRecord> = None;

        for atom in structure.atoms() {
            if options.with_models && current_model != Some(atom.model) {
                if current_model.is_some() {
                    if let Some(prev) = previous.filter(|p| p.class == AtomClass::Atom) {
                        serial += 1;
                        write_ter(writer, serial, prev)?;
                    }
                    writeln!(writer, "ENDMDL")?;
                    previous = None;
                }
                writeln!(writer, "MODEL     {:>4}", atom.model)?;
                current_model = Some(atom.model);
            }

            if let Some(prev) = previous {
                if prev.class == AtomClass::Atom && prev.chain != atom.chain {
                    serial += 1;
                    write_ter(writer, serial, prev)?;
                }
            }

            serial += 1;
            writeln!(writer, "{}", Self::format_atom_line(serial, atom, options))?;
            previous = Some(atom);
        }

        if let Some(prev) = previous.filter(|p| p.class == AtomClass::Atom) {
            serial += 1;
            write_ter(writer, serial, prev)?;
        }
        if options.with_models && current_model.is_some() {
            writeln!(writer, "ENDMDL")?;
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

fn write_ter(writer: &mut impl Write, serial: usize, last: &AtomRecord) -> io::Result<()> {
    let number = last.residue_number.to_string();
    let residue_field = if number.len() <= 4 {
        format!("{:>4}{}", number, last.insertion_code.unwrap_or(' '))
    } else {
        format!("{:>5}", number)
    };
    writeln!(
        writer,
        "TER   {:>5}      {:>3} {}{}",
        serial % 100_000,
        last.residue_name,
        last.chain,
        residue_field
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::ResidueAnnotation;
    use std::io::Cursor;

    const SAMPLE: &str = "\
HEADER    TEST STRUCTURE
ATOM      1  N   SER A   1      11.104   6.134  -6.504  1.00 20.00           N
ATOM      2  CA  SER A   1      11.639   6.071  -5.147  1.00 20.00           C
ATOM      3  OG ASER A   1      12.000   7.000  -4.000  0.50 20.00           O
ATOM      4  OG BSER A   1      12.500   7.500  -4.500  0.50 20.00           O
ATOM      5  CA  GLY A   2A     13.000   5.000  -3.000  1.00 21.50           C
TER       6      GLY A   2A
ATOM      7  CA  ALA B  10       1.000   2.000   3.000  1.00 10.00           C
HETATM    8 ZN    ZN B 301       0.000   0.000   0.000  1.00 30.00          ZN
END
";

    fn read(text: &str) -> StructureRecord {
        PdbFile::read_from(&mut Cursor::new(text), "sample.pdb").unwrap()
    }

    fn write(structure: &StructureRecord, options: WriteOptions) -> String {
        let mut buffer = Vec::new();
        PdbFile::write_to(structure, &options, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn reads_atom_and_hetatm_rows() {
        let structure = read(SAMPLE);
        assert_eq!(structure.id(), "sample.pdb");
        assert_eq!(structure.len(), 6);

        let ca = &structure.atoms()[1];
        assert_eq!(ca.name, "CA");
        assert_eq!(ca.residue_name, "SER");
        assert_eq!(ca.chain, 'A');
        assert_eq!(ca.residue_number, 1);
        assert!((ca.position.x - 11.639).abs() < 1e-9);

        let zinc = structure.atoms().last().unwrap();
        assert_eq!(zinc.class, AtomClass::Hetatm);
        assert_eq!(zinc.element, "ZN");
        assert_eq!(zinc.residue_number, 301);
    }

    #[test]
    fn keeps_only_first_alternate_location() {
        let structure = read(SAMPLE);
        let og: Vec<_> = structure.atoms().iter().filter(|a| a.name == "OG").collect();
        assert_eq!(og.len(), 1);
        assert!((og[0].position.x - 12.0).abs() < 1e-9);
    }

    #[test]
    fn reads_insertion_codes() {
        let structure = read(SAMPLE);
        let gly = &structure.atoms()[3];
        assert_eq!(gly.residue_number, 2);
        assert_eq!(gly.insertion_code, Some('A'));
    }

    #[test]
    fn tracks_model_sections() {
        let text = "\
MODEL        1
ATOM      1  CA  ALA A   1       0.000   0.000   0.000  1.00  0.00           C
ENDMDL
MODEL        2
ATOM      1  CA  ALA A   1       1.000   0.000   0.000  1.00  0.00           C
ENDMDL
END
";
        let structure = read(text);
        assert_eq!(structure.models(), vec![1, 2]);
    }

    #[test]
    fn rejects_malformed_coordinates() {
        let text =
            "ATOM      1  CA  ALA A   1      xx.000   0.000   0.000  1.00  0.00           C\n";
        let result = PdbFile::read_from(&mut Cursor::new(text), "bad.pdb");
        assert!(matches!(
            result,
            Err(PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::InvalidFloat { .. }
            })
        ));
    }

    #[test]
    fn rejects_truncated_rows_and_empty_files() {
        let short = PdbFile::read_from(&mut Cursor::new("ATOM      1  CA  ALA A   1\n"), "x");
        assert!(matches!(
            short,
            Err(PdbError::Parse {
                kind: PdbParseErrorKind::LineTooShort,
                ..
            })
        ));
        let empty = PdbFile::read_from(&mut Cursor::new("HEADER\nEND\n"), "x");
        assert!(matches!(empty, Err(PdbError::MissingRecord(_))));
    }

    #[test]
    fn writes_fixed_columns_with_ter_between_chains() {
        let structure = read(SAMPLE);
        let text = write(&structure, WriteOptions::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "ATOM      1  N   SER A   1      11.104   6.134  -6.504  1.00 20.00           N"
        );
        assert_eq!(&lines[3][22..27], "   2A");
        assert!(lines[4].starts_with("TER       5      GLY A   2A"));
        assert!(lines[6].starts_with("HETATM    7"));
        assert_eq!(&lines[6][17..26], " ZN B 301");
        assert_eq!(*lines.last().unwrap(), "END");
    }

    #[test]
    fn writes_and_reads_back_long_negative_numbers() {
        let atom = AtomRecord::new(
            AtomClass::Atom,
            "CA",
            "ALA",
            'A',
            -1234,
            Point3::new(1.0, 2.0, 3.0),
        );
        let structure = StructureRecord::new("neg.pdb", vec![atom]);
        let text = write(&structure, WriteOptions::default());
        assert_eq!(&text.lines().next().unwrap()[22..27], "-1234");

        let reread = read(&text);
        assert_eq!(reread.atoms()[0].residue_number, -1234);
        assert_eq!(reread.atoms()[0].insertion_code, None);
    }

    #[test]
    fn four_character_atom_names_start_in_column_thirteen() {
        let atom = AtomRecord::new(
            AtomClass::Atom,
            "HD21",
            "ASN",
            'A',
            3,
            Point3::origin(),
        );
        let text = write(&StructureRecord::new("h.pdb", vec![atom]), WriteOptions::default());
        assert_eq!(&text.lines().next().unwrap()[12..16], "HD21");
    }

    #[test]
    fn annotations_round_trip_through_occupancy_and_b_factor() {
        let mut shared = AtomRecord::new(AtomClass::Atom, "CA", "ALA", 'A', 1, Point3::origin());
        shared.annotation = Some(ResidueAnnotation::fully_shared());
        let mut partial = AtomRecord::new(AtomClass::Atom, "CA", "GLY", 'A', -1, Point3::origin());
        partial.annotation = Some(ResidueAnnotation {
            shared_fraction: 2.0 / 3.0,
            identical_aa: false,
        });
        let ligand = AtomRecord::new(AtomClass::Hetatm, "O", "HOH", 'A', 400, Point3::origin());
        let structure = StructureRecord::new("ann.pdb", vec![shared, partial, ligand]);

        let options = WriteOptions {
            annotations: true,
            ..WriteOptions::default()
        };
        let reread = read(&write(&structure, options));
        let atoms = reread.atoms();

        assert!((atoms[0].occupancy - 1.0).abs() < 1e-3);
        assert!((atoms[0].temperature_factor - 1.0).abs() < 1e-3);
        assert!(atoms[1].occupancy.abs() < 1e-3);
        assert!((atoms[1].temperature_factor - 2.0 / 3.0).abs() < 1e-3);
        assert_eq!(atoms[2].occupancy, 0.0);
        assert_eq!(atoms[2].temperature_factor, 0.0);
    }

    #[test]
    fn model_sections_are_written_on_request() {
        let mut second = AtomRecord::new(AtomClass::Atom, "CA", "ALA", 'A', 1, Point3::origin());
        second.model = 2;
        let first = AtomRecord::new(AtomClass::Atom, "CA", "ALA", 'A', 1, Point3::origin());
        let structure = StructureRecord::new("m.pdb", vec![first, second]);
        let options = WriteOptions {
            with_models: true,
            ..WriteOptions::default()
        };
        let text = write(&structure, options);
        assert_eq!(text.matches("ENDMDL").count(), 2);
        assert!(text.contains("MODEL        1"));
        assert_eq!(read(&text).models(), vec![1, 2]);
    }

    #[test]
    fn write_to_path_refuses_to_overwrite_without_permission() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdb");
        let structure = read(SAMPLE);

        PdbFile::write_to_path(&structure, &WriteOptions::default(), &path).unwrap();
        let second = PdbFile::write_to_path(&structure, &WriteOptions::default(), &path);
        assert!(matches!(second, Err(PdbError::Io(ref e)) if e.kind() == io::ErrorKind::AlreadyExists));

        let overwrite = WriteOptions {
            overwrite: true,
            ..WriteOptions::default()
        };
        PdbFile::write_to_path(&structure, &overwrite, &path).unwrap();
        assert_eq!(PdbFile::read_from_path(&path).unwrap().len(), structure.len());
    }
}
