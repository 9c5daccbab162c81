use std::collections::HashSet;
use std::path::{Component, Path};
use thiserror::Error;

pub const COMPONENT_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("Input '{0}' is listed more than once")]
    DuplicatePath(String),
    #[error("Cannot derive distinct output names for '{0}'")]
    Indistinguishable(String),
}

fn name_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Derives short, collision-free names for a list of input files.
///
/// Each name starts as the file name. While any two names collide, every name
/// is widened by one more trailing path component, joined with `__`
/// (`a/x.pdb`, `b/x.pdb` become `a__x.pdb`, `b__x.pdb`).
///
/// # Errors
///
/// Returns [`NamingError::DuplicatePath`] if a path is listed twice, or
/// [`NamingError::Indistinguishable`] if two paths stay identical after all of
/// their components are used.
pub fn unique_output_names<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<String>, NamingError> {
    let mut seen = HashSet::new();
    for path in paths {
        let path = path.as_ref();
        if !seen.insert(path) {
            return Err(NamingError::DuplicatePath(path.display().to_string()));
        }
    }

    let components: Vec<Vec<String>> = paths.iter().map(|p| name_components(p.as_ref())).collect();
    let max_depth = components.iter().map(Vec::len).max().unwrap_or(0).max(1);

    for depth in 1..=max_depth {
        let names: Vec<String> = components
            .iter()
            .map(|parts| {
                let start = parts.len().saturating_sub(depth);
                parts[start..].join(COMPONENT_SEPARATOR)
            })
            .collect();

        let mut distinct = HashSet::new();
        if let Some(clash) = names.iter().find(|name| !distinct.insert(name.as_str())) {
            if depth == max_depth {
                return Err(NamingError::Indistinguishable(clash.clone()));
            }
            continue;
        }
        return Ok(names);
    }

    Ok(Vec::new())
}

/// Drops the extension of every name, unless that would make two names equal.
///
/// `x.pdb` and `y.pdb` become `x` and `y`; `x.pdb` and `x.cif` are kept whole.
pub fn strip_extensions(names: &[String]) -> Vec<String> {
    let stems: Vec<String> = names
        .iter()
        .map(|name| {
            Path::new(name)
                .file_stem()
                .map_or_else(|| name.clone(), |stem| stem.to_string_lossy().into_owned())
        })
        .collect();
    let distinct: HashSet<&str> = stems.iter().map(String::as_str).collect();
    if distinct.len() == stems.len() {
        stems
    } else {
        names.to_vec()
    }
}
