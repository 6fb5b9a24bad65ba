use log::debug;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Delimited-text flavour shared by manifests and matrix files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Tsv,
}

impl Format {
    pub fn delimiter(self) -> char {
        match self {
            Format::Csv => ',',
            Format::Tsv => '\t',
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Format::Csv),
            "tsv" => Ok(Format::Tsv),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Identifier -> path table loaded from a delimited file.
///
/// Lines starting with `#` are comments; every other line, blank ones
/// included, must carry at least two fields. A row whose first two fields are
/// literally `id` and `path` is a header and is skipped wherever it occurs.
/// When an identifier repeats, the later row wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    base_dir: PathBuf,
    paths: FxHashMap<String, String>,
}

impl Manifest {
    /// Validate `format` and then load `path`. The format is checked before
    /// the file is touched.
    pub fn open(path: &Path, format: &str) -> Result<Self> {
        let format: Format = format.parse()?;
        Self::load(path, format)
    }

    pub fn load(path: &Path, format: Format) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let reader = BufReader::new(file);
        let delimiter = format.delimiter();
        let mut paths = FxHashMap::default();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::io(path, e))?;
            if line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
            if fields.len() < 2 {
                return Err(Error::MalformedRecord {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                    content: line.clone(),
                    reason: format!("expected 2 fields, found {}", fields.len()),
                });
            }
            if fields[0] == "id" && fields[1] == "path" {
                continue;
            }

            if let Some(previous) = paths.insert(fields[0].to_string(), fields[1].to_string()) {
                debug!(
                    "Manifest {:?}: '{}' redefined (was {}, now {})",
                    path, fields[0], previous, fields[1]
                );
            }
        }

        debug!("Loaded {} manifest entries from {:?}", paths.len(), path);

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Manifest { base_dir, paths })
    }

    /// Raw path string as written in the manifest.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.paths.get(id).map(String::as_str)
    }

    /// Path for `id`, with relative entries anchored at the manifest's directory.
    pub fn resolve(&self, id: &str) -> Result<PathBuf> {
        let raw = self
            .get(id)
            .ok_or_else(|| Error::UnknownKey(id.to_string()))?;
        let p = Path::new(raw);
        if p.is_absolute() {
            Ok(p.to_path_buf())
        } else {
            Ok(self.base_dir.join(p))
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Entries sorted by identifier.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .paths
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }
}
