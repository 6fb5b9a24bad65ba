use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::manifest::Format;

/// Dense row-major numeric matrix with one label per row and per column.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    row_labels: Vec<String>,
    col_labels: Vec<String>,
}

impl DataMatrix {
    pub fn new(values: Vec<Vec<f64>>, row_labels: Vec<String>, col_labels: Vec<String>) -> Result<Self> {
        let rows = values.len();
        let cols = values.first().map_or(0, Vec::len);

        if let Some((i, r)) = values.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(Error::ShapeMismatch(format!(
                "row {} has {} values, expected {}",
                i,
                r.len(),
                cols
            )));
        }
        if row_labels.len() != rows {
            return Err(Error::ShapeMismatch(format!(
                "{} row labels for {} rows",
                row_labels.len(),
                rows
            )));
        }
        if col_labels.len() != cols {
            return Err(Error::ShapeMismatch(format!(
                "{} column labels for {} columns",
                col_labels.len(),
                cols
            )));
        }

        Ok(DataMatrix {
            rows,
            cols,
            values: values.into_iter().flatten().collect(),
            row_labels,
            col_labels,
        })
    }

    /// Build a matrix labelled with its positional indices.
    pub fn from_rows(values: Vec<Vec<f64>>) -> Result<Self> {
        let rows = values.len();
        let cols = values.first().map_or(0, Vec::len);
        Self::new(values, index_labels(rows), index_labels(cols))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.cols + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[String] {
        &self.col_labels
    }

    /// Rows as observation vectors.
    pub fn row_vectors(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    /// Columns as observation vectors.
    pub fn col_vectors(&self) -> Vec<Vec<f64>> {
        (0..self.cols)
            .map(|j| (0..self.rows).map(|i| self.get(i, j)).collect())
            .collect()
    }

    /// Values as nested rows, in the shape the heatmap trace carries.
    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        self.row_vectors()
    }

    /// Check that the matrix is square and that every label is its own
    /// positional index, so leaf labels produced by clustering can be used
    /// directly as row and column indices.
    pub fn require_index_space(&self) -> Result<()> {
        if self.rows != self.cols {
            return Err(Error::ShapeMismatch(format!(
                "matrix is {}x{}, a square matrix is required",
                self.rows, self.cols
            )));
        }
        for (axis, labels) in [("row", &self.row_labels), ("column", &self.col_labels)] {
            for (pos, label) in labels.iter().enumerate() {
                if label.trim().parse::<usize>().ok() != Some(pos) {
                    return Err(Error::ShapeMismatch(format!(
                        "{} label '{}' at position {} is not the index {}",
                        axis, label, pos, pos
                    )));
                }
            }
        }
        Ok(())
    }

    /// Reorder rows by `row_order`, then columns by `col_order`: cell (i, j)
    /// of the result is cell (row_order[i], col_order[j]) of `self`.
    pub fn permute(&self, row_order: &[usize], col_order: &[usize]) -> Result<DataMatrix> {
        check_permutation("row", row_order, self.rows)?;
        check_permutation("column", col_order, self.cols)?;

        let mut values = Vec::with_capacity(self.values.len());
        for &r in row_order {
            let row = self.row(r);
            values.extend(col_order.iter().map(|&c| row[c]));
        }

        Ok(DataMatrix {
            rows: self.rows,
            cols: self.cols,
            values,
            row_labels: row_order.iter().map(|&r| self.row_labels[r].clone()).collect(),
            col_labels: col_order.iter().map(|&c| self.col_labels[c].clone()).collect(),
        })
    }

    /// Load a delimited numeric matrix.
    ///
    /// If the first data line holds any non-numeric field it is read as the
    /// column labels, and each following row starts with its row label.
    /// Otherwise labels are positional indices.
    pub fn load(path: &Path, format: Format) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let reader = BufReader::new(file);
        let delimiter = format.delimiter();

        let mut header: Option<Vec<String>> = None;
        let mut first_data_line = true;
        let mut values: Vec<Vec<f64>> = Vec::new();
        let mut row_labels: Vec<String> = Vec::new();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::io(path, e))?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let line_no = line_idx + 1;
            let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();

            if first_data_line {
                first_data_line = false;
                if fields.iter().any(|f| f.parse::<f64>().is_err()) {
                    // A leading empty corner cell is common in labelled exports.
                    let labels = if fields.first() == Some(&"") {
                        &fields[1..]
                    } else {
                        &fields[..]
                    };
                    header = Some(labels.iter().map(|s| s.to_string()).collect());
                    continue;
                }
            }

            let (label, cells) = match &header {
                Some(h) => {
                    if fields.len() != h.len() + 1 {
                        return Err(malformed(path, line_no, &line, h.len() + 1, fields.len()));
                    }
                    (fields[0].to_string(), &fields[1..])
                }
                None => {
                    if let Some(first) = values.first() {
                        if fields.len() != first.len() {
                            return Err(malformed(path, line_no, &line, first.len(), fields.len()));
                        }
                    }
                    (values.len().to_string(), &fields[..])
                }
            };

            let row = cells
                .iter()
                .map(|cell| {
                    cell.parse::<f64>().map_err(|_| Error::InvalidValue {
                        path: path.to_path_buf(),
                        line: line_no,
                        value: cell.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            row_labels.push(label);
            values.push(row);
        }

        let cols = match &header {
            Some(h) => h.len(),
            None => values.first().map_or(0, Vec::len),
        };
        let col_labels = header.unwrap_or_else(|| index_labels(cols));

        debug!("Loaded {}x{} matrix from {:?}", values.len(), cols, path);

        DataMatrix::new(values, row_labels, col_labels)
    }
}

fn index_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

fn malformed(path: &Path, line: usize, content: &str, expected: usize, found: usize) -> Error {
    Error::MalformedRecord {
        path: path.to_path_buf(),
        line,
        content: content.to_string(),
        reason: format!("expected {} fields, found {}", expected, found),
    }
}

fn check_permutation(axis: &str, order: &[usize], n: usize) -> Result<()> {
    if order.len() != n {
        return Err(Error::ShapeMismatch(format!(
            "{} order has {} entries for {} {}s",
            axis,
            order.len(),
            n,
            axis
        )));
    }
    let mut seen = vec![false; n];
    for &idx in order {
        if idx >= n || seen[idx] {
            return Err(Error::ShapeMismatch(format!(
                "{} order is not a permutation of 0..{} (offending index {})",
                axis, n, idx
            )));
        }
        seen[idx] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn distance_4x4() -> DataMatrix {
        DataMatrix::from_rows(vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 0.0, 4.0, 5.0],
            vec![2.0, 4.0, 0.0, 6.0],
            vec![3.0, 5.0, 6.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn permuted_cell_reads_original_at_orders() {
        let m = distance_4x4();
        let rows = [2, 0, 3, 1];
        let cols = [1, 3, 0, 2];
        let p = m.permute(&rows, &cols).unwrap();

        assert_eq!(p.get(0, 0), m.get(2, 1));
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(p.get(i, j), m.get(rows[i], cols[j]));
            }
        }
        assert_eq!(p.row_labels(), &["2", "0", "3", "1"]);
        assert_eq!(p.col_labels(), &["1", "3", "0", "2"]);
    }

    #[test]
    fn permute_rejects_non_permutations() {
        let m = distance_4x4();
        assert!(matches!(
            m.permute(&[0, 0, 1, 2], &[0, 1, 2, 3]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            m.permute(&[0, 1, 2, 3], &[0, 1, 2]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            m.permute(&[0, 1, 2, 4], &[0, 1, 2, 3]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn ragged_rows_rejected() {
        let r = DataMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(r, Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn index_space_requires_square_and_positional_labels() {
        assert!(distance_4x4().require_index_space().is_ok());

        let rect = DataMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert!(matches!(rect.require_index_space(), Err(Error::ShapeMismatch(_))));

        let named = DataMatrix::new(
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            vec!["a".into(), "b".into()],
            vec!["0".into(), "1".into()],
        )
        .unwrap();
        assert!(matches!(named.require_index_space(), Err(Error::ShapeMismatch(_))));

        let shuffled = DataMatrix::new(
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            vec!["1".into(), "0".into()],
            vec!["0".into(), "1".into()],
        )
        .unwrap();
        assert!(matches!(shuffled.require_index_space(), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn columns_are_transposed_rows() {
        let m = DataMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.col_vectors(), vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
    }

    #[test]
    fn load_unlabelled_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "# distances\n0,1,2\n1,0,3\n\n2,3,0\n").unwrap();
        let m = DataMatrix::load(file.path(), Format::Csv).unwrap();
        assert_eq!((m.rows(), m.cols()), (3, 3));
        assert_eq!(m.get(2, 1), 3.0);
        assert_eq!(m.row_labels(), &["0", "1", "2"]);
        assert!(m.require_index_space().is_ok());
    }

    #[test]
    fn load_labelled_tsv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\t0\t1\n0\t0.0\t0.5\n1\t0.5\t0.0\n").unwrap();
        let m = DataMatrix::load(file.path(), Format::Tsv).unwrap();
        assert_eq!(m.col_labels(), &["0", "1"]);
        assert_eq!(m.row_labels(), &["0", "1"]);
        assert_eq!(m.get(0, 1), 0.5);
    }

    #[test]
    fn load_reports_bad_cells_and_ragged_lines() {
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "1,2\n3,x\n").unwrap();
        // A non-numeric first line would be a header; here it is the second.
        assert!(matches!(
            DataMatrix::load(bad.path(), Format::Csv),
            Err(Error::InvalidValue { line: 2, .. })
        ));

        let mut ragged = tempfile::NamedTempFile::new().unwrap();
        write!(ragged, "1,2\n3,4,5\n").unwrap();
        assert!(matches!(
            DataMatrix::load(ragged.path(), Format::Csv),
            Err(Error::MalformedRecord { line: 2, .. })
        ));
    }
}
