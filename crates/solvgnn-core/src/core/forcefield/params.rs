use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid neck table in '{path}': {reason}")]
    Shape { path: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct NeckRecord {
    i: usize,
    j: usize,
    d0: f64,
    m0: f64,
}

/// Square tables of neck integral parameters indexed by a pair of radius indices.
///
/// `d0` is the separation (nm) at which the neck integral peaks and `m0` its height.
#[derive(Debug, Clone, PartialEq)]
pub struct NeckTable {
    size: usize,
    d0: Vec<f64>,
    m0: Vec<f64>,
}

impl NeckTable {
    /// Builds a `size × size` table from a function of the index pair.
    pub fn from_fn(size: usize, mut entry: impl FnMut(usize, usize) -> (f64, f64)) -> Self {
        let mut d0 = Vec::with_capacity(size * size);
        let mut m0 = Vec::with_capacity(size * size);
        for i in 0..size {
            for j in 0..size {
                let (d, m) = entry(i, j);
                d0.push(d);
                m0.push(m);
            }
        }
        Self { size, d0, m0 }
    }

    /// Loads a table from a CSV file with the header `i,j,d0,m0`.
    ///
    /// The table size is one more than the largest index found; every index pair of the
    /// resulting square must appear exactly once.
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let records = reader
            .deserialize::<NeckRecord>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParamLoadError::Csv {
                path: path_str.clone(),
                source: e,
            })?;

        Self::from_records(&records).map_err(|reason| ParamLoadError::Shape {
            path: path_str,
            reason,
        })
    }

    fn from_records(records: &[NeckRecord]) -> Result<Self, String> {
        let size = records
            .iter()
            .map(|r| r.i.max(r.j) + 1)
            .max()
            .ok_or_else(|| "table has no entries".to_string())?;

        let mut d0 = vec![f64::NAN; size * size];
        let mut m0 = vec![f64::NAN; size * size];
        let mut seen = vec![false; size * size];
        for record in records {
            let slot = record.i * size + record.j;
            if std::mem::replace(&mut seen[slot], true) {
                return Err(format!("duplicate entry ({}, {})", record.i, record.j));
            }
            d0[slot] = record.d0;
            m0[slot] = record.m0;
        }

        if let Some(slot) = seen.iter().position(|&s| !s) {
            return Err(format!(
                "missing entry ({}, {}) in a {size}x{size} table",
                slot / size,
                slot % size
            ));
        }
        Ok(Self { size, d0, m0 })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `(d0, m0)` for a pair of radius indices, clamping both to the table.
    pub fn lookup(&self, index_i: usize, index_j: usize) -> (f64, f64) {
        let last = self.size.saturating_sub(1);
        let slot = index_i.min(last) * self.size + index_j.min(last);
        (self.d0[slot], self.m0[slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn from_fn_fills_square_table() {
        let table = NeckTable::from_fn(3, |i, j| (i as f64, j as f64));
        assert_eq!(table.size(), 3);
        assert_eq!(table.lookup(2, 1), (2.0, 1.0));
    }

    #[test]
    fn lookup_clamps_out_of_range_indices() {
        let table = NeckTable::from_fn(2, |i, j| (i as f64, j as f64));
        assert_eq!(table.lookup(7, 0), (1.0, 0.0));
    }

    #[test]
    fn load_succeeds_with_valid_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("neck.csv");
        fs::write(
            &file_path,
            "i,j,d0,m0\n0,0,0.27,0.0038\n0,1,0.28,0.0035\n1,0,0.28,0.0035\n1,1,0.29,0.0031\n",
        )
        .unwrap();

        let table = NeckTable::load(&file_path).unwrap();
        assert_eq!(table.size(), 2);
        assert_eq!(table.lookup(1, 1), (0.29, 0.0031));
        assert_eq!(table.lookup(0, 1), (0.28, 0.0035));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = NeckTable::load(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(ParamLoadError::Io { .. })));
    }

    #[test]
    fn load_fails_for_malformed_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("neck.csv");
        fs::write(&file_path, "i,j,d0,m0\n0,0,not-a-number,0.1\n").unwrap();
        let result = NeckTable::load(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Csv { .. })));
    }

    #[test]
    fn load_fails_for_incomplete_table() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("neck.csv");
        fs::write(&file_path, "i,j,d0,m0\n0,0,0.27,0.0038\n1,1,0.29,0.0031\n").unwrap();
        let result = NeckTable::load(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Shape { .. })));
    }

    #[test]
    fn load_fails_for_duplicate_entries() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("neck.csv");
        fs::write(&file_path, "i,j,d0,m0\n0,0,0.27,0.0038\n0,0,0.27,0.0038\n").unwrap();
        let result = NeckTable::load(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Shape { .. })));
    }

    #[test]
    fn load_fails_for_empty_table() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("neck.csv");
        fs::write(&file_path, "i,j,d0,m0\n").unwrap();
        let result = NeckTable::load(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Shape { .. })));
    }
}
