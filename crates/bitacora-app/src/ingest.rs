//! Input table loading.
//!
//! The pipeline is column-name-agnostic: the caller designates which four
//! columns carry the device id, description, timestamp, and client name.
//! Encoding detection and upload handling live outside this tool.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::event::ServiceRow;

/// Designated source columns, resolved by header name.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub device: String,
    pub description: String,
    pub timestamp: String,
    pub client: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read input file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("input table is missing column `{name}`")]
    MissingColumn { name: String },
}

/// Load service rows from a CSV file using the designated columns.
///
/// Missing description cells become empty strings; such rows still flow
/// through the pipeline (the extraction contract answers them with an empty
/// event list).
pub fn load_service_rows(path: &Path, columns: &ColumnSpec) -> Result<Vec<ServiceRow>, IngestError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| match err.kind() {
        csv::ErrorKind::Io(_) => IngestError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(err.to_string()),
        },
        _ => IngestError::Csv(err),
    })?;

    let headers = reader.headers()?.clone();
    let index_of = |name: &str| -> Result<usize, IngestError> {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| IngestError::MissingColumn {
                name: name.to_string(),
            })
    };

    let device_idx = index_of(&columns.device)?;
    let description_idx = index_of(&columns.description)?;
    let timestamp_idx = index_of(&columns.timestamp)?;
    let client_idx = index_of(&columns.client)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |idx: usize| record.get(idx).unwrap_or_default().trim().to_string();
        rows.push(ServiceRow {
            device_id: cell(device_idx),
            timestamp: cell(timestamp_idx),
            client: cell(client_idx),
            description: cell(description_idx),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_columns() -> ColumnSpec {
        ColumnSpec {
            device: "IMEI".to_string(),
            description: "DESCRIPTION".to_string(),
            timestamp: "FECHA".to_string(),
            client: "CLIENTE".to_string(),
        }
    }

    #[test]
    fn loads_designated_columns() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "IMEI,EXTRA,DESCRIPTION,FECHA,CLIENTE").expect("write header");
        writeln!(file, "868111,x,SE PUSO POWER HUB 868,2024-01-05,Acme").expect("write row");
        writeln!(file, "868112,y,,2024-01-06,Acme").expect("write row");

        let rows = load_service_rows(file.path(), &sample_columns()).expect("load rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].device_id, "868111");
        assert_eq!(rows[0].description, "SE PUSO POWER HUB 868");
        assert_eq!(rows[0].client, "Acme");
        assert_eq!(rows[1].description, "");
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "IMEI,DESCRIPTION,FECHA").expect("write header");
        writeln!(file, "868111,desc,2024-01-05").expect("write row");

        let err = load_service_rows(file.path(), &sample_columns()).expect_err("must fail");
        assert!(matches!(err, IngestError::MissingColumn { ref name } if name == "CLIENTE"));
    }
}
