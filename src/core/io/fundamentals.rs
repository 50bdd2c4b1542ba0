use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::DataError;

/// Fundamental attribute name -> numeric value. Absent attributes are omitted.
pub type FundamentalSnapshot = BTreeMap<String, f64>;

/// Read a flat JSON object of company attributes.
///
/// Only finite numeric values are kept. Strings, booleans, nulls and nested
/// values are treated as absent.
pub fn read_info_json<P: AsRef<Path>>(path: P) -> Result<FundamentalSnapshot, DataError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_json::from_str(&raw).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let Value::Object(map) = value else {
        return Err(DataError::NotAnObject {
            path: path.to_path_buf(),
        });
    };

    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.as_f64().filter(|x| x.is_finite()).map(|x| (k, x)))
        .collect())
}

/// Restrict a snapshot to the named attributes.
pub fn select_attributes<S: AsRef<str>>(raw: &FundamentalSnapshot, names: &[S]) -> FundamentalSnapshot {
    names
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            raw.get(name).map(|&v| (name.to_string(), v))
        })
        .collect()
}
