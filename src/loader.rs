use std::path::Path;

use crate::errors::PitwallError;
use crate::laps::RawLap;

/// Load raw lap records from a JSON-lines recording, one lap per line.
pub fn load_laps(path: &Path) -> Result<Vec<RawLap>, PitwallError> {
    if !path.exists() {
        return Err(PitwallError::InvalidLapFile {
            path: format!("{:?}", path),
        });
    }

    serde_jsonlines::json_lines(path)
        .map_err(|e| PitwallError::LapLoaderError { source: e })?
        .collect::<Result<Vec<RawLap>, std::io::Error>>()
        .map_err(|e| PitwallError::LapLoaderError { source: e })
}
