// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for model loading
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that make a building model unusable.
///
/// Every variant is a parse failure for the file being loaded; callers skip
/// the file and carry on with the rest of the batch.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed building model: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid building model: {0}")]
    Invalid(String),
}
