// Copyright 2026 The mdcore Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Error taxonomy for the LVC, matching the `SchemaMissing` / `IoError` /
/// `LVCLocked` kinds named in the error-handling design.
#[derive(Debug, thiserror::Error)]
pub enum LvcError {
    #[error("lvc file has a bad signature")]
    BadSignature,
    #[error("lvc file is truncated or corrupt: {0}")]
    Truncated(&'static str),
    #[error("fid {0} is not present in the lvc schema")]
    SchemaMissing(i32),
    #[error("named lock {0:?} could not be acquired")]
    Locked(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Schema(#[from] mdcore_wire_codec::SchemaError),
}

pub type LvcResult<T> = Result<T, LvcError>;
