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

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("payload is empty; protocol cannot be detected")]
    EmptyPayload,
    #[error("recorded payload is an incomplete message (hint: {0:?} more bytes)")]
    Incomplete(Option<usize>),
    #[error("recorded payload has bad framing for its detected protocol")]
    BadFraming,
    #[error("lvc store lock was poisoned by a panicking writer")]
    Poisoned,
    #[error(transparent)]
    Codec(#[from] mdcore_wire_codec::CodecError),
    #[error(transparent)]
    Lvc(#[from] mdcore_lvc_store::LvcError),
    #[error(transparent)]
    Tape(#[from] mdcore_tape::TapeError),
}

pub type EngineResult<T> = Result<T, EngineError>;
