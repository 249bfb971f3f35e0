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

//! The on-disk config schema, deserialized from TOML by `cmd/mdcore`. Each
//! submodule owns one section; [`MdcoreConfig`] is the document root.

mod codec;
mod lvc;
mod runtime;
mod tape;
mod telemetry;

pub use codec::CodecConfig;
pub use lvc::LvcConfig;
pub use runtime::RuntimeOptions;
pub use tape::TapeConfig;
pub use telemetry::LogConfig;
pub use telemetry::StderrConfig;
pub use telemetry::TelemetryConfig;

use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MdcoreConfig {
    #[serde(default)]
    pub runtime: RuntimeOptions,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub lvc: LvcConfig,
    #[serde(default)]
    pub tape: TapeConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
