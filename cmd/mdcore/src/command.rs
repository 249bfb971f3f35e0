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

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use error_stack::ResultExt;
use mdcore_lvc_store::LvcFilter;
use mdcore_lvc_store::LvcStore;
use mdcore_lvc_store::Signature;
use mdcore_protos::config::MdcoreConfig;
use mdcore_tape::TapeParams;
use mdcore_tape::TapeReader;
use mdcore_tape::TapeWriter;
use mdcore_version::version;
use mdcore_wire_codec::detect_protocol;
use mdcore_wire_codec::FieldList;
use mdcore_wire_codec::Header;
use mdcore_wire_codec::MsgType;
use mdcore_wire_codec::ParseOutcome;
use mdcore_wire_codec::Schema;

use crate::Error;

#[derive(Debug, Parser)]
#[command(name = "mdcore", version, long_version = version())]
pub struct Command {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

impl Command {
    pub fn run(self) -> error_stack::Result<(), Error> {
        match self.cmd {
            SubCommand::Start(cmd) => cmd.run(),
            SubCommand::Generate(cmd) => cmd.run(),
            SubCommand::Lvc(cmd) => cmd.run(),
            SubCommand::Tape(cmd) => cmd.run(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// Start an mdcore node, reading framed messages from stdin.
    #[command()]
    Start(CommandStart),
    /// Generate command-line interface utilities.
    #[command(name = "gen")]
    Generate(CommandGenerate),
    /// Inspect the Last Value Cache.
    #[command()]
    Lvc(CommandLvc),
    /// Inspect the tape journal.
    #[command()]
    Tape(CommandTape),
}

fn load_config(file: &Path) -> error_stack::Result<MdcoreConfig, Error> {
    let content = std::fs::read_to_string(file)
        .change_context_lazy(|| Error(format!("failed to read config file: {}", file.display())))?;
    toml::from_str(&content).change_context_lazy(|| Error("failed to parse config content".to_string()))
}

fn load_schema(path: &Path) -> error_stack::Result<Schema, Error> {
    let bytes = std::fs::read(path)
        .change_context_lazy(|| Error(format!("failed to read schema file: {}", path.display())))?;
    Schema::load(&bytes).change_context_lazy(|| Error(format!("failed to parse schema file: {}", path.display())))
}

fn now_sec() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Parser)]
pub struct CommandStart {
    /// Configure the node with the given file.
    #[arg(short, long)]
    config_file: PathBuf,
}

impl CommandStart {
    pub fn run(self) -> error_stack::Result<(), Error> {
        let config = load_config(&self.config_file)?;

        mdcore_telemetry::init(&config.telemetry);
        mdcore_runtime::init(&config.runtime);
        ctrlc::set_handler(mdcore_runtime::shutdown)
            .change_context_lazy(|| Error("failed to setup ctrl-c signal handle".to_string()))?;

        let schema = load_schema(&config.codec.schema_path)?;

        let lock_path = mdcore_lvc_store::lock_path_for(&config.lvc.path, &config.lvc.lock_name);
        let mut lvc = LvcStore::open(&config.lvc.path, &lock_path, schema.clone(), Signature::Binary)
            .change_context_lazy(|| Error(format!("failed to open lvc store at {}", config.lvc.path.display())))?;

        let tape_path = config.tape.directory.join("tape.dat");
        let params = TapeParams {
            sec_per_idx_t: config.tape.index_granularity_secs,
            ..TapeParams::default()
        };
        let mut tape = TapeWriter::open(&tape_path, now_sec(), params)
            .change_context_lazy(|| Error(format!("failed to open tape at {}", tape_path.display())))?;

        log::info!("mdcore node started, reading framed messages from stdin");
        let result = run_dispatch_loop(&mut lvc, &mut tape, &schema);

        tape.close(now_sec())
            .change_context_lazy(|| Error("failed to close tape cleanly".to_string()))?;

        result
    }
}

/// Reads stdin in chunks, cutting off one complete wire message at a time
/// regardless of which of the three framings the sender used, applying each
/// to the LVC and appending it to the tape. Runs until stdin closes or
/// [`mdcore_runtime::shutdown`] is called.
fn run_dispatch_loop(lvc: &mut LvcStore, tape: &mut TapeWriter, schema: &Schema) -> error_stack::Result<(), Error> {
    let mut stdin = std::io::stdin();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    while !mdcore_runtime::is_shutdown() {
        let n = stdin
            .read(&mut chunk)
            .change_context_lazy(|| Error("failed to read stdin".to_string()))?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        loop {
            let Some(protocol) = detect_protocol(&buf) else {
                break;
            };
            let mut codec = mdcore_snapshot_engine::make_codec(protocol);
            match codec.parse(&buf, schema) {
                ParseOutcome::Parsed { consumed, header, body } => {
                    apply_message(lvc, tape, &header, &body, &buf[..consumed])?;
                    buf.drain(..consumed);
                }
                ParseOutcome::Incomplete { .. } => break,
                ParseOutcome::BadFraming => {
                    log::warn!("dropping unrecoverable framing on stdin");
                    buf.clear();
                    break;
                }
            }
        }
    }
    Ok(())
}

fn apply_message(
    lvc: &mut LvcStore,
    tape: &mut TapeWriter,
    header: &Header,
    body: &FieldList,
    raw: &[u8],
) -> error_stack::Result<(), Error> {
    let dead = header.msg_type == MsgType::Dead;
    lvc.apply(&header.svc, &header.tkr, body, header.tstamp.sec, header.tstamp.usec, dead)
        .change_context_lazy(|| Error(format!("failed to apply update for {}/{}", header.svc, header.tkr)))?;

    let is_image = header.msg_type == MsgType::Image;
    tape.append(
        header.tstamp.sec as u64,
        header.tstamp.usec,
        &header.svc,
        &header.tkr,
        0,
        0,
        0,
        is_image,
        raw,
    )
    .change_context_lazy(|| Error(format!("failed to append tape record for {}/{}", header.svc, header.tkr)))?;
    Ok(())
}

#[derive(Debug, Parser)]
pub struct CommandGenerate {
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    cmd: GenerateTarget,
}

#[derive(Debug, Subcommand)]
pub enum GenerateTarget {
    /// Generate the default node config.
    #[command()]
    SampleConfig,
}

impl CommandGenerate {
    pub fn run(self) -> error_stack::Result<(), Error> {
        match self.cmd {
            GenerateTarget::SampleConfig => {
                let config = MdcoreConfig::default();
                let content = toml::to_string(&config)
                    .change_context_lazy(|| Error("default config must be always valid".to_string()))?;
                if let Some(output) = self.output {
                    std::fs::write(&output, content)
                        .change_context_lazy(|| Error(format!("failed to write config to {}", output.display())))?;
                } else {
                    println!("{content}");
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct CommandLvc {
    #[command(subcommand)]
    cmd: LvcTarget,
}

#[derive(Debug, Subcommand)]
pub enum LvcTarget {
    /// Print the current record for one (service, ticker).
    #[command()]
    Snap(CommandLvcSnap),
}

impl CommandLvc {
    pub fn run(self) -> error_stack::Result<(), Error> {
        match self.cmd {
            LvcTarget::Snap(cmd) => cmd.run(),
        }
    }
}

#[derive(Debug, Parser)]
pub struct CommandLvcSnap {
    #[arg(short, long)]
    config_file: PathBuf,
    #[arg(long)]
    service: String,
    #[arg(long)]
    ticker: String,
}

impl CommandLvcSnap {
    pub fn run(self) -> error_stack::Result<(), Error> {
        let config = load_config(&self.config_file)?;
        let schema = load_schema(&config.codec.schema_path)?;

        let lock_path = mdcore_lvc_store::lock_path_for(&config.lvc.path, &config.lvc.lock_name);
        let mut lvc = LvcStore::open(&config.lvc.path, &lock_path, schema, Signature::Binary)
            .change_context_lazy(|| Error(format!("failed to open lvc store at {}", config.lvc.path.display())))?;
        lvc.remap()
            .change_context_lazy(|| Error("failed to remap lvc store".to_string()))?;

        match lvc
            .snap(&self.service, &self.ticker)
            .change_context_lazy(|| Error(format!("failed to snap {}/{}", self.service, self.ticker)))?
        {
            Some(view) => {
                println!("{}/{} active={} n_upd={}", view.svc, view.tkr, view.active, view.n_upd);
                let filter = LvcFilter::new();
                for field in filter.project(&view.fields).iter() {
                    println!("  fid={} value={:?}", field.fid, field.value);
                }
            }
            None => println!("{}/{} not found", self.service, self.ticker),
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct CommandTape {
    #[command(subcommand)]
    cmd: TapeTarget,
}

#[derive(Debug, Subcommand)]
pub enum TapeTarget {
    /// Print decoded messages recorded between two tape timestamps.
    #[command()]
    Dump(CommandTapeDump),
}

impl CommandTape {
    pub fn run(self) -> error_stack::Result<(), Error> {
        match self.cmd {
            TapeTarget::Dump(cmd) => cmd.run(),
        }
    }
}

#[derive(Debug, Parser)]
pub struct CommandTapeDump {
    #[arg(short, long)]
    config_file: PathBuf,
    #[arg(long)]
    from: u64,
    #[arg(long)]
    to: Option<u64>,
}

impl CommandTapeDump {
    pub fn run(self) -> error_stack::Result<(), Error> {
        let config = load_config(&self.config_file)?;
        let schema = load_schema(&config.codec.schema_path)?;

        let tape_path = config.tape.directory.join("tape.dat");
        let mut reader = TapeReader::open(&tape_path)
            .change_context_lazy(|| Error(format!("failed to open tape at {}", tape_path.display())))?;
        reader.rewind_to(self.from);

        loop {
            let record = reader
                .read()
                .change_context_lazy(|| Error("failed to read tape record".to_string()))?;
            let Some(record) = record else {
                break;
            };
            if let Some(to) = self.to {
                if record.t_msg_sec > to {
                    break;
                }
            }
            match mdcore_snapshot_engine::decode_any(&record.payload, &schema) {
                Ok((header, body)) => {
                    println!(
                        "t={}.{:06} svc={} tkr={} msg_type={:?} fields={}",
                        record.t_msg_sec,
                        record.t_msg_usec,
                        header.svc,
                        header.tkr,
                        header.msg_type,
                        body.len()
                    );
                }
                Err(err) => {
                    log::warn!("could not decode tape record at svc={} tkr={}: {err}", record.svc, record.tkr);
                }
            }
        }
        Ok(())
    }
}
