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

//! MarketFeed framing: delimiter-separated ASCII using the four C0 control
//! characters as field/group/record/unit separators, one message per
//! `FS`-to-`FS` span:
//!
//! ```text
//! <FS>MT<US>Svc<GS>Tkr<US>RTL<US>Tag<RS>fid<US>value<RS>fid<US>value<RS>...<FS>
//! ```
//!
//! The trailing `FS` doubles as the next message's leading delimiter, so a
//! frame never consumes it. Leading bytes before the first `FS` ("slop")
//! are tolerated and discarded, matching real feed handlers that splice
//! streams at arbitrary points.

use crate::codec::Codec;
use crate::codec::ParseOutcome;
use crate::field::FieldType;
use crate::field::FieldValue;
use crate::field_list::FieldList;
use crate::framer::FrameOutcome;
use crate::framer::Framer;
use crate::framer::Protocol;
use crate::header::Header;
use crate::header::MsgType;
use crate::schema::Schema;
use crate::CodecError;
use crate::IoResult;

const FS: u8 = 0x1C;
const GS: u8 = 0x1D;
const RS: u8 = 0x1E;
const US: u8 = 0x1F;

const MT_IMAGE: i32 = 340;
const MT_UPDATE: i32 = 316;
const MT_STATUS: i32 = 318;
const MT_GLOBAL_STATUS: i32 = 319;
const MT_CTL: i32 = 330;
const MT_PING: i32 = 348;

fn msg_type_from_mt(mt: i32) -> MsgType {
    match mt {
        MT_IMAGE => MsgType::Image,
        MT_UPDATE => MsgType::Update,
        MT_STATUS => MsgType::Stale,
        MT_GLOBAL_STATUS => MsgType::GlobalStatus,
        MT_CTL => MsgType::Ctl,
        MT_PING => MsgType::Ping,
        _ => MsgType::Undef,
    }
}

fn mt_from_msg_type(ty: MsgType) -> i32 {
    match ty {
        MsgType::Image => MT_IMAGE,
        MsgType::Update => MT_UPDATE,
        MsgType::Stale => MT_STATUS,
        MsgType::GlobalStatus => MT_GLOBAL_STATUS,
        MsgType::Ctl => MT_CTL,
        MsgType::Ping => MT_PING,
        _ => 0,
    }
}

fn split_byte(text: &str, sep: u8) -> Vec<&str> {
    text.split(sep as char).collect()
}

#[derive(Debug, Default)]
pub struct MarketFeedCodec {
    scratch: Vec<u8>,
}

impl MarketFeedCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_message(text: &str, schema: &Schema) -> IoResult<(Header, FieldList)> {
        let start = text
            .find(FS as char)
            .ok_or_else(|| CodecError::BadFraming("no leading FS".into()))?;
        let body_text = &text[start + 1..];
        let mut records = split_byte(body_text, RS);
        if records.is_empty() {
            return Err(CodecError::BadFraming("empty marketfeed message".into()));
        }
        let header_record = records.remove(0);
        let (mt_and_svc, rest) = header_record
            .split_once(GS as char)
            .ok_or_else(|| CodecError::BadFraming("missing GS in header".into()))?;
        let mut mt_svc = split_byte(mt_and_svc, US);
        if mt_svc.len() < 2 {
            mt_svc.push("");
        }
        let mt: i32 = mt_svc[0].trim().parse().unwrap_or(0);
        let svc = mt_svc[1].to_string();
        let rest_parts = split_byte(rest, US);
        let tkr = rest_parts.first().copied().unwrap_or("").to_string();
        let rtl: i64 = rest_parts.get(1).and_then(|s| s.trim().parse().ok()).unwrap_or(0);
        let tag_str = rest_parts.get(2).copied().unwrap_or("").to_string();

        let mut header = Header::new(msg_type_from_mt(mt), svc, tkr);
        header.tag_str = tag_str;
        header.rtl = rtl;

        let mut body = FieldList::new();
        for record in records {
            if record.is_empty() {
                continue;
            }
            let (fid_str, value_str) = record
                .split_once(US as char)
                .ok_or_else(|| CodecError::BadFraming(format!("malformed field record {record:?}")))?;
            let fid: i32 = fid_str
                .trim()
                .parse()
                .map_err(|_| CodecError::BadFraming(format!("non-numeric fid {fid_str:?}")))?;
            let ty = schema.find_by_fid(fid).map(|e| e.ty).unwrap_or(FieldType::String);
            body.upsert(fid, ty, FieldValue::parse_ascii(value_str, ty));
        }
        if body.is_empty() && matches!(header.msg_type, MsgType::Image | MsgType::Update) {
            // A header with no field records on an Image/Update stream is
            // purely an acknowledgement; other message types are legitimately
            // field-less (Status, Ctl, Ping) and keep their own type.
            header.msg_type = MsgType::InsAck;
        }
        Ok((header, body))
    }
}

impl Framer for MarketFeedCodec {
    fn protocol(&self) -> Protocol {
        Protocol::MarketFeed
    }

    fn frame(&self, buf: &[u8]) -> FrameOutcome {
        let Some(first) = buf.iter().position(|&b| b == FS) else {
            return FrameOutcome::NeedMore { hint: None };
        };
        match buf[first + 1..].iter().position(|&b| b == FS) {
            Some(next) => FrameOutcome::Complete {
                len: first + 1 + next,
            },
            None => FrameOutcome::NeedMore { hint: None },
        }
    }
}

impl Codec for MarketFeedCodec {
    fn parse(&mut self, buf: &[u8], schema: &Schema) -> ParseOutcome {
        match self.frame(buf) {
            FrameOutcome::Complete { len } => {
                let text = match std::str::from_utf8(&buf[..len]) {
                    Ok(t) => t,
                    Err(_) => return ParseOutcome::BadFraming,
                };
                match Self::decode_message(text, schema) {
                    Ok((header, body)) => ParseOutcome::Parsed { consumed: len, header, body },
                    Err(_) => ParseOutcome::BadFraming,
                }
            }
            FrameOutcome::NeedMore { hint } => ParseOutcome::Incomplete { hint },
            FrameOutcome::BadFraming => ParseOutcome::BadFraming,
        }
    }

    fn parse_header(&mut self, buf: &[u8]) -> IoResult<Option<(usize, Header)>> {
        match self.frame(buf) {
            FrameOutcome::Complete { len } => {
                let text = std::str::from_utf8(&buf[..len])
                    .map_err(|_| CodecError::BadFraming("invalid utf-8".into()))?;
                let schema = Schema::default();
                let (header, _) = Self::decode_message(text, &schema)?;
                Ok(Some((len, header)))
            }
            FrameOutcome::NeedMore { .. } => Ok(None),
            FrameOutcome::BadFraming => Err(CodecError::BadFraming("marketfeed framing".into())),
        }
    }

    fn build(&mut self, header: &Header, body: &FieldList, _schema: &Schema) -> IoResult<&[u8]> {
        self.scratch.clear();
        let mut out = String::new();
        out.push(FS as char);
        out.push_str(&mt_from_msg_type(header.msg_type).to_string());
        out.push(US as char);
        out.push_str(&header.svc);
        out.push(GS as char);
        out.push_str(&header.tkr);
        out.push(US as char);
        out.push_str(&header.rtl.to_string());
        out.push(US as char);
        out.push_str(&header.tag_str);
        for field in body.iter() {
            out.push(RS as char);
            out.push_str(&field.fid.to_string());
            out.push(US as char);
            out.push_str(&field.value.to_ascii());
        }
        out.push(RS as char);
        self.scratch.extend_from_slice(out.as_bytes());
        Ok(&self.scratch)
    }

    fn ping(&mut self) -> &[u8] {
        self.scratch.clear();
        self.scratch.push(FS);
        self.scratch.extend_from_slice(MT_PING.to_string().as_bytes());
        self.scratch.push(US);
        self.scratch.push(GS);
        self.scratch.push(US);
        self.scratch.push(b'0');
        self.scratch.push(US);
        self.scratch.push(RS);
        &self.scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::builder()
            .field(22, "BID", FieldType::Double, 8)
            .field(25, "ASK", FieldType::Double, 8)
            .build()
            .unwrap()
    }

    #[test]
    fn round_trips_image_message() {
        let schema = schema();
        let mut header = Header::new(MsgType::Image, "NASDAQ", "AAPL");
        header.tag_str = "T1".into();
        header.rtl = 99;
        let mut body = FieldList::new();
        body.add(22, FieldType::Double, FieldValue::Double(120.55));
        body.add(25, FieldType::Double, FieldValue::Double(120.60));

        let mut codec = MarketFeedCodec::new();
        let wire = codec.build(&header, &body, &schema).unwrap().to_vec();
        // append the next message's leading FS so framing has something to stop at.
        let mut buf = wire.clone();
        buf.push(FS);

        let mut codec2 = MarketFeedCodec::new();
        match codec2.parse(&buf, &schema) {
            ParseOutcome::Parsed { consumed, header: h2, body: b2 } => {
                assert_eq!(consumed, wire.len());
                assert_eq!(h2.msg_type, MsgType::Image);
                assert_eq!(h2.svc, "NASDAQ");
                assert_eq!(h2.tkr, "AAPL");
                assert_eq!(h2.tag_str, "T1");
                assert_eq!(h2.rtl, 99);
                assert_eq!(b2.get(22), Some(&FieldValue::Double(120.55)));
            }
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn tolerates_leading_slop_before_first_fs() {
        let schema = schema();
        let mut header = Header::new(MsgType::Update, "NYSE", "IBM");
        let mut body = FieldList::new();
        body.add(22, FieldType::Double, FieldValue::Double(1.0));
        let mut codec = MarketFeedCodec::new();
        let wire = codec.build(&header, &body, &schema).unwrap().to_vec();
        header.rtl = 1;

        let mut buf = b"garbage-before-frame".to_vec();
        buf.extend_from_slice(&wire);
        buf.push(FS);

        let mut codec2 = MarketFeedCodec::new();
        match codec2.parse(&buf, &schema) {
            ParseOutcome::Parsed { header: h2, .. } => assert_eq!(h2.tkr, "IBM"),
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn header_only_message_decodes_as_insack() {
        let schema = schema();
        let header = Header::new(MsgType::Image, "NASDAQ", "AAPL");
        let mut codec = MarketFeedCodec::new();
        let wire = codec.build(&header, &FieldList::new(), &schema).unwrap().to_vec();
        let mut buf = wire;
        buf.push(FS);
        let mut codec2 = MarketFeedCodec::new();
        match codec2.parse(&buf, &schema) {
            ParseOutcome::Parsed { header: h2, body, .. } => {
                assert_eq!(h2.msg_type, MsgType::InsAck);
                assert!(body.is_empty());
            }
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn incomplete_without_closing_fs() {
        let schema = schema();
        let mut buf = vec![FS];
        buf.extend_from_slice(b"340\x1FNASDAQ\x1DAAPL");
        let mut codec = MarketFeedCodec::new();
        assert!(matches!(codec.parse(&buf, &schema), ParseOutcome::Incomplete { .. }));
    }

    #[test]
    fn header_only_status_message_keeps_its_type() {
        let schema = schema();
        let header = Header::new(MsgType::Stale, "NASDAQ", "AAPL");
        let mut codec = MarketFeedCodec::new();
        let wire = codec.build(&header, &FieldList::new(), &schema).unwrap().to_vec();
        let mut buf = wire;
        buf.push(FS);
        let mut codec2 = MarketFeedCodec::new();
        match codec2.parse(&buf, &schema) {
            ParseOutcome::Parsed { header: h2, body, .. } => {
                assert_eq!(h2.msg_type, MsgType::Stale);
                assert!(body.is_empty());
            }
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn decodes_the_literal_bytes_with_rtl_before_tag() {
        // RTL precedes Tag on the wire: `...US "7"(RTL) US "42"(Tag) RS...`.
        let schema = schema();
        let mut buf = vec![FS];
        buf.extend_from_slice(b"340");
        buf.push(US);
        buf.extend_from_slice(b"BLOOMBERG");
        buf.push(GS);
        buf.extend_from_slice(b"IBM EQUITY");
        buf.push(US);
        buf.extend_from_slice(b"7");
        buf.push(US);
        buf.extend_from_slice(b"42");
        buf.push(RS);
        buf.extend_from_slice(b"22");
        buf.push(US);
        buf.extend_from_slice(b"120.50");
        buf.push(RS);
        buf.extend_from_slice(b"25");
        buf.push(US);
        buf.extend_from_slice(b"120.55");
        buf.push(RS);
        buf.push(FS);

        let mut codec = MarketFeedCodec::new();
        match codec.parse(&buf, &schema) {
            ParseOutcome::Parsed { header, body, .. } => {
                assert_eq!(header.msg_type, MsgType::Image);
                assert_eq!(header.svc, "BLOOMBERG");
                assert_eq!(header.tkr, "IBM EQUITY");
                assert_eq!(header.rtl, 7);
                assert_eq!(header.tag_str, "42");
                assert_eq!(body.get(22), Some(&FieldValue::Double(120.50)));
                assert_eq!(body.get(25), Some(&FieldValue::Double(120.55)));
            }
            _ => panic!("expected Parsed"),
        }
    }
}
