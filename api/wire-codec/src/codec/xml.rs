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

//! XML framing: one element per message, named after the message's
//! [`MsgType`], with header fields as attributes and one self-closing
//! `<_FID v="..."/>` child per field. Only the fixed grammar below is
//! parsed; nothing here is a general-purpose XML parser and no external
//! document may be fed through it.
//!
//! ```text
//! <image Svc="NASDAQ" Name="AAPL" Tag="" RTL="12345" Time="0"><_22 v="120.55"/><_25 v="120.60"/></image>
//! ```
//!
//! Field values decode to [`FieldValue::String`] unless the codec was built
//! with [`XmlCodec::with_native_field`], in which case they take the
//! schema-declared native type.

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
use crate::header::Timestamp;
use crate::schema::Schema;
use crate::CodecError;
use crate::IoResult;

/// Element name for each message type, per the grammar's `Tag` enumeration.
/// `Undef`, `Dead`, `Recovering` and `GlobalStatus` have no dedicated name in
/// the grammar; they round-trip through a lowercase spelling of the variant.
const TAG_NAMES: &[(&str, MsgType)] = &[
    ("image", MsgType::Image),
    ("update", MsgType::Update),
    ("status", MsgType::Stale),
    ("mount", MsgType::Mount),
    ("open", MsgType::Open),
    ("close", MsgType::Close),
    ("ioctl", MsgType::Ctl),
    ("ping", MsgType::Ping),
    ("insert", MsgType::Insert),
    ("insAck", MsgType::InsAck),
    ("query", MsgType::Query),
    ("undef", MsgType::Undef),
    ("dead", MsgType::Dead),
    ("recovering", MsgType::Recovering),
    ("globalStatus", MsgType::GlobalStatus),
];

fn tag_name_for(ty: MsgType) -> &'static str {
    TAG_NAMES.iter().find(|(_, t)| *t == ty).map(|(name, _)| *name).unwrap_or("undef")
}

fn msg_type_for_tag(tag: &str) -> MsgType {
    TAG_NAMES.iter().find(|(name, _)| *name == tag).map(|(_, t)| *t).unwrap_or(MsgType::Undef)
}

/// Returns the element name starting right after `buf[open_lt]` (which must
/// be `<`), or `None` if the buffer ends before the name is terminated.
fn tag_name_at(text: &str, open_lt: usize) -> Option<&str> {
    let rest = &text[open_lt + 1..];
    let end = rest.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
    Some(&rest[..end])
}

fn format_time(ts: Timestamp) -> String {
    if ts.usec == 0 {
        ts.sec.to_string()
    } else {
        format!("{}.{:06}", ts.sec, ts.usec)
    }
}

fn parse_time(value: &str) -> Timestamp {
    match value.split_once('.') {
        Some((sec, usec)) => Timestamp {
            sec: sec.trim().parse().unwrap_or(0),
            usec: usec.trim().parse().unwrap_or(0),
        },
        None => Timestamp {
            sec: value.trim().parse().unwrap_or(0),
            usec: 0,
        },
    }
}

/// Escapes `&`, `<`, `>`, `"`, `'`, and any byte below `0x20` (other than
/// tab) as a numeric entity so the value cannot break attribute quoting.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' => out.push_str(&format!("&#{};", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn unescape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        let mut entity = String::new();
        let mut closed = false;
        for c2 in chars.by_ref() {
            if c2 == ';' {
                closed = true;
                break;
            }
            entity.push(c2);
        }
        if !closed {
            out.push('&');
            out.push_str(&entity);
            continue;
        }
        match entity.as_str() {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            s if s.starts_with('#') => {
                if let Ok(code) = s[1..].parse::<u32>() {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            other => {
                out.push('&');
                out.push_str(other);
                out.push(';');
            }
        }
    }
    out
}

/// Pulls `name="value"` pairs out of a tag's attribute span. Does not handle
/// namespaces or unquoted attributes: the grammar this parses never emits
/// them.
fn parse_attrs(span: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let bytes = span.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && bytes[i] != b'=' && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || name_start == i {
            break;
        }
        let name = &span[name_start..i];
        while i < bytes.len() && bytes[i] != b'"' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        i += 1; // opening quote
        let val_start = i;
        while i < bytes.len() && bytes[i] != b'"' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let value = unescape_attr(&span[val_start..i]);
        i += 1; // closing quote
        out.push((name.to_string(), value));
    }
    out
}

#[derive(Debug, Default)]
pub struct XmlCodec {
    scratch: Vec<u8>,
    native_field: bool,
}

impl XmlCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes field values to their schema-declared native type instead of
    /// the default `String`. Mirrors `nativeField` mode on the MarketFeed
    /// framing.
    pub fn with_native_field(mut self, enabled: bool) -> Self {
        self.native_field = enabled;
        self
    }

    fn decode_message(&self, text: &str, schema: &Schema) -> IoResult<(Header, FieldList)> {
        let open_lt = text
            .find('<')
            .ok_or_else(|| CodecError::BadFraming("missing root element".into()))?;
        let tag = tag_name_at(text, open_lt)
            .ok_or_else(|| CodecError::BadFraming("unterminated root tag name".into()))?
            .to_string();
        let open_end = text[open_lt..]
            .find('>')
            .map(|p| open_lt + p)
            .ok_or_else(|| CodecError::BadFraming("unterminated root open tag".into()))?;
        let self_closing = text.as_bytes()[open_end - 1] == b'/';
        let attr_span_end = if self_closing { open_end - 1 } else { open_end };
        let attrs = parse_attrs(&text[open_lt + 1 + tag.len()..attr_span_end]);

        let mut header = Header::new(msg_type_for_tag(&tag), "", "");
        for (name, value) in &attrs {
            match name.as_str() {
                "Svc" => header.svc = value.clone(),
                "Name" => header.tkr = value.clone(),
                "Tag" => header.tag_str = value.clone(),
                "RTL" => header.rtl = value.parse().unwrap_or(0),
                "Time" => header.tstamp = parse_time(value),
                "Error" => header.err = value.clone(),
                _ => {}
            }
        }

        let mut body = FieldList::new();
        if !self_closing {
            let body_text = &text[open_end + 1..];
            let mut pos = 0;
            while let Some(tag_start) = body_text[pos..].find("<_") {
                let tag_start = pos + tag_start;
                let tag_end = body_text[tag_start..]
                    .find('>')
                    .map(|p| tag_start + p)
                    .ok_or_else(|| CodecError::BadFraming("unterminated field tag".into()))?;
                let inner = &body_text[tag_start + 2..if body_text.as_bytes()[tag_end - 1] == b'/' {
                    tag_end - 1
                } else {
                    tag_end
                }];
                let (fid_str, attr_span) = match inner.find(char::is_whitespace) {
                    Some(sp) => (&inner[..sp], &inner[sp..]),
                    None => (inner, ""),
                };
                let fid: i32 = fid_str
                    .parse()
                    .map_err(|_| CodecError::BadFraming(format!("non-numeric field tag _{fid_str}")))?;
                let value_text = parse_attrs(attr_span)
                    .into_iter()
                    .find(|(n, _)| n == "v")
                    .map(|(_, v)| v)
                    .unwrap_or_default();
                let ty = if self.native_field {
                    schema.find_by_fid(fid).map(|e| e.ty).unwrap_or(FieldType::String)
                } else {
                    FieldType::String
                };
                body.upsert(fid, ty, FieldValue::parse_ascii(&value_text, ty));
                pos = tag_end + 1;
            }
        }
        Ok((header, body))
    }
}

impl Framer for XmlCodec {
    fn protocol(&self) -> Protocol {
        Protocol::Xml
    }

    fn frame(&self, buf: &[u8]) -> FrameOutcome {
        let Ok(text) = std::str::from_utf8(buf) else {
            return FrameOutcome::BadFraming;
        };
        let Some(open_lt) = text.find('<') else {
            return FrameOutcome::NeedMore { hint: None };
        };
        if text.as_bytes().get(open_lt + 1) == Some(&b'/') {
            return FrameOutcome::BadFraming;
        }
        let Some(tag) = tag_name_at(text, open_lt) else {
            return FrameOutcome::NeedMore { hint: None };
        };
        let Some(open_end) = text[open_lt..].find('>').map(|p| open_lt + p) else {
            return FrameOutcome::NeedMore { hint: None };
        };
        if text.as_bytes()[open_end - 1] == b'/' {
            return FrameOutcome::Complete { len: open_end + 1 };
        }
        let close_tag = format!("</{tag}>");
        match text[open_end..].find(close_tag.as_str()) {
            Some(close) => FrameOutcome::Complete {
                len: open_end + close + close_tag.len(),
            },
            None => FrameOutcome::NeedMore { hint: None },
        }
    }
}

impl Codec for XmlCodec {
    fn parse(&mut self, buf: &[u8], schema: &Schema) -> ParseOutcome {
        match self.frame(buf) {
            FrameOutcome::Complete { len } => {
                let text = match std::str::from_utf8(&buf[..len]) {
                    Ok(t) => t,
                    Err(_) => return ParseOutcome::BadFraming,
                };
                match self.decode_message(text, schema) {
                    Ok((header, body)) => ParseOutcome::Parsed {
                        consumed: len,
                        header,
                        body,
                    },
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
                let (header, _) = self.decode_message(text, &schema)?;
                Ok(Some((len, header)))
            }
            FrameOutcome::NeedMore { .. } => Ok(None),
            FrameOutcome::BadFraming => Err(CodecError::BadFraming("xml framing".into())),
        }
    }

    fn build(&mut self, header: &Header, body: &FieldList, _schema: &Schema) -> IoResult<&[u8]> {
        self.scratch.clear();
        let tag = tag_name_for(header.msg_type);
        let mut out = String::new();
        out.push('<');
        out.push_str(tag);
        out.push_str(" Svc=\"");
        out.push_str(&escape_attr(&header.svc));
        out.push_str("\" Name=\"");
        out.push_str(&escape_attr(&header.tkr));
        out.push_str("\" Tag=\"");
        out.push_str(&escape_attr(&header.tag_str));
        out.push_str("\" RTL=\"");
        out.push_str(&header.rtl.to_string());
        out.push_str("\" Time=\"");
        out.push_str(&format_time(header.tstamp));
        out.push('"');
        if !header.err.is_empty() {
            out.push_str(" Error=\"");
            out.push_str(&escape_attr(&header.err));
            out.push('"');
        }
        if body.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for field in body.iter() {
                out.push_str(&format!(
                    "<_{} v=\"{}\"/>",
                    field.fid,
                    escape_attr(&field.value.to_ascii())
                ));
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        self.scratch.extend_from_slice(out.as_bytes());
        Ok(&self.scratch)
    }

    fn ping(&mut self) -> &[u8] {
        self.scratch.clear();
        self.scratch
            .extend_from_slice(b"<ping Svc=\"\" Name=\"\" Tag=\"\" RTL=\"0\" Time=\"0\"/>");
        &self.scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

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
        header.rtl = 7;
        let mut body = FieldList::new();
        body.add(22, FieldType::Double, FieldValue::Double(120.55));
        body.add(25, FieldType::Double, FieldValue::Double(120.60));

        let mut codec = XmlCodec::new();
        let wire = codec.build(&header, &body, &schema).unwrap().to_vec();
        assert!(String::from_utf8_lossy(&wire).starts_with("<image "));

        let mut codec2 = XmlCodec::new();
        match codec2.parse(&wire, &schema) {
            ParseOutcome::Parsed { consumed, header: h2, body: b2 } => {
                assert_eq!(consumed, wire.len());
                assert_eq!(h2.msg_type, MsgType::Image);
                assert_eq!(h2.svc, "NASDAQ");
                assert_eq!(h2.tkr, "AAPL");
                assert_eq!(h2.rtl, 7);
                assert_eq!(b2.get(22), Some(&FieldValue::String("120.55".into())));
            }
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn decodes_a_non_image_tag_by_its_element_name() {
        let schema = schema();
        let header = Header::new(MsgType::Stale, "NASDAQ", "AAPL");
        let mut codec = XmlCodec::new();
        let wire = codec.build(&header, &FieldList::new(), &schema).unwrap().to_vec();
        assert!(String::from_utf8_lossy(&wire).starts_with("<status "));

        let mut codec2 = XmlCodec::new();
        match codec2.parse(&wire, &schema) {
            ParseOutcome::Parsed { header: h2, .. } => assert_eq!(h2.msg_type, MsgType::Stale),
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn escapes_special_characters_in_attributes() {
        let schema = Schema::default();
        let header = Header::new(MsgType::Update, "A&B", "<T>");
        let mut codec = XmlCodec::new();
        let wire = codec.build(&header, &FieldList::new(), &schema).unwrap().to_vec();
        let text = String::from_utf8(wire.clone()).unwrap();
        assert!(text.contains("A&amp;B"));
        assert!(text.contains("&lt;T&gt;"));

        let mut codec2 = XmlCodec::new();
        match codec2.parse(&wire, &schema) {
            ParseOutcome::Parsed { header: h2, .. } => {
                assert_eq!(h2.svc, "A&B");
                assert_eq!(h2.tkr, "<T>");
            }
            _ => panic!("expected Parsed"),
        }
    }

    #[test]
    fn incomplete_buffer_requests_more() {
        let schema = Schema::default();
        let partial = b"<image Svc=\"X\" Name=\"Y\" Tag=\"\" RTL=\"0\" Time=\"0\">";
        let mut codec = XmlCodec::new();
        assert!(matches!(
            codec.parse(partial, &schema),
            ParseOutcome::Incomplete { .. }
        ));
    }

    // Scenario S5: values decode as String by default, and take the
    // schema-declared native type only with `nativeField` enabled.
    #[test]
    fn decodes_fields_as_string_unless_native_field_is_enabled() {
        let schema = schema();
        let text = br#"<update Svc="S" Name="N" Tag="1" RTL="1" Time="0"><_22 v="9.5"/></update>"#;

        let mut codec = XmlCodec::new();
        match codec.parse(text, &schema) {
            ParseOutcome::Parsed { header, body, .. } => {
                assert_eq!(header.msg_type, MsgType::Update);
                assert_eq!(header.tkr, "N");
                assert_eq!(header.tag_str, "1");
                assert_eq!(header.rtl, 1);
                assert_eq!(body.get(22), Some(&FieldValue::String("9.5".into())));
            }
            _ => panic!("expected Parsed"),
        }

        let mut native = XmlCodec::new().with_native_field(true);
        match native.parse(text, &schema) {
            ParseOutcome::Parsed { body, .. } => {
                assert_eq!(body.get(22), Some(&FieldValue::Double(9.5)));
            }
            _ => panic!("expected Parsed"),
        }
    }
}
