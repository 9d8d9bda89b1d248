// Copyright 2023 cotendo-sdk authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! DNS record model of the ADNS domain configuration.
//!
//! A [`Record`] groups the [`DnsResult`] values of one kind under one host, e.g. all
//! A results for `www`. SOA and NS are provider infrastructure: they are never
//! held as records and are regenerated with a fixed reference on serialization.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use crate::error::CotendoError;
use crate::utils::xml::Element;

/// Domain every SOA and NS record points at.
pub const REFERENCE_DOMAIN: &str = "cotdns.net.";
pub const DEFAULT_TTL: u32 = 1800;
pub const DEFAULT_A_TTL: u32 = 10800;
pub const DEFAULT_MX_PREFERENCE: u32 = 20;

const RESULT_TAG: &str = "result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Soa,
    Ns,
    A,
    Cname,
    Mx,
    Ptr,
    Txt,
    Srv,
}

/// Canonical order of zone entries.
const SORT_ORDER: [RecordKind; 6] = [
    RecordKind::A,
    RecordKind::Cname,
    RecordKind::Mx,
    RecordKind::Ptr,
    RecordKind::Txt,
    RecordKind::Srv,
];

type ResultParser = fn(&Element) -> Result<DnsResult, CotendoError>;

struct KindEntry {
    tag: &'static str,
    kind: RecordKind,
    /// `None` for provider-managed kinds, which are regenerated instead of parsed.
    parse: Option<ResultParser>,
}

/// Tag → kind/constructor registry used when reading provider documents.
static KIND_TABLE: [KindEntry; 8] = [
    KindEntry { tag: "soa", kind: RecordKind::Soa, parse: None },
    KindEntry { tag: "ns", kind: RecordKind::Ns, parse: None },
    KindEntry { tag: "a", kind: RecordKind::A, parse: Some(parse_a) },
    KindEntry { tag: "cname", kind: RecordKind::Cname, parse: Some(parse_cname) },
    KindEntry { tag: "mx", kind: RecordKind::Mx, parse: Some(parse_mx) },
    KindEntry { tag: "ptr", kind: RecordKind::Ptr, parse: Some(parse_ptr) },
    KindEntry { tag: "txt", kind: RecordKind::Txt, parse: Some(parse_txt) },
    KindEntry { tag: "srv", kind: RecordKind::Srv, parse: Some(parse_srv) },
];

fn kind_entry(kind: RecordKind) -> &'static KindEntry {
    // every variant has a row
    KIND_TABLE
        .iter()
        .find(|entry| entry.kind == kind)
        .unwrap_or(&KIND_TABLE[0])
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        kind_entry(*self).tag
    }

    /// Looks a document tag up in the kind table. Tags are matched case-insensitively.
    pub fn from_tag(tag: &str) -> Result<Self, CotendoError> {
        let tag = tag.to_ascii_lowercase();
        KIND_TABLE
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.kind)
            .ok_or(CotendoError::UnknownRecordKind(tag))
    }

    /// SOA and NS: fixed, provider-managed, never part of the editable entries.
    pub fn is_reference(&self) -> bool {
        matches!(self, RecordKind::Soa | RecordKind::Ns)
    }

    /// Position in the canonical entry order.
    pub fn rank(&self) -> usize {
        SORT_ORDER
            .iter()
            .position(|kind| kind == self)
            .unwrap_or(SORT_ORDER.len())
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = CotendoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::from_tag(s)
    }
}

/// One value attached to a record. Each variant carries only the fields its kind uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DnsResult {
    A { ip: String, ttl: u32 },
    Cname { domain: String, ttl: u32 },
    Ptr { domain: String, ttl: u32 },
    Mx { domain: String, preference: u32, ttl: u32 },
    Txt { text: String, ttl: u32 },
    Srv {
        domain: String,
        priority: u32,
        weight: u32,
        port: u32,
        target: String,
        ttl: u32,
    },
}

impl DnsResult {
    pub fn a(ip: impl Into<String>) -> Self {
        DnsResult::A { ip: ip.into(), ttl: DEFAULT_A_TTL }
    }

    pub fn cname(domain: impl Into<String>) -> Self {
        DnsResult::Cname { domain: domain.into(), ttl: DEFAULT_TTL }
    }

    pub fn ptr(domain: impl Into<String>) -> Self {
        DnsResult::Ptr { domain: domain.into(), ttl: DEFAULT_TTL }
    }

    pub fn mx(domain: impl Into<String>, preference: u32) -> Self {
        DnsResult::Mx { domain: domain.into(), preference, ttl: DEFAULT_TTL }
    }

    pub fn txt(text: impl Into<String>) -> Self {
        DnsResult::Txt { text: text.into(), ttl: DEFAULT_TTL }
    }

    pub fn srv(domain: impl Into<String>, priority: u32, weight: u32, port: u32, target: impl Into<String>) -> Self {
        DnsResult::Srv {
            domain: domain.into(),
            priority,
            weight,
            port,
            target: target.into(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Replaces the ttl.
    pub fn with_ttl(mut self, value: u32) -> Self {
        match &mut self {
            DnsResult::A { ttl, .. }
            | DnsResult::Cname { ttl, .. }
            | DnsResult::Ptr { ttl, .. }
            | DnsResult::Mx { ttl, .. }
            | DnsResult::Txt { ttl, .. }
            | DnsResult::Srv { ttl, .. } => *ttl = value,
        }
        self
    }

    pub fn ttl(&self) -> u32 {
        match self {
            DnsResult::A { ttl, .. }
            | DnsResult::Cname { ttl, .. }
            | DnsResult::Ptr { ttl, .. }
            | DnsResult::Mx { ttl, .. }
            | DnsResult::Txt { ttl, .. }
            | DnsResult::Srv { ttl, .. } => *ttl,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            DnsResult::A { .. } => RecordKind::A,
            DnsResult::Cname { .. } => RecordKind::Cname,
            DnsResult::Ptr { .. } => RecordKind::Ptr,
            DnsResult::Mx { .. } => RecordKind::Mx,
            DnsResult::Txt { .. } => RecordKind::Txt,
            DnsResult::Srv { .. } => RecordKind::Srv,
        }
    }

    /// Provider attribute names and values, in emission order.
    fn attributes(&self) -> Vec<(&'static str, String)> {
        match self {
            DnsResult::A { ip, ttl } => vec![("ip", ip.clone()), ("ttl", ttl.to_string())],
            DnsResult::Cname { domain, ttl } | DnsResult::Ptr { domain, ttl } => {
                vec![("domain_name", domain.clone()), ("ttl", ttl.to_string())]
            }
            DnsResult::Mx { domain, preference, ttl } => vec![
                ("domain_name", domain.clone()),
                ("preference", preference.to_string()),
                ("ttl", ttl.to_string()),
            ],
            DnsResult::Txt { text, ttl } => vec![("text", text.clone()), ("ttl", ttl.to_string())],
            DnsResult::Srv { domain, priority, weight, port, target, ttl } => vec![
                ("domain_name", domain.clone()),
                ("priority", priority.to_string()),
                ("weight", weight.to_string()),
                ("port", port.to_string()),
                ("target", target.clone()),
                ("ttl", ttl.to_string()),
            ],
        }
    }

    fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), CotendoError> {
        let mut element = BytesStart::new(RESULT_TAG);
        for (key, value) in self.attributes() {
            element.push_attribute((key, value.as_str()));
        }
        writer.write_event(Event::Empty(element))?;
        Ok(())
    }
}

/// Accessors over one `<result>` element. Integer attributes parse or fail.
struct ResultAttrs<'a> {
    tag: &'static str,
    element: &'a Element,
}

impl<'a> ResultAttrs<'a> {
    fn text(&self, key: &str) -> Result<String, CotendoError> {
        self.element
            .attribute(key)
            .map(str::to_string)
            .ok_or_else(|| CotendoError::malformed(self.tag, format!("result is missing `{}`", key)))
    }

    fn number(&self, key: &str, default: Option<u32>) -> Result<u32, CotendoError> {
        match (self.element.attribute(key), default) {
            (Some(raw), _) => raw.trim().parse::<u32>().map_err(|e| {
                CotendoError::malformed(self.tag, format!("`{}` is not a number ({:?}): {}", key, raw, e))
            }),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(CotendoError::malformed(self.tag, format!("result is missing `{}`", key))),
        }
    }

    fn ttl(&self, default: u32) -> Result<u32, CotendoError> {
        let ttl = self.number("ttl", Some(default))?;
        if ttl == 0 {
            return Err(CotendoError::malformed(self.tag, "ttl must be positive"));
        }
        Ok(ttl)
    }
}

fn parse_a(element: &Element) -> Result<DnsResult, CotendoError> {
    let attrs = ResultAttrs { tag: "a", element };
    Ok(DnsResult::A {
        ip: attrs.text("ip")?,
        ttl: attrs.ttl(DEFAULT_A_TTL)?,
    })
}

fn parse_cname(element: &Element) -> Result<DnsResult, CotendoError> {
    let attrs = ResultAttrs { tag: "cname", element };
    Ok(DnsResult::Cname {
        domain: attrs.text("domain_name")?,
        ttl: attrs.ttl(DEFAULT_TTL)?,
    })
}

fn parse_ptr(element: &Element) -> Result<DnsResult, CotendoError> {
    let attrs = ResultAttrs { tag: "ptr", element };
    Ok(DnsResult::Ptr {
        domain: attrs.text("domain_name")?,
        ttl: attrs.ttl(DEFAULT_TTL)?,
    })
}

/// `preference` may be omitted and then reads as [`DEFAULT_MX_PREFERENCE`], the value
/// the provider assigns to new MX results. When present it must be an integer.
fn parse_mx(element: &Element) -> Result<DnsResult, CotendoError> {
    let attrs = ResultAttrs { tag: "mx", element };
    Ok(DnsResult::Mx {
        domain: attrs.text("domain_name")?,
        preference: attrs.number("preference", Some(DEFAULT_MX_PREFERENCE))?,
        ttl: attrs.ttl(DEFAULT_TTL)?,
    })
}

fn parse_txt(element: &Element) -> Result<DnsResult, CotendoError> {
    let attrs = ResultAttrs { tag: "txt", element };
    Ok(DnsResult::Txt {
        text: attrs.text("text")?,
        ttl: attrs.ttl(DEFAULT_TTL)?,
    })
}

fn parse_srv(element: &Element) -> Result<DnsResult, CotendoError> {
    let attrs = ResultAttrs { tag: "srv", element };
    Ok(DnsResult::Srv {
        domain: attrs.text("domain_name")?,
        priority: attrs.number("priority", None)?,
        weight: attrs.number("weight", None)?,
        port: attrs.number("port", None)?,
        target: attrs.text("target")?,
        ttl: attrs.ttl(DEFAULT_TTL)?,
    })
}

/// A group of results sharing one host and one kind.
///
/// The kind is fixed at construction; SOA and NS cannot be built as records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(rename = "type")]
    kind: RecordKind,
    host: String,
    results: Vec<DnsResult>,
}

impl Record {
    /// Creates an empty record.
    pub fn new(kind: RecordKind, host: impl Into<String>) -> Result<Self, CotendoError> {
        if kind.is_reference() {
            return Err(CotendoError::ReservedKind(kind));
        }
        Ok(Self {
            kind,
            host: host.into(),
            results: Vec::new(),
        })
    }

    /// Builds a record from a document element such as `<a host="www"><result .../></a>`.
    ///
    /// Either every result parses or the record is rejected.
    pub fn from_element(element: &Element) -> Result<Self, CotendoError> {
        let kind = RecordKind::from_tag(element.local_name())?;
        let entry = kind_entry(kind);
        let parse = entry.parse.ok_or(CotendoError::ReservedKind(kind))?;

        let host = element
            .attribute("host")
            .ok_or_else(|| CotendoError::malformed(entry.tag, "missing `host` attribute"))?;

        let mut record = Record::new(kind, host)?;
        for child in element.children() {
            if child.local_name().eq_ignore_ascii_case("comment") {
                continue;
            }
            if !child.local_name().eq_ignore_ascii_case(RESULT_TAG) {
                return Err(CotendoError::malformed(
                    entry.tag,
                    format!("unexpected <{}> inside record", child.name()),
                ));
            }
            record.results.push(parse(child)?);
        }
        Ok(record)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn results(&self) -> &[DnsResult] {
        &self.results
    }

    /// Appends a result; it must be of this record's kind and carry a positive ttl.
    pub fn push_result(&mut self, result: DnsResult) -> Result<(), CotendoError> {
        if result.kind() != self.kind {
            return Err(CotendoError::KindMismatch {
                record: self.kind,
                result: result.kind(),
            });
        }
        if result.ttl() == 0 {
            return Err(CotendoError::malformed(self.kind.as_str(), "ttl must be positive"));
        }
        self.results.push(result);
        Ok(())
    }

    pub fn with_result(mut self, result: DnsResult) -> Result<Self, CotendoError> {
        self.push_result(result)?;
        Ok(self)
    }

    /// Removes every result equal to `result`; returns whether anything was removed.
    pub fn remove_result(&mut self, result: &DnsResult) -> bool {
        let before = self.results.len();
        self.results.retain(|r| r != result);
        self.results.len() != before
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), CotendoError> {
        let tag = self.kind.as_str();
        let mut start = BytesStart::new(tag);
        start.push_attribute(("host", self.host.as_str()));

        if self.results.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for result in &self.results {
            result.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }
}

/// Emits the fixed SOA or NS element: `<soa><reference domain_name="cotdns.net."/></soa>`.
pub(crate) fn write_reference<W: Write>(writer: &mut Writer<W>, kind: RecordKind) -> Result<(), CotendoError> {
    let tag = kind.as_str();
    let mut start = BytesStart::new(tag);
    if kind == RecordKind::Ns {
        start.push_attribute(("host", ""));
    }
    writer.write_event(Event::Start(start))?;

    let mut reference = BytesStart::new("reference");
    reference.push_attribute(("domain_name", REFERENCE_DOMAIN));
    writer.write_event(Event::Empty(reference))?;

    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
