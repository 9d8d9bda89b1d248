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

use std::collections::BTreeSet;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use serde::Serialize;
use tracing::debug;
use crate::client::RawConfig;
use crate::error::CotendoError;
use crate::records::{write_reference, DnsResult, Record, RecordKind};
use crate::utils::xml::{document_writer, finish, parse_document};

const DEFAULT_ROOT: &str = "xml";
const DEFAULT_CONTAINER: &str = "resource_records";

/// The domain configuration of one ADNS zone, as fetched with `dns_get_conf`.
///
/// Holds the editable entries (SOA and NS excluded) and the version token that has
/// to be echoed back on commit. A zone lives for one fetch → modify → commit cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DnsZone {
    token: String,
    #[serde(skip)]
    root_tag: String,
    #[serde(skip)]
    container_tag: String,
    entries: Vec<Record>,
}

/// Results that differ between a stored record and an incoming one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordDiff {
    pub added: BTreeSet<DnsResult>,
    pub removed: BTreeSet<DnsResult>,
}

impl RecordDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl DnsZone {
    /// Creates a zone with no entries, for a domain that has no configuration yet.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            root_tag: DEFAULT_ROOT.to_string(),
            container_tag: DEFAULT_CONTAINER.to_string(),
            entries: Vec::new(),
        }
    }

    /// Parses a provider document.
    ///
    /// The first element under the root holds the records. SOA, NS and comments are
    /// skipped; any other tag must be a known kind. Entries keep document order.
    pub fn parse(token: impl Into<String>, body: &str) -> Result<Self, CotendoError> {
        let root = parse_document(body)?;
        let container = root
            .children()
            .next()
            .ok_or_else(|| CotendoError::MalformedDocument(format!("<{}> has no record container", root.name())))?;

        let mut entries = Vec::new();
        for child in container.children() {
            if child.local_name().eq_ignore_ascii_case("comment") {
                continue;
            }
            if RecordKind::from_tag(child.local_name())?.is_reference() {
                continue;
            }
            entries.push(Record::from_element(child)?);
        }

        debug!(entries = entries.len(), container = container.name(), "parsed DNS zone");

        Ok(Self {
            token: token.into(),
            root_tag: root.name().to_string(),
            container_tag: container.name().to_string(),
            entries,
        })
    }

    pub fn from_raw(raw: &RawConfig) -> Result<Self, CotendoError> {
        Self::parse(raw.token.as_str(), &raw.body)
    }

    /// Version token to pass back unchanged on commit.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn entries(&self) -> &[Record] {
        &self.entries
    }

    fn position(&self, kind: RecordKind, host: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|record| record.kind() == kind && record.host() == host)
    }

    /// First entry with this kind and host.
    pub fn lookup(&self, kind: RecordKind, host: &str) -> Option<&Record> {
        self.position(kind, host).map(|index| &self.entries[index])
    }

    /// Adds `record`, or replaces the contents of the entry with the same kind and host,
    /// then restores canonical order.
    pub fn upsert(&mut self, record: Record) {
        let replaced = match self.position(record.kind(), record.host()) {
            Some(index) => {
                self.entries[index] = record;
                true
            }
            None => {
                self.entries.push(record);
                false
            }
        };
        debug!(replaced, entries = self.entries.len(), "upserted record");
        self.sort();
    }

    /// Removes the entry with this kind and host. Absent entries are a no-op.
    pub fn delete(&mut self, kind: RecordKind, host: &str) -> Option<Record> {
        let removed = self.position(kind, host).map(|index| self.entries.remove(index));
        debug!(%kind, host, removed = removed.is_some(), "deleted record");
        removed
    }

    /// Compares `record` against the stored record with the same key.
    pub fn diff(&self, record: &Record) -> Result<RecordDiff, CotendoError> {
        let stored = self
            .lookup(record.kind(), record.host())
            .ok_or_else(|| CotendoError::NotComparable {
                kind: record.kind(),
                host: record.host().to_string(),
            })?;

        let current: BTreeSet<&DnsResult> = stored.results().iter().collect();
        let incoming: BTreeSet<&DnsResult> = record.results().iter().collect();

        Ok(RecordDiff {
            added: incoming.difference(&current).map(|r| (*r).clone()).collect(),
            removed: current.difference(&incoming).map(|r| (*r).clone()).collect(),
        })
    }

    /// Canonical order: a, cname, mx, ptr, txt, srv, then host ascending within a kind.
    pub fn sort(&mut self) {
        self.entries.sort_by(|left, right| {
            left.kind()
                .rank()
                .cmp(&right.kind().rank())
                .then_with(|| left.host().cmp(right.host()))
        });
    }

    /// Renders the provider document: SOA, NS, then the entries in their current order.
    pub fn serialize(&self) -> Result<String, CotendoError> {
        let mut writer = document_writer()?;
        writer.write_event(Event::Start(BytesStart::new(self.root_tag.as_str())))?;
        writer.write_event(Event::Start(BytesStart::new(self.container_tag.as_str())))?;

        write_reference(&mut writer, RecordKind::Soa)?;
        write_reference(&mut writer, RecordKind::Ns)?;
        for record in &self.entries {
            record.write(&mut writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new(self.container_tag.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new(self.root_tag.as_str())))?;
        finish(writer)
    }

    /// Consumes the zone into the token/body pair expected by `commit`.
    pub fn into_commit(self) -> Result<RawConfig, CotendoError> {
        let body = self.serialize()?;
        Ok(RawConfig { token: self.token, body })
    }

    /// JSON listing of the entries, for display.
    pub fn to_json(&self) -> Result<String, CotendoError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<xml>
  <resource_records>
    <soa><reference domain_name="cotdns.net."/></soa>
    <ns host=""><reference domain_name="cotdns.net."/></ns>
    <!-- mail -->
    <txt host="@"><result text="v=spf1 -all" ttl="1800"/></txt>
    <cname host="ftp"><result domain_name="www.example.com" ttl="1800"/></cname>
    <a host="www"><result ip="10.0.0.1" ttl="3600"/></a>
    <comment>managed by ops</comment>
    <a host="api"><result ip="10.0.0.2" ttl="3600"/><result ip="10.0.0.3" ttl="3600"/></a>
    <mx host=""><result domain_name="mail.example.com." preference="10" ttl="1800"/></mx>
    <srv host="_sip._tcp"><result domain_name="example.com." priority="10" weight="5" port="5060" target="sip.example.com." ttl="1800"/></srv>
    <ptr host="1"><result domain_name="www.example.com." ttl="86400"/></ptr>
  </resource_records>
</xml>"#;

    fn zone() -> DnsZone {
        DnsZone::parse("token-1", DOC).unwrap()
    }

    fn keys(zone: &DnsZone) -> Vec<(RecordKind, String)> {
        zone.entries()
            .iter()
            .map(|r| (r.kind(), r.host().to_string()))
            .collect()
    }

    fn a_record(host: &str, ip: &str) -> Record {
        Record::new(RecordKind::A, host)
            .unwrap()
            .with_result(DnsResult::a(ip))
            .unwrap()
    }

    #[test]
    fn parse_keeps_document_order_and_skips_infrastructure() {
        let zone = zone();
        assert_eq!(zone.token(), "token-1");
        assert_eq!(
            keys(&zone),
            vec![
                (RecordKind::Txt, "@".to_string()),
                (RecordKind::Cname, "ftp".to_string()),
                (RecordKind::A, "www".to_string()),
                (RecordKind::A, "api".to_string()),
                (RecordKind::Mx, "".to_string()),
                (RecordKind::Srv, "_sip._tcp".to_string()),
                (RecordKind::Ptr, "1".to_string()),
            ]
        );
    }

    #[test]
    fn parse_fails_on_unknown_kind() {
        let doc = r#"<xml><rr><a host="www"><result ip="1.1.1.1"/></a><aaaa host="www"/></rr></xml>"#;
        assert!(matches!(
            DnsZone::parse("t", doc),
            Err(CotendoError::UnknownRecordKind(ref tag)) if tag == "aaaa"
        ));
    }

    #[test]
    fn parse_fails_on_malformed_record() {
        let doc = r#"<xml><rr><mx host=""><result domain_name="m" preference="high"/></mx></rr></xml>"#;
        assert!(matches!(
            DnsZone::parse("t", doc),
            Err(CotendoError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn parse_requires_a_container() {
        assert!(matches!(
            DnsZone::parse("t", "<xml/>"),
            Err(CotendoError::MalformedDocument(_))
        ));
    }

    #[test]
    fn sort_orders_by_kind_then_host_and_is_idempotent() {
        let mut zone = zone();
        zone.sort();
        let once = keys(&zone);
        assert_eq!(
            once,
            vec![
                (RecordKind::A, "api".to_string()),
                (RecordKind::A, "www".to_string()),
                (RecordKind::Cname, "ftp".to_string()),
                (RecordKind::Mx, "".to_string()),
                (RecordKind::Ptr, "1".to_string()),
                (RecordKind::Txt, "@".to_string()),
                (RecordKind::Srv, "_sip._tcp".to_string()),
            ]
        );

        for pair in zone.entries().windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            assert!(
                left.kind().rank() < right.kind().rank()
                    || (left.kind() == right.kind() && left.host() <= right.host())
            );
        }

        zone.sort();
        assert_eq!(keys(&zone), once);
    }

    #[test]
    fn upsert_appends_new_record() {
        let mut zone = zone();
        let before = zone.entries().len();
        let record = a_record("mail", "10.0.0.9");

        assert!(zone.lookup(RecordKind::A, "mail").is_none());
        zone.upsert(record.clone());

        assert_eq!(zone.entries().len(), before + 1);
        assert_eq!(zone.lookup(RecordKind::A, "mail"), Some(&record));
        assert_eq!(zone.entries()[1], record);
    }

    #[test]
    fn upsert_replaces_existing_contents() {
        let mut zone = zone();
        let before = zone.entries().len();
        let record = a_record("www", "192.168.0.1");

        zone.upsert(record.clone());

        assert_eq!(zone.entries().len(), before);
        assert_eq!(zone.lookup(RecordKind::A, "www"), Some(&record));
    }

    #[test]
    fn delete_removes_match_and_ignores_absent() {
        let mut zone = zone();
        let before = zone.entries().len();

        let removed = zone.delete(RecordKind::Cname, "ftp");
        assert_eq!(removed.map(|r| r.host().to_string()), Some("ftp".to_string()));
        assert!(zone.lookup(RecordKind::Cname, "ftp").is_none());
        assert_eq!(zone.entries().len(), before - 1);

        let snapshot = keys(&zone);
        assert!(zone.delete(RecordKind::Cname, "ftp").is_none());
        assert!(zone.delete(RecordKind::Srv, "nowhere").is_none());
        assert_eq!(keys(&zone), snapshot);
    }

    #[test]
    fn diff_reports_added_and_removed_results() {
        let mut zone = DnsZone::new("t");
        zone.upsert(a_record("www", "1.1.1.1"));

        let diff = zone.diff(&a_record("www", "2.2.2.2")).unwrap();
        assert_eq!(diff.removed, BTreeSet::from([DnsResult::a("1.1.1.1")]));
        assert_eq!(diff.added, BTreeSet::from([DnsResult::a("2.2.2.2")]));

        let same = zone.diff(&a_record("www", "1.1.1.1")).unwrap();
        assert!(same.is_empty());
    }

    #[test]
    fn diff_without_stored_record_is_not_comparable() {
        let zone = DnsZone::new("t");
        assert!(matches!(
            zone.diff(&a_record("www", "1.1.1.1")),
            Err(CotendoError::NotComparable { kind: RecordKind::A, ref host }) if host == "www"
        ));
    }

    #[test]
    fn serialize_emits_infrastructure_first_and_round_trips() {
        let mut zone = zone();
        zone.sort();
        let body = zone.serialize().unwrap();

        let soa = body.find("<soa>").unwrap();
        let ns = body.find("<ns host=\"\">").unwrap();
        let first_entry = body.find("<a host=\"api\">").unwrap();
        assert!(soa < ns && ns < first_entry);
        assert_eq!(body.matches("cotdns.net.").count(), 2);
        assert!(body.contains("<resource_records>"));

        let reparsed = DnsZone::parse(zone.token(), &body).unwrap();
        assert_eq!(reparsed.entries(), zone.entries());
    }

    #[test]
    fn serialize_round_trips_every_editable_kind() {
        let mut zone = zone();
        zone.upsert(
            Record::new(RecordKind::Txt, "quoted")
                .unwrap()
                .with_result(DnsResult::txt(r#"say "hi" <b> & bye"#))
                .unwrap(),
        );
        zone.upsert(Record::new(RecordKind::A, "empty").unwrap());

        let body = zone.serialize().unwrap();
        assert!(body.contains(r#"<ptr host="1">"#));
        assert!(body.contains(r#"<result domain_name="www.example.com." ttl="86400"/>"#));
        assert!(body.contains(
            r#"<result domain_name="example.com." priority="10" weight="5" port="5060" target="sip.example.com." ttl="1800"/>"#
        ));
        assert!(body.contains(r#"<a host="empty"/>"#));

        let reparsed = DnsZone::parse(zone.token(), &body).unwrap();
        assert_eq!(reparsed.entries(), zone.entries());

        let srv = reparsed.lookup(RecordKind::Srv, "_sip._tcp").unwrap();
        assert_eq!(
            srv.results(),
            &[DnsResult::srv("example.com.", 10, 5, 5060, "sip.example.com.")]
        );
        let txt = reparsed.lookup(RecordKind::Txt, "quoted").unwrap();
        assert_eq!(txt.results(), &[DnsResult::txt(r#"say "hi" <b> & bye"#)]);
    }

    #[test]
    fn end_to_end_scenario() {
        let doc = r#"<xml><records>
            <soa><reference domain_name="cotdns.net."/></soa>
            <ns host=""><reference domain_name="cotdns.net."/></ns>
            <cname host="ftp"><result domain_name="www.example.com" ttl="1800"/></cname>
            <a host="www"><result ip="10.0.0.1" ttl="3600"/></a>
        </records></xml>"#;

        let mut zone = DnsZone::parse("v42", doc).unwrap();
        zone.sort();

        let expected = vec![
            Record::new(RecordKind::A, "www")
                .unwrap()
                .with_result(DnsResult::a("10.0.0.1").with_ttl(3600))
                .unwrap(),
            Record::new(RecordKind::Cname, "ftp")
                .unwrap()
                .with_result(DnsResult::cname("www.example.com"))
                .unwrap(),
        ];
        assert_eq!(zone.entries(), expected.as_slice());

        let raw = zone.into_commit().unwrap();
        assert_eq!(raw.token, "v42");
        assert!(raw.body.contains("<records>"));
        let reparsed = DnsZone::parse(raw.token.as_str(), &raw.body).unwrap();
        assert_eq!(reparsed.entries(), expected.as_slice());
    }

    #[test]
    fn to_json_lists_entries() {
        let json = zone().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[2]["type"], "a");
        assert_eq!(value[2]["host"], "www");
        assert_eq!(value[2]["results"][0]["ip"], "10.0.0.1");
    }
}
