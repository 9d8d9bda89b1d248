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

//! Envelope shaping for the Cotendo web service.
//!
//! The service expects rpc/encoded style: `soap` prefixed envelope and body, no
//! header, every argument typed as `xsd:string` with its text wrapped in CDATA.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::warn;
use crate::error::CotendoError;
use crate::utils::xml::{cdata_sections, parse_document, Element};

const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP_ENC: &str = "http://schemas.xmlsoap.org/soap/encoding/";
const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Builds the request envelope for `method` with its arguments in call order.
pub(crate) fn build_envelope(method: &str, params: &[(&'static str, String)]) -> Result<String, CotendoError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut envelope = BytesStart::new("soap:Envelope");
    envelope.push_attribute(("xmlns:soap", SOAP_ENV));
    envelope.push_attribute(("xmlns:xsi", XSI));
    envelope.push_attribute(("xmlns:soapenc", SOAP_ENC));
    envelope.push_attribute(("xmlns:xsd", XSD));
    envelope.push_attribute(("soap:encodingStyle", SOAP_ENC));
    writer.write_event(Event::Start(envelope))?;
    writer.write_event(Event::Start(BytesStart::new("soap:Body")))?;
    writer.write_event(Event::Start(BytesStart::new(method)))?;

    for (name, value) in params {
        let mut param = BytesStart::new(*name);
        param.push_attribute(("xsi:type", "xsd:string"));
        writer.write_event(Event::Start(param))?;
        for section in cdata_sections(value) {
            writer.write_event(Event::CData(BytesCData::new(section)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(*name)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(method)))?;
    writer.write_event(Event::End(BytesEnd::new("soap:Body")))?;
    writer.write_event(Event::End(BytesEnd::new("soap:Envelope")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Decodes a response envelope into the method's return values.
///
/// A `Fault` body becomes an error. Otherwise each child of the response element is
/// one value; a child that wraps further elements (a SOAP array) contributes the
/// text of each of them.
pub(crate) fn parse_response(body: &str) -> Result<Vec<String>, CotendoError> {
    let envelope = parse_document(body)?;
    let soap_body = envelope
        .child("Body")
        .ok_or_else(|| CotendoError::MalformedDocument("SOAP envelope has no Body".into()))?;

    let Some(response) = soap_body.children().next() else {
        return Ok(Vec::new());
    };

    if response.local_name() == "Fault" {
        return Err(fault_error(response));
    }

    let mut values = Vec::new();
    for child in response.children() {
        if child.children().next().is_none() {
            values.push(child.text());
        } else {
            values.extend(child.children().map(Element::text));
        }
    }
    Ok(values)
}

/// Phrases the service uses when a configuration token is no longer current.
const STALE_TOKEN: &[&str] = &["not the latest", "has changed", "stale", "mismatch", "outdated", "not current"];

/// Phrases the service uses when a call quota is exhausted.
const RATE_LIMITED: &[&str] = &["per hour", "rate limit", "ratelimit", "limit exceeded", "limit reached", "too many"];

fn fault_error(fault: &Element) -> CotendoError {
    let code = fault_field(fault, "faultcode");
    let message = fault_field(fault, "faultstring");
    warn!(%code, %message, "SOAP fault");

    let code_lowered = code.to_ascii_lowercase();
    let lowered = message.to_ascii_lowercase();
    let stale = |text: &str| text.contains("token") && STALE_TOKEN.iter().any(|p| text.contains(p));
    let limited = |text: &str| RATE_LIMITED.iter().any(|p| text.contains(p));

    if stale(&code_lowered) || stale(&lowered) {
        CotendoError::TokenMismatch(message)
    } else if limited(&code_lowered) || limited(&lowered) {
        CotendoError::RateLimit(message)
    } else {
        CotendoError::Fault { code, message }
    }
}

fn fault_field(fault: &Element, name: &str) -> String {
    fault
        .child(name)
        .map(|field| field.text().trim().to_string())
        .unwrap_or_default()
}
