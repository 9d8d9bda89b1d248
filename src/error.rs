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

use std::string::FromUtf8Error;
use quick_xml::events::attributes::AttrError;
use thiserror::Error;
use crate::client::Product;
use crate::records::RecordKind;

/// Every failure surfaced by the SDK.
///
/// Parse errors abort the whole document, remote errors are forwarded unchanged.
#[derive(Error, Debug)]
pub enum CotendoError {
    #[error("malformed <{tag}> record: {reason}")]
    MalformedRecord { tag: String, reason: String },

    #[error("unknown record kind <{0}>")]
    UnknownRecordKind(String),

    #[error("no stored {kind} record for host {host:?} to compare against")]
    NotComparable { kind: RecordKind, host: String },

    #[error("{0} records are managed by the provider and cannot be edited")]
    ReservedKind(RecordKind),

    #[error("cannot add a {result} result to a {record} record")]
    KindMismatch { record: RecordKind, result: RecordKind },

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("configuration token rejected: {0}")]
    TokenMismatch(String),

    #[error("flush rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("remote fault {code}: {message}")]
    Fault { code: String, message: String },

    #[error("{0} is required")]
    MissingParam(&'static str),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("no {0} configuration loaded, fetch one first")]
    NotLoaded(Product),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    XmlAttribute(#[from] AttrError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encoding(#[from] FromUtf8Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CotendoError {
    pub(crate) fn malformed(tag: &str, reason: impl Into<String>) -> Self {
        CotendoError::MalformedRecord {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}
