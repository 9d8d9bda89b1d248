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

use crate::client::RawConfig;
use crate::error::CotendoError;
use crate::utils::xml::{parse_document, to_document, Element};

/// An origin configuration fetched with `cdn_get_conf`.
///
/// The CDN schema is not modelled; the document is kept as a generic element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnConfig {
    token: String,
    document: Element,
}

impl CdnConfig {
    pub fn parse(token: impl Into<String>, body: &str) -> Result<Self, CotendoError> {
        Ok(Self {
            token: token.into(),
            document: parse_document(body)?,
        })
    }

    pub fn from_raw(raw: &RawConfig) -> Result<Self, CotendoError> {
        Self::parse(raw.token.as_str(), &raw.body)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn document(&self) -> &Element {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Element {
        &mut self.document
    }

    pub fn to_xml(&self) -> Result<String, CotendoError> {
        to_document(&self.document)
    }

    pub fn into_commit(self) -> Result<RawConfig, CotendoError> {
        let body = self.to_xml()?;
        Ok(RawConfig { token: self.token, body })
    }
}
