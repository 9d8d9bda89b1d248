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

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use async_trait::async_trait;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use crate::error::CotendoError;

/// Which configuration a call targets: the ADNS domain or the CDN origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Dns,
    Cdn,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Dns => "dns",
            Product::Cdn => "cdn",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target environment. Sent on the wire as `0` or `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Staging = 0,
    Production = 1,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

impl FromStr for Environment {
    type Err = CotendoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "staging" => Ok(Environment::Staging),
            "1" | "production" => Ok(Environment::Production),
            other => Err(CotendoError::InvalidParam(format!("environment {:?}", other))),
        }
    }
}

/// Cache flush mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushType {
    Hard,
    Soft,
}

impl fmt::Display for FlushType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlushType::Hard => "hard",
            FlushType::Soft => "soft",
        })
    }
}

impl FromStr for FlushType {
    type Err = CotendoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hard" => Ok(FlushType::Hard),
            "soft" => Ok(FlushType::Soft),
            other => Err(CotendoError::InvalidParam(format!("flush type {:?}", other))),
        }
    }
}

/// A DNS configuration variable, e.g. `<variable name="ny_weight" value="10"/>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The `<variables>` container sent by `dns_set_variables`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(pub Vec<Variable>);

impl Variables {
    pub fn to_xml(&self) -> Result<String, CotendoError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Start(BytesStart::new("variables")))?;
        for variable in &self.0 {
            let mut element = BytesStart::new("variable");
            element.push_attribute(("name", variable.name.as_str()));
            element.push_attribute(("value", variable.value.as_str()));
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new("variables")))?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xml = self.to_xml().map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}

/// A configuration document and the version token it was fetched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConfig {
    pub token: String,
    pub body: String,
}

/// Arguments of a remote call. Each operation reads the fields it needs and rejects
/// the call when a required one is unset.
#[derive(Debug, Clone, Default)]
pub struct ConfigRequestBuilder {
    /// Domain name (DNS) or origin CNAME (CDN)
    pub(crate) identifier: Option<String>,
    pub(crate) environment: Option<Environment>,
    pub(crate) token: Option<String>,
    /// Configuration document to upload
    pub(crate) conf: Option<String>,
    /// Newline-delimited flush expressions
    pub(crate) expression: Option<String>,
    pub(crate) flush_type: Option<FlushType>,
    pub(crate) variables: Option<Variables>,
}

impl ConfigRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn conf(mut self, conf: &str) -> Self {
        self.conf = Some(conf.to_string());
        self
    }

    /// Sets body and token from a fetched-then-edited configuration.
    pub fn raw_config(self, raw: &RawConfig) -> Self {
        self.conf(&raw.body).token(&raw.token)
    }

    pub fn expression(mut self, expression: &str) -> Self {
        self.expression = Some(expression.to_string());
        self
    }

    /// Joins several flush expressions into one call.
    pub fn expressions<S: AsRef<str>>(mut self, expressions: &[S]) -> Self {
        let joined = expressions
            .iter()
            .map(|e| e.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        self.expression = Some(joined);
        self
    }

    pub fn flush_type(mut self, flush_type: FlushType) -> Self {
        self.flush_type = Some(flush_type);
        self
    }

    pub fn variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = Some(Variables(variables));
        self
    }

    pub fn get_identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn get_environment(&self) -> Option<Environment> {
        self.environment
    }

    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn get_conf(&self) -> Option<&str> {
        self.conf.as_deref()
    }

    pub fn get_expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn get_flush_type(&self) -> Option<FlushType> {
        self.flush_type
    }

    pub fn get_variables(&self) -> Option<&[Variable]> {
        self.variables.as_ref().map(|v| v.0.as_slice())
    }
}

/// Authenticated calls to the remote configuration service.
#[async_trait]
pub trait ConfigService: Send + Sync {
    /// Current configuration and its version token. Needs identifier and environment.
    async fn fetch(&self, product: Product, request: &ConfigRequestBuilder) -> Result<RawConfig, CotendoError>;

    /// Uploads a configuration. Needs identifier, conf, environment and the token from
    /// the fetch it was based on; a stale token is rejected with `TokenMismatch`.
    async fn commit(&self, product: Product, request: &ConfigRequestBuilder) -> Result<(), CotendoError>;

    /// Publishes the staged configuration. Needs identifier.
    async fn publish(&self, product: Product, request: &ConfigRequestBuilder) -> Result<(), CotendoError>;

    /// Flushes cached content by expression. Needs identifier and expression.
    async fn invalidate(&self, request: &ConfigRequestBuilder) -> Result<(), CotendoError>;

    /// Sets DNS configuration variables. Needs variables.
    async fn set_variables(&self, request: &ConfigRequestBuilder) -> Result<(), CotendoError>;
}

/// Lets several sessions share one client.
#[async_trait]
impl<T: ConfigService + ?Sized> ConfigService for Arc<T> {
    async fn fetch(&self, product: Product, request: &ConfigRequestBuilder) -> Result<RawConfig, CotendoError> {
        (**self).fetch(product, request).await
    }

    async fn commit(&self, product: Product, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        (**self).commit(product, request).await
    }

    async fn publish(&self, product: Product, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        (**self).publish(product, request).await
    }

    async fn invalidate(&self, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        (**self).invalidate(request).await
    }

    async fn set_variables(&self, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        (**self).set_variables(request).await
    }
}
