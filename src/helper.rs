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

use crate::cdn::CdnConfig;
use crate::client::{ConfigRequestBuilder, ConfigService, Environment, FlushType, Product, Variable};
use crate::error::CotendoError;
use crate::zone::DnsZone;

/// Fetch → modify → commit sessions on top of a [`ConfigService`].
///
/// Each `update_*` consumes the loaded document; grab it again before the next edit.
/// A rejected commit (stale token) is not retried.
pub struct CotendoHelper<S: ConfigService> {
    service: S,
    dns: Option<DnsZone>,
    cdn: Option<CdnConfig>,
}

impl<S: ConfigService> CotendoHelper<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            dns: None,
            cdn: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The zone loaded by the last `grab_dns`, if not yet committed.
    pub fn dns(&mut self) -> Option<&mut DnsZone> {
        self.dns.as_mut()
    }

    pub fn cdn(&mut self) -> Option<&mut CdnConfig> {
        self.cdn.as_mut()
    }

    pub async fn grab_dns(&mut self, domain: &str, environment: Environment) -> Result<&mut DnsZone, CotendoError> {
        let request = ConfigRequestBuilder::new()
            .identifier(domain)
            .environment(environment);
        let raw = self.service.fetch(Product::Dns, &request).await?;
        Ok(self.dns.insert(DnsZone::from_raw(&raw)?))
    }

    /// Commits the loaded zone with the token it was fetched with.
    pub async fn update_dns(&mut self, domain: &str, environment: Environment) -> Result<(), CotendoError> {
        let zone = self.dns.take().ok_or(CotendoError::NotLoaded(Product::Dns))?;
        let raw = zone.into_commit()?;
        let request = ConfigRequestBuilder::new()
            .identifier(domain)
            .environment(environment)
            .raw_config(&raw);
        self.service.commit(Product::Dns, &request).await
    }

    pub async fn publish_dns(&self, domain: &str) -> Result<(), CotendoError> {
        let request = ConfigRequestBuilder::new().identifier(domain);
        self.service.publish(Product::Dns, &request).await
    }

    pub async fn grab_cdn(&mut self, cname: &str, environment: Environment) -> Result<&mut CdnConfig, CotendoError> {
        let request = ConfigRequestBuilder::new()
            .identifier(cname)
            .environment(environment);
        let raw = self.service.fetch(Product::Cdn, &request).await?;
        Ok(self.cdn.insert(CdnConfig::from_raw(&raw)?))
    }

    pub async fn update_cdn(&mut self, cname: &str, environment: Environment) -> Result<(), CotendoError> {
        let config = self.cdn.take().ok_or(CotendoError::NotLoaded(Product::Cdn))?;
        let raw = config.into_commit()?;
        let request = ConfigRequestBuilder::new()
            .identifier(cname)
            .environment(environment)
            .raw_config(&raw);
        self.service.commit(Product::Cdn, &request).await
    }

    pub async fn publish_cdn(&self, cname: &str) -> Result<(), CotendoError> {
        let request = ConfigRequestBuilder::new().identifier(cname);
        self.service.publish(Product::Cdn, &request).await
    }

    pub async fn flush<E: AsRef<str>>(&self, cname: &str, expressions: &[E], flush_type: FlushType) -> Result<(), CotendoError> {
        let request = ConfigRequestBuilder::new()
            .identifier(cname)
            .expressions(expressions)
            .flush_type(flush_type);
        self.service.invalidate(&request).await
    }

    pub async fn set_variables(&self, variables: Vec<Variable>) -> Result<(), CotendoError> {
        let request = ConfigRequestBuilder::new().variables(variables);
        self.service.set_variables(&request).await
    }
}
