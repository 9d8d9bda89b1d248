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

use async_trait::async_trait;
use cotendo_macros::extract_params;
use tracing::{debug, info};
use crate::client::{ConfigRequestBuilder, ConfigService, FlushType, Product, RawConfig};
use crate::error::CotendoError;
use crate::providers::soap::{build_envelope, parse_response};
use crate::utils::request::{Credentials, DefaultSoapClient, SoapTransport};

pub const DEFAULT_ENDPOINT: &str = "http://api.cotendo.net/cws?ver=1.0";

/// Builder for creating Cotendo client instances.
pub struct CotendoClientBuilder<T: SoapTransport + Default = DefaultSoapClient> {
    username: Option<String>,
    password: Option<String>,
    endpoint: Option<String>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: SoapTransport + Default> Default for CotendoClientBuilder<T> {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            endpoint: None,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: SoapTransport + Default> CotendoClientBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets configuration parameters for the client builder.
    ///
    /// Supported keys:
    /// - "username"
    /// - "password"
    /// - "endpoint" (defaults to [`DEFAULT_ENDPOINT`])
    pub fn set_param(mut self, key: &str, value: &str) -> Result<Self, CotendoError> {
        match key {
            "username" => self.username = Some(value.into()),
            "password" => self.password = Some(value.into()),
            "endpoint" => self.endpoint = Some(value.into()),
            _ => return Err(CotendoError::InvalidParam(format!("unknown client parameter {:?}", key))),
        }
        Ok(self)
    }

    /// Constructs a new client instance using configured parameters.
    pub fn build(self) -> Result<CotendoClient<T>, CotendoError> {
        let username = self.username.ok_or(CotendoError::MissingParam("username"))?;
        let password = self.password.ok_or(CotendoError::MissingParam("password"))?;
        Ok(CotendoClient {
            transport: T::default(),
            endpoint: self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            credentials: Credentials::new(username, password),
        })
    }
}

/// `ConfigService` backed by the Cotendo SOAP web service.
pub struct CotendoClient<T: SoapTransport = DefaultSoapClient> {
    /// Transport posting the envelopes
    transport: T,
    /// Service location
    endpoint: String,
    credentials: Credentials,
}

impl<T: SoapTransport> CotendoClient<T> {
    pub fn new(credentials: Credentials, endpoint: impl Into<String>, transport: T) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            credentials,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Vec<(&'static str, String)>) -> Result<Vec<String>, CotendoError> {
        let envelope = build_envelope(method, &params)?;
        debug!(method, endpoint = %self.endpoint, "sending SOAP request");
        let body = self
            .transport
            .call(&self.endpoint, method, &self.credentials, envelope)
            .await?;
        parse_response(&body)
    }
}

fn method_name(product: Product, operation: &str) -> String {
    format!("{}_{}", product.as_str(), operation)
}

#[async_trait]
impl<T: SoapTransport> ConfigService for CotendoClient<T> {
    /// Calls `dns_get_conf` / `cdn_get_conf`; the response carries the token then the document.
    async fn fetch(&self, product: Product, request: &ConfigRequestBuilder) -> Result<RawConfig, CotendoError> {
        let params = match product {
            Product::Dns => extract_params!(request, CotendoError::MissingParam, {
                required identifier => "domainName",
                required environment => "environment"
            }),
            Product::Cdn => extract_params!(request, CotendoError::MissingParam, {
                required identifier => "cname",
                required environment => "environment"
            }),
        };

        let mut values = self.call(&method_name(product, "get_conf"), params).await?.into_iter();
        let token = values
            .next()
            .ok_or_else(|| CotendoError::MalformedDocument("get_conf response has no token".into()))?;
        let body = values
            .next()
            .ok_or_else(|| CotendoError::MalformedDocument("get_conf response has no configuration".into()))?;

        debug!(%product, bytes = body.len(), "fetched configuration");
        Ok(RawConfig { token, body })
    }

    /// Calls `dns_set_conf` / `cdn_set_conf`.
    async fn commit(&self, product: Product, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        let params = match product {
            Product::Dns => extract_params!(request, CotendoError::MissingParam, {
                required identifier => "domainName",
                required conf => "domainConf",
                required environment => "environment",
                required token => "token"
            }),
            Product::Cdn => extract_params!(request, CotendoError::MissingParam, {
                required identifier => "cname",
                required conf => "originConf",
                required environment => "environment",
                required token => "token"
            }),
        };

        self.call(&method_name(product, "set_conf"), params).await?;
        info!(%product, identifier = request.identifier.as_deref().unwrap_or_default(), "configuration committed");
        Ok(())
    }

    /// Calls `dns_publish_conf` / `cdn_publish_conf`.
    async fn publish(&self, product: Product, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        let params = match product {
            Product::Dns => extract_params!(request, CotendoError::MissingParam, {
                required identifier => "domainName"
            }),
            Product::Cdn => extract_params!(request, CotendoError::MissingParam, {
                required identifier => "cname"
            }),
        };

        self.call(&method_name(product, "publish_conf"), params).await?;
        info!(%product, identifier = request.identifier.as_deref().unwrap_or_default(), "staged configuration published");
        Ok(())
    }

    /// Calls `doFlush`. The service allows 1,000 flush invocations per hour; going over
    /// is reported as `RateLimit`.
    async fn invalidate(&self, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        let params = extract_params!(request, CotendoError::MissingParam, {
            required identifier => "cname",
            required expression => "flushExpression"
            optional flush_type = FlushType::Soft => "flushType"
        });

        self.call("doFlush", params).await?;
        info!(identifier = request.identifier.as_deref().unwrap_or_default(), "flush requested");
        Ok(())
    }

    /// Calls `dns_set_variables`.
    async fn set_variables(&self, request: &ConfigRequestBuilder) -> Result<(), CotendoError> {
        let params = extract_params!(request, CotendoError::MissingParam, {
            required variables => "variables"
        });

        self.call("dns_set_variables", params).await?;
        info!(count = request.get_variables().map_or(0, |v| v.len()), "DNS variables set");
        Ok(())
    }
}

impl<T: SoapTransport + Default> CotendoClient<T> {
    pub fn builder() -> CotendoClientBuilder<T> {
        CotendoClientBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Environment, Variable};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeTransport {
        responses: Arc<Mutex<VecDeque<String>>>,
        requests: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeTransport {
        fn reply(&self, inner: &str) {
            let body = format!(
                r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>{}</soap:Body></soap:Envelope>"#,
                inner
            );
            self.responses.lock().unwrap().push_back(body);
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl SoapTransport for FakeTransport {
        async fn call(
            &self,
            _endpoint: &str,
            action: &str,
            _credentials: &Credentials,
            envelope: String,
        ) -> Result<String, CotendoError> {
            self.requests.lock().unwrap().push((action.to_string(), envelope));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CotendoError::MalformedDocument("no canned response".into()))
        }
    }

    /// Collects formatted log lines for the current thread.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn client(transport: &FakeTransport) -> CotendoClient<FakeTransport> {
        CotendoClient::new(Credentials::new("user", "secret"), DEFAULT_ENDPOINT, transport.clone())
    }

    #[test]
    fn builder_requires_credentials_and_rejects_unknown_keys() {
        let built = CotendoClient::<FakeTransport>::builder()
            .set_param("username", "user")
            .unwrap()
            .set_param("password", "secret")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(built.endpoint(), DEFAULT_ENDPOINT);

        let missing = CotendoClientBuilder::<FakeTransport>::new()
            .set_param("username", "user")
            .unwrap()
            .build();
        assert!(matches!(missing, Err(CotendoError::MissingParam("password"))));

        let unknown = CotendoClientBuilder::<FakeTransport>::new().set_param("api_token", "x");
        assert!(matches!(unknown, Err(CotendoError::InvalidParam(_))));
    }

    #[tokio::test]
    async fn fetch_returns_token_and_document() {
        let transport = FakeTransport::default();
        transport.reply("<r><token>t-1</token><conf>&lt;xml&gt;&lt;rr/&gt;&lt;/xml&gt;</conf></r>");

        let request = ConfigRequestBuilder::new()
            .identifier("example.com")
            .environment(Environment::Production);
        let raw = client(&transport).fetch(Product::Dns, &request).await.unwrap();

        assert_eq!(raw, RawConfig { token: "t-1".into(), body: "<xml><rr/></xml>".into() });
        let sent = transport.sent();
        assert_eq!(sent[0].0, "dns_get_conf");
        assert!(sent[0].1.contains("<domainName xsi:type=\"xsd:string\"><![CDATA[example.com]]></domainName>"));
        assert!(sent[0].1.contains("<![CDATA[1]]>"));
    }

    #[tokio::test]
    async fn commit_needs_token() {
        let transport = FakeTransport::default();
        let request = ConfigRequestBuilder::new()
            .identifier("example.com")
            .environment(Environment::Staging)
            .conf("<xml/>");

        let result = client(&transport).commit(Product::Dns, &request).await;
        assert!(matches!(result, Err(CotendoError::MissingParam("token"))));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn commit_forwards_token_mismatch() {
        let transport = FakeTransport::default();
        transport.reply("<soap:Fault><faultcode>soap:Client</faultcode><faultstring>token is not the latest</faultstring></soap:Fault>");

        let request = ConfigRequestBuilder::new()
            .identifier("origin.example.com")
            .environment(Environment::Staging)
            .conf("<origin/>")
            .token("stale");
        let result = client(&transport).commit(Product::Cdn, &request).await;

        assert!(matches!(result, Err(CotendoError::TokenMismatch(_))));
        let sent = transport.sent();
        assert_eq!(sent[0].0, "cdn_set_conf");
        assert!(sent[0].1.contains("<originConf xsi:type=\"xsd:string\"><![CDATA[<origin/>]]></originConf>"));
        assert!(sent[0].1.contains("<![CDATA[stale]]>"));
    }

    #[tokio::test]
    async fn invalidate_defaults_to_soft_flush() {
        let transport = FakeTransport::default();
        transport.reply("<doFlushResponse/>");

        let request = ConfigRequestBuilder::new()
            .identifier("cdn.example.com")
            .expressions(&["/a/*", "/b/*"]);
        client(&transport).invalidate(&request).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].0, "doFlush");
        assert!(sent[0].1.contains("<![CDATA[/a/*\n/b/*]]>"));
        assert!(sent[0].1.contains("<flushType xsi:type=\"xsd:string\"><![CDATA[soft]]></flushType>"));
    }

    #[tokio::test]
    async fn publish_and_variables_use_product_methods() {
        let transport = FakeTransport::default();
        transport.reply("<r/>");
        transport.reply("<r/>");

        let client = client(&transport);
        client
            .publish(Product::Cdn, &ConfigRequestBuilder::new().identifier("origin.example.com"))
            .await
            .unwrap();
        client
            .set_variables(&ConfigRequestBuilder::new().variables(vec![Variable::new("ny_weight", "10")]))
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].0, "cdn_publish_conf");
        assert!(sent[0].1.contains("<cname xsi:type"));
        assert_eq!(sent[1].0, "dns_set_variables");
        assert!(sent[1].1.contains(r#"<![CDATA[<variables><variable name="ny_weight" value="10"/></variables>]]>"#));
    }

    #[tokio::test]
    async fn set_variables_logs_success() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = FakeTransport::default();
        transport.reply("<r/>");
        client(&transport)
            .set_variables(&ConfigRequestBuilder::new().variables(vec![
                Variable::new("ny_weight", "10"),
                Variable::new("la_weight", "5"),
            ]))
            .await
            .unwrap();

        let output = logs.contents();
        assert!(output.contains("DNS variables set"));
        assert!(output.contains("count=2"));
    }
}
