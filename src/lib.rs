//! Cotendo SDK: ADNS zone records and CDN configuration over the Cotendo web service
//!
//! Supported features:
//! - Typed DNS record model (A, CNAME, MX, PTR, TXT, SRV) parsed from and written to
//!   the provider's domain configuration document
//! - Zone editing: lookup, upsert, delete, diff and canonical ordering
//! - Asynchronous remote calls: get/set/publish configuration, cache flush, variables
//! - Builder pattern for client and request configuration
//!
//! # Example
//! ```no_run
//! use cotendo_sdk::client::Environment;
//! use cotendo_sdk::helper::CotendoHelper;
//! use cotendo_sdk::records::{DnsResult, Record, RecordKind};
//! use cotendo_sdk::CotendoClient;
//!
//! # async fn run() -> Result<(), cotendo_sdk::error::CotendoError> {
//! let client: CotendoClient = CotendoClient::builder()
//!     .set_param("username", "your_user")?
//!     .set_param("password", "your_password")?
//!     .build()?;
//!
//! let mut helper = CotendoHelper::new(client);
//! let zone = helper.grab_dns("example.com", Environment::Staging).await?;
//! zone.upsert(Record::new(RecordKind::A, "www")?.with_result(DnsResult::a("10.0.0.1"))?);
//! helper.update_dns("example.com", Environment::Staging).await?;
//! # Ok(())
//! # }
//! ```

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

pub(crate) mod providers;
pub mod cdn;
pub mod client;
pub mod error;
pub mod helper;
pub mod records;
pub mod utils;
pub mod zone;

pub use providers::cotendo::{CotendoClient, CotendoClientBuilder, DEFAULT_ENDPOINT};
