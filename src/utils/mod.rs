pub mod request;
pub mod xml;
