pub mod cotendo;
pub(crate) mod soap;
