pub mod registry;
pub mod timing;
