pub mod serial;
pub mod timing;
