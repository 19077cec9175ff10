pub mod error;
pub mod fixes;
pub mod status;
pub mod sync;
pub mod tracking;
