// Application layer - use cases and orchestration.
// Every money-moving workflow runs inside one storage atomic unit.

pub mod assistant;
pub mod error;
pub mod identity;
pub mod reporting;
pub mod service;

pub use assistant::*;
pub use error::*;
pub use identity::*;
pub use reporting::*;
pub use service::*;
