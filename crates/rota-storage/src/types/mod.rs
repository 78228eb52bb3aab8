//! Type definitions for rota storage.

mod attendance;
mod ids;
mod meetings;
mod roles;
mod users;

// Re-export all types from submodules
pub use attendance::*;
pub use ids::*;
pub use meetings::*;
pub use roles::*;
pub use users::*;
