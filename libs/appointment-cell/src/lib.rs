// =====================================================================================
// APPOINTMENT CELL - BOOKING SAGA, CACHE-ASIDE STORE, DOCTOR SLOT CLIENT
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod test_utils;

pub use error::*;
pub use models::*;
pub use router::appointment_routes;
pub use services::*;
