pub mod gate;
pub mod response;

pub use gate::{authenticate, CurrentPrincipal};
pub use response::{ApiResponse, ApiResult};
