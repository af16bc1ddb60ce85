pub mod credentials;
pub mod gate;
pub mod password;
pub mod session;

pub use gate::{CurrentUser, Viewer};
pub use session::{Authenticated, SessionStore};
