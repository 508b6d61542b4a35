pub mod denylist;
pub mod jwt;
pub mod password;

pub use denylist::{DenylistError, TokenDenylist};
pub use jwt::{Claims, TokenError, TokenService};
