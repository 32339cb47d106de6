/// Authentication module
///
/// JWT issuance/verification, password hashing, and the auth service that
/// ties them to the stores.

mod claims;
mod jwt;
mod password;
mod service;

pub use claims::{Claims, TokenKind, ACCESS_SUBJECT, REFRESH_SUBJECT};
pub use jwt::{IssuedToken, TokenError, TokenService};
pub use password::{hash_password, verify_password, PASSWORD_HASH_COST};
pub use service::{
    generate_username, AuthService, RegisterInput, Session, UsernameGenerator, USERNAME_ATTEMPTS,
    USERNAME_SUFFIX_LENGTH,
};
