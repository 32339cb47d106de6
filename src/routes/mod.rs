mod auth;
mod index;

pub use auth::{
    json_config, login, logout, refresh_token, register, AuthResponse, LoginRequest,
    RefreshResponse, RegisterRequest, SessionCookie, UserView, REFRESH_TOKEN_COOKIE,
};
pub use index::{api_root, health_check};
