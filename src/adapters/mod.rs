pub mod api_errors;
pub mod auth;
pub mod checkout;
pub mod stripe;
