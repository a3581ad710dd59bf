pub mod claims;
pub mod http;
pub mod persistence;
pub mod verifier;
