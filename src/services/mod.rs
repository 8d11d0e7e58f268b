pub mod account_service;
pub mod delegation_service;

pub use account_service::{AccountError, AccountService, LoginRequest, RegisterRequest, Session};
pub use delegation_service::{
    Actor, DelegationError, DelegationService, GenerateAccessRequest, IssuedToken, RevokeAccessRequest,
    TokenDuration, VerifiedToken, VerifyAccessRequest,
};
