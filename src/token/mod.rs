//! Token Module - Access Token vom Backend
//!
//! Dieses Modul verwaltet:
//! - Abruf des Access Tokens über HTTP (`GET /token`)
//! - Dekodierung der JWT-Claims für Diagnose-Ausgaben
//!

mod claims;
mod client;

pub use claims::{TokenClaims, VoiceGrants};
pub use client::{HttpTokenSource, TokenError, TokenResponse, TokenSource};
