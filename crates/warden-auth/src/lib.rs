//! Warden Auth: staff authentication, bearer tokens, impersonation,
//! audit recording, origin blocking and security analytics.

pub mod aggregator;
pub mod config;
pub mod console;
pub mod context;
pub mod error;
pub mod impersonation;
pub mod origin;
pub mod password;
pub mod recorder;
pub mod service;
pub mod token;

pub use aggregator::{SecurityAggregator, SecurityReport, ViewDiagnostic};
pub use config::AuthConfig;
pub use console::{AdminConsole, Repositories};
pub use context::{AuthContext, StaffRef, Subject};
pub use error::AuthError;
pub use impersonation::{ImpersonationGrant, ImpersonationIssuer};
pub use origin::OriginGuard;
pub use password::{Argon2Verifier, SecretVerifier};
pub use recorder::{AuditEntry, EventRecorder, RecordError};
pub use service::{Authenticator, LoginOutcome, LoginRequest};
pub use token::{TokenClaims, TokenKind};
