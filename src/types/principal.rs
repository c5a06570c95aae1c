//! Principal references consumed from the identity layer
//!
//! Identity and access management is an external collaborator; the ledger
//! core only ever reads a principal's identifier, role kind, and status
//! flags. Roles are a flat tagged variant rather than a type hierarchy.

use serde::{Deserialize, Serialize};

/// Role of a principal, with role-specific attributes inline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// A bank customer; `kyc_verified` is produced by the external KYC flow
    Customer { kyc_verified: bool },
    /// Branch or back-office staff
    Staff,
    /// Administrative staff
    Admin,
}

/// Principal account status, mirrored from the identity layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalStatus {
    Active,
    Inactive,
    Suspended,
    Locked,
    PendingVerification,
}

/// A reference to an identity-layer principal
///
/// The core treats the identifier as opaque and never inspects anything
/// beyond role and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque identifier assigned by the identity layer
    pub id: String,
    /// Role kind plus role-specific flags
    pub role: Role,
    /// Current status
    pub status: PrincipalStatus,
}

impl Principal {
    /// Create an active customer principal
    pub fn customer(id: impl Into<String>, kyc_verified: bool) -> Self {
        Principal {
            id: id.into(),
            role: Role::Customer { kyc_verified },
            status: PrincipalStatus::Active,
        }
    }

    /// Create an active staff principal
    pub fn staff(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            role: Role::Staff,
            status: PrincipalStatus::Active,
        }
    }

    /// Create an active admin principal
    pub fn admin(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            role: Role::Admin,
            status: PrincipalStatus::Active,
        }
    }

    /// True iff this is an active, KYC-verified customer
    ///
    /// The gate for opening accounts and originating loans.
    pub fn is_verified_customer(&self) -> bool {
        self.status == PrincipalStatus::Active
            && matches!(self.role, Role::Customer { kyc_verified: true })
    }

    /// True iff this is an active staff or admin principal
    ///
    /// The gate for approvals.
    pub fn is_active_staff(&self) -> bool {
        self.status == PrincipalStatus::Active && matches!(self.role, Role::Staff | Role::Admin)
    }
}
