//! Runtime permissions a recording attempt needs
//!
//! The host platform answers the questions; this module only decides whether
//! a recording may start.

use crate::errors::RecorderError;
use serde::{Deserialize, Serialize};

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Capabilities requested before the camera is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Camera,
    Microphone,
    Storage,
}

impl Permission {
    pub const REQUIRED: [Permission; 3] =
        [Permission::Camera, Permission::Microphone, Permission::Storage];
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Camera => write!(f, "camera"),
            Permission::Microphone => write!(f, "microphone"),
            Permission::Storage => write!(f, "storage"),
        }
    }
}

/// Host-side permission lookup
pub trait PermissionProvider {
    fn status(&self, permission: Permission) -> PermissionStatus;
}

/// Provider answering the same status for everything. Useful for headless
/// hosts that have no permission model.
#[derive(Debug, Clone, Copy)]
pub struct UniformPermissions(pub PermissionStatus);

impl PermissionProvider for UniformPermissions {
    fn status(&self, _permission: Permission) -> PermissionStatus {
        self.0
    }
}

/// Succeeds only if every required permission is granted
pub fn ensure_granted(provider: &dyn PermissionProvider) -> Result<(), RecorderError> {
    let missing: Vec<String> = Permission::REQUIRED
        .iter()
        .filter_map(|&p| match provider.status(p) {
            PermissionStatus::Granted => None,
            status => Some(format!("{} ({})", p, status)),
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RecorderError::PermissionDenied(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoMicrophone;

    impl PermissionProvider for NoMicrophone {
        fn status(&self, permission: Permission) -> PermissionStatus {
            match permission {
                Permission::Microphone => PermissionStatus::Denied,
                _ => PermissionStatus::Granted,
            }
        }
    }

    #[test]
    fn test_all_granted() {
        assert!(ensure_granted(&UniformPermissions(PermissionStatus::Granted)).is_ok());
    }

    #[test]
    fn test_missing_permission_is_named() {
        let err = ensure_granted(&NoMicrophone).unwrap_err();
        assert_eq!(
            err,
            RecorderError::PermissionDenied("microphone (denied)".to_string())
        );
    }

    #[test]
    fn test_not_determined_is_not_granted() {
        let err = ensure_granted(&UniformPermissions(PermissionStatus::NotDetermined));
        assert!(matches!(err, Err(RecorderError::PermissionDenied(_))));
    }
}
