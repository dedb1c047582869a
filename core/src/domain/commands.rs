//! Command and result types passed between the UI layer and the services.

pub mod identity {
    use serde::{Deserialize, Serialize};

    /// Weak identity hints gathered from the environment: URL query
    /// parameters, a scanned QR payload, or nothing at all.
    ///
    /// Remembered values are not part of the hints; the resolver reads those
    /// through its injected session service.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct ResolveHints {
        /// `fid` query parameter: a family UUID or a short family code
        pub fid: Option<String>,
        /// `child` query parameter: a child id in either form
        pub child_id: Option<String>,
        /// `nick` query parameter: a child nickname
        pub nickname: Option<String>,
        /// Raw QR payload, parsed as a URL carrying the fields above
        pub qr_payload: Option<String>,
    }

    impl ResolveHints {
        pub fn is_empty(&self) -> bool {
            self.fid.is_none()
                && self.child_id.is_none()
                && self.nickname.is_none()
                && self.qr_payload.is_none()
        }
    }
}

pub mod secret {
    use shared::VerifyMode;

    /// A single verification attempt. The secret lives only as long as this
    /// command and is never logged or stored.
    #[derive(Debug, Clone)]
    pub struct VerifySecretCommand {
        /// Child reference in either id form
        pub child_ref: String,
        pub secret: String,
        pub mode: VerifyMode,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct VerifySecretResult {
        pub verified: bool,
        /// User-facing outcome message
        pub message: String,
    }
}
