//! Advertisement filter configuration.

use crate::gatt::ServiceId;

/// Filter applied to advertisements while scanning.
///
/// A single service-UUID filter in "match any" mode: an advertisement
/// qualifies when its service list contains the target service. The set
/// is built once at startup and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilterSet {
    service: ServiceId,
    active: bool,
}

impl ScanFilterSet {
    /// Active scan for advertisers exposing `service`.
    #[must_use]
    pub const fn new(service: ServiceId) -> Self {
        Self {
            service,
            active: true,
        }
    }

    /// Request passive scanning (no scan requests sent to advertisers).
    #[must_use]
    pub const fn passive(mut self) -> Self {
        self.active = false;
        self
    }

    #[must_use]
    pub const fn service(&self) -> ServiceId {
        self.service
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether an advertised service list satisfies the filter.
    #[must_use]
    pub fn matches(&self, advertised: &[uuid::Uuid]) -> bool {
        advertised.contains(&self.service.as_uuid())
    }
}
