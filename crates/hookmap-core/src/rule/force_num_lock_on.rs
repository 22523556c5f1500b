// Hookmap Force NumLock On Rule
// Turns num lock on for one specific device, for keypads that attach with it off

use crate::device::DeviceIdentifier;

use super::stream::{AddDataType, AddValue, RemapType};
use super::RuleBuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Vendor,
    Product,
    Location,
    Complete,
}

/// Matches a device by vendor, product and location.
///
/// Values must arrive in exactly that order; the rule is inert until all
/// three are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceNumLockOn {
    phase: Phase,
    identifier: DeviceIdentifier,
    pub(super) ignore_pass_through: bool,
}

impl ForceNumLockOn {
    pub fn new() -> Self {
        Self {
            phase: Phase::Vendor,
            identifier: DeviceIdentifier::default(),
            ignore_pass_through: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn identifier(&self) -> &DeviceIdentifier {
        &self.identifier
    }

    pub fn add(&mut self, tag: AddDataType, value: AddValue) -> Result<(), RuleBuildError> {
        match (tag, self.phase) {
            (AddDataType::DeviceVendor, Phase::Vendor) => {
                self.identifier.vendor = value.get();
                self.phase = Phase::Product;
            }
            (AddDataType::DeviceProduct, Phase::Product) => {
                self.identifier.product = value.get();
                self.phase = Phase::Location;
            }
            (AddDataType::DeviceLocation, Phase::Location) => {
                self.identifier.location = value.get();
                self.phase = Phase::Complete;
            }
            (tag, phase) => {
                return Err(RuleBuildError::UnexpectedData {
                    rule: RemapType::ForceNumLockOn,
                    tag,
                    expected: match phase {
                        Phase::Vendor => "device_vendor",
                        Phase::Product => "device_product",
                        Phase::Location => "device_location",
                        Phase::Complete => "nothing",
                    },
                })
            }
        }
        Ok(())
    }

    /// The hack applies to the device with `identifier`
    pub fn matches(&self, identifier: &DeviceIdentifier) -> bool {
        self.is_complete() && self.identifier.is_equal(identifier)
    }
}

impl Default for ForceNumLockOn {
    fn default() -> Self {
        Self::new()
    }
}
