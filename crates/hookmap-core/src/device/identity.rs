// Hookmap Device Identity
// Vendor/product/location identity and the first-party classification

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Opaque registry handle of an attached device.
///
/// This is also the `sender` passed to every slot callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// USB vendor ids the hook policy needs to recognize
pub mod vendor {
    pub const PSEUDO: u32 = 0x0000;
    pub const APPLE_COMPUTER: u32 = 0x05ac;
    pub const LOGITECH: u32 = 0x046d;
}

/// USB product ids the hook policy needs to recognize
pub mod product {
    pub const PSEUDO: u32 = 0x0000;
    pub const LOGITECH_USB_HEADSET: u32 = 0x0a0b;
}

/// Identity of a physical device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentifier {
    pub vendor: u32,
    pub product: u32,
    pub location: u32,
}

impl DeviceIdentifier {
    pub fn new(vendor: u32, product: u32, location: u32) -> Self {
        Self {
            vendor,
            product,
            location,
        }
    }

    /// Vendor, product and location all match
    pub fn is_equal(&self, other: &DeviceIdentifier) -> bool {
        self == other
    }

    pub fn is_equal_vendor(&self, vendor: u32) -> bool {
        self.vendor == vendor
    }

    pub fn is_equal_vendor_product(&self, vendor: u32, product: u32) -> bool {
        self.vendor == vendor && self.product == product
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vendor:0x{:04x} product:0x{:04x} location:0x{:x}",
            self.vendor, self.product, self.location
        )
    }
}

/// Driver classification of a keyboard device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[default]
    Unknown,
    /// Built-in keyboard driven by the platform driver
    AppleInternal,
    /// External keyboard driven by the platform driver
    AppleExternal,
    /// Device driven by USB Overdrive, which reports a 0/0 identity
    UsbOverdrive,
}

impl DeviceType {
    /// Driven by the platform's own keyboard driver.
    ///
    /// Only these devices get indicator writes; other drivers manage their own.
    pub fn is_first_party(self) -> bool {
        matches!(self, DeviceType::AppleInternal | DeviceType::AppleExternal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality() {
        let a = DeviceIdentifier::new(vendor::APPLE_COMPUTER, 0x0262, 0x1);
        let same = DeviceIdentifier::new(vendor::APPLE_COMPUTER, 0x0262, 0x1);
        let elsewhere = DeviceIdentifier::new(vendor::APPLE_COMPUTER, 0x0262, 0x2);
        assert!(a.is_equal(&same));
        assert!(!a.is_equal(&elsewhere));
    }

    #[test]
    fn test_identifier_vendor_only() {
        let id = DeviceIdentifier::new(vendor::LOGITECH, product::LOGITECH_USB_HEADSET, 0x14);
        assert!(id.is_equal_vendor(vendor::LOGITECH));
        assert!(!id.is_equal_vendor(vendor::APPLE_COMPUTER));
        assert!(id.is_equal_vendor_product(vendor::LOGITECH, product::LOGITECH_USB_HEADSET));
        assert!(!id.is_equal_vendor_product(vendor::LOGITECH, product::PSEUDO));
    }

    #[test]
    fn test_first_party() {
        assert!(DeviceType::AppleInternal.is_first_party());
        assert!(DeviceType::AppleExternal.is_first_party());
        assert!(!DeviceType::UsbOverdrive.is_first_party());
        assert!(!DeviceType::Unknown.is_first_party());
    }

    #[test]
    fn test_device_type_names() {
        assert_eq!(DeviceType::AppleInternal.to_string(), "apple_internal");
        assert_eq!("usb_overdrive".parse::<DeviceType>(), Ok(DeviceType::UsbOverdrive));
    }
}
