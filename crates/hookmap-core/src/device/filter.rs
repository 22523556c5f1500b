// Hookmap Device Filtering
// Driver names that are never hooked

/// Drivers that expose keyboard slots but only deliver consumer keys
/// (media, brightness, eject).
const CONSUMER_DRIVER_NAMES: &[&str] = &["IOHIDConsumer", "AppleADBButtons"];

/// Check if a driver name belongs to a consumer-only device.
///
/// Matching is exact, the driver class names are fixed strings.
pub fn is_consumer(name: &str) -> bool {
    CONSUMER_DRIVER_NAMES.iter().any(|consumer| *consumer == name)
}
