//! Device class detection from a browser user-agent string.

use crate::types::DeviceClass;

/// Classify a user agent into desktop, mobile or tablet.
///
/// Tablets are checked first: iPads and Android devices that do not
/// advertise `Mobile` are tablets.
pub fn classify_user_agent(user_agent: &str) -> DeviceClass {
    let ua = user_agent.to_ascii_lowercase();

    let android = ua.contains("android");
    if ua.contains("ipad") || ua.contains("tablet") || (android && !ua.contains("mobile")) {
        return DeviceClass::Tablet;
    }
    if android || ua.contains("mobi") || ua.contains("iphone") || ua.contains("ipod") {
        return DeviceClass::Mobile;
    }
    DeviceClass::Desktop
}
