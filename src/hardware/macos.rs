use std::process::Command;

use regex::Regex;

/// Get the hardware UUID on macOS.
///
/// Uses `ioreg -rd1 -c IOPlatformExpertDevice` and extracts `IOPlatformUUID`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn read_machine_id() -> Option<String> {
    let output = Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_ioreg_output(&String::from_utf8_lossy(&output.stdout))
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn parse_ioreg_output(output: &str) -> Option<String> {
    let re = Regex::new(r#""IOPlatformUUID" = "([^"]+)""#).ok()?;
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| super::non_empty(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOREG_SAMPLE: &str = r#"+-o J314sAP  <class IOPlatformExpertDevice, id 0x100000219>
    {
      "IOPlatformSerialNumber" = "C02XXXXXXXXX"
      "IOPlatformUUID" = "6A1B2C3D-4E5F-6789-ABCD-0123456789EF"
      "model" = <"MacBookPro18,3">
    }"#;

    #[test]
    fn extracts_platform_uuid() {
        assert_eq!(
            parse_ioreg_output(IOREG_SAMPLE),
            Some("6A1B2C3D-4E5F-6789-ABCD-0123456789EF".to_string())
        );
    }

    #[test]
    fn missing_uuid_yields_none() {
        assert_eq!(parse_ioreg_output("\"IOPlatformSerialNumber\" = \"C02\""), None);
        assert_eq!(parse_ioreg_output(""), None);
    }
}
