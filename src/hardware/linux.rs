//! Linux: systemd/dbus machine id.

/// Candidate files, in order of preference.
const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub fn read_machine_id() -> Option<String> {
    MACHINE_ID_PATHS.iter().find_map(|path| {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| parse_machine_id_file(&contents))
    })
}

/// The file holds a single hex id followed by a newline.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub fn parse_machine_id_file(contents: &str) -> Option<String> {
    super::non_empty(contents)
}
