use std::process::Command;

const CRYPTOGRAPHY_KEY: &str = r"HKLM\SOFTWARE\Microsoft\Cryptography";

/// Read `MachineGuid` from the registry via `reg query`.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub fn read_machine_id() -> Option<String> {
    let output = Command::new("reg")
        .args(["query", CRYPTOGRAPHY_KEY, "/v", "MachineGuid"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_reg_query_output(&String::from_utf8_lossy(&output.stdout))
}

/// Expected line: `    MachineGuid    REG_SZ    <guid>`
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub fn parse_reg_query_output(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.trim_start().starts_with("MachineGuid"))
        .and_then(|line| line.split("REG_SZ").nth(1))
        .and_then(super::non_empty)
}
