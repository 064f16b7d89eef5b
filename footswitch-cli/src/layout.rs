//! Text rendering of the pedal board, as seen from the player.

use std::fmt::Write;

use footswitch_core::{ButtonId, DriveLine, FootswitchConfig, POLL_LINES};

/// Each row lists its pedals right to left, so poll line 0 sits under the
/// wire on the right-hand side.
pub fn render(config: &FootswitchConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>width$}", "/|\\ (wire)", width = POLL_LINES * 8 - 4);

    for line in [DriveLine::Zero, DriveLine::One] {
        let pedals: Vec<ButtonId> = (0..POLL_LINES as u8)
            .rev()
            .map(|poll| ButtonId::at(line, poll))
            .collect();

        for id in &pedals {
            let _ = write!(out, "{:>6}  ", id.index());
        }
        let _ = writeln!(out, "  drive line {}", line.index());

        for &id in &pedals {
            let cell = if id == config.mode_button {
                "MODE".to_string()
            } else {
                format!("0x{:02X}", config.code(id))
            };
            let _ = write!(out, "{:>6}  ", cell);
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "\n{:?}: mode button {}, {:?}",
        config.hardware,
        config.mode_button.index(),
        config.policy
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use footswitch_core::HardwareVersion;

    #[test]
    fn test_rows_run_right_to_left() {
        let text = render(&FootswitchConfig::for_hardware(HardwareVersion::MarkII));
        let rows: Vec<&str> = text.lines().collect();
        let numbers = |row: &str| -> Vec<String> {
            row.split("drive").next().unwrap().split_whitespace().map(String::from).collect()
        };
        assert_eq!(numbers(rows[1]), ["4", "3", "2", "1", "0"]);
        assert_eq!(numbers(rows[3]), ["9", "8", "7", "6", "5"]);
        assert!(rows[4].trim_end().ends_with("MODE"));
    }

    #[test]
    fn test_mark_i_mode_button() {
        let text = render(&FootswitchConfig::for_hardware(HardwareVersion::MarkI));
        let codes: Vec<&str> = text.lines().nth(2).unwrap().split_whitespace().collect();
        assert_eq!(codes, ["0x49", "0x48", "0x47", "0x46", "MODE"]);
    }
}
