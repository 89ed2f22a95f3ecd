//! Hex dumps for the diagnostics log

const BYTES_PER_ROW: usize = 16;

/// Render `bytes` as rows of `offset: xx xx ..`
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .chunks(BYTES_PER_ROW)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            format!("{:04x}: {}", row * BYTES_PER_ROW, hex.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dump `bytes` at trace level under `target`
pub fn log_hex(target: &str, bytes: &[u8]) {
    if log::log_enabled!(target: target, log::Level::Trace) {
        for line in format_hex(bytes).lines() {
            log::trace!(target: target, "{}", line);
        }
    }
}
