// src/utils/log.rs

//! Run banners and summaries on top of the `log` facade.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {step_num}/{total}] {message}");
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {message}");
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for (key, value) in items {
        log::info!("    {key}: {value}");
    }
}

/// Log an info message
pub fn info(message: &str) {
    log::info!("{message}");
}

/// Log a warning
pub fn warn(message: &str) {
    log::warn!("{message}");
}

/// Log a debug message
pub fn debug(message: &str) {
    log::debug!("{message}");
}

/// Log a success message
pub fn success(message: &str) {
    log::info!("✓ {message}");
}
