//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry and DefaultLogger formatting.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "tutorial3d::SwapchainManager".to_string(),
        message: "Swapchain resized to 1280x720".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_have_fixed_width() {
    let severities = [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ];
    for severity in severities {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Info.label(), "INFO ");
    assert_eq!(LogSeverity::Error.label(), "ERROR");
}

// ============================================================================
// FORMAT TESTS
// ============================================================================

#[test]
fn test_format_entry_without_file_line() {
    let line = DefaultLogger::format_entry(&entry(LogSeverity::Info, None, None));
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[tutorial3d::SwapchainManager]"));
    assert!(line.ends_with("Swapchain resized to 1280x720"));
}

#[test]
fn test_format_entry_with_file_line() {
    let line = DefaultLogger::format_entry(&entry(LogSeverity::Error, Some("swapchain_manager.rs"), Some(42)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("(swapchain_manager.rs:42)"));
}

#[test]
fn test_format_entry_ignores_partial_location() {
    let line = DefaultLogger::format_entry(&entry(LogSeverity::Warn, Some("a.rs"), None));
    assert!(!line.contains("a.rs"));
}

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    logger.log(&entry(LogSeverity::Trace, None, None));
    logger.log(&entry(LogSeverity::Debug, None, None));
    logger.log(&entry(LogSeverity::Info, None, None));
    logger.log(&entry(LogSeverity::Warn, None, None));
    logger.log(&entry(LogSeverity::Error, Some("test.rs"), Some(1)));
}

// ============================================================================
// CUSTOM LOGGER TESTS
// ============================================================================

struct CountingLogger {
    count: Arc<Mutex<usize>>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_implementation() {
    let count = Arc::new(Mutex::new(0));
    let logger: Box<dyn Logger> = Box::new(CountingLogger { count: count.clone() });

    logger.log(&entry(LogSeverity::Info, None, None));
    logger.log(&entry(LogSeverity::Error, None, None));

    assert_eq!(*count.lock().unwrap(), 2);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<Box<dyn Logger>>();
}
