//! Text helpers shared by the CLI tables and the TUI.

/// `width`-cell bar for a 0-100 percentage.
pub fn progress_bar(percentage: u8, width: usize) -> String {
    let filled = (percentage.min(100) as usize * width) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("hello", 5), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_counts_chars_not_bytes() {
            assert_eq!(truncate("héllo wörld", 8), "héllo...");
        }

        #[test]
        fn truncate_minimum_length() {
            // With max_len = 4, we get 1 char + "..."
            assert_eq!(truncate("hello", 4), "h...");
        }
    }

    mod bar_tests {
        use super::*;

        #[test]
        fn bar_widths() {
            assert_eq!(progress_bar(0, 4), "░░░░");
            assert_eq!(progress_bar(50, 4), "██░░");
            assert_eq!(progress_bar(100, 4), "████");
        }
    }

    mod duration_tests {
        use super::*;

        #[test]
        fn durations() {
            assert_eq!(format_duration(0), "0m");
            assert_eq!(format_duration(59_999), "0m");
            assert_eq!(format_duration(90 * 60_000), "1h 30m");
            assert_eq!(format_duration(2 * 3_600_000), "2h");
        }
    }
}
