// 进度显示
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Byte progress of a single file copy.
pub struct ProgressTracker {
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_size: u64, description: &str) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        let style = ProgressStyle::with_template(concat!(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ",
            "{bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        progress_bar.set_style(style);
        progress_bar.set_message(description.to_string());

        Self {
            progress_bar,
            start_time: Instant::now(),
        }
    }

    pub fn update(&self, bytes_transferred: u64) {
        self.progress_bar.set_position(bytes_transferred);
    }

    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        let total = self.progress_bar.position();

        // 计算平均速度
        let avg_speed = if elapsed.as_secs_f64() > 0.0 {
            (total as f64 / elapsed.as_secs_f64()) as u64
        } else {
            total
        };

        self.progress_bar
            .finish_with_message(format!("done (avg speed: {})", format_speed(avg_speed)));
    }

    pub fn finish_with_error(&self, error: &str) {
        self.progress_bar.abandon_with_message(format!("failed: {}", error));
    }
}

// 格式化速度显示
pub fn format_speed(bytes_per_sec: u64) -> String {
    if bytes_per_sec < 1024 {
        format!("{} B/s", bytes_per_sec)
    } else if bytes_per_sec < 1024 * 1024 {
        format!("{:.2} KB/s", bytes_per_sec as f64 / 1024.0)
    } else if bytes_per_sec < 1024 * 1024 * 1024 {
        format!("{:.2} MB/s", bytes_per_sec as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB/s", bytes_per_sec as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
