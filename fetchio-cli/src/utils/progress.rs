use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Bar resolution. Progress arrives as fractions, so positions are permille.
pub const BAR_SCALE: u64 = 1000;

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {percent}%")
        .unwrap()
        .progress_chars("=> ")
}

/// Convert a progress fraction into a bar position.
///
/// Downloads without a known content length report negative fractions;
/// clamping pins those bars at zero until the terminal value lands.
pub fn permille(fraction: f32) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_SCALE as f32) as u64
}

#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            multi,
            disabled: true,
        }
    }

    /// Add a bar for one download, or `None` when display is disabled.
    pub fn add_download(&self, url: &str) -> Option<ProgressBar> {
        if self.disabled {
            return None;
        }
        let bar = self.multi.add(ProgressBar::new(BAR_SCALE));
        bar.set_style(download_style());
        bar.set_message(format!("Fetching {url}"));
        bar.enable_steady_tick(Duration::from_millis(500));
        Some(bar)
    }

    #[inline]
    #[allow(unused)]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
