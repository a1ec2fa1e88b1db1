//! User-facing texts (Persian) and fault-to-text classification.

use crate::progress::ProgressSnapshot;
use crate::transport::TransportError;
use crate::utils::bytes_to_megabytes;
use crate::BotError;

pub const GREETING: &str = "سلام! 👋\n\n\
من یک ربات دانلودر ویدیو هستم.\n\
فقط کافیه لینک ویدیوی خودت رو از یوتیوب، اینستاگرام یا تیک‌تاک برام بفرستی تا دانلودش کنم.";

pub const INVALID_LINK: &str = "لطفاً یک لینک معتبر ارسال کنید.";
pub const PROCESSING: &str = "⏳ در حال پردازش لینک...";
pub const FETCHING_INFO: &str = "🔍 در حال دریافت اطلاعات ویدیو...";
pub const DOWNLOADING: &str = "📥 در حال دانلود ویدیو... لطفاً صبور باشید، این مرحله ممکن است طول بکشد.";
pub const UPLOADING: &str = "📤 در حال آپلود ویدیو...";
pub const DEFAULT_CAPTION: &str = "ویدیوی شما";

pub const UPLOAD_TOO_LARGE: &str = "❌ خطا: حجم ویدیو برای آپلود در تلگرام بیش از حد بزرگ است.";

const FAILURE_PREFIX: &str = "❌ متاسفانه خطایی در پردازش لینک شما رخ داد.\n\n";
pub const UNSUPPORTED_HINT: &str = "این لینک پشتیبانی نمی‌شود.";
pub const PRIVATE_HINT: &str = "این ویدیو خصوصی است و قابل دانلود نیست.";
pub const GENERIC_HINT: &str = "لطفاً لینک را بررسی کرده و دوباره تلاش کنید.";

/// Best-effort mapping from yt-dlp error text to a hint, first match wins.
/// The patterns follow yt-dlp's current wording and are not a stable interface.
const FAILURE_HINTS: &[(&[&str], &str)] = &[
    (&["Unsupported URL"], UNSUPPORTED_HINT),
    (&["Private video", "login is required"], PRIVATE_HINT),
];

pub fn too_large(size: u64, ceiling: u64) -> String {
    format!(
        "❌ خطا: حجم این ویدیو ({:.2} مگابایت) بیشتر از حد مجاز ({:.0} مگابایت) است.",
        bytes_to_megabytes(size),
        bytes_to_megabytes(ceiling)
    )
}

pub fn upload_progress(snapshot: &ProgressSnapshot) -> String {
    format!(
        "در حال آپلود ویدیو...\n\n✅ پیشرفت: {}٪\n🚀 سرعت: {:.2} MB/s",
        snapshot.percent, snapshot.speed_mbps
    )
}

/// Status text shown when a request failed
pub fn failure(error: &BotError) -> String {
    if let BotError::Transport(TransportError::EntityTooLarge) = error {
        return UPLOAD_TOO_LARGE.to_string();
    }

    let description = error.to_string();
    let hint = FAILURE_HINTS
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| description.contains(p)))
        .map(|(_, hint)| *hint)
        .unwrap_or(GENERIC_HINT);

    format!("{}{}", FAILURE_PREFIX, hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::ExtractError;
    use std::path::PathBuf;

    fn extract_failure(text: &str) -> BotError {
        BotError::Extract(ExtractError::Failed(text.to_string()))
    }

    #[test]
    fn test_failure_unsupported_url() {
        let text = failure(&extract_failure("ERROR: Unsupported URL: https://example.com/page"));
        assert!(text.starts_with(FAILURE_PREFIX));
        assert!(text.ends_with(UNSUPPORTED_HINT));
    }

    #[test]
    fn test_failure_private_or_login() {
        assert!(failure(&extract_failure("ERROR: [youtube] abc: Private video. Sign in")).ends_with(PRIVATE_HINT));
        assert!(failure(&extract_failure("ERROR: [instagram] x: login is required")).ends_with(PRIVATE_HINT));
    }

    #[test]
    fn test_failure_generic_fallback() {
        assert!(failure(&extract_failure("HTTP Error 500")).ends_with(GENERIC_HINT));
        let missing = BotError::Extract(ExtractError::MissingArtifact(PathBuf::from("downloads/x.mp4")));
        assert!(failure(&missing).ends_with(GENERIC_HINT));
        let transport = BotError::Transport(TransportError::Other("Bad Gateway".to_string()));
        assert!(failure(&transport).ends_with(GENERIC_HINT));
    }

    #[test]
    fn test_failure_upload_too_large() {
        assert_eq!(failure(&BotError::Transport(TransportError::EntityTooLarge)), UPLOAD_TOO_LARGE);
    }

    #[test]
    fn test_too_large_text() {
        let text = too_large(2 * 1024 * 1024 * 1024, 1024 * 1024 * 1024);
        assert!(text.contains("2048.00"));
        assert!(text.contains("1024 مگابایت"));
    }

    #[test]
    fn test_upload_progress_text() {
        let text = upload_progress(&ProgressSnapshot { percent: 42, speed_mbps: 1.5 });
        assert!(text.contains("42٪"));
        assert!(text.contains("1.50 MB/s"));
    }
}
