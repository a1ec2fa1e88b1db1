use std::net::Ipv4Addr;
use url::{Host, Url};

const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// Check whether the input looks like an absolute http(s)/ftp(s) URL.
///
/// Accepts a domain name with at least two labels, `localhost` or a dotted IPv4 host,
/// an optional port and an optional path/query. Whether the site is actually supported
/// is decided later by yt-dlp.
pub fn is_valid_url(input: &str) -> bool {
    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return false;
    }

    // `Url::parse` tolerates "http:example.com", the explicit "://" is required here
    let Some((scheme, rest)) = input.split_once("://") else {
        return false;
    };
    if !URL_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
        return false;
    }

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() || authority.contains('@') || authority.starts_with('[') {
        return false;
    }
    // Anything after the host and port has to start with a path or a query
    if rest[authority.len()..].starts_with('#') {
        return false;
    }
    let raw_host = authority.split(':').next().unwrap_or_default();

    let Ok(parsed) = Url::parse(input) else {
        return false;
    };

    match parsed.host() {
        // Non-special schemes such as ftps leave IPv4 hosts as plain domains
        Some(Host::Domain(domain)) => {
            is_dotted_quad(raw_host) || domain.eq_ignore_ascii_case("localhost") || is_valid_domain(domain)
        }
        // The WHATWG parser also turns "1.2.3" or "0x7f.1" into IPv4, only dotted quads count
        Some(Host::Ipv4(_)) => raw_host.parse::<Ipv4Addr>().is_ok() || is_dotted_quad(raw_host),
        Some(Host::Ipv6(_)) | None => false,
    }
}

fn is_valid_domain(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    labels_ok && labels.last().is_some_and(|tld| tld.len() >= 2)
}

fn is_dotted_quad(host: &str) -> bool {
    let parts: Vec<&str> = host.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| (1..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit()))
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Size in MiB, as shown to chat users
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Average throughput in MB/s, zero until any time has elapsed
pub fn format_speed(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        bytes_to_megabytes(bytes) / elapsed_secs
    } else {
        0.0
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path, "--version").await {
        missing.push(format!("{} - required for extracting and downloading videos", yt_dlp_path));
    }

    // yt-dlp shells out to ffmpeg to merge separate video and audio streams
    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for merging video and audio streams".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
