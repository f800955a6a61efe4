//! Validation of user supplied session parameters.
//!
//! Sizes accept `b`, `kb`, `mb`, `gb` and `tb` (binary multiples), the
//! initial downloaded amount may also be a percentage of the torrent, and
//! speeds accept `kbps` and `mbps` (KiB/s and MiB/s).

use std::sync::LazyLock;

use regex::Regex;

use crate::torrent::TorrentContext;

/// Default port announced to the tracker.
pub const DEFAULT_PORT: u16 = 8999;

static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(b|kb|mb|gb|tb)?\s*$").expect("size pattern is valid")
});

static PERCENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*%\s*$").expect("percent pattern is valid")
});

static SPEED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(kbps|mbps)\s*$").expect("speed pattern is valid")
});

/// Errors raised while validating session input.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    #[error("'{value}' is not a size, expected e.g. 0b, 512kb, 1.5gb")]
    InvalidSize { value: String },

    #[error("'{value}' is not a percentage between 0% and 100%")]
    InvalidPercent { value: String },

    #[error("'{value}' is not a speed, expected e.g. 0kbps, 100kbps, 2mbps")]
    InvalidSpeed { value: String },

    #[error("Initial downloaded {downloaded} bytes exceeds torrent size {total} bytes")]
    ExceedsTorrentSize { downloaded: u64, total: u64 },

    #[error("Port {port} is outside 1-65535")]
    InvalidPort { port: u16 },
}

/// Raw session parameters as typed by the user.
#[derive(Debug, Clone)]
pub struct InputArgs {
    pub initial_downloaded: String,
    pub initial_uploaded: String,
    pub download_speed: String,
    pub upload_speed: String,
    pub port: u16,
    pub debug: bool,
}

/// Validated session parameters in bytes and bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInput {
    pub initial_downloaded: u64,
    pub initial_uploaded: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub port: u16,
    pub debug: bool,
}

impl InputArgs {
    /// Validates the arguments against the torrent they will be used for.
    ///
    /// A partially downloaded starting point is aligned down to a piece
    /// boundary, matching what a real client could have verified.
    ///
    /// # Errors
    ///
    /// - `InputError` - If any value is malformed or out of range
    pub fn parse(&self, torrent: &TorrentContext) -> Result<SessionInput, InputError> {
        if self.port == 0 {
            return Err(InputError::InvalidPort { port: self.port });
        }

        let downloaded = parse_downloaded(&self.initial_downloaded, torrent.total_size)?;
        if downloaded > torrent.total_size {
            return Err(InputError::ExceedsTorrentSize {
                downloaded,
                total: torrent.total_size,
            });
        }
        let initial_downloaded = if downloaded == torrent.total_size {
            downloaded
        } else {
            downloaded - downloaded % torrent.piece_size
        };

        Ok(SessionInput {
            initial_downloaded,
            initial_uploaded: parse_size(&self.initial_uploaded)?,
            download_speed: parse_speed(&self.download_speed)?,
            upload_speed: parse_speed(&self.upload_speed)?,
            port: self.port,
            debug: self.debug,
        })
    }
}

/// Parses `N%` of `total` or an absolute size.
fn parse_downloaded(value: &str, total: u64) -> Result<u64, InputError> {
    let Some(captures) = PERCENT_PATTERN.captures(value) else {
        return parse_size(value);
    };

    let percent: f64 = captures[1].parse().map_err(|_| InputError::InvalidPercent {
        value: value.to_string(),
    })?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(InputError::InvalidPercent {
            value: value.to_string(),
        });
    }

    Ok(((total as f64) * percent / 100.0).round() as u64)
}

/// Parses a size such as `512kb` into bytes; a bare number is bytes.
pub fn parse_size(value: &str) -> Result<u64, InputError> {
    let invalid = || InputError::InvalidSize {
        value: value.to_string(),
    };
    let captures = SIZE_PATTERN.captures(value).ok_or_else(invalid)?;
    let amount: f64 = captures[1].parse().map_err(|_| invalid())?;
    let unit = captures
        .get(2)
        .map_or("b".to_string(), |unit| unit.as_str().to_ascii_lowercase());

    let multiplier: u64 = match unit.as_str() {
        "b" => 1,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        "tb" => 1 << 40,
        _ => return Err(invalid()),
    };

    to_bytes(amount, multiplier).ok_or_else(invalid)
}

/// Parses a speed such as `100kbps` into bytes per second.
pub fn parse_speed(value: &str) -> Result<u64, InputError> {
    let invalid = || InputError::InvalidSpeed {
        value: value.to_string(),
    };
    let captures = SPEED_PATTERN.captures(value).ok_or_else(invalid)?;
    let amount: f64 = captures[1].parse().map_err(|_| invalid())?;

    let multiplier: u64 = match captures[2].to_ascii_lowercase().as_str() {
        "kbps" => 1 << 10,
        "mbps" => 1 << 20,
        _ => return Err(invalid()),
    };

    to_bytes(amount, multiplier).ok_or_else(invalid)
}

fn to_bytes(amount: f64, multiplier: u64) -> Option<u64> {
    let bytes = (amount * multiplier as f64).round();
    (bytes.is_finite() && bytes >= 0.0 && bytes <= u64::MAX as f64).then_some(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torrent::InfoHash;

    fn torrent(total_size: u64, piece_size: u64) -> TorrentContext {
        TorrentContext {
            info_hash: InfoHash::new([0; 20]),
            name: "test".to_string(),
            piece_size,
            total_size,
            files: Vec::new(),
            tracker_urls: vec!["http://tracker.example.com/announce".to_string()],
        }
    }

    fn args(downloaded: &str) -> InputArgs {
        InputArgs {
            initial_downloaded: downloaded.to_string(),
            initial_uploaded: "0b".to_string(),
            download_speed: "100kbps".to_string(),
            upload_speed: "0kbps".to_string(),
            port: DEFAULT_PORT,
            debug: false,
        }
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("0b"), Ok(0));
        assert_eq!(parse_size("1024"), Ok(1024));
        assert_eq!(parse_size("512kb"), Ok(524_288));
        assert_eq!(parse_size("1.5GB"), Ok(1_610_612_736));
        assert_eq!(parse_size("2 tb"), Ok(2_199_023_255_552));
        assert!(parse_size("ten mb").is_err());
        assert!(parse_size("-1kb").is_err());
        assert!(parse_size("1pb").is_err());
    }

    #[test]
    fn test_parse_speed_units() {
        assert_eq!(parse_speed("0kbps"), Ok(0));
        assert_eq!(parse_speed("100kbps"), Ok(102_400));
        assert_eq!(parse_speed("1.5Mbps"), Ok(1_572_864));
        assert!(parse_speed("100").is_err());
        assert!(parse_speed("100kb").is_err());
    }

    #[test]
    fn test_percent_downloaded_is_piece_aligned() {
        let input = args("50%").parse(&torrent(1000, 30)).unwrap();
        // 500 bytes rounded down to a 30 byte piece boundary.
        assert_eq!(input.initial_downloaded, 480);
        assert_eq!(input.download_speed, 102_400);
    }

    #[test]
    fn test_full_download_is_not_aligned() {
        let input = args("100%").parse(&torrent(1000, 30)).unwrap();
        assert_eq!(input.initial_downloaded, 1000);
    }

    #[test]
    fn test_downloaded_beyond_torrent_rejected() {
        let result = args("2kb").parse(&torrent(1000, 10));
        assert_eq!(
            result,
            Err(InputError::ExceedsTorrentSize {
                downloaded: 2048,
                total: 1000
            })
        );
        assert!(matches!(
            args("101%").parse(&torrent(1000, 10)),
            Err(InputError::InvalidPercent { .. })
        ));
    }

    #[test]
    fn test_port_zero_rejected() {
        let mut raw = args("0%");
        raw.port = 0;
        assert_eq!(
            raw.parse(&torrent(1000, 10)),
            Err(InputError::InvalidPort { port: 0 })
        );
    }
}
