//! Bencode metadata extraction and info hash calculation

use sha1::{Digest, Sha1};

use super::types::{TorrentContext, TorrentFile};
use crate::torrent::{InfoHash, TorrentError};

pub(super) type BencodeDict<'a> = std::collections::HashMap<&'a [u8], bencode_rs::Value<'a>>;
pub(super) type ParseResult<T> = Result<T, TorrentError>;
pub(super) type FilesResult = ParseResult<(Vec<TorrentFile>, u64)>;

fn invalid(reason: impl Into<String>) -> TorrentError {
    TorrentError::InvalidTorrentFile {
        reason: reason.into(),
    }
}

/// Bencode parsing utilities for torrent metadata extraction.
pub struct BencodeParser;

impl BencodeParser {
    /// Parse bencode data into the torrent context used by a session.
    ///
    /// # Errors
    ///
    /// - `TorrentError::InvalidTorrentFile` - If bencode parsing or metadata extraction failed
    pub fn parse_bencode_data(torrent_bytes: &[u8]) -> ParseResult<TorrentContext> {
        let parsed = bencode_rs::Value::parse(torrent_bytes)
            .map_err(|e| invalid(format!("Bencode parsing failed: {e:?}")))?;

        let Some(root) = parsed.first() else {
            return Err(invalid("Empty bencode data"));
        };

        let bencode_rs::Value::Dictionary(dict) = root else {
            return Err(invalid("Root element must be dictionary"));
        };

        Self::extract_context_from_dict(dict, torrent_bytes)
    }

    fn extract_context_from_dict(
        dict: &BencodeDict<'_>,
        original_data: &[u8],
    ) -> ParseResult<TorrentContext> {
        let Some(info) = dict.get(b"info".as_slice()) else {
            return Err(invalid("Missing 'info' field"));
        };
        let bencode_rs::Value::Dictionary(info_dict) = info else {
            return Err(invalid("Info field must be dictionary"));
        };

        let info_hash = Self::calculate_info_hash(original_data)?;
        let name = Self::extract_bytes_as_string(info_dict, b"name")?;

        let piece_size = Self::extract_integer(info_dict, b"piece length")?;
        if piece_size <= 0 {
            return Err(invalid("Piece length must be positive"));
        }

        let pieces = Self::extract_bytes(info_dict, b"pieces")?;
        if !pieces.len().is_multiple_of(20) {
            return Err(invalid("Invalid pieces length"));
        }

        let (files, total_size) = match (
            Self::extract_integer(info_dict, b"length"),
            info_dict.get(b"files".as_slice()),
        ) {
            (Ok(length), _) => {
                let length = u64::try_from(length).map_err(|_| invalid("Negative length"))?;
                let files = vec![TorrentFile {
                    path: vec![name.clone()],
                    length,
                }];
                (files, length)
            }
            (Err(_), Some(bencode_rs::Value::List(files_list))) => {
                Self::extract_files_info(files_list)?
            }
            (Err(_), Some(_)) => return Err(invalid("Invalid files structure")),
            (Err(_), None) => return Err(invalid("Missing 'files' or 'length' field")),
        };

        if total_size == 0 {
            return Err(invalid("Torrent content is empty"));
        }

        let tracker_urls = Self::extract_tracker_urls(dict)?;

        Ok(TorrentContext {
            info_hash,
            name,
            piece_size: piece_size as u64,
            total_size,
            files,
            tracker_urls,
        })
    }

    /// SHA-1 of the raw `info` value exactly as it appears in the file.
    fn calculate_info_hash(original_data: &[u8]) -> ParseResult<InfoHash> {
        let (start, end) = Self::find_info_span(original_data)?;

        let mut hasher = Sha1::new();
        hasher.update(&original_data[start..end]);
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&hasher.finalize());

        Ok(InfoHash::new(hash))
    }

    /// Locates the byte range of the top-level `info` value.
    ///
    /// Walks the root dictionary key by key so an `info` string nested in
    /// another field never matches.
    fn find_info_span(data: &[u8]) -> ParseResult<(usize, usize)> {
        if data.first() != Some(&b'd') {
            return Err(invalid("Expected dictionary start"));
        }

        let mut pos = 1;
        while pos < data.len() && data[pos] != b'e' {
            let key_end = Self::find_value_end(data, pos)?;
            let key = Self::string_content(data, pos, key_end)?;
            let value_end = Self::find_value_end(data, key_end)?;
            if key == b"info" {
                return Ok((key_end, value_end));
            }
            pos = value_end;
        }

        Err(invalid("Could not find info dictionary in data"))
    }

    fn string_content(data: &[u8], start: usize, end: usize) -> ParseResult<&[u8]> {
        let colon = data[start..end]
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| invalid("Dictionary key must be a string"))?;
        Ok(&data[start + colon + 1..end])
    }

    /// Returns the position just past the bencode value starting at `start`.
    ///
    /// # Errors
    ///
    /// - `TorrentError::InvalidTorrentFile` - If the value is truncated or malformed
    pub fn find_value_end(data: &[u8], start: usize) -> ParseResult<usize> {
        let mut pos = start;
        let mut depth = 0usize;

        loop {
            let Some(&byte) = data.get(pos) else {
                return Err(invalid("Incomplete bencode value"));
            };

            match byte {
                b'd' | b'l' => {
                    depth += 1;
                    pos += 1;
                }
                b'e' => {
                    if depth == 0 {
                        return Err(invalid("Unexpected end marker"));
                    }
                    depth -= 1;
                    pos += 1;
                }
                b'i' => {
                    let close = data[pos..]
                        .iter()
                        .position(|&b| b == b'e')
                        .ok_or_else(|| invalid("Unterminated integer"))?;
                    pos += close + 1;
                }
                b'0'..=b'9' => {
                    let colon = data[pos..]
                        .iter()
                        .position(|&b| b == b':')
                        .ok_or_else(|| invalid("Invalid string format"))?;
                    let length: usize = std::str::from_utf8(&data[pos..pos + colon])
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| invalid("Invalid string length"))?;
                    pos += colon + 1 + length;
                    if pos > data.len() {
                        return Err(invalid("String exceeds data"));
                    }
                }
                _ => return Err(invalid("Invalid bencode character")),
            }

            if depth == 0 {
                return Ok(pos);
            }
        }
    }

    fn extract_bytes_as_string(dict: &BencodeDict<'_>, key: &[u8]) -> ParseResult<String> {
        let bytes = Self::extract_bytes(dict, key)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            invalid(format!(
                "Invalid UTF-8 in field: {:?}",
                String::from_utf8_lossy(key)
            ))
        })
    }

    fn extract_bytes<'a>(dict: &'a BencodeDict<'_>, key: &[u8]) -> ParseResult<&'a [u8]> {
        match dict.get(key) {
            Some(bencode_rs::Value::Bytes(bytes)) => Ok(bytes),
            _ => Err(invalid(format!(
                "Missing or invalid field: {:?}",
                String::from_utf8_lossy(key)
            ))),
        }
    }

    fn extract_integer(dict: &BencodeDict<'_>, key: &[u8]) -> ParseResult<i64> {
        match dict.get(key) {
            Some(bencode_rs::Value::Integer(value)) => Ok(*value),
            _ => Err(invalid(format!(
                "Missing or invalid integer field: {:?}",
                String::from_utf8_lossy(key)
            ))),
        }
    }

    fn extract_files_info(files_list: &[bencode_rs::Value<'_>]) -> FilesResult {
        let mut files = Vec::with_capacity(files_list.len());
        let mut total_length = 0u64;

        for file_value in files_list {
            let bencode_rs::Value::Dictionary(file_dict) = file_value else {
                return Err(invalid("Invalid file entry type"));
            };

            let length = u64::try_from(Self::extract_integer(file_dict, b"length")?)
                .map_err(|_| invalid("Negative file length"))?;
            total_length = total_length
                .checked_add(length)
                .ok_or_else(|| invalid("Total length overflow"))?;

            let Some(bencode_rs::Value::List(path_list)) = file_dict.get(b"path".as_slice())
            else {
                return Err(invalid("Missing or invalid path in file"));
            };

            let path = path_list
                .iter()
                .map(|component| match component {
                    bencode_rs::Value::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                        .map_err(|_| invalid("Invalid UTF-8 in file path")),
                    _ => Err(invalid("Invalid path component type")),
                })
                .collect::<ParseResult<Vec<_>>>()?;

            files.push(TorrentFile { path, length });
        }

        Ok((files, total_length))
    }

    /// Collects HTTP(S) tracker URLs from `announce` and `announce-list`.
    fn extract_tracker_urls(dict: &BencodeDict<'_>) -> ParseResult<Vec<String>> {
        let mut candidates = Vec::new();

        if let Ok(announce) = Self::extract_bytes_as_string(dict, b"announce") {
            candidates.push(announce);
        }

        if let Some(bencode_rs::Value::List(tiers)) = dict.get(b"announce-list".as_slice()) {
            for tier in tiers {
                if let bencode_rs::Value::List(tier_urls) = tier {
                    for url_value in tier_urls {
                        if let bencode_rs::Value::Bytes(url_bytes) = url_value
                            && let Ok(url) = String::from_utf8(url_bytes.to_vec())
                        {
                            candidates.push(url);
                        }
                    }
                }
            }
        }

        if candidates.is_empty() {
            return Err(invalid("No announce URLs found"));
        }

        let mut tracker_urls: Vec<String> = Vec::new();
        for candidate in candidates {
            let is_http = url::Url::parse(&candidate)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !is_http {
                tracing::debug!("Skipping unsupported tracker URL: {}", candidate);
                continue;
            }
            if !tracker_urls.contains(&candidate) {
                tracker_urls.push(candidate);
            }
        }

        if tracker_urls.is_empty() {
            return Err(invalid("No HTTP tracker URLs found"));
        }

        Ok(tracker_urls)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const PIECES: &str = "\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01\x01";

    fn single_file_torrent() -> Vec<u8> {
        format!(
            "d8:announce31:http://tracker.example.com:80804:infod6:lengthi1048576e4:name9:test.file12:piece lengthi32768e6:pieces20:{PIECES}ee"
        )
        .into_bytes()
    }

    #[test]
    fn test_find_value_end_simple() {
        let data = b"d3:keyi42ee";
        assert_eq!(BencodeParser::find_value_end(data, 0).unwrap(), data.len());
    }

    #[test]
    fn test_find_value_end_nested() {
        let data = b"d3:keyd4:namel4:testi42eeee";
        assert_eq!(BencodeParser::find_value_end(data, 0).unwrap(), data.len());
    }

    #[test]
    fn test_find_value_end_scalars() {
        assert_eq!(BencodeParser::find_value_end(b"4:spamxx", 0).unwrap(), 6);
        assert_eq!(BencodeParser::find_value_end(b"i-3exx", 0).unwrap(), 4);
    }

    #[test]
    fn test_find_value_end_incomplete() {
        assert!(BencodeParser::find_value_end(b"d3:key", 0).is_err());
        assert!(BencodeParser::find_value_end(b"d3:key999:", 0).is_err());
        assert!(BencodeParser::find_value_end(b"x", 0).is_err());
    }

    #[test]
    fn test_parse_single_file_torrent() {
        let context = BencodeParser::parse_bencode_data(&single_file_torrent()).unwrap();

        assert_eq!(context.name, "test.file");
        assert_eq!(context.piece_size, 32768);
        assert_eq!(context.total_size, 1048576);
        assert_eq!(context.files.len(), 1);
        assert_eq!(context.tracker_urls, vec!["http://tracker.example.com:8080"]);
        assert_eq!(context.piece_count(), 32);
    }

    #[test]
    fn test_info_hash_covers_only_info_value() {
        let data = single_file_torrent();
        let context = BencodeParser::parse_bencode_data(&data).unwrap();

        let info_start = data.windows(6).position(|w| w == b"4:info").unwrap() + 6;
        let info_bytes = &data[info_start..data.len() - 1];
        let mut hasher = Sha1::new();
        hasher.update(info_bytes);
        assert_eq!(context.info_hash.as_bytes()[..], hasher.finalize()[..]);
    }

    #[test]
    fn test_info_key_inside_other_value_is_ignored() {
        let data = b"d7:comment4:info8:announce31:http://tracker.example.com:80804:infod6:lengthi10e4:name1:a12:piece lengthi4e6:pieces0:ee";
        let context = BencodeParser::parse_bencode_data(data).unwrap();
        assert_eq!(context.total_size, 10);
    }

    #[test]
    fn test_parse_rejects_missing_info() {
        let result = BencodeParser::parse_bencode_data(b"d8:announce9:test.com:e");
        assert!(matches!(
            result,
            Err(TorrentError::InvalidTorrentFile { reason }) if reason.contains("Missing 'info' field")
        ));
    }

    #[test]
    fn test_parse_rejects_non_dictionary_root() {
        assert!(BencodeParser::parse_bencode_data(b"l4:teste").is_err());
        assert!(BencodeParser::parse_bencode_data(b"").is_err());
    }

    #[test]
    fn test_parse_rejects_zero_piece_length() {
        let data = format!(
            "d8:announce31:http://tracker.example.com:80804:infod6:lengthi10e4:name1:a12:piece lengthi0e6:pieces20:{PIECES}ee"
        );
        assert!(BencodeParser::parse_bencode_data(data.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_content() {
        let data = format!(
            "d8:announce31:http://tracker.example.com:80804:infod6:lengthi0e4:name1:a12:piece lengthi4e6:pieces20:{PIECES}ee"
        );
        assert!(BencodeParser::parse_bencode_data(data.as_bytes()).is_err());
    }

    #[test]
    fn test_extract_files_info_sums_lengths() {
        let file = |length: i64, name: &'static [u8]| {
            let mut file_dict = HashMap::new();
            file_dict.insert(b"length".as_slice(), bencode_rs::Value::Integer(length));
            file_dict.insert(
                b"path".as_slice(),
                bencode_rs::Value::List(vec![bencode_rs::Value::Bytes(name)]),
            );
            bencode_rs::Value::Dictionary(file_dict)
        };

        let (files, total) =
            BencodeParser::extract_files_info(&[file(524288, b"a.bin"), file(1024, b"b.bin")])
                .unwrap();
        assert_eq!(total, 525312);
        assert_eq!(files[1].path, vec!["b.bin"]);
    }

    #[test]
    fn test_tracker_urls_filtered_and_deduplicated() {
        let data = format!(
            "d8:announce31:http://tracker.example.com:808013:announce-listll31:http://tracker.example.com:8080el26:udp://udp.example.com:1337el26:https://backup.example.orgee4:infod6:lengthi10e4:name1:a12:piece lengthi4e6:pieces20:{PIECES}ee"
        );
        let context = BencodeParser::parse_bencode_data(data.as_bytes()).unwrap();
        assert_eq!(
            context.tracker_urls,
            vec!["http://tracker.example.com:8080", "https://backup.example.org"]
        );
    }

    #[test]
    fn test_udp_only_torrent_rejected() {
        let data = format!(
            "d8:announce26:udp://udp.example.com:13374:infod6:lengthi10e4:name1:a12:piece lengthi4e6:pieces20:{PIECES}ee"
        );
        let result = BencodeParser::parse_bencode_data(data.as_bytes());
        assert!(matches!(
            result,
            Err(TorrentError::InvalidTorrentFile { reason }) if reason.contains("No HTTP tracker")
        ));
    }
}
