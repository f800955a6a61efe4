//! Built-in client definitions

use super::rounding::RoundingPolicy;

/// Characters libtorrent-based clients use for the random part of a peer id.
const LIBTORRENT_PEER_ID_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-._~";

const TRANSMISSION_PEER_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const QBITTORRENT_QUERY: &str = "info_hash={infohash}&peer_id={peerid}&port={port}&uploaded={uploaded}&downloaded={downloaded}&left={left}&corrupt=0&key={key}&event={event}&numwant={numwant}&compact=1&no_peer_id=1&supportcrypto=1&redundant=0";

const TRANSMISSION_QUERY: &str = "info_hash={infohash}&peer_id={peerid}&port={port}&uploaded={uploaded}&downloaded={downloaded}&left={left}&numwant={numwant}&key={key}&compact=1&supportcrypto=1&event={event}";

/// Letter case of the hex announce key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum KeyCase {
    Upper,
    Lower,
}

/// Static description of one emulated client release.
#[derive(Debug)]
pub(super) struct ProfileDefinition {
    pub code: &'static str,
    pub name: &'static str,
    pub peer_id_prefix: &'static str,
    pub peer_id_alphabet: &'static [u8],
    pub key_case: KeyCase,
    pub query_template: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
    pub rounding: RoundingPolicy,
}

pub(super) const PROFILES: &[ProfileDefinition] = &[
    ProfileDefinition {
        code: "qbit-4.0.3",
        name: "qBittorrent v4.0.3",
        peer_id_prefix: "-qB4030-",
        peer_id_alphabet: LIBTORRENT_PEER_ID_ALPHABET,
        key_case: KeyCase::Upper,
        query_template: QBITTORRENT_QUERY,
        headers: &[
            ("User-Agent", "qBittorrent/4.0.3"),
            ("Accept-Encoding", "gzip"),
        ],
        rounding: RoundingPolicy::PieceAligned,
    },
    ProfileDefinition {
        code: "qbit-4.3.3",
        name: "qBittorrent v4.3.3",
        peer_id_prefix: "-qB4330-",
        peer_id_alphabet: LIBTORRENT_PEER_ID_ALPHABET,
        key_case: KeyCase::Upper,
        query_template: QBITTORRENT_QUERY,
        headers: &[
            ("User-Agent", "qBittorrent/4.3.3"),
            ("Accept-Encoding", "gzip"),
        ],
        rounding: RoundingPolicy::PieceAligned,
    },
    ProfileDefinition {
        code: "transmission-3.00",
        name: "Transmission 3.00",
        peer_id_prefix: "-TR3000-",
        peer_id_alphabet: TRANSMISSION_PEER_ID_ALPHABET,
        key_case: KeyCase::Lower,
        query_template: TRANSMISSION_QUERY,
        headers: &[
            ("User-Agent", "Transmission/3.00"),
            ("Accept", "*/*"),
            ("Accept-Encoding", "gzip;q=1.0, deflate, identity"),
        ],
        rounding: RoundingPolicy::Exact,
    },
];

/// Looks up a built-in definition by its command-line code.
pub(super) fn find(code: &str) -> Option<&'static ProfileDefinition> {
    PROFILES
        .iter()
        .find(|profile| profile.code.eq_ignore_ascii_case(code))
}
