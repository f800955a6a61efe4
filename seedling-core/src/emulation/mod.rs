//! BitTorrent client emulation.
//!
//! A profile makes announces look like they come from a specific client
//! release: its peer id format, announce key, query parameter order,
//! HTTP headers and the way it rounds reported byte counts.

mod profiles;
pub mod rounding;

use rand::Rng;
pub use rounding::RoundingPolicy;

use self::profiles::{KeyCase, ProfileDefinition};

/// Length of a BitTorrent peer id.
const PEER_ID_LENGTH: usize = 20;

/// Number of hex digits in an announce key.
const KEY_LENGTH: usize = 8;

/// Errors raised while building a client profile.
#[derive(Debug, thiserror::Error)]
pub enum EmulationError {
    #[error("Unknown client code '{code}', available: {available}")]
    UnknownProfile { code: String, available: String },
}

impl EmulationError {
    fn unknown_profile(code: &str) -> Self {
        EmulationError::UnknownProfile {
            code: code.to_string(),
            available: ClientProfile::available_codes()
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// An emulated client with its per-process identity.
///
/// The peer id and key are generated once and reused for every announce
/// of the session, like a real client does.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    code: &'static str,
    name: &'static str,
    peer_id: String,
    key: String,
    query_template: &'static str,
    headers: Vec<(String, String)>,
    rounding: RoundingPolicy,
}

impl ClientProfile {
    /// Builds the profile registered under `code` with a fresh identity.
    ///
    /// # Errors
    ///
    /// - `EmulationError::UnknownProfile` - If no built-in profile matches `code`
    pub fn from_code<R: Rng + ?Sized>(code: &str, rng: &mut R) -> Result<Self, EmulationError> {
        let definition =
            profiles::find(code).ok_or_else(|| EmulationError::unknown_profile(code))?;

        Ok(Self::from_definition(definition, rng))
    }

    fn from_definition<R: Rng + ?Sized>(definition: &'static ProfileDefinition, rng: &mut R) -> Self {
        let peer_id = Self::generate_peer_id(definition, rng);
        let key = Self::generate_key(definition.key_case, rng);
        tracing::debug!(
            "Emulating {} with peer id {} and key {}",
            definition.name,
            peer_id,
            key
        );

        Self {
            code: definition.code,
            name: definition.name,
            peer_id,
            key,
            query_template: definition.query_template,
            headers: definition
                .headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            rounding: definition.rounding,
        }
    }

    fn generate_peer_id<R: Rng + ?Sized>(definition: &ProfileDefinition, rng: &mut R) -> String {
        let alphabet = definition.peer_id_alphabet;
        let mut peer_id = String::with_capacity(PEER_ID_LENGTH);
        peer_id.push_str(definition.peer_id_prefix);
        while peer_id.len() < PEER_ID_LENGTH {
            let index = rng.random_range(0..alphabet.len());
            peer_id.push(char::from(alphabet[index]));
        }
        peer_id
    }

    fn generate_key<R: Rng + ?Sized>(key_case: KeyCase, rng: &mut R) -> String {
        let key: u32 = rng.random();
        match key_case {
            KeyCase::Upper => format!("{key:0width$X}", width = KEY_LENGTH),
            KeyCase::Lower => format!("{key:0width$x}", width = KEY_LENGTH),
        }
    }

    /// Codes accepted by [`ClientProfile::from_code`].
    pub fn available_codes() -> impl Iterator<Item = &'static str> {
        profiles::PROFILES.iter().map(|profile| profile.code)
    }

    /// Command-line code of this profile.
    pub fn code(&self) -> &str {
        self.code
    }

    /// Human readable client name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Raw 20-character peer id.
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Peer id ready for substitution into a query string.
    pub fn peer_id_encoded(&self) -> String {
        urlencoding::encode(&self.peer_id).into_owned()
    }

    /// Announce key identifying this client instance to the tracker.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Query template with `{placeholder}` fields.
    pub fn query_template(&self) -> &str {
        self.query_template
    }

    /// HTTP headers sent with every announce.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Reconciles candidate byte counts the way this client reports them.
    pub fn round(&self, downloaded: u64, uploaded: u64, left: u64, piece_size: u64) -> (u64, u64, u64) {
        self.rounding.round(downloaded, uploaded, left, piece_size)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_unknown_profile() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = ClientProfile::from_code("utorrent-1.0", &mut rng);
        let Err(error) = result else {
            panic!("unknown code must be rejected");
        };
        assert!(error.to_string().contains("qbit-4.0.3"));
    }

    #[test]
    fn test_qbittorrent_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let profile = ClientProfile::from_code("qbit-4.0.3", &mut rng).unwrap();

        assert_eq!(profile.name(), "qBittorrent v4.0.3");
        assert_eq!(profile.peer_id().len(), 20);
        assert!(profile.peer_id().starts_with("-qB4030-"));
        assert_eq!(profile.key().len(), 8);
        assert!(
            profile
                .key()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
        assert!(profile.query_template().contains("{numwant}"));
        assert!(
            profile
                .headers()
                .iter()
                .any(|(name, value)| name == "User-Agent" && value == "qBittorrent/4.0.3")
        );
    }

    #[test]
    fn test_transmission_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let profile = ClientProfile::from_code("Transmission-3.00", &mut rng).unwrap();

        assert_eq!(profile.code(), "transmission-3.00");
        assert!(profile.peer_id().starts_with("-TR3000-"));
        assert!(
            profile
                .key()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
        assert_eq!(profile.round(1234, 5, 766, 100), (1234, 5, 766));
    }

    #[test]
    fn test_identity_is_seed_deterministic() {
        let first = ClientProfile::from_code("qbit-4.3.3", &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let second = ClientProfile::from_code("qbit-4.3.3", &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        assert_eq!(first.peer_id(), second.peer_id());
        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn test_peer_id_encoding_keeps_unreserved_characters() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let profile = ClientProfile::from_code("qbit-4.0.3", &mut rng).unwrap();
        assert_eq!(profile.peer_id_encoded(), profile.peer_id());
    }
}
