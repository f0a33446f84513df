//! Platform abstraction layer
//!
//! Browser-only pieces live in `web`: the PeerJS-backed [`Transport`] and the
//! `WebPong` handle exported to the page. Native builds use
//! [`LocalNetwork`](crate::net::LocalNetwork) instead and need nothing here.
//!
//! [`Transport`]: crate::net::Transport

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{WebPong, WebTransport};

/// Random lowercase room code for peers that were not given an id
pub fn random_peer_id<R: rand::Rng + ?Sized>(rng: &mut R) -> crate::PeerId {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let code: String = (0..8)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    crate::PeerId::new(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_random_peer_id_shape() {
        let mut rng = Pcg32::seed_from_u64(5);
        let id = random_peer_id(&mut rng);
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(id, random_peer_id(&mut rng));
    }
}
