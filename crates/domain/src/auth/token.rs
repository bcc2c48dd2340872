use rand::Rng;

/// Number of random bytes in a session token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generates a fresh session token: 32 bytes from the thread-local CSPRNG, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}
