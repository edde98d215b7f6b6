use rand::Rng;

use crate::constants::INVITE_CODE_LEN;

const INVITE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a fresh invite code: eight uppercase base-36 characters.
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Normalize user input (trim, uppercase) and check it looks like an
/// invite code.
pub fn normalize_invite_code(input: &str) -> Result<String, InviteCodeError> {
    let code = input.trim().to_ascii_uppercase();

    if code.len() != INVITE_CODE_LEN {
        return Err(InviteCodeError::InvalidLength(code.len()));
    }
    if let Some(c) = code.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(InviteCodeError::InvalidCharacter(c));
    }

    Ok(code)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InviteCodeError {
    #[error("Invite code must be 8 characters, got {0}")]
    InvalidLength(usize),

    #[error("Invalid character in invite code: {0:?}")]
    InvalidCharacter(char),
}
