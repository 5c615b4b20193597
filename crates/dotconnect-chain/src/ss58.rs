//! SS58 address re-encoding.

use std::str::FromStr;

use subxt::utils::AccountId32;

/// Context string hashed in front of the payload for the checksum.
const CHECKSUM_CONTEXT: &[u8] = b"SS58PRE";

/// Largest address format representable in the two-byte prefix form.
const MAX_ADDRESS_FORMAT: u16 = 0x3FFF;

/// Re-encode an SS58 address for a network's prefix.
///
/// Extensions report addresses in whatever format they store; sessions
/// show them in the format of the network they are connected to. Returns
/// `None` when `address` is not a valid SS58 address (e.g. Ethereum-style
/// accounts) or `prefix` is out of range, in which case callers keep the
/// original string.
pub fn reencode_address(address: &str, prefix: u16) -> Option<String> {
    let account = AccountId32::from_str(address).ok()?;

    let mut payload = match prefix {
        0..64 => vec![prefix as u8],
        64..=MAX_ADDRESS_FORMAT => {
            let [low, high] = prefix.to_le_bytes();
            vec![(low >> 2) | 0x40, ((low & 0x03) << 6) | high]
        }
        _ => return None,
    };
    payload.extend_from_slice(&account.0);

    let hash = sp_crypto_hashing::blake2_512(&[CHECKSUM_CONTEXT, &payload].concat());
    payload.extend_from_slice(&hash[..2]);

    Some(bs58::encode(payload).into_string())
}
