//! Transaction signing with the treasury key.

use bincode::Options as _;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair as SolanaKeypair, Signer as _};
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{ExecError, ExecResult};

/// Length of a serialized keypair: 32 secret bytes followed by 32 public
const KEYPAIR_LEN: usize = 64;

/// Wire decoding for transactions handed out by the routing service.
///
/// Fixed-width integers like the node expects, and no trailing garbage.
pub fn decode_transaction(bytes: &[u8]) -> ExecResult<VersionedTransaction> {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(bytes)
        .map_err(|e| ExecError::MalformedTransaction(e.to_string()))
}

/// Transaction id: base58 of the first signature.
pub fn transaction_id(bytes: &[u8]) -> ExecResult<String> {
    decode_transaction(bytes)?
        .signatures
        .first()
        .map(ToString::to_string)
        .ok_or_else(|| ExecError::MalformedTransaction("transaction has no signatures".into()))
}

// =============================================================================
// Keypair
// =============================================================================

/// Treasury keypair.
///
/// Never printed; the JSON source it was parsed from is zeroized.
pub struct Keypair {
    inner: SolanaKeypair,
}

impl Keypair {
    /// Build from 64 keypair bytes (secret ‖ public).
    ///
    /// # Errors
    ///
    /// `ExecError::Config` if the length is wrong or the public half does
    /// not belong to the secret half.
    #[allow(deprecated)]
    pub fn from_bytes(bytes: &[u8]) -> ExecResult<Self> {
        if bytes.len() != KEYPAIR_LEN {
            return Err(ExecError::Config(format!(
                "keypair must be {KEYPAIR_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let inner = SolanaKeypair::from_bytes(bytes)
            .map_err(|_| ExecError::Config("keypair public key does not match secret".into()))?;
        Ok(Self { inner })
    }

    /// Parse a JSON array of 64 byte values, e.g. `[12,34,...]`.
    pub fn from_json(raw: &str) -> ExecResult<Self> {
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_str(raw)
                .map_err(|e| ExecError::Config(format!("keypair is not a JSON byte array: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Build from a 32-byte secret seed
    pub fn from_seed(seed: &[u8; 32]) -> ExecResult<Self> {
        let inner = keypair_from_seed(seed)
            .map_err(|e| ExecError::Config(format!("invalid keypair seed: {e}")))?;
        Ok(Self { inner })
    }

    /// Public key
    pub fn pubkey(&self) -> Pubkey {
        self.inner.pubkey()
    }

    /// Public key as base58 (the wallet address)
    pub fn pubkey_base58(&self) -> String {
        self.pubkey().to_string()
    }

    /// 64-byte keypair encoding (secret ‖ public)
    pub fn to_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LEN]> {
        Zeroizing::new(self.inner.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey_base58())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Signing
// =============================================================================

/// Signed transaction ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Wire bytes
    pub bytes: Vec<u8>,
    /// Transaction id (base58 of the first signature)
    pub signature: String,
}

/// Place the keypair's signature into the matching signer slot.
///
/// Deterministic: ed25519 signatures carry no randomness, so the same
/// unsigned bytes and key always produce the same output.
///
/// # Errors
///
/// `ExecError::MalformedTransaction` if the bytes do not parse, the
/// signature slots do not match the header, or the key is not one of the
/// message's required signers.
pub fn sign_transaction(unsigned: &[u8], keypair: &Keypair) -> ExecResult<SignedTransaction> {
    let mut tx = decode_transaction(unsigned)?;

    let required = usize::from(tx.message.header().num_required_signatures);
    if tx.signatures.len() != required {
        return Err(ExecError::MalformedTransaction(format!(
            "{} signature slots for {required} required signers",
            tx.signatures.len()
        )));
    }

    let pubkey = keypair.pubkey();
    let slot = tx
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == pubkey)
        .ok_or_else(|| {
            ExecError::MalformedTransaction(format!("{pubkey} is not a required signer"))
        })?;

    tx.signatures[slot] = keypair.inner.sign_message(&tx.message.serialize());

    let signature = tx.signatures[0].to_string();
    let bytes = bincode::serialize(&tx)
        .map_err(|e| ExecError::MalformedTransaction(e.to_string()))?;
    Ok(SignedTransaction { bytes, signature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::unsigned_transaction;
    use solana_sdk::signature::Signature;

    fn keypair() -> Keypair {
        Keypair::from_seed(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_keypair_from_json_round_trip() {
        let kp = keypair();
        let json = serde_json::to_string(&kp.to_bytes().to_vec()).unwrap();
        let parsed = Keypair::from_json(&json).unwrap();
        assert_eq!(parsed.pubkey(), kp.pubkey());
    }

    #[test]
    fn test_keypair_rejects_bad_input() {
        assert!(Keypair::from_json("[1,2,3]").is_err());
        assert!(Keypair::from_json("not json").is_err());

        let mut bytes = keypair().to_bytes().to_vec();
        bytes[40] ^= 0xff;
        assert!(Keypair::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let kp = keypair();
        let printed = format!("{kp:?}");
        assert!(printed.contains(&kp.pubkey_base58()));
        assert!(!printed.contains("inner"));
    }

    #[test]
    fn test_sign_is_deterministic_and_verifies() {
        let kp = keypair();
        let unsigned = unsigned_transaction(&kp.pubkey(), 1);

        let a = sign_transaction(&unsigned, &kp).unwrap();
        let b = sign_transaction(&unsigned, &kp).unwrap();
        assert_eq!(a, b);

        let original = decode_transaction(&unsigned).unwrap();
        let signed = decode_transaction(&a.bytes).unwrap();
        assert_eq!(signed.message, original.message);
        assert_eq!(a.signature, transaction_id(&a.bytes).unwrap());
        assert!(signed.signatures[0].verify(
            kp.pubkey().as_ref(),
            &signed.message.serialize()
        ));
    }

    #[test]
    fn test_sign_fills_only_own_slot() {
        let kp = keypair();
        let other = Keypair::from_seed(&[9u8; 32]).unwrap();
        let mut tx = decode_transaction(&unsigned_transaction(&other.pubkey(), 3)).unwrap();
        // Make our key the second required signer
        match &mut tx.message {
            solana_sdk::message::VersionedMessage::V0(message) => {
                message.header.num_required_signatures = 2;
                message.account_keys.insert(1, kp.pubkey());
                for ix in &mut message.instructions {
                    ix.program_id_index += 1;
                }
            },
            solana_sdk::message::VersionedMessage::Legacy(_) => unreachable!(),
        }
        tx.signatures.push(Signature::default());
        let unsigned = bincode::serialize(&tx).unwrap();

        let signed = sign_transaction(&unsigned, &kp).unwrap();
        let parsed = decode_transaction(&signed.bytes).unwrap();
        assert_eq!(parsed.signatures[0], Signature::default());
        assert_ne!(parsed.signatures[1], Signature::default());
    }

    #[test]
    fn test_sign_rejects_foreign_transaction() {
        let kp = keypair();
        let other = Keypair::from_seed(&[9u8; 32]).unwrap();
        let unsigned = unsigned_transaction(&other.pubkey(), 1);
        let err = sign_transaction(&unsigned, &kp).unwrap_err();
        assert!(matches!(err, ExecError::MalformedTransaction(_)));

        let err = sign_transaction(&[1, 2, 3], &kp).unwrap_err();
        assert!(matches!(err, ExecError::MalformedTransaction(_)));
    }

    #[test]
    fn test_sign_rejects_trailing_bytes() {
        let kp = keypair();
        let mut unsigned = unsigned_transaction(&kp.pubkey(), 1);
        unsigned.push(0);
        let err = sign_transaction(&unsigned, &kp).unwrap_err();
        assert!(matches!(err, ExecError::MalformedTransaction(_)));
    }
}
