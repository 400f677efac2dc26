use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use p256::SecretKey;
use rand_core::{CryptoRng, OsRng, RngCore};
use tracing::debug;

use crate::error::Error;

/// A node identity: a P-256 key pair together with the DER encodings that
/// travel on the wire. The public key is PKIX/SPKI DER, the secret key SEC1
/// DER; both are exchanged as hex strings.
#[derive(Clone, Debug)]
pub struct Keypair {
    signing: SigningKey,
    public_der: Vec<u8>,
    secret_der: Vec<u8>,
}

impl Keypair {
    pub fn generate<T>(csprng: &mut T) -> Result<Self, Error>
    where
        T: CryptoRng + RngCore,
    {
        Self::from_secret(SecretKey::random(csprng))
    }

    /// Fresh identity from the OS entropy source.
    pub fn random() -> Result<Self, Error> {
        Self::generate(&mut OsRng)
    }

    /// Rebuild an identity from its hex-encoded DER key material. The
    /// public key bytes are kept as supplied so the locking script matches
    /// whatever is already recorded on chain.
    pub fn from_hex(public_hex: &str, secret_hex: &str) -> Result<Self, Error> {
        let public_der = hex::decode(public_hex)?;
        VerifyingKey::from_public_key_der(&public_der)?;
        let secret_der = hex::decode(secret_hex)?;
        let signing = SigningKey::from(&SecretKey::from_sec1_der(&secret_der)?);
        Ok(Self {
            signing,
            public_der,
            secret_der,
        })
    }

    fn from_secret(secret: SecretKey) -> Result<Self, Error> {
        let signing = SigningKey::from(&secret);
        let public_der = signing
            .verifying_key()
            .to_public_key_der()?
            .into_vec();
        let secret_der = secret.to_sec1_der()?.to_vec();
        Ok(Self {
            signing,
            public_der,
            secret_der,
        })
    }

    /// The identity's locking script: hex of the PKIX-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_der)
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(&self.secret_der)
    }

    /// Sign `msg`, returning the ASN.1-DER signature hex-encoded. This is
    /// the unlocking script for an output whose locking script is this
    /// identity's public key.
    pub fn sign_hex(&self, msg: &[u8]) -> String {
        let signature: Signature = self.signing.sign(msg);
        hex::encode(signature.to_der())
    }
}

/// Check `sig_hex` against `msg` under the PKIX public key `public_hex`.
/// Fails closed: any decode failure counts as an invalid signature.
pub fn verify_hex(public_hex: &str, msg: &[u8], sig_hex: &str) -> bool {
    fn inner(public_hex: &str, msg: &[u8], sig_hex: &str) -> Result<(), Error> {
        let key = VerifyingKey::from_public_key_der(&hex::decode(public_hex)?)?;
        let signature = Signature::from_der(&hex::decode(sig_hex)?)?;
        key.verify(msg, &signature)?;
        Ok(())
    }
    match inner(public_hex, msg, sig_hex) {
        Ok(()) => true,
        Err(error) => {
            debug!(%error, "signature verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let pair = Keypair::random().unwrap();
        let sig = pair.sign_hex(b"pay to the order of");
        assert!(verify_hex(&pair.public_key_hex(), b"pay to the order of", &sig));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let pair = Keypair::random().unwrap();
        let sig = pair.sign_hex(b"ten coins");
        assert!(!verify_hex(&pair.public_key_hex(), b"ten thousand coins", &sig));
    }

    #[test]
    fn verify_rejects_foreign_key() {
        let pair = Keypair::random().unwrap();
        let other = Keypair::random().unwrap();
        let sig = pair.sign_hex(b"msg");
        assert!(!verify_hex(&other.public_key_hex(), b"msg", &sig));
    }

    #[test]
    fn verify_fails_closed_on_garbage() {
        let pair = Keypair::random().unwrap();
        let sig = pair.sign_hex(b"msg");
        assert!(!verify_hex("zz-not-hex", b"msg", &sig));
        assert!(!verify_hex(&pair.public_key_hex(), b"msg", "00ff"));
        assert!(!verify_hex(&pair.public_key_hex(), b"msg", "not hex at all"));
    }

    #[test]
    fn keypair_round_trips_through_hex() {
        let pair = Keypair::random().unwrap();
        let restored = Keypair::from_hex(&pair.public_key_hex(), &pair.secret_key_hex()).unwrap();
        assert_eq!(pair.public_key_hex(), restored.public_key_hex());
        let sig = restored.sign_hex(b"restored");
        assert!(verify_hex(&pair.public_key_hex(), b"restored", &sig));
    }
}
