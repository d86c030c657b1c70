//! AES-256-GCM sealing for portal passwords stored at rest.

use std::fmt;

use aes_gcm::{
	Aes256Gcm, Key, KeyInit, Nonce,
	aead::{Aead, AeadCore, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{Error, Result};

const NONCE_LEN: usize = 12;

/// Sealed values are `base64(nonce || ciphertext)`.
#[derive(Clone)]
pub struct CredentialCipher {
	cipher: Aes256Gcm,
}
impl CredentialCipher {
	pub fn from_base64_key(encoded: &str) -> Result<Self> {
		let raw = STANDARD.decode(encoded.trim()).map_err(|err| Error::Credential {
			message: format!("Key is not valid base64: {err}."),
		})?;

		if raw.len() != 32 {
			return Err(Error::Credential {
				message: format!("Key must be 32 bytes, got {}.", raw.len()),
			});
		}

		let key = Key::<Aes256Gcm>::from_slice(&raw);

		Ok(Self { cipher: Aes256Gcm::new(key) })
	}

	pub fn seal(&self, plaintext: &str) -> Result<String> {
		let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
		let ciphertext = self
			.cipher
			.encrypt(&nonce, plaintext.as_bytes())
			.map_err(|_| Error::Credential { message: "Encryption failed.".to_string() })?;
		let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());

		sealed.extend_from_slice(nonce.as_slice());
		sealed.extend_from_slice(&ciphertext);

		Ok(STANDARD.encode(sealed))
	}

	pub fn open(&self, sealed: &str) -> Result<String> {
		let raw = STANDARD.decode(sealed.trim()).map_err(|err| Error::Credential {
			message: format!("Sealed value is not valid base64: {err}."),
		})?;

		if raw.len() <= NONCE_LEN {
			return Err(Error::Credential { message: "Sealed value is truncated.".to_string() });
		}

		let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
		let plaintext = self
			.cipher
			.decrypt(Nonce::from_slice(nonce), ciphertext)
			.map_err(|_| Error::Credential { message: "Decryption failed.".to_string() })?;

		String::from_utf8(plaintext).map_err(|_| Error::Credential {
			message: "Decrypted value is not UTF-8.".to_string(),
		})
	}
}
impl fmt::Debug for CredentialCipher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CredentialCipher").finish_non_exhaustive()
	}
}
