use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::Hmac;
use rand::RngCore;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::error::{Error, Result};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

const CIPHER: &str = "aes-128-ctr";
const PRF: &str = "hmac-sha256";
const DKLEN: usize = 32;

/// A secp256k1 key pair held in memory for the lifetime of the process.
pub struct KeyWallet {
	secret: SecretKey,
	public: PublicKey,
	address: Address,
}

impl fmt::Debug for KeyWallet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyWallet")
			.field("address", &self.address.to_string())
			.finish_non_exhaustive()
	}
}

impl KeyWallet {
	/// Generate a fresh random key.
	pub fn create() -> Self {
		let mut rng = rand::thread_rng();
		loop {
			let mut bytes = [0u8; 32];
			rng.fill_bytes(&mut bytes);
			// Out-of-range scalars are astronomically rare; just draw again.
			if let Ok(wallet) = Self::from_private_key(&bytes) {
				return wallet;
			}
		}
	}

	pub fn from_private_key(bytes: &[u8]) -> Result<Self> {
		let secret = SecretKey::from_slice(bytes)
			.map_err(|e| Error::Keystore(format!("invalid private key: {e}")))?;
		let secp = Secp256k1::signing_only();
		let public = PublicKey::from_secret_key(&secp, &secret);
		let address = Address::from_public_key(&public.serialize_uncompressed());
		Ok(Self {
			secret,
			public,
			address,
		})
	}

	/// Accepts the key with or without a `0x` prefix.
	pub fn from_private_key_hex(s: &str) -> Result<Self> {
		let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
			.map_err(|e| Error::Keystore(format!("invalid private key: {e}")))?;
		Self::from_private_key(&bytes)
	}

	/// Unlock a keystore file.
	pub fn load(path: &Path, password: &str) -> Result<Self> {
		Keystore::from_file(path)?.decrypt(password)
	}

	pub fn address(&self) -> &Address {
		&self.address
	}

	/// Uncompressed public key (65 bytes) as hex.
	pub fn public_key_hex(&self) -> String {
		hex::encode(self.public.serialize_uncompressed())
	}

	pub fn private_key_hex(&self) -> String {
		hex::encode(self.secret.secret_bytes())
	}

	/// Encrypt with the default scrypt cost.
	pub fn to_keystore(&self, password: &str) -> Result<Keystore> {
		Keystore::encrypt(self, password, Kdf::default())
	}

	/// Write a new keystore file. Never overwrites an existing file.
	pub fn save(&self, path: &Path, password: &str) -> Result<()> {
		let keystore = self.to_keystore(password)?;
		let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
		file.write_all(serde_json::to_string_pretty(&keystore)?.as_bytes())?;
		Ok(())
	}
}

impl super::Signer for KeyWallet {
	fn address(&self) -> &Address {
		&self.address
	}

	fn sign(&self, hash: &[u8; 32]) -> Result<[u8; 65]> {
		let secp = Secp256k1::signing_only();
		let message = Message::from_digest(*hash);
		let signature = secp.sign_ecdsa_recoverable(&message, &self.secret);
		let (recovery_id, compact) = signature.serialize_compact();

		let mut out = [0u8; 65];
		out[..64].copy_from_slice(&compact);
		out[64] = recovery_id.to_i32() as u8;
		Ok(out)
	}
}

// -- Keystore file format --

/// Key derivation used when writing a new keystore.
#[derive(Debug, Clone, Copy)]
pub enum Kdf {
	Scrypt { log_n: u8, r: u32, p: u32 },
	Pbkdf2 { rounds: u32 },
}

impl Default for Kdf {
	fn default() -> Self {
		Self::Scrypt {
			log_n: 14,
			r: 8,
			p: 1,
		}
	}
}

/// Version-3 secret-storage keystore as written by ICON wallets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keystore {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	#[serde(alias = "Crypto")]
	pub crypto: CryptoSection,
	#[serde(default)]
	pub id: String,
	pub version: u32,
	#[serde(rename = "coinType", default, skip_serializing_if = "Option::is_none")]
	pub coin_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoSection {
	pub cipher: String,
	pub cipherparams: CipherParams,
	pub ciphertext: String,
	pub kdf: String,
	pub kdfparams: KdfParams,
	pub mac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherParams {
	pub iv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KdfParams {
	Scrypt {
		dklen: usize,
		n: u64,
		r: u32,
		p: u32,
		salt: String,
	},
	Pbkdf2 {
		c: u32,
		dklen: usize,
		prf: String,
		salt: String,
	},
}

impl Keystore {
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)?;
		serde_json::from_str(&content)
			.map_err(|e| Error::Keystore(format!("{}: {e}", path.display())))
	}

	/// The address recorded in the file, readable without the password.
	pub fn address_hint(&self) -> Option<Address> {
		self.address.as_deref().and_then(|a| a.parse().ok())
	}

	pub fn encrypt(wallet: &KeyWallet, password: &str, kdf: Kdf) -> Result<Self> {
		let mut rng = rand::thread_rng();
		let mut salt = [0u8; 32];
		let mut iv = [0u8; 16];
		rng.fill_bytes(&mut salt);
		rng.fill_bytes(&mut iv);

		let (kdf_name, kdfparams) = match kdf {
			Kdf::Scrypt { log_n, r, p } => (
				"scrypt",
				KdfParams::Scrypt {
					dklen: DKLEN,
					n: 1u64 << log_n,
					r,
					p,
					salt: hex::encode(salt),
				},
			),
			Kdf::Pbkdf2 { rounds } => (
				"pbkdf2",
				KdfParams::Pbkdf2 {
					c: rounds,
					dklen: DKLEN,
					prf: PRF.into(),
					salt: hex::encode(salt),
				},
			),
		};

		let derived = derive_key(&kdfparams, password)?;
		let mut ciphertext = wallet.secret.secret_bytes().to_vec();
		apply_keystream(&derived[..16], &iv, &mut ciphertext)?;
		let mac = mac(&derived[16..32], &ciphertext);

		Ok(Self {
			address: Some(wallet.address().to_string()),
			crypto: CryptoSection {
				cipher: CIPHER.into(),
				cipherparams: CipherParams {
					iv: hex::encode(iv),
				},
				ciphertext: hex::encode(&ciphertext),
				kdf: kdf_name.into(),
				kdfparams,
				mac: hex::encode(mac),
			},
			id: uuid::Uuid::new_v4().to_string(),
			version: 3,
			coin_type: Some("icx".into()),
		})
	}

	pub fn decrypt(&self, password: &str) -> Result<KeyWallet> {
		if self.crypto.cipher != CIPHER {
			return Err(Error::Keystore(format!(
				"unsupported cipher: {}",
				self.crypto.cipher
			)));
		}

		let derived = derive_key(&self.crypto.kdfparams, password)?;
		let mut plain = decode_hex(&self.crypto.ciphertext)?;

		let expected = decode_hex(&self.crypto.mac)?;
		if mac(&derived[16..32], &plain) != expected.as_slice() {
			return Err(Error::Keystore(
				"wrong password or corrupted keystore".into(),
			));
		}

		let iv = decode_hex(&self.crypto.cipherparams.iv)?;
		apply_keystream(&derived[..16], &iv, &mut plain)?;
		KeyWallet::from_private_key(&plain)
	}
}

// -- Helpers --

fn derive_key(params: &KdfParams, password: &str) -> Result<Vec<u8>> {
	let derived = match params {
		KdfParams::Scrypt {
			dklen,
			n,
			r,
			p,
			salt,
		} => {
			if *n < 2 || !n.is_power_of_two() {
				return Err(Error::Keystore(format!("invalid scrypt n: {n}")));
			}
			let log_n = n.trailing_zeros() as u8;
			let params = scrypt::Params::new(log_n, *r, *p, *dklen)
				.map_err(|e| Error::Keystore(format!("invalid scrypt params: {e}")))?;
			let mut out = vec![0u8; *dklen];
			scrypt::scrypt(password.as_bytes(), &decode_hex(salt)?, &params, &mut out)
				.map_err(|e| Error::Keystore(format!("scrypt: {e}")))?;
			out
		}
		KdfParams::Pbkdf2 {
			c,
			dklen,
			prf,
			salt,
		} => {
			if prf != PRF {
				return Err(Error::Keystore(format!("unsupported prf: {prf}")));
			}
			let mut out = vec![0u8; *dklen];
			pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), &decode_hex(salt)?, *c, &mut out)
				.map_err(|e| Error::Keystore(format!("pbkdf2: {e}")))?;
			out
		}
	};

	if derived.len() < 32 {
		return Err(Error::Keystore("derived key shorter than 32 bytes".into()));
	}
	Ok(derived)
}

fn mac(key_tail: &[u8], ciphertext: &[u8]) -> [u8; 32] {
	let mut h = Keccak256::new();
	h.update(key_tail);
	h.update(ciphertext);
	h.finalize().into()
}

fn apply_keystream(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
	let mut cipher = Aes128Ctr::new_from_slices(key, iv)
		.map_err(|_| Error::Keystore("invalid cipher key or iv length".into()))?;
	cipher.apply_keystream(buf);
	Ok(())
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
	hex::decode(s.strip_prefix("0x").unwrap_or(s))
		.map_err(|e| Error::Keystore(format!("invalid hex field: {e}")))
}
