// Licensed under the Apache-2.0 license

//! Deterministic collaborators for unit tests.
//!
//! `TestCrypto` derives keys and signatures from SHA-256 so that tampering
//! with any signed byte is detected, without pulling in real curve
//! arithmetic. `TestStore` keeps fields in a map and can be told to fail.

use crate::chain::ChainIngester;
use crate::context::ProvisioningContext;
use crate::csr::CsrGenerator;
use crate::identity::IdentityGenerator;
use crate::{CryptoProvider, MfgStore};
use sha2::{Digest, Sha256};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;
use std::collections::BTreeMap;

pub(crate) const TEST_SERIALS: [&[u8]; CA_LEVEL_COUNT] = [
    &[0x10, 0x00, 0x00, 0x01],
    &[0x20, 0x00, 0x00, 0x02],
    &[0xC5; 12],
    &[0x40, 0x00, 0x00, 0x04],
    &[0x50; 20],
];

fn expand(digest: &[u8], out: &mut [u8]) {
    for (dst, src) in out.iter_mut().zip(digest.iter().cycle()) {
        *dst = *src;
    }
}

#[derive(Default)]
pub(crate) struct TestCrypto {
    pub digest_error: Option<ProvError>,
    pub keygen_error: Option<ProvError>,
    pub sign_error: Option<ProvError>,
    pub verify_error: Option<ProvError>,
    pub last_digest_input: Vec<u8>,
    keys_generated: u32,
}

impl TestCrypto {
    pub fn with_digest_error(err: ProvError) -> Self {
        Self {
            digest_error: Some(err),
            ..Default::default()
        }
    }

    fn public_key_of(alg: Algorithm, priv_key: &[u8]) -> Vec<u8> {
        let mut pub_key = vec![0u8; alg.pub_key_size()];
        expand(&Sha256::new().chain_update(b"pk").chain_update(priv_key).finalize(), &mut pub_key);
        pub_key
    }

    fn signature_of(alg: Algorithm, pub_key: &[u8], msg: &[u8]) -> Vec<u8> {
        let mut sig = vec![0u8; alg.signature_size()];
        expand(&Sha256::new().chain_update(pub_key).chain_update(msg).finalize(), &mut sig);
        sig
    }
}

impl CryptoProvider for TestCrypto {
    fn sha256_digest(&mut self, data: &[u8]) -> ProvResult<Fingerprint> {
        if let Some(err) = self.digest_error {
            return Err(err);
        }
        self.last_digest_input = data.to_vec();
        Ok(Sha256::digest(data).into())
    }

    fn generate_keypair(
        &mut self,
        alg: Algorithm,
        priv_key: &mut [u8],
        pub_key: &mut [u8],
    ) -> ProvResult<()> {
        if let Some(err) = self.keygen_error {
            return Err(err);
        }
        if priv_key.len() != alg.priv_key_size() || pub_key.len() != alg.pub_key_size() {
            return Err(ProvError::INVALID_ARGS);
        }
        self.keys_generated += 1;
        let seed = Sha256::new()
            .chain_update(b"sk")
            .chain_update([alg as u8])
            .chain_update(self.keys_generated.to_be_bytes())
            .finalize();
        expand(&seed, priv_key);
        pub_key.copy_from_slice(&Self::public_key_of(alg, priv_key));
        Ok(())
    }

    fn sign(
        &mut self,
        alg: Algorithm,
        priv_key: &[u8],
        msg: &[u8],
        sig: &mut [u8],
    ) -> ProvResult<()> {
        if let Some(err) = self.sign_error {
            return Err(err);
        }
        if priv_key.len() != alg.priv_key_size() || sig.len() != alg.signature_size() {
            return Err(ProvError::INVALID_ARGS);
        }
        let pub_key = Self::public_key_of(alg, priv_key);
        sig.copy_from_slice(&Self::signature_of(alg, &pub_key, msg));
        Ok(())
    }

    fn verify(
        &mut self,
        alg: Algorithm,
        pub_key: &[u8],
        msg: &[u8],
        sig: &[u8],
    ) -> ProvResult<bool> {
        if let Some(err) = self.verify_error {
            return Err(err);
        }
        if pub_key.len() != alg.pub_key_size() || sig.len() != alg.signature_size() {
            return Err(ProvError::INVALID_ARGS);
        }
        Ok(Self::signature_of(alg, pub_key, msg) == sig)
    }
}

/// Build a chain answering `csr`, each level signed by its issuer.
pub(crate) fn build_chain(crypto: &mut TestCrypto, alg: Algorithm, csr: &[u8]) -> Vec<u8> {
    let (pk_len, sig_len) = (alg.pub_key_size(), alg.signature_size());
    let device_pub = &csr[..pk_len];
    let fingerprint = &csr[pk_len..pk_len + FINGERPRINT_SIZE];

    let keys: Vec<(Vec<u8>, Vec<u8>)> = CaLevel::ALL
        .iter()
        .map(|_| {
            let mut sk = vec![0u8; alg.priv_key_size()];
            let mut pk = vec![0u8; pk_len];
            crypto.generate_keypair(alg, &mut sk, &mut pk).unwrap();
            (sk, pk)
        })
        .collect();

    let mut device_sig = vec![0u8; sig_len];
    let msg = [device_pub, fingerprint].concat();
    crypto
        .sign(alg, &keys[CaLevel::Dak.index()].0, &msg, &mut device_sig)
        .unwrap();

    let mut bytes = [fingerprint, device_pub, device_sig.as_slice()].concat();
    for (level, serial) in CaLevel::ALL.into_iter().zip(TEST_SERIALS) {
        let (_, pk) = &keys[level.index()];
        let (issuer_sk, _) = &keys[level.issuer().index()];
        let mut sig = vec![0u8; sig_len];
        crypto
            .sign(alg, issuer_sk, &[pk.as_slice(), serial].concat(), &mut sig)
            .unwrap();

        let mut encoded = [0u8; SERIAL_HEADER_SIZE + CA_SERIAL_MAX_SIZE];
        let len = encode_serial(serial, &mut encoded).unwrap();
        bytes.extend_from_slice(&encoded[..len]);
        bytes.extend_from_slice(pk);
        bytes.extend_from_slice(&sig);
    }
    bytes
}

/// Run identity, both CSRs, both chains and the app key against `ctx`.
pub(crate) fn provision_all(crypto: &mut TestCrypto, ctx: &mut ProvisioningContext) {
    IdentityGenerator::new(crypto)
        .derive(ctx, "dev_type_A", "DSN12345", "APID", None)
        .unwrap();
    for alg in Algorithm::ALL {
        let mut csr = [0u8; 256];
        let len = CsrGenerator::new(crypto).generate(ctx, alg, &mut csr).unwrap();
        let chain = build_chain(crypto, alg, &csr[..len]);
        ChainIngester::new().ingest(ctx, alg, &chain).unwrap();
    }
    ctx.app_server_key = Some([0xA5; APP_SERVER_KEY_SIZE]);
}

#[derive(Default)]
pub(crate) struct TestStore {
    pub tlv: bool,
    pub fail_erase: bool,
    pub fail_write: Option<MfgField>,
    pub corrupt: Option<MfgField>,
    pub fields: BTreeMap<MfgField, Vec<u8>>,
    pub writes: Vec<MfgField>,
    pub erases: u32,
}

impl MfgStore for TestStore {
    fn write(&mut self, field: MfgField, data: &[u8]) -> ProvResult<()> {
        if self.fail_write == Some(field) {
            return Err(ProvError::MFG_STORE_WRITE_FAILURE);
        }
        let mut data = data.to_vec();
        if self.corrupt == Some(field) {
            data[0] ^= 0x01;
        }
        self.writes.push(field);
        self.fields.insert(field, data);
        Ok(())
    }

    fn read(&mut self, field: MfgField, data: &mut [u8]) -> ProvResult<()> {
        let stored = self
            .fields
            .get(&field)
            .ok_or(ProvError::MFG_STORE_FIELD_NOT_FOUND)?;
        if stored.len() != data.len() {
            return Err(ProvError::MFG_STORE_LENGTH_MISMATCH);
        }
        data.copy_from_slice(stored);
        Ok(())
    }

    fn erase_all(&mut self) -> ProvResult<()> {
        if self.fail_erase {
            return Err(ProvError::MFG_STORE_ERASE_FAILURE);
        }
        self.erases += 1;
        self.fields.clear();
        Ok(())
    }

    fn supports_tlv_layout(&self) -> bool {
        self.tlv
    }
}
