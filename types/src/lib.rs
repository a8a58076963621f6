/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures and sizes for device identity provisioning:
    algorithm families, certificate authority records and the manufacturing
    store field map.

--*/

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

mod mfg_field;
mod serial;

pub use mfg_field::*;
pub use serial::*;

use core::fmt;
use sidewalk_prov_error::{ProvError, ProvResult};
use zeroize::Zeroize;

pub const FINGERPRINT_SIZE: usize = 32;
pub const APID_SIZE: usize = 4;
pub const APP_SERVER_KEY_SIZE: usize = 32;
pub const ED25519_PRIV_KEY_SIZE: usize = 32;
pub const ED25519_PUB_KEY_SIZE: usize = 32;
pub const ED25519_SIGNATURE_SIZE: usize = 64;
pub const P256_PRIV_KEY_SIZE: usize = 32;
pub const P256_PUB_KEY_SIZE: usize = 64;
pub const P256_SIGNATURE_SIZE: usize = 64;
pub const CA_LEVEL_COUNT: usize = 5;

/// Device serial number limit, terminator included.
pub const DSN_MAX_SIZE: usize = 32;
pub const FINGERPRINT_SCRATCH_SIZE: usize = 128;

/// Largest key or signature of any supported algorithm.
pub const MAX_PRIV_KEY_SIZE: usize = 32;
pub const MAX_PUB_KEY_SIZE: usize = 64;
pub const MAX_SIGNATURE_SIZE: usize = 64;

pub type Fingerprint = [u8; FINGERPRINT_SIZE];
pub type AdvertisedProductId = [u8; APID_SIZE];
pub type AppServerKey = [u8; APP_SERVER_KEY_SIZE];

/// Asymmetric algorithm family
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum Algorithm {
    /// Ed25519 signatures
    Ed25519 = 0,

    /// ECDSA over NIST P-256 with SHA-256
    P256 = 1,
}

impl Algorithm {
    /// Both families, in provisioning order
    pub const ALL: [Algorithm; 2] = [Algorithm::Ed25519, Algorithm::P256];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Ed25519 => "ed25519",
            Algorithm::P256 => "p256",
        }
    }

    pub const fn priv_key_size(self) -> usize {
        match self {
            Algorithm::Ed25519 => ED25519_PRIV_KEY_SIZE,
            Algorithm::P256 => P256_PRIV_KEY_SIZE,
        }
    }

    pub const fn pub_key_size(self) -> usize {
        match self {
            Algorithm::Ed25519 => ED25519_PUB_KEY_SIZE,
            Algorithm::P256 => P256_PUB_KEY_SIZE,
        }
    }

    pub const fn signature_size(self) -> usize {
        match self {
            Algorithm::Ed25519 => ED25519_SIGNATURE_SIZE,
            Algorithm::P256 => P256_SIGNATURE_SIZE,
        }
    }

    /// CSR layout is `public_key || fingerprint || signature`
    pub const fn csr_size(self) -> usize {
        self.pub_key_size() + FINGERPRINT_SIZE + self.signature_size()
    }

    const fn device_cert_size(self) -> usize {
        FINGERPRINT_SIZE + self.pub_key_size() + self.signature_size()
    }

    /// Smallest possible chain: every serial inline at the minimum length
    pub const fn chain_min_size(self) -> usize {
        self.device_cert_size()
            + CA_LEVEL_COUNT * (CA_SERIAL_MIN_SIZE + self.pub_key_size() + self.signature_size())
    }

    /// Largest possible chain: every serial extended at the maximum length
    pub const fn chain_max_size(self) -> usize {
        self.device_cert_size()
            + CA_LEVEL_COUNT
                * (SERIAL_HEADER_SIZE
                    + CA_SERIAL_MAX_SIZE
                    + self.pub_key_size()
                    + self.signature_size())
    }
}

impl TryFrom<u32> for Algorithm {
    type Error = ProvError;

    fn try_from(value: u32) -> ProvResult<Self> {
        match value {
            0 => Ok(Algorithm::Ed25519),
            1 => Ok(Algorithm::P256),
            _ => Err(ProvError::NOSUPPORT),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Certificate authority level, nearest the device first.
///
/// Each level is signed by the level after it; the root signs itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CaLevel {
    /// Device attestation key, the direct issuer of the device certificate
    Dak = 0,
    Product = 1,
    Manufacturer = 2,
    Sidewalk = 3,
    /// Self-signed root
    Root = 4,
}

impl CaLevel {
    pub const ALL: [CaLevel; CA_LEVEL_COUNT] = [
        CaLevel::Dak,
        CaLevel::Product,
        CaLevel::Manufacturer,
        CaLevel::Sidewalk,
        CaLevel::Root,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            CaLevel::Dak => "dak",
            CaLevel::Product => "product",
            CaLevel::Manufacturer => "manufacturer",
            CaLevel::Sidewalk => "sidewalk",
            CaLevel::Root => "root",
        }
    }

    /// Level whose public key verifies this level's signature
    pub const fn issuer(self) -> CaLevel {
        match self {
            CaLevel::Dak => CaLevel::Product,
            CaLevel::Product => CaLevel::Manufacturer,
            CaLevel::Manufacturer => CaLevel::Sidewalk,
            CaLevel::Sidewalk => CaLevel::Root,
            CaLevel::Root => CaLevel::Root,
        }
    }

    pub const fn is_self_signed(self) -> bool {
        matches!(self, CaLevel::Root)
    }
}

/// Certificate authority serial number, 4 to 131 bytes
#[derive(Clone, Copy)]
pub struct CaSerial {
    len: u8,
    bytes: [u8; CA_SERIAL_MAX_SIZE],
}

impl CaSerial {
    pub fn new(serial: &[u8]) -> ProvResult<Self> {
        if serial.is_empty() || serial.len() < CA_SERIAL_MIN_SIZE {
            return Err(ProvError::INVALID_ARGS);
        }
        let mut bytes = [0u8; CA_SERIAL_MAX_SIZE];
        bytes
            .get_mut(..serial.len())
            .ok_or(ProvError::INVALID_ARGS)?
            .copy_from_slice(serial);
        Ok(Self {
            len: serial.len() as u8,
            bytes,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PartialEq for CaSerial {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for CaSerial {}

impl fmt::Debug for CaSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CaSerial").field(&self.as_bytes()).finish()
    }
}

impl Zeroize for CaSerial {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
        self.len.zeroize();
    }
}

/// One certificate authority in the chain
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CaRecord<const PK: usize, const SIG: usize> {
    pub level: CaLevel,
    pub public_key: [u8; PK],
    pub signature: [u8; SIG],
    pub serial: CaSerial,
}

impl<const PK: usize, const SIG: usize> CaRecord<PK, SIG> {
    /// Level holding the key that signed this record
    pub fn issuer(&self) -> CaLevel {
        self.level.issuer()
    }
}

impl<const PK: usize, const SIG: usize> Zeroize for CaRecord<PK, SIG> {
    fn zeroize(&mut self) {
        self.public_key.zeroize();
        self.signature.zeroize();
        self.serial.zeroize();
    }
}

/// Parsed certificate authority chain, indexed by [`CaLevel`]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CertChain<const PK: usize, const SIG: usize> {
    authorities: [CaRecord<PK, SIG>; CA_LEVEL_COUNT],
}

impl<const PK: usize, const SIG: usize> CertChain<PK, SIG> {
    /// Build a chain from records ordered nearest issuer first.
    ///
    /// Fails with `INVALID_ARGS` if a record sits at the wrong position.
    pub fn new(authorities: [CaRecord<PK, SIG>; CA_LEVEL_COUNT]) -> ProvResult<Self> {
        for (record, level) in authorities.iter().zip(CaLevel::ALL) {
            if record.level != level {
                return Err(ProvError::INVALID_ARGS);
            }
        }
        Ok(Self { authorities })
    }

    pub fn authority(&self, level: CaLevel) -> &CaRecord<PK, SIG> {
        &self.authorities[level.index()]
    }

    /// Record whose public key verifies `level`
    pub fn issuer_of(&self, level: CaLevel) -> &CaRecord<PK, SIG> {
        self.authority(level.issuer())
    }

    pub fn authorities(&self) -> &[CaRecord<PK, SIG>; CA_LEVEL_COUNT] {
        &self.authorities
    }
}

impl<const PK: usize, const SIG: usize> Zeroize for CertChain<PK, SIG> {
    fn zeroize(&mut self) {
        self.authorities.iter_mut().for_each(Zeroize::zeroize);
    }
}

pub type Ed25519CaRecord = CaRecord<ED25519_PUB_KEY_SIZE, ED25519_SIGNATURE_SIZE>;
pub type P256CaRecord = CaRecord<P256_PUB_KEY_SIZE, P256_SIGNATURE_SIZE>;
pub type Ed25519CertChain = CertChain<ED25519_PUB_KEY_SIZE, ED25519_SIGNATURE_SIZE>;
pub type P256CertChain = CertChain<P256_PUB_KEY_SIZE, P256_SIGNATURE_SIZE>;
