/*++

Licensed under the Apache-2.0 license.

File Name:

   mfg_field.rs

Abstract:

    Manufacturing store field identifiers and the tag/length/value record
    header.

--*/

use crate::{
    Algorithm, CaLevel, APID_SIZE, APP_SERVER_KEY_SIZE, CA_LEVEL_COUNT, CA_SERIAL_MAX_SIZE,
    FINGERPRINT_SIZE,
};
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const MFG_STORE_VERSION_SIZE: usize = 4;

/// Version marker written for the fixed-offset layout
pub const MFG_STORE_VERSION_FIXED: u32 = 7;

/// Version marker written for the tag/length/value layout
pub const MFG_STORE_VERSION_TLV: u32 = 8;

/// Tag value of an erased (never written) record header
pub const MFG_STORE_ERASED_TAG: u16 = 0xFFFF;

pub const MFG_STORE_ERASED_BYTE: u8 = 0xFF;

const DEVICE_FIELD_BASE: u16 = 4;
const DEVICE_FIELDS_PER_ALG: u16 = 3;
const CA_FIELD_BASE: u16 = 16;
const CA_FIELDS_PER_LEVEL: u16 = 3;

/// What a field identifier holds
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MfgFieldKind {
    Version,
    Fingerprint,
    AdvertisedProductId,
    AppServerKey,
    DevicePrivateKey(Algorithm),
    DevicePublicKey(Algorithm),
    DeviceSignature(Algorithm),
    CaPublicKey(Algorithm, CaLevel),
    CaSignature(Algorithm, CaLevel),
    CaSerial(Algorithm, CaLevel),
}

/// Manufacturing store field identifier
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MfgField(pub u16);

impl MfgField {
    pub const VERSION: Self = Self(0);
    pub const FINGERPRINT: Self = Self(1);
    pub const APID: Self = Self(2);
    pub const APP_SERVER_KEY: Self = Self(3);

    /// One past the largest assigned identifier
    pub const END: u16 = CA_FIELD_BASE
        + (Algorithm::ALL.len() * CA_LEVEL_COUNT) as u16 * CA_FIELDS_PER_LEVEL;

    const fn device(alg: Algorithm, slot: u16) -> Self {
        Self(DEVICE_FIELD_BASE + alg as u16 * DEVICE_FIELDS_PER_ALG + slot)
    }

    const fn ca(alg: Algorithm, level: CaLevel, slot: u16) -> Self {
        let record = alg as u16 * CA_LEVEL_COUNT as u16 + level as u16;
        Self(CA_FIELD_BASE + record * CA_FIELDS_PER_LEVEL + slot)
    }

    pub const fn device_private_key(alg: Algorithm) -> Self {
        Self::device(alg, 0)
    }

    pub const fn device_public_key(alg: Algorithm) -> Self {
        Self::device(alg, 1)
    }

    pub const fn device_signature(alg: Algorithm) -> Self {
        Self::device(alg, 2)
    }

    pub const fn ca_public_key(alg: Algorithm, level: CaLevel) -> Self {
        Self::ca(alg, level, 0)
    }

    pub const fn ca_signature(alg: Algorithm, level: CaLevel) -> Self {
        Self::ca(alg, level, 1)
    }

    pub const fn ca_serial(alg: Algorithm, level: CaLevel) -> Self {
        Self::ca(alg, level, 2)
    }

    /// Decode the identifier, `None` for unassigned values
    pub fn kind(self) -> Option<MfgFieldKind> {
        match self.0 {
            0 => Some(MfgFieldKind::Version),
            1 => Some(MfgFieldKind::Fingerprint),
            2 => Some(MfgFieldKind::AdvertisedProductId),
            3 => Some(MfgFieldKind::AppServerKey),
            id if id >= DEVICE_FIELD_BASE && id < CA_FIELD_BASE => {
                let offset = id - DEVICE_FIELD_BASE;
                let alg = Algorithm::try_from((offset / DEVICE_FIELDS_PER_ALG) as u32).ok()?;
                match offset % DEVICE_FIELDS_PER_ALG {
                    0 => Some(MfgFieldKind::DevicePrivateKey(alg)),
                    1 => Some(MfgFieldKind::DevicePublicKey(alg)),
                    _ => Some(MfgFieldKind::DeviceSignature(alg)),
                }
            }
            id if id >= CA_FIELD_BASE && id < Self::END => {
                let offset = id - CA_FIELD_BASE;
                let record = (offset / CA_FIELDS_PER_LEVEL) as usize;
                let alg = Algorithm::try_from((record / CA_LEVEL_COUNT) as u32).ok()?;
                let level = CaLevel::ALL[record % CA_LEVEL_COUNT];
                match offset % CA_FIELDS_PER_LEVEL {
                    0 => Some(MfgFieldKind::CaPublicKey(alg, level)),
                    1 => Some(MfgFieldKind::CaSignature(alg, level)),
                    _ => Some(MfgFieldKind::CaSerial(alg, level)),
                }
            }
            _ => None,
        }
    }

    /// Size of the field; for serials this is the largest size it may take.
    pub fn max_len(self) -> Option<usize> {
        let len = match self.kind()? {
            MfgFieldKind::Version => MFG_STORE_VERSION_SIZE,
            MfgFieldKind::Fingerprint => FINGERPRINT_SIZE,
            MfgFieldKind::AdvertisedProductId => APID_SIZE,
            MfgFieldKind::AppServerKey => APP_SERVER_KEY_SIZE,
            MfgFieldKind::DevicePrivateKey(alg) => alg.priv_key_size(),
            MfgFieldKind::DevicePublicKey(alg) | MfgFieldKind::CaPublicKey(alg, _) => {
                alg.pub_key_size()
            }
            MfgFieldKind::DeviceSignature(alg) | MfgFieldKind::CaSignature(alg, _) => {
                alg.signature_size()
            }
            MfgFieldKind::CaSerial(..) => CA_SERIAL_MAX_SIZE,
        };
        Some(len)
    }

    /// Every assigned identifier in ascending order
    pub fn all() -> impl Iterator<Item = MfgField> {
        (0..Self::END)
            .map(MfgField)
            .filter(|field| field.kind().is_some())
    }
}

/// Header in front of every record of the tag/length/value layout
#[repr(C)]
#[derive(Debug, Copy, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct TlvHeader {
    pub tag: U16,
    pub len: U16,
}

impl TlvHeader {
    pub fn new(field: MfgField, len: u16) -> Self {
        Self {
            tag: U16::new(field.0),
            len: U16::new(len),
        }
    }

    pub fn is_erased(&self) -> bool {
        self.tag.get() == MFG_STORE_ERASED_TAG
    }
}
