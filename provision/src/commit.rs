/*++

Licensed under the Apache-2.0 license.

File Name:

    commit.rs

Abstract:

    Persistence of verified provisioning material to the manufacturing store.

    The store is erased first and fields are then written one by one, each
    read back and compared before the next. A failure part way leaves a
    prefix of valid fields followed by erased space; nothing is rolled back.

--*/

use crate::context::ProvisioningContext;
use crate::state::{DeviceKeys, ProvFlags};
use crate::{cprintln, MfgStore};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;
use zeroize::Zeroize;

/// Store Committer
pub(crate) struct StoreCommitter<'a, S: MfgStore> {
    store: &'a mut S,
}

impl<'a, S: MfgStore> StoreCommitter<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Erase the store and write every provisioned field.
    pub fn commit(&mut self, ctx: &ProvisioningContext) -> ProvResult<()> {
        ctx.require(ProvFlags::all())?;
        let identity = ctx.identity.as_ref().ok_or(ProvError::INVALID_STATE)?;
        let app_server_key = ctx.app_server_key.as_ref().ok_or(ProvError::INVALID_STATE)?;
        let (ed25519_keys, ed25519_chain) =
            ctx.ed25519.chain().ok_or(ProvError::INVALID_STATE)?;
        let (p256_keys, p256_chain) = ctx.p256.chain().ok_or(ProvError::INVALID_STATE)?;

        self.store.erase_all().map_err(|err| {
            cprintln!("[prov] Store erase failed: 0x{:08x}", u32::from(err));
            ProvError::STORAGE_ERASE_FAIL
        })?;

        let version = if self.store.supports_tlv_layout() {
            MFG_STORE_VERSION_TLV
        } else {
            MFG_STORE_VERSION_FIXED
        };
        self.write(MfgField::VERSION, &version.to_be_bytes())?;
        self.write(MfgField::FINGERPRINT, &identity.fingerprint)?;
        self.write(MfgField::APID, &identity.apid)?;
        self.write(MfgField::APP_SERVER_KEY, app_server_key)?;

        self.write_alg(Algorithm::Ed25519, ed25519_keys, ed25519_chain)?;
        self.write_alg(Algorithm::P256, p256_keys, p256_chain)?;

        cprintln!("[prov] Store committed, version {}", version);
        Ok(())
    }

    fn write_alg<const SK: usize, const PK: usize, const SIG: usize>(
        &mut self,
        alg: Algorithm,
        keys: &DeviceKeys<SK, PK, SIG>,
        chain: &CertChain<PK, SIG>,
    ) -> ProvResult<()> {
        self.write(MfgField::device_private_key(alg), &keys.private_key)?;
        self.write(MfgField::device_public_key(alg), &keys.public_key)?;
        self.write(MfgField::device_signature(alg), &keys.signature)?;
        for record in chain.authorities() {
            self.write(MfgField::ca_public_key(alg, record.level), &record.public_key)?;
            self.write(MfgField::ca_signature(alg, record.level), &record.signature)?;
            self.write(MfgField::ca_serial(alg, record.level), record.serial.as_bytes())?;
        }
        Ok(())
    }

    /// Write `data` to `field` and confirm it reads back unchanged
    fn write(&mut self, field: MfgField, data: &[u8]) -> ProvResult<()> {
        let mut readback = [0u8; CA_SERIAL_MAX_SIZE];
        let result = self.write_and_read(field, data, &mut readback);
        readback.zeroize();
        result.map_err(|err| {
            cprintln!(
                "[prov] Store write failed field={}: 0x{:08x}",
                field.0,
                u32::from(err)
            );
            ProvError::STORAGE_WRITE_FAIL
        })
    }

    fn write_and_read(
        &mut self,
        field: MfgField,
        data: &[u8],
        readback: &mut [u8],
    ) -> ProvResult<()> {
        self.store.write(field, data)?;
        let readback = readback
            .get_mut(..data.len())
            .ok_or(ProvError::STORAGE_WRITE_FAIL)?;
        self.store.read(field, readback)?;
        if *readback != *data {
            return Err(ProvError::STORAGE_WRITE_FAIL);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::{provision_all, TestCrypto, TestStore};

    fn provisioned() -> ProvisioningContext {
        let mut crypto = TestCrypto::default();
        let mut ctx = ProvisioningContext::new();
        provision_all(&mut crypto, &mut ctx);
        ctx
    }

    #[test]
    fn test_commit_writes_every_field_in_order() {
        let ctx = provisioned();
        let mut store = TestStore::default();
        StoreCommitter::new(&mut store).commit(&ctx).unwrap();

        assert_eq!(store.erases, 1);
        assert_eq!(store.writes.len(), 4 + 2 * (3 + 3 * CA_LEVEL_COUNT));
        assert_eq!(
            &store.writes[..5],
            &[
                MfgField::VERSION,
                MfgField::FINGERPRINT,
                MfgField::APID,
                MfgField::APP_SERVER_KEY,
                MfgField::device_private_key(Algorithm::Ed25519),
            ]
        );
        assert_eq!(
            store.writes.last(),
            Some(&MfgField::ca_serial(Algorithm::P256, CaLevel::Root))
        );

        assert_eq!(store.fields[&MfgField::VERSION], 7u32.to_be_bytes());
        assert_eq!(store.fields[&MfgField::FINGERPRINT], ctx.fingerprint().unwrap());
        assert_eq!(store.fields[&MfgField::APID], b"APID");
        let (_, chain) = ctx.p256.chain().unwrap();
        assert_eq!(
            store.fields[&MfgField::ca_serial(Algorithm::P256, CaLevel::Manufacturer)],
            chain.authority(CaLevel::Manufacturer).serial.as_bytes()
        );
    }

    #[test]
    fn test_tlv_version_marker() {
        let ctx = provisioned();
        let mut store = TestStore {
            tlv: true,
            ..Default::default()
        };
        StoreCommitter::new(&mut store).commit(&ctx).unwrap();
        assert_eq!(store.fields[&MfgField::VERSION], 8u32.to_be_bytes());
    }

    #[test]
    fn test_requires_every_flag() {
        let mut ctx = provisioned();
        ctx.clear_algorithm(Algorithm::Ed25519);
        let mut store = TestStore::default();
        assert_eq!(
            StoreCommitter::new(&mut store).commit(&ctx),
            Err(ProvError::INVALID_STATE)
        );
        assert_eq!(store.erases, 0);
    }

    #[test]
    fn test_erase_failure() {
        let ctx = provisioned();
        let mut store = TestStore {
            fail_erase: true,
            ..Default::default()
        };
        assert_eq!(
            StoreCommitter::new(&mut store).commit(&ctx),
            Err(ProvError::STORAGE_ERASE_FAIL)
        );
        assert!(store.writes.is_empty());
    }

    #[test]
    fn test_write_failure_leaves_prefix() {
        let ctx = provisioned();
        let failing = MfgField::device_signature(Algorithm::P256);
        let mut store = TestStore {
            fail_write: Some(failing),
            ..Default::default()
        };
        assert_eq!(
            StoreCommitter::new(&mut store).commit(&ctx),
            Err(ProvError::STORAGE_WRITE_FAIL)
        );
        assert!(!store.fields.contains_key(&failing));
        assert!(store.fields.contains_key(&MfgField::device_public_key(Algorithm::P256)));
        assert!(!store
            .fields
            .contains_key(&MfgField::ca_public_key(Algorithm::P256, CaLevel::Dak)));
    }

    #[test]
    fn test_readback_mismatch() {
        let ctx = provisioned();
        let mut store = TestStore {
            corrupt: Some(MfgField::ca_signature(Algorithm::Ed25519, CaLevel::Sidewalk)),
            ..Default::default()
        };
        assert_eq!(
            StoreCommitter::new(&mut store).commit(&ctx),
            Err(ProvError::STORAGE_WRITE_FAIL)
        );
        assert_eq!(
            store.writes.last(),
            Some(&MfgField::ca_signature(Algorithm::Ed25519, CaLevel::Sidewalk))
        );
    }
}
