/*++

Licensed under the Apache-2.0 license.

File Name:

    identity.rs

Abstract:

    Device fingerprint derivation.

--*/

use crate::context::{DeviceIdentity, ProvisioningContext};
use crate::slice_concat::concat_into;
use crate::{cprintln, CryptoProvider, HexBytes};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;
use zeroize::Zeroize;

/// Identity Generator
pub(crate) struct IdentityGenerator<'a, C: CryptoProvider> {
    crypto: &'a mut C,
}

impl<'a, C: CryptoProvider> IdentityGenerator<'a, C> {
    pub fn new(crypto: &'a mut C) -> Self {
        Self { crypto }
    }

    /// Derive the device fingerprint and restart provisioning from it
    ///
    /// # Arguments
    ///
    /// * `ctx`         - Provisioning context, reset on entry
    /// * `device_type` - Device type string
    /// * `dsn`         - Device serial number
    /// * `apid`        - Advertised product id, exactly `APID_SIZE` bytes
    /// * `board_id`    - Optional board identifier
    ///
    /// # Returns
    ///
    /// * `Fingerprint` - SHA-256 over `device_type || dsn || apid || board_id`
    pub fn derive(
        &mut self,
        ctx: &mut ProvisioningContext,
        device_type: &str,
        dsn: &str,
        apid: &str,
        board_id: Option<&str>,
    ) -> ProvResult<Fingerprint> {
        // A new identity invalidates everything provisioned for the old one.
        ctx.wipe();

        if device_type.is_empty() || dsn.is_empty() || apid.is_empty() {
            cprintln!("[prov] Fingerprint input missing");
            return Err(ProvError::NULL_POINTER);
        }

        // Room for the terminator the store format reserves.
        if dsn.len() + 1 > DSN_MAX_SIZE {
            cprintln!("[prov] DSN too long: {}", dsn.len());
            return Err(ProvError::INVALID_ARGS);
        }

        let apid: AdvertisedProductId = apid
            .as_bytes()
            .try_into()
            .map_err(|_| ProvError::INVALID_ARGS)?;

        let mut scratch = [0u8; FINGERPRINT_SCRATCH_SIZE];
        let result = concat_into(
            &mut scratch,
            &[
                device_type.as_bytes(),
                dsn.as_bytes(),
                &apid,
                board_id.unwrap_or_default().as_bytes(),
            ],
            ProvError::OUT_OF_MEMORY,
        )
        .and_then(|input| self.crypto.sha256_digest(input));
        scratch.zeroize();
        let fingerprint = result?;

        ctx.identity = Some(DeviceIdentity { fingerprint, apid });
        cprintln!("[prov] Fingerprint {}", HexBytes(&fingerprint));

        Ok(fingerprint)
    }
}
