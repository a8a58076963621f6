/*++

Licensed under the Apache-2.0 license.

File Name:

    chain.rs

Abstract:

    Certificate chain ingestion.

    The chain is `fingerprint || device_public_key || device_signature`
    followed by one record per authority level, nearest issuer first:
    `serial || ca_public_key || ca_signature`, the serial carrying the
    length header described in `SerialEncoding`. Nothing is authenticated
    here; the verifier checks every signature before the commit.

--*/

use crate::context::ProvisioningContext;
use crate::state::ProvFlags;
use crate::{cprintln, HexBytes};
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;
use zerocopy::byteorder::big_endian::U16;
use zerocopy::FromBytes;

/// Forward-only cursor over a chain buffer.
///
/// Every read fails with `INVALID_ARGS` instead of running past the end.
pub(crate) struct ChainReader<'a> {
    buf: &'a [u8],
}

impl<'a> ChainReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn read_slice(&mut self, len: usize) -> ProvResult<&'a [u8]> {
        if len > self.buf.len() {
            return Err(ProvError::INVALID_ARGS);
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn read_array<const N: usize>(&mut self) -> ProvResult<[u8; N]> {
        let (head, tail) = self
            .buf
            .split_first_chunk::<N>()
            .ok_or(ProvError::INVALID_ARGS)?;
        self.buf = tail;
        Ok(*head)
    }

    /// Big-endian word at the cursor, without consuming it
    pub fn peek_u16(&self) -> ProvResult<u16> {
        let (word, _) = U16::read_from_prefix(self.buf).map_err(|_| ProvError::INVALID_ARGS)?;
        Ok(word.get())
    }

    pub fn skip(&mut self, len: usize) -> ProvResult<()> {
        self.read_slice(len).map(|_| ())
    }

    /// Read one authority record
    pub fn read_authority<const PK: usize, const SIG: usize>(
        &mut self,
        level: CaLevel,
    ) -> ProvResult<CaRecord<PK, SIG>> {
        let encoding = SerialEncoding::decode(self.peek_u16()?);
        if encoding.serial_len() == 0 {
            return Err(ProvError::INVALID_ARGS);
        }
        let needed = encoding.header_len() + encoding.serial_len() + PK + SIG;
        if needed > self.remaining() {
            cprintln!(
                "[prov] Chain truncated level={} need={} have={}",
                level.name(),
                needed,
                self.remaining()
            );
            return Err(ProvError::INVALID_ARGS);
        }

        self.skip(encoding.header_len())?;
        let serial = CaSerial::new(self.read_slice(encoding.serial_len())?)?;
        let public_key = self.read_array::<PK>()?;
        let signature = self.read_array::<SIG>()?;

        Ok(CaRecord {
            level,
            public_key,
            signature,
            serial,
        })
    }
}

/// Device certificate and authorities parsed from a chain buffer
pub(crate) struct ParsedChain<const PK: usize, const SIG: usize> {
    pub device_signature: [u8; SIG],
    pub chain: CertChain<PK, SIG>,
}

/// Parse `bytes`, checking the device certificate against the identity and
/// key the chain must have been issued for.
pub(crate) fn parse_chain<const PK: usize, const SIG: usize>(
    bytes: &[u8],
    fingerprint: &Fingerprint,
    device_public_key: &[u8; PK],
) -> ProvResult<ParsedChain<PK, SIG>> {
    let mut reader = ChainReader::new(bytes);

    if reader.read_array::<FINGERPRINT_SIZE>()? != *fingerprint {
        cprintln!("[prov] Chain fingerprint mismatch");
        return Err(ProvError::INVALID_ARGS);
    }
    if reader.read_array::<PK>()? != *device_public_key {
        cprintln!("[prov] Chain device key mismatch");
        return Err(ProvError::INVALID_ARGS);
    }
    let device_signature = reader.read_array::<SIG>()?;

    let authorities = [
        reader.read_authority(CaLevel::Dak)?,
        reader.read_authority(CaLevel::Product)?,
        reader.read_authority(CaLevel::Manufacturer)?,
        reader.read_authority(CaLevel::Sidewalk)?,
        reader.read_authority(CaLevel::Root)?,
    ];

    if reader.remaining() != 0 {
        cprintln!("[prov] Chain has {} trailing bytes", reader.remaining());
        return Err(ProvError::INVALID_ARGS);
    }

    Ok(ParsedChain {
        device_signature,
        chain: CertChain::new(authorities)?,
    })
}

/// Chain Ingester
pub(crate) struct ChainIngester;

impl ChainIngester {
    pub fn new() -> Self {
        Self
    }

    /// Parse and store the chain issued for `alg`.
    ///
    /// A chain already held for `alg` is dropped on entry; the CSR and
    /// device keys stay.
    pub fn ingest(
        &mut self,
        ctx: &mut ProvisioningContext,
        alg: Algorithm,
        bytes: &[u8],
    ) -> ProvResult<()> {
        if bytes.is_empty() {
            return Err(ProvError::NULL_POINTER);
        }
        ctx.require(ProvFlags::csr(alg))?;

        if !(alg.chain_min_size()..=alg.chain_max_size()).contains(&bytes.len()) {
            cprintln!(
                "[prov] Chain length {} out of range alg={}",
                bytes.len(),
                alg.name()
            );
            return Err(ProvError::INVALID_ARGS);
        }

        ctx.clear_chain(alg);
        let fingerprint = ctx.fingerprint()?;

        match alg {
            Algorithm::Ed25519 => {
                let device_pub = ctx
                    .ed25519
                    .keys()
                    .map(|keys| keys.public_key)
                    .ok_or(ProvError::INVALID_STATE)?;
                let parsed = parse_chain(bytes, &fingerprint, &device_pub)?;
                ctx.ed25519
                    .attach_chain(parsed.device_signature, parsed.chain)?;
            }
            Algorithm::P256 => {
                let device_pub = ctx
                    .p256
                    .keys()
                    .map(|keys| keys.public_key)
                    .ok_or(ProvError::INVALID_STATE)?;
                let parsed = parse_chain(bytes, &fingerprint, &device_pub)?;
                ctx.p256.attach_chain(parsed.device_signature, parsed.chain)?;
            }
        }

        cprintln!(
            "[prov] Chain ingested alg={} for {}",
            alg.name(),
            HexBytes(&fingerprint[..4])
        );
        Ok(())
    }
}
