/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    RAM-backed manufacturing store.

    The region behaves like NOR flash: `erase_all` sets every byte to 0xFF
    and programming can only clear bits. Two layouts are supported:

    * Tag/length/value: records `{tag: u16 BE, len: u16 BE, value}` appended
      back to back. The first erased header marks the end of the data.
    * Fixed offset: every field owns a slot of its maximum size, slots laid
      out in field identifier order.

--*/

use sidewalk_prov::MfgStore;
use sidewalk_prov_error::{ProvError, ProvResult};
use sidewalk_prov_types::*;
use zerocopy::{FromBytes, IntoBytes};

pub const MFG_STORE_REGION_SIZE: usize = 4096;

const TLV_HEADER_SIZE: usize = core::mem::size_of::<TlvHeader>();

/// Physical arrangement of fields in the region
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StoreLayout {
    TagLengthValue,
    FixedOffset,
}

pub struct RamMfgStore {
    layout: StoreLayout,
    region: Vec<u8>,
    fail_erase: bool,
    corrupt_field: Option<MfgField>,
}

/// Check `len` against the size the field must have
fn check_field_len(field: MfgField, len: usize) -> ProvResult<()> {
    let max_len = field.max_len().ok_or(ProvError::MFG_STORE_UNKNOWN_FIELD)?;
    let valid = match field.kind() {
        Some(MfgFieldKind::CaSerial(..)) => (CA_SERIAL_MIN_SIZE..=max_len).contains(&len),
        _ => len == max_len,
    };
    if valid {
        Ok(())
    } else {
        Err(ProvError::MFG_STORE_LENGTH_MISMATCH)
    }
}

/// Offset of the fixed-layout slot of `field`
fn fixed_offset(field: MfgField) -> ProvResult<usize> {
    field.max_len().ok_or(ProvError::MFG_STORE_UNKNOWN_FIELD)?;
    Ok(MfgField::all()
        .take_while(|f| *f != field)
        .filter_map(MfgField::max_len)
        .sum())
}

impl RamMfgStore {
    /// Create an erased store
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            region: vec![MFG_STORE_ERASED_BYTE; MFG_STORE_REGION_SIZE],
            fail_erase: false,
            corrupt_field: None,
        }
    }

    pub fn layout(&self) -> StoreLayout {
        self.layout
    }

    /// Raw contents of the region
    pub fn region(&self) -> &[u8] {
        &self.region
    }

    /// Make every following `erase_all` fail without touching the region
    pub fn set_fail_erase(&mut self, fail: bool) {
        self.fail_erase = fail;
    }

    /// Flip the low bit of the first byte whenever `field` is written
    pub fn set_corrupt_field(&mut self, field: Option<MfgField>) {
        self.corrupt_field = field;
    }

    /// Length of the stored value of `field`.
    ///
    /// The fixed-offset layout keeps no lengths, so there this is the slot
    /// size.
    pub fn field_len(&self, field: MfgField) -> ProvResult<usize> {
        match self.layout {
            StoreLayout::TagLengthValue => self
                .find_record(field)?
                .map(|(_, len)| len)
                .ok_or(ProvError::MFG_STORE_FIELD_NOT_FOUND),
            StoreLayout::FixedOffset => {
                field.max_len().ok_or(ProvError::MFG_STORE_UNKNOWN_FIELD)
            }
        }
    }

    /// AND `data` into the region at `offset`
    fn program(&mut self, offset: usize, data: &[u8]) -> ProvResult<()> {
        let dst = self
            .region
            .get_mut(offset..offset + data.len())
            .ok_or(ProvError::MFG_STORE_OUT_OF_SPACE)?;
        for (dst, src) in dst.iter_mut().zip(data) {
            *dst &= *src;
        }
        Ok(())
    }

    /// Walk the records, returning the value offset and length of `field`
    /// (if present) and the offset just past the last record.
    fn scan(&self, field: MfgField) -> ProvResult<(Option<(usize, usize)>, usize)> {
        let mut offset = 0;
        let mut found = None;
        while let Some(rest) = self.region.get(offset..) {
            let Ok((header, _)) = TlvHeader::read_from_prefix(rest) else {
                break;
            };
            if header.is_erased() {
                break;
            }
            let len = header.len.get() as usize;
            let value = offset + TLV_HEADER_SIZE;
            if value + len > self.region.len() {
                return Err(ProvError::MFG_STORE_OUT_OF_SPACE);
            }
            if header.tag.get() == field.0 {
                found = Some((value, len));
            }
            offset = value + len;
        }
        Ok((found, offset))
    }

    fn find_record(&self, field: MfgField) -> ProvResult<Option<(usize, usize)>> {
        Ok(self.scan(field)?.0)
    }

    fn write_tlv(&mut self, field: MfgField, data: &[u8]) -> ProvResult<()> {
        let (existing, end) = self.scan(field)?;
        if existing.is_some() {
            return Err(ProvError::MFG_STORE_WRITE_FAILURE);
        }
        if end + TLV_HEADER_SIZE + data.len() > self.region.len() {
            return Err(ProvError::MFG_STORE_OUT_OF_SPACE);
        }
        let header = TlvHeader::new(field, data.len() as u16);
        self.program(end, header.as_bytes())?;
        self.program(end + TLV_HEADER_SIZE, data)
    }

    fn read_tlv(&self, field: MfgField, data: &mut [u8]) -> ProvResult<()> {
        let (offset, len) = self
            .find_record(field)?
            .ok_or(ProvError::MFG_STORE_FIELD_NOT_FOUND)?;
        if len != data.len() {
            return Err(ProvError::MFG_STORE_LENGTH_MISMATCH);
        }
        data.copy_from_slice(&self.region[offset..offset + len]);
        Ok(())
    }

    /// Slots carry no presence marker of their own; an erased version slot
    /// means nothing has been written since the last erase.
    fn read_fixed(&self, field: MfgField, data: &mut [u8]) -> ProvResult<()> {
        let max_len = field.max_len().ok_or(ProvError::MFG_STORE_UNKNOWN_FIELD)?;
        if data.len() > max_len {
            return Err(ProvError::MFG_STORE_LENGTH_MISMATCH);
        }
        let version = &self.region[..MFG_STORE_VERSION_SIZE];
        if version.iter().all(|&b| b == MFG_STORE_ERASED_BYTE) {
            return Err(ProvError::MFG_STORE_FIELD_NOT_FOUND);
        }
        let offset = fixed_offset(field)?;
        data.copy_from_slice(&self.region[offset..offset + data.len()]);
        Ok(())
    }
}

impl MfgStore for RamMfgStore {
    fn write(&mut self, field: MfgField, data: &[u8]) -> ProvResult<()> {
        check_field_len(field, data.len())?;

        let mut value = [0u8; CA_SERIAL_MAX_SIZE];
        let value = value
            .get_mut(..data.len())
            .ok_or(ProvError::MFG_STORE_LENGTH_MISMATCH)?;
        value.copy_from_slice(data);
        if self.corrupt_field == Some(field) {
            value[0] ^= 0x01;
        }

        match self.layout {
            StoreLayout::TagLengthValue => self.write_tlv(field, value),
            StoreLayout::FixedOffset => {
                let offset = fixed_offset(field)?;
                self.program(offset, value)
            }
        }
    }

    fn read(&mut self, field: MfgField, data: &mut [u8]) -> ProvResult<()> {
        match self.layout {
            StoreLayout::TagLengthValue => self.read_tlv(field, data),
            StoreLayout::FixedOffset => self.read_fixed(field, data),
        }
    }

    fn erase_all(&mut self) -> ProvResult<()> {
        if self.fail_erase {
            return Err(ProvError::MFG_STORE_ERASE_FAILURE);
        }
        self.region.fill(MFG_STORE_ERASED_BYTE);
        Ok(())
    }

    fn supports_tlv_layout(&self) -> bool {
        self.layout == StoreLayout::TagLengthValue
    }
}
