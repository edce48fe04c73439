//! Advertisement assembly
//!
//! Builds legacy advertising payloads out of AD structures
//! (`[length, type, data...]`) and hands them to the backend. Nothing here
//! truncates: any structure that would push the payload past
//! [`ADV_MAX_SIZE_BYTES`] is refused with `PayloadTooLarge`.

use crate::error::{PeripheralError, PeripheralResult};
use crate::gap::constants::*;
use crate::peripheral::backend::PeripheralBackend;
use log::debug;

/// Flags advertised by a connectable, general-discoverable LE-only device
pub const DEFAULT_ADV_FLAGS: u8 = ADV_FLAG_LE_GENERAL_DISCOVERABLE | ADV_FLAG_BR_EDR_NOT_SUPPORTED;

/// A legacy advertising payload, at most 31 bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingData {
    bytes: Vec<u8>,
}

impl AdvertisingData {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(ADV_MAX_SIZE_BYTES),
        }
    }

    /// Wraps an already-assembled payload
    pub fn from_raw(raw: &[u8]) -> PeripheralResult<Self> {
        check_size(raw.len())?;
        Ok(Self {
            bytes: raw.to_vec(),
        })
    }

    /// Appends one AD structure
    pub fn add_structure(&mut self, ad_type: u8, data: &[u8]) -> PeripheralResult<&mut Self> {
        // length byte + type byte + data
        let size = self.bytes.len() + 2 + data.len();
        check_size(size)?;

        self.bytes.push((data.len() + 1) as u8);
        self.bytes.push(ad_type);
        self.bytes.extend_from_slice(data);
        Ok(self)
    }

    pub fn add_flags(&mut self, flags: u8) -> PeripheralResult<&mut Self> {
        self.add_structure(ADV_TYPE_FLAGS, &[flags])
    }

    pub fn add_complete_local_name(&mut self, name: &str) -> PeripheralResult<&mut Self> {
        self.add_structure(ADV_TYPE_COMPLETE_LOCAL_NAME, name.as_bytes())
    }

    pub fn add_short_local_name(&mut self, name: &str) -> PeripheralResult<&mut Self> {
        self.add_structure(ADV_TYPE_SHORT_LOCAL_NAME, name.as_bytes())
    }

    /// Complete list of 16-bit service UUIDs
    pub fn add_service_uuid16s(&mut self, uuids: &[u16]) -> PeripheralResult<&mut Self> {
        let data: Vec<u8> = uuids.iter().flat_map(|uuid| uuid.to_le_bytes()).collect();
        self.add_structure(ADV_TYPE_16BIT_SERVICE_UUID_COMPLETE, &data)
    }

    pub fn add_tx_power(&mut self, dbm: i8) -> PeripheralResult<&mut Self> {
        self.add_structure(ADV_TYPE_TX_POWER_LEVEL, &[dbm as u8])
    }

    /// Manufacturer specific data, company identifier first in little-endian
    pub fn add_manufacturer_specific(
        &mut self,
        company_code: u16,
        payload: &[u8],
    ) -> PeripheralResult<&mut Self> {
        let mut data = Vec::with_capacity(2 + payload.len());
        data.extend_from_slice(&company_code.to_le_bytes());
        data.extend_from_slice(payload);
        self.add_structure(ADV_TYPE_MANUFACTURER_SPECIFIC, &data)
    }

    /// Flags structure followed by a manufacturer specific structure
    pub fn manufacturer_specific(company_code: u16, payload: &[u8]) -> PeripheralResult<Self> {
        let mut adv = Self::new();
        adv.add_flags(DEFAULT_ADV_FLAGS)?
            .add_manufacturer_specific(company_code, payload)?;
        Ok(adv)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

fn check_size(size: usize) -> PeripheralResult<()> {
    if size > ADV_MAX_SIZE_BYTES {
        return Err(PeripheralError::PayloadTooLarge {
            size,
            max: ADV_MAX_SIZE_BYTES,
        });
    }
    Ok(())
}

/// Splits an advertisement into (type, data) structures.
///
/// Parsing stops at a zero length byte or a structure running past the end.
pub fn parse_advertising_data(data: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let length = data[i] as usize;
        if length == 0 || i + length >= data.len() {
            break;
        }

        result.push((data[i + 1], data[i + 2..i + 1 + length].to_vec()));
        i += 1 + length;
    }

    result
}

/// Advertising period and payload handed to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingInfo {
    pub period_ms: u32,
    pub data: AdvertisingData,
}

/// Holds the current advertising configuration and forwards it to the backend.
///
/// Advertising state beyond that is owned by the backend.
#[derive(Debug, Default)]
pub struct AdvertisingConfigurator {
    info: Option<AdvertisingInfo>,
}

impl AdvertisingConfigurator {
    pub fn new() -> Self {
        Self { info: None }
    }

    /// Stores a raw payload as the advertising configuration
    pub fn configure(
        &mut self,
        period_ms: u32,
        payload: &[u8],
    ) -> PeripheralResult<&AdvertisingInfo> {
        let data = AdvertisingData::from_raw(payload)?;
        Ok(self.info.insert(AdvertisingInfo { period_ms, data }))
    }

    /// Stores a flags + manufacturer specific payload as the configuration
    pub fn configure_manufacturer_specific(
        &mut self,
        period_ms: u32,
        company_code: u16,
        payload: &[u8],
    ) -> PeripheralResult<&AdvertisingInfo> {
        let data = AdvertisingData::manufacturer_specific(company_code, payload)?;
        Ok(self.info.insert(AdvertisingInfo { period_ms, data }))
    }

    pub fn info(&self) -> Option<&AdvertisingInfo> {
        self.info.as_ref()
    }

    /// Sends the stored configuration to the backend and starts advertising.
    ///
    /// Returns false when nothing has been configured yet.
    pub fn apply<B: PeripheralBackend + ?Sized>(&self, backend: &mut B) -> bool {
        let Some(info) = &self.info else {
            return false;
        };

        debug!(
            "Advertising {} bytes every {} ms: {}",
            info.data.len(),
            info.period_ms,
            hex::encode(info.data.as_slice())
        );
        backend.set_advertising_info(info.period_ms, info.data.as_slice());
        backend.start_advertising();
        true
    }
}
