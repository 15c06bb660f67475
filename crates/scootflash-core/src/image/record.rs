//! Per-device data record
//!
//! The record embeds the serial number, the drive MCU's hardware UID and
//! the odometer value into a fixed-size template that lands behind the
//! firmware in drive flash. Record layout comes entirely from the profile's
//! [`DataRecordTemplate`](crate::registry::DataRecordTemplate).

use crate::error::{Error, Result};
use crate::registry::{DataRecordTemplate, DeviceProfile};

/// Serial written when the operator leaves the field empty.
pub const DEFAULT_SERIAL: &str = "00000/000000000";

/// A composed data record, sized exactly to its template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    bytes: Vec<u8>,
}

impl DataRecord {
    /// Record contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Record length (always the template's declared length).
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the record is empty (never true for composed records).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Build a data record on a zeroed template.
///
/// UID words are stored byte-reversed relative to the device-native value
/// the probe read, the serial is zero-padded into its reserved span, and
/// the odometer is stored as `floor(km * 1000)` little-endian.
pub fn build_data_record(
    profile: &DeviceProfile,
    uid: [u32; 3],
    serial: &str,
    odometer_km: f64,
) -> Result<DataRecord> {
    let template = profile.data_template();
    compose(template, vec![0u8; template.len], uid, serial, odometer_km)
}

/// Build a data record seeded from a fetched template blob.
///
/// The blob is resized to the template's declared length; the per-device
/// fields are then written over it exactly as in [`build_data_record`].
pub fn build_data_record_seeded(
    profile: &DeviceProfile,
    template_blob: &[u8],
    uid: [u32; 3],
    serial: &str,
    odometer_km: f64,
) -> Result<DataRecord> {
    let template = profile.data_template();
    let mut base = template_blob.to_vec();
    base.resize(template.len, 0);
    compose(template, base, uid, serial, odometer_km)
}

fn compose(
    template: &DataRecordTemplate,
    mut bytes: Vec<u8>,
    uid: [u32; 3],
    serial: &str,
    odometer_km: f64,
) -> Result<DataRecord> {
    debug_assert_eq!(bytes.len(), template.len);

    let serial = if serial.is_empty() {
        DEFAULT_SERIAL
    } else {
        serial
    };
    if serial.len() > template.serial_span {
        return Err(Error::OutOfBounds {
            what: "serial number",
            len: serial.len(),
            max: template.serial_span,
            offset: template.serial_offset,
        });
    }

    // Clear the whole span first: a seeded template may carry a placeholder
    // serial longer than the one being written.
    let span = &mut bytes[template.serial_offset..template.serial_offset + template.serial_span];
    span.fill(0);
    span[..serial.len()].copy_from_slice(serial.as_bytes());

    for (word, offset) in uid.iter().zip(template.uid_offsets) {
        bytes[offset..offset + 4].copy_from_slice(&word.to_be_bytes());
    }

    let km_milli = (odometer_km.max(0.0) * 1000.0).floor() as u32;
    bytes[template.odometer_offset..template.odometer_offset + 4]
        .copy_from_slice(&km_milli.to_le_bytes());

    Ok(DataRecord { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{profile_for, ChipIdentity};

    fn pro() -> crate::registry::DeviceProfile {
        profile_for("pro", ChipIdentity::Standard).unwrap()
    }

    #[test]
    fn uid_words_are_stored_byte_reversed() {
        let uid = [0x1234_5678, 0x9ABC_DEF0, 0x1234_5678];
        let record = build_data_record(&pro(), uid, "12345/000000001", 0.0).unwrap();
        let bytes = record.as_bytes();
        assert_eq!(&bytes[0x1B4..0x1B8], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&bytes[0x1B8..0x1BC], &[0x9A, 0xBC, 0xDE, 0xF0]);
        assert_eq!(&bytes[0x1BC..0x1C0], &[0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn odometer_is_millikm_little_endian() {
        let record = build_data_record(&pro(), [0; 3], "", 12.0).unwrap();
        // 12.0 km -> 12000 -> 0x2EE0
        assert_eq!(&record.as_bytes()[0x52..0x56], &[0xE0, 0x2E, 0x00, 0x00]);
    }

    #[test]
    fn fractional_odometer_is_floored() {
        let record = build_data_record(&pro(), [0; 3], "", 1.2349).unwrap();
        assert_eq!(&record.as_bytes()[0x52..0x56], &1234u32.to_le_bytes());
    }

    #[test]
    fn empty_serial_falls_back_to_default() {
        let record = build_data_record(&pro(), [0; 3], "", 0.0).unwrap();
        let bytes = record.as_bytes();
        assert_eq!(&bytes[0x20..0x20 + DEFAULT_SERIAL.len()], DEFAULT_SERIAL.as_bytes());
        // zero padded to the end of the span
        assert!(bytes[0x20 + DEFAULT_SERIAL.len()..0x40].iter().all(|&b| b == 0));
    }

    #[test]
    fn overlong_serial_is_rejected() {
        let serial = "X".repeat(33);
        let err = build_data_record(&pro(), [0; 3], &serial, 0.0).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds { what: "serial number", len: 33, max: 32, .. }
        ));
    }

    #[test]
    fn record_length_matches_template() {
        let record = build_data_record(&pro(), [0; 3], "", 0.0).unwrap();
        assert_eq!(record.len(), pro().data_template().len);
    }

    #[test]
    fn composition_is_deterministic() {
        let uid = [0xDEAD_BEEF, 0x0102_0304, 0xA5A5_A5A5];
        let a = build_data_record(&pro(), uid, "31337/000000042", 153.7).unwrap();
        let b = build_data_record(&pro(), uid, "31337/000000042", 153.7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn large_template_places_serial_at_relocated_offset() {
        let fourpro = profile_for("4pro", ChipIdentity::Standard).unwrap();
        let record = build_data_record(&fourpro, [0; 3], "98765/000000009", 0.0).unwrap();
        assert_eq!(&record.as_bytes()[0xA8..0xA8 + 15], b"98765/000000009");
    }

    #[test]
    fn seeded_template_keeps_base_and_overwrites_fields() {
        let base = vec![0xAB; 0x200];
        let record =
            build_data_record_seeded(&pro(), &base, [0x11111111; 3], "00001/000000001", 1.0)
                .unwrap();
        let bytes = record.as_bytes();
        // untouched template byte survives
        assert_eq!(bytes[0x00], 0xAB);
        // serial span was cleared before writing
        assert_eq!(bytes[0x20 + 15], 0x00);
        assert_eq!(&bytes[0x52..0x56], &1000u32.to_le_bytes());
    }

    #[test]
    fn short_seed_blob_is_zero_extended() {
        let record =
            build_data_record_seeded(&pro(), &[0xCD; 16], [0; 3], "", 0.0).unwrap();
        assert_eq!(record.len(), 0x200);
        assert_eq!(record.as_bytes()[0x0F], 0xCD);
        assert_eq!(record.as_bytes()[0x10], 0x00);
    }
}
