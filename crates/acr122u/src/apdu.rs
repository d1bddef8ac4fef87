//! Identity retrieval command and response decoding

use crate::error::{Error, Result};

/// PC/SC pseudo-APDU: GET DATA, UID of the card in the field
pub(crate) const GET_UID: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

const SW_SUCCESS: u16 = 0x9000;
const SW_OPERATION_FAILED: u16 = 0x6300;

/// Split a GET UID response into the UID, checking the trailing status word
pub(crate) fn parse_uid(response: &[u8]) -> Result<Vec<u8>> {
    let Some(split) = response.len().checked_sub(2) else {
        return Err(Error::InvalidResponse(response.len()));
    };
    let (data, sw) = response.split_at(split);

    match u16::from_be_bytes([sw[0], sw[1]]) {
        SW_SUCCESS => Ok(data.to_vec()),
        SW_OPERATION_FAILED => Err(Error::OperationFailed),
        other => Err(Error::StatusWord(other)),
    }
}
