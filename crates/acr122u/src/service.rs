//! Card service seam over the PC/SC middleware

use std::ffi::CString;
use std::time::Duration;

use pcsc::ffi::DWORD;
use pcsc::{Card, Context, Disposition, ReaderState, Scope, State};

use crate::config::{Protocol, ShareMode};
use crate::state::ReaderRecord;

/// One established middleware session
///
/// The polling engine only talks to readers through this trait, which is
/// implemented for [`pcsc::Context`].
pub trait CardService {
    /// Connection to a card, as returned by [`CardService::connect`]
    type Connection: CardConnection;

    /// Check that the session handle is still usable
    fn is_valid(&self) -> Result<(), pcsc::Error>;

    /// Names of the readers currently attached
    fn list_readers(&self) -> Result<Vec<String>, pcsc::Error>;

    /// Connect to the card in `reader`
    fn connect(
        &self,
        reader: &str,
        share_mode: ShareMode,
        protocol: Protocol,
    ) -> Result<Self::Connection, pcsc::Error>;

    /// Block until any record's reader differs from its current flags or
    /// event count
    ///
    /// On success every record's event flags and count are updated. Returns
    /// [`pcsc::Error::Timeout`] when `timeout` elapses with no change.
    fn get_status_change(
        &self,
        records: &mut [ReaderRecord],
        timeout: Duration,
    ) -> Result<(), pcsc::Error>;

    /// Tear down the session
    fn release(self) -> Result<(), pcsc::Error>
    where
        Self: Sized;
}

/// An open connection to one card
pub trait CardConnection {
    /// Exchange one APDU with the card
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, pcsc::Error>;

    /// Close the connection, resetting the card
    fn disconnect(self) -> Result<(), pcsc::Error>
    where
        Self: Sized;
}

/// Establish a user scope PC/SC session
pub(crate) fn establish() -> Result<Context, pcsc::Error> {
    Context::establish(Scope::User)
}

fn reader_cstring(reader: &str) -> Result<CString, pcsc::Error> {
    CString::new(reader).map_err(|_| pcsc::Error::UnknownReader)
}

/// Rebuild the full state word: flags low, event count in the upper 16 bits
fn state_word(state: State, count: u32) -> State {
    State::from_bits_retain(state.bits() | (DWORD::from(count) << 16))
}

impl CardService for Context {
    type Connection = Card;

    fn is_valid(&self) -> Result<(), pcsc::Error> {
        Self::is_valid(self)
    }

    fn list_readers(&self) -> Result<Vec<String>, pcsc::Error> {
        match self.list_readers_owned() {
            Ok(readers) => Ok(readers
                .iter()
                .map(|r| r.to_string_lossy().into_owned())
                .collect()),
            // pcsc-lite reports an empty list this way
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn connect(
        &self,
        reader: &str,
        share_mode: ShareMode,
        protocol: Protocol,
    ) -> Result<Card, pcsc::Error> {
        let reader = reader_cstring(reader)?;
        Self::connect(self, &reader, share_mode.into(), protocol.into())
    }

    fn get_status_change(
        &self,
        records: &mut [ReaderRecord],
        timeout: Duration,
    ) -> Result<(), pcsc::Error> {
        let mut reader_states = records
            .iter()
            .map(|record| {
                Ok(ReaderState::new(
                    reader_cstring(record.name())?,
                    state_word(record.current_state(), record.current_count()),
                ))
            })
            .collect::<Result<Vec<_>, pcsc::Error>>()?;

        Self::get_status_change(self, timeout, &mut reader_states)?;

        for (record, reader_state) in records.iter_mut().zip(&reader_states) {
            record.set_event_state(reader_state.event_state());
            record.set_event_count(reader_state.event_count());
        }
        Ok(())
    }

    fn release(self) -> Result<(), pcsc::Error> {
        Self::release(self).map_err(|(_, e)| e)
    }
}

impl CardConnection for Card {
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, pcsc::Error> {
        let mut response_buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
        let response = Self::transmit(self, command, &mut response_buffer)?;
        Ok(response.to_vec())
    }

    fn disconnect(self) -> Result<(), pcsc::Error> {
        Self::disconnect(self, Disposition::ResetCard).map_err(|(_, e)| e)
    }
}
