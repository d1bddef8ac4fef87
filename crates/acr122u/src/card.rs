//! Card identity and the connect, read, disconnect session

use std::fmt;

use tracing::{debug, error, trace};

use crate::apdu::{GET_UID, parse_uid};
use crate::config::{Protocol, ShareMode};
use crate::error::{Error, Result};
use crate::service::{CardConnection, CardService};

/// A card that was presented to a reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    reader: String,
    uid: Vec<u8>,
}

impl Card {
    /// Create a card read from `reader`
    pub fn new(reader: impl Into<String>, uid: Vec<u8>) -> Self {
        Self {
            reader: reader.into(),
            uid,
        }
    }

    /// Name of the reader the card was read on
    pub const fn reader(&self) -> &str {
        self.reader.as_str()
    }

    /// Unique identifier of the card
    pub const fn uid(&self) -> &[u8] {
        self.uid.as_slice()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.uid))
    }
}

/// Connection to one presented card, bounded by [`CardSession::scoped`]
pub(crate) struct CardSession<C: CardConnection> {
    reader: String,
    connection: C,
}

impl<C: CardConnection> fmt::Debug for CardSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardSession")
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

impl<C: CardConnection> CardSession<C> {
    /// Connect, run `f` against the session, then always disconnect
    ///
    /// Returns `Ok(None)` when the card was gone before the connect landed.
    /// A disconnect failure is logged and never replaces the result of `f`.
    pub(crate) fn scoped<S, T, F>(
        service: &S,
        reader: &str,
        share_mode: ShareMode,
        protocol: Protocol,
        f: F,
    ) -> Result<Option<T>>
    where
        S: CardService<Connection = C>,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        debug!(reader, "Connecting to reader");
        let connection = match service.connect(reader, share_mode, protocol) {
            Ok(connection) => connection,
            Err(e) => {
                let e = Error::pcsc("card connect error", e);
                if e.is_card_absent() {
                    trace!(reader, error = %e, "Card gone before connect");
                    return Ok(None);
                }
                return Err(e);
            }
        };

        let mut session = Self {
            reader: reader.to_string(),
            connection,
        };
        let result = f(&mut session);
        session.close();
        result.map(Some)
    }

    /// Read the card's UID
    pub(crate) fn read_uid(&mut self) -> Result<Vec<u8>> {
        debug!(reader = %self.reader, "Reading payload");
        let response = self
            .connection
            .transmit(&GET_UID)
            .map_err(|e| Error::pcsc("card transmit error", e))?;
        trace!(reader = %self.reader, response = %hex::encode(&response), "Received UID response");
        parse_uid(&response)
    }

    fn close(self) {
        debug!(reader = %self.reader, "Disconnecting");
        if let Err(e) = self.connection.disconnect() {
            let e = Error::pcsc("card disconnect error", e);
            error!(reader = %self.reader, error = %e, "Problem disconnecting");
        }
    }
}

/// Read the card that just appeared in `reader`
pub(crate) fn read_card<S: CardService>(
    service: &S,
    reader: &str,
    share_mode: ShareMode,
    protocol: Protocol,
) -> Result<Option<Card>> {
    let uid = CardSession::<S::Connection>::scoped(
        service,
        reader,
        share_mode,
        protocol,
        CardSession::read_uid,
    )?;
    Ok(uid.map(|uid| Card::new(reader, uid)))
}
